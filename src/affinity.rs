//! Optional worker pinning. Partitioning never depends on whether a request
//! is honoured.
use std::sync::OnceLock;

use core_affinity::CoreId;
use log::{trace, warn};

fn cores() -> &'static [CoreId] {
    static CORES: OnceLock<Vec<CoreId>> = OnceLock::new();
    CORES.get_or_init(|| core_affinity::get_core_ids().unwrap_or_default())
}

/// Number of execution units visible to the process, at least 1.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Core that `worker` asks for, wrapping when there are more workers than
/// cores. `None` when the platform reports no cores.
pub fn core_for(worker: usize) -> Option<CoreId> {
    let cores = cores();
    if cores.is_empty() {
        None
    } else {
        Some(cores[worker % cores.len()])
    }
}

/// Pins the calling thread to the core chosen for `worker`.
///
/// Returns whether the platform accepted the request.
pub fn pin_current(worker: usize) -> bool {
    let Some(core) = core_for(worker) else {
        warn!("worker {worker}: no cores reported, running unpinned");
        return false;
    };
    let pinned = core_affinity::set_for_current(core);
    if pinned {
        trace!("worker {worker}: pinned to core {}", core.id);
    } else {
        warn!("worker {worker}: pinning to core {} failed", core.id);
    }
    pinned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_one_core() {
        assert!(available_cores() >= 1);
    }

    #[test]
    fn core_choice_wraps() {
        let n = cores().len();
        if n == 0 {
            assert!(core_for(0).is_none());
            return;
        }
        assert_eq!(core_for(0).map(|c| c.id), core_for(n).map(|c| c.id));
    }

    #[test]
    fn pinning_is_best_effort() {
        // Whatever the sandbox allows, asking must not panic.
        std::thread::spawn(|| {
            let _ = pin_current(3);
        })
        .join()
        .unwrap();
    }
}
