//! One OS thread per chunk, spawned for a single pass and joined before the
//! pass returns. Returning from [`run`] is the barrier between passes.
use std::thread;

use log::trace;

use crate::affinity;
use crate::chunk::Chunk;
use crate::error::{Error, Result};

/// Runs `work` once per chunk, each on its own scoped thread.
///
/// Results come back in worker order. Every thread is joined, even when an
/// earlier one panicked; the first panic is reported as
/// [`Error::WorkerPanicked`].
pub(crate) fn run<T, F>(chunks: &[Chunk], pin: bool, work: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(Chunk) -> T + Sync,
{
    let work = &work;
    let joined: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = chunks
            .iter()
            .map(|&chunk| {
                s.spawn(move || {
                    if pin {
                        affinity::pin_current(chunk.worker);
                    }
                    trace!(
                        "worker {}: records [{}, {})",
                        chunk.worker, chunk.start, chunk.end
                    );
                    work(chunk)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    joined
        .into_iter()
        .zip(chunks)
        .map(|(outcome, chunk)| {
            outcome.map_err(|_| Error::WorkerPanicked {
                worker: chunk.worker,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk;

    #[test]
    fn results_in_worker_order() {
        let chunks = chunk::plan(10, 3).unwrap();
        let lens = run(&chunks, false, |c| (c.worker, c.len())).unwrap();
        assert_eq!(lens, vec![(0, 3), (1, 3), (2, 4)]);
    }

    #[test]
    fn panic_is_reported() {
        let chunks = chunk::plan(4, 2).unwrap();
        let err = run(&chunks, false, |c| {
            if c.worker == 1 {
                panic!("boom");
            }
        })
        .unwrap_err();
        assert_eq!(err, Error::WorkerPanicked { worker: 1 });
    }
}
