use std::ops::Range;

use crate::error::ConfigError;

/// A half-open index range `[start, end)` over the input, owned by one worker
/// for the duration of a pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub worker: usize,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Splits `[0, num_records)` into `num_workers` contiguous chunks of
/// `num_records / num_workers` records; the last chunk takes the remainder.
///
/// With fewer records than workers every chunk but the last is empty.
pub fn plan(num_records: usize, num_workers: usize) -> Result<Vec<Chunk>, ConfigError> {
    if num_workers == 0 {
        return Err(ConfigError::ZeroWorkers);
    }
    let size = num_records / num_workers;
    Ok((0..num_workers)
        .map(|worker| {
            let start = worker * size;
            let end = if worker == num_workers - 1 {
                num_records
            } else {
                start + size
            };
            Chunk { worker, start, end }
        })
        .collect())
}
