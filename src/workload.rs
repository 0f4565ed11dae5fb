//! Synthetic per-record compute, interleaved with data movement so that the
//! partitioners are not purely memory bound.
use crate::record::Record;

/// Number of rounds the benchmark programs used when compute was enabled.
pub const DEFAULT_ROUNDS: u32 = 50;

const MODULUS: i64 = 10_000;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Workload {
    rounds: u32,
}

impl Workload {
    /// Leaves records untouched.
    pub const NONE: Self = Self { rounds: 0 };

    pub const fn rounds(rounds: u32) -> Self {
        Self { rounds }
    }

    pub fn is_none(&self) -> bool {
        self.rounds == 0
    }

    /// Rewrites `value` as `(key * value + i) mod 10000` for each round `i`.
    ///
    /// Pure in `(key, value)`, no allocation. Arithmetic wraps.
    #[inline]
    pub fn apply(&self, record: Record) -> Record {
        let mut value = record.value;
        for i in 0..self.rounds as i64 {
            value = record.key.wrapping_mul(value).wrapping_add(i) % MODULUS;
        }
        Record::new(record.key, value)
    }
}
