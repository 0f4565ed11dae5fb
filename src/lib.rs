//! Multi-threaded hash partitioning of numbered records.
//!
//! Two strategies place every record of an input sequence into one of `K`
//! buckets by `key mod K`:
//!
//! * [`concurrent`] (`concurrent-output`): a single pass where workers claim
//!   output slots through one atomic counter per bucket.
//! * [`count_move`] (`count-then-move`): a counting pass, a prefix sum, then a
//!   move pass where every worker writes to precomputed, private offsets.
//!
//! [`harness`] drives either strategy over synthetic input, times it and
//! verifies the result.
pub mod affinity;
pub mod buffer;
pub mod chunk;
pub mod concurrent;
pub mod config;
pub mod count_move;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod record;
pub mod workload;

mod workers;

pub use buffer::BucketBuffers;
pub use chunk::Chunk;
pub use config::{Capacity, MAX_BUCKETS, MAX_HASH_BITS, PartitionConfig};
pub use count_move::PackedPartitions;
pub use error::{ConfigError, Error, Result};
pub use harness::{RunReport, Strategy};
pub use record::{Record, bucket_of};
pub use workload::Workload;

/// Read access to a finished partitioning, whatever its memory layout.
pub trait Partitioned {
    fn num_buckets(&self) -> usize;

    /// The records placed in `bucket`, densely packed.
    fn bucket(&self, bucket: usize) -> &[Record];

    /// Number of records in each bucket.
    fn occupancy(&self) -> Vec<usize> {
        (0..self.num_buckets()).map(|b| self.bucket(b).len()).collect()
    }

    fn len(&self) -> usize {
        (0..self.num_buckets()).map(|b| self.bucket(b).len()).sum()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for dyn Partitioned + Send + Sync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partitioned")
            .field("num_buckets", &self.num_buckets())
            .field("len", &self.len())
            .finish()
    }
}
