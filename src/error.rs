//! Error types for the `hashpart` crate.

/// A configuration that can never be partitioned.
///
/// These are reported by [`PartitionConfig::validate`](crate::PartitionConfig::validate)
/// before any worker thread is spawned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A bucket count of zero has no valid bucket index.
    #[error("bucket count must be positive")]
    ZeroBuckets,

    /// At least one worker is needed to visit the input.
    #[error("worker count must be positive")]
    ZeroWorkers,

    /// The bucket count is above the configured maximum.
    #[error("bucket count {requested} exceeds the maximum of {max}")]
    TooManyBuckets { requested: usize, max: usize },

    /// The configured maximum is itself above the hard limit.
    #[error("maximum bucket count {requested} exceeds the hard limit of {limit}")]
    MaxBucketsTooLarge { requested: usize, limit: usize },

    /// `1 << bits` would exceed the bucket limit.
    #[error("{bits} hash bits exceeds the maximum of {max}")]
    HashBitsTooWide { bits: u32, max: u32 },

    /// `buckets * capacity` slots cannot be addressed.
    #[error("{buckets} buckets of capacity {capacity} cannot be allocated")]
    ArenaTooLarge { buckets: usize, capacity: usize },

    /// A fixed capacity of zero cannot hold any record.
    #[error("bucket capacity must be positive")]
    ZeroCapacity,
}

/// Errors raised while running a partitioning pass.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The configuration was rejected, nothing ran.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A bucket buffer ran out of preallocated slots.
    ///
    /// This is a sizing error. The run is aborted and the buffers are
    /// discarded, nothing past `capacity` is ever written.
    #[error("bucket {bucket} exceeded its capacity of {capacity} records")]
    CapacityExceeded { bucket: usize, capacity: usize },

    /// A worker's records for `bucket` do not fill exactly the region its
    /// count reserved.
    #[error("worker {worker} does not match its count for bucket {bucket}")]
    CountMismatch { worker: usize, bucket: usize },

    /// The chunk plan does not line up with the count table or the input.
    #[error("chunk plan does not match the count table")]
    ChunkPlanMismatch,

    /// A worker thread panicked before finishing its chunk.
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
