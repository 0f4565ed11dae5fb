use crate::error::ConfigError;
use crate::workload::Workload;

/// Widest supported hash, in bits.
pub const MAX_HASH_BITS: u32 = 18;

/// Hard limit on the number of buckets, `1 << MAX_HASH_BITS`.
pub const MAX_BUCKETS: usize = 1 << MAX_HASH_BITS;

/// How many slots each single-pass bucket buffer gets.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Capacity {
    /// `N / K + 1`. Enough when keys spread evenly, e.g. sequential keys.
    #[default]
    Uniform,
    /// `N`. Every record may land in the same bucket.
    WorstCase,
    /// A caller-chosen number of slots per bucket.
    Fixed(usize),
}

impl Capacity {
    pub fn resolve(self, num_records: usize, num_buckets: usize) -> usize {
        match self {
            Capacity::Uniform => num_records / num_buckets + 1,
            Capacity::WorstCase => num_records.max(1),
            Capacity::Fixed(c) => c,
        }
    }
}

/// Sizing and behaviour of one partitioning run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionConfig {
    pub num_records: usize,
    pub num_workers: usize,
    pub num_buckets: usize,
    pub max_buckets: usize,
    pub capacity: Capacity,
    pub pin_workers: bool,
    pub workload: Workload,
}

impl PartitionConfig {
    pub fn new(num_records: usize, num_workers: usize, num_buckets: usize) -> Self {
        Self {
            num_records,
            num_workers,
            num_buckets,
            max_buckets: MAX_BUCKETS,
            capacity: Capacity::default(),
            pin_workers: false,
            workload: Workload::NONE,
        }
    }

    /// `K = 1 << hash_bits`.
    pub fn from_hash_bits(
        num_records: usize,
        num_workers: usize,
        hash_bits: u32,
    ) -> Result<Self, ConfigError> {
        if hash_bits > MAX_HASH_BITS {
            return Err(ConfigError::HashBitsTooWide {
                bits: hash_bits,
                max: MAX_HASH_BITS,
            });
        }
        Ok(Self::new(num_records, num_workers, 1 << hash_bits))
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets;
        self
    }

    pub fn with_pinning(mut self, pin_workers: bool) -> Self {
        self.pin_workers = pin_workers;
        self
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    /// `log2(K)` when `K` is a power of two.
    pub fn hash_bits(&self) -> Option<u32> {
        self.num_buckets
            .is_power_of_two()
            .then(|| self.num_buckets.trailing_zeros())
    }

    /// Slots per bucket for the single-pass buffers.
    pub fn bucket_capacity(&self) -> usize {
        self.capacity_for(self.num_records)
    }

    pub fn capacity_for(&self, num_records: usize) -> usize {
        self.capacity.resolve(num_records, self.num_buckets)
    }

    /// Checks everything either strategy needs, including the single-pass
    /// arena for `num_records` records.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for(self.num_records)
    }

    /// Like [`validate`](Self::validate), against an input of `num_records`
    /// records, which may differ from the configured size.
    pub fn validate_for(&self, num_records: usize) -> Result<(), ConfigError> {
        self.validate_common()?;
        self.validate_arena(num_records)
    }

    /// Worker and bucket counts, shared by both strategies.
    pub fn validate_common(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.num_buckets == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        if self.max_buckets > MAX_BUCKETS {
            return Err(ConfigError::MaxBucketsTooLarge {
                requested: self.max_buckets,
                limit: MAX_BUCKETS,
            });
        }
        if self.num_buckets > self.max_buckets {
            return Err(ConfigError::TooManyBuckets {
                requested: self.num_buckets,
                max: self.max_buckets,
            });
        }
        Ok(())
    }

    /// Capacity and arena size of the single-pass buffers.
    ///
    /// This only rules out sizes that cannot be addressed; an arena that is
    /// addressable but larger than the allocator can provide is reported by
    /// [`BucketBuffers::new`](crate::BucketBuffers::new).
    pub fn validate_arena(&self, num_records: usize) -> Result<(), ConfigError> {
        if self.capacity == Capacity::Fixed(0) {
            return Err(ConfigError::ZeroCapacity);
        }
        let capacity = self.capacity_for(num_records);
        if arena_slots(self.num_buckets, capacity).is_none() {
            return Err(ConfigError::ArenaTooLarge {
                buckets: self.num_buckets,
                capacity,
            });
        }
        Ok(())
    }
}

/// `buckets * capacity`, when that many records fit in one allocation.
pub(crate) fn arena_slots(buckets: usize, capacity: usize) -> Option<usize> {
    buckets
        .checked_mul(capacity)
        .filter(|&slots| slots <= isize::MAX as usize / size_of::<crate::Record>())
}
