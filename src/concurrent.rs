//! Single-pass partitioning with shared atomic fill counters.
//!
//! Every worker scans its own chunk once. For each record it computes the
//! bucket, claims the next free slot in that bucket with a `fetch_add` on the
//! bucket's counter and writes the record there.
//!
//! The `fetch_add` is the only synchronization on the hot path. It hands out
//! each `(bucket, position)` exactly once, so no two workers ever write the
//! same slot. It does not preserve source order inside a bucket: records from
//! different workers interleave in the order their increments were granted.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use log::{debug, trace};

use crate::buffer::{BucketBuffers, ScatterTarget};
use crate::chunk::{self, Chunk};
use crate::config::PartitionConfig;
use crate::error::{Error, Result};
use crate::record::{Record, bucket_of};
use crate::workers;
use crate::workload::Workload;

/// One shared counter per bucket, bounded by the bucket capacity.
pub struct FillCounters {
    cells: Vec<AtomicUsize>,
    capacity: usize,
}

impl FillCounters {
    pub fn new(num_buckets: usize, capacity: usize) -> Self {
        Self {
            cells: (0..num_buckets).map(|_| AtomicUsize::new(0)).collect(),
            capacity,
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.cells.len()
    }

    /// Claims the next free position in `bucket`.
    ///
    /// Each call returns a distinct position per bucket, in increasing order
    /// of grant. Positions at or past the capacity are never handed out: the
    /// claim fails instead.
    #[inline(always)]
    pub fn claim(&self, bucket: usize) -> Result<usize> {
        // AcqRel keeps claims ordered with the slot writes around them.
        let position = self.cells[bucket].fetch_add(1, Ordering::AcqRel);
        if position >= self.capacity {
            return Err(Error::CapacityExceeded {
                bucket,
                capacity: self.capacity,
            });
        }
        Ok(position)
    }

    /// Number of positions successfully handed out for `bucket` so far.
    pub fn load(&self, bucket: usize) -> usize {
        self.cells[bucket]
            .load(Ordering::Acquire)
            .min(self.capacity)
    }

    pub fn into_fills(self) -> Vec<usize> {
        let capacity = self.capacity;
        self.cells
            .into_iter()
            .map(|c| c.into_inner().min(capacity))
            .collect()
    }
}

/// Scatters `records[chunk]` into the target. Stops early once `abort` is
/// raised by another worker.
fn scatter_chunk(
    records: &[Record],
    chunk: Chunk,
    counters: &FillCounters,
    target: ScatterTarget<'_>,
    workload: Workload,
    abort: &AtomicBool,
) -> Result<()> {
    let num_buckets = counters.num_buckets();
    for record in &records[chunk.range()] {
        if abort.load(Ordering::Relaxed) {
            trace!("worker {}: aborted", chunk.worker);
            return Ok(());
        }
        let record = workload.apply(*record);
        let bucket = bucket_of(record.key, num_buckets);
        let placed = counters.claim(bucket).and_then(|position| {
            // SAFETY: `claim` never returns the same position twice for a bucket.
            unsafe { target.write(bucket, position, record) }
        });
        if let Err(e) = placed {
            abort.store(true, Ordering::Relaxed);
            return Err(e);
        }
    }
    Ok(())
}

/// Partitions `records` into `config.num_buckets` buffers with
/// `config.num_workers` threads.
///
/// Fails with [`Error::CapacityExceeded`] when a bucket receives more records
/// than its capacity; the partial buffers are dropped.
pub fn partition(records: &[Record], config: &PartitionConfig) -> Result<BucketBuffers> {
    config.validate_for(records.len())?;
    let chunks = chunk::plan(records.len(), config.num_workers)?;
    let capacity = config.capacity_for(records.len());

    debug!(
        "concurrent-output: {} records, {} workers, {} buckets x {} slots",
        records.len(),
        config.num_workers,
        config.num_buckets,
        capacity
    );

    let mut buffers = BucketBuffers::new(config.num_buckets, capacity)?;
    let counters = FillCounters::new(config.num_buckets, capacity);
    let abort = AtomicBool::new(false);

    let start = Instant::now();
    {
        let target = buffers.scatter_target();
        debug_assert_eq!(target.capacity(), capacity);
        let (counters, abort) = (&counters, &abort);
        let workload = config.workload;

        workers::run(&chunks, config.pin_workers, |chunk| {
            scatter_chunk(records, chunk, counters, target, workload, abort)
        })?
        .into_iter()
        .collect::<Result<()>>()?;
    }
    debug!("concurrent-output: scatter took {:?}", start.elapsed());

    buffers.set_fills(counters.into_fills());
    Ok(buffers)
}
