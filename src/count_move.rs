//! Two-pass count-then-move partitioning.
//!
//! ```text
//!  pass 1 (parallel)      reduce (sequential)         pass 2 (parallel)
//!  worker w counts its    totals[b] = Σ_w local[w][b]  worker w writes its
//!  chunk into local[w]    offsets = exclusive scan     records from
//!                                                      offsets[b] + Σ_{w'<w} local[w'][b]
//! ```
//!
//! Neither pass touches shared mutable state: pass 1 writes only its own row
//! of the count table, pass 2 writes only into the region reserved for it in
//! each bucket. The resulting layout is fully determined by the input and the
//! chunk plan: within a bucket, lower-numbered workers come first, and each
//! worker's records keep their source order.
use std::ops::Range;
use std::time::Instant;

use log::debug;

use crate::Partitioned;
use crate::buffer::SendPtr;
use crate::chunk::{self, Chunk};
use crate::config::PartitionConfig;
use crate::error::{Error, Result};
use crate::record::{Record, bucket_of};
use crate::workers;
use crate::workload::Workload;

/// `[worker][bucket]` record counts, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalCounts {
    counts: Vec<usize>,
    num_buckets: usize,
}

impl LocalCounts {
    pub fn new(num_workers: usize, num_buckets: usize) -> Self {
        Self {
            counts: vec![0; num_workers * num_buckets],
            num_buckets,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.counts.len() / self.num_buckets
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    pub fn row(&self, worker: usize) -> &[usize] {
        let start = worker * self.num_buckets;
        &self.counts[start..start + self.num_buckets]
    }

    pub fn get(&self, worker: usize, bucket: usize) -> usize {
        self.counts[worker * self.num_buckets + bucket]
    }

    /// Per-bucket totals over all workers.
    pub fn totals(&self) -> Vec<usize> {
        let mut totals = vec![0; self.num_buckets];
        for row in self.counts.chunks_exact(self.num_buckets) {
            for (t, &c) in totals.iter_mut().zip(row) {
                *t += c;
            }
        }
        totals
    }

    /// Records that workers below `worker` contribute to `bucket`.
    pub fn preceding(&self, worker: usize, bucket: usize) -> usize {
        (0..worker).map(|w| self.get(w, bucket)).sum()
    }
}

/// Exclusive prefix sum of the bucket totals, with the grand total appended,
/// so bucket `b` occupies `[start(b), end(b))`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetTable {
    starts: Vec<usize>,
}

impl OffsetTable {
    pub fn from_totals(totals: &[usize]) -> Self {
        let mut starts = Vec::with_capacity(totals.len() + 1);
        let mut cumulative = 0;
        for &count in totals {
            starts.push(cumulative);
            cumulative += count;
        }
        starts.push(cumulative);
        Self { starts }
    }

    pub fn num_buckets(&self) -> usize {
        self.starts.len() - 1
    }

    pub fn start(&self, bucket: usize) -> usize {
        self.starts[bucket]
    }

    pub fn range(&self, bucket: usize) -> Range<usize> {
        self.starts[bucket]..self.starts[bucket + 1]
    }

    pub fn total(&self) -> usize {
        self.starts[self.num_buckets()]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.starts
    }
}

/// Pass 1: each worker counts its own chunk into its own row.
pub(crate) fn count_pass(
    records: &[Record],
    chunks: &[Chunk],
    num_buckets: usize,
    pin: bool,
) -> Result<LocalCounts> {
    let rows = workers::run(chunks, pin, |chunk| {
        let mut row = vec![0usize; num_buckets];
        for record in &records[chunk.range()] {
            row[bucket_of(record.key, num_buckets)] += 1;
        }
        row
    })?;

    let mut local = LocalCounts::new(chunks.len(), num_buckets);
    for (dst, row) in local.counts.chunks_exact_mut(num_buckets).zip(rows) {
        dst.copy_from_slice(&row);
    }
    Ok(local)
}

/// Sums each bucket's column and scans the totals in bucket order.
pub(crate) fn reduce(local: &LocalCounts) -> OffsetTable {
    OffsetTable::from_totals(&local.totals())
}

/// First write position of `worker` in every bucket. With
/// `worker == num_workers` this is the end of every bucket.
pub(crate) fn worker_cursors(
    local: &LocalCounts,
    offsets: &OffsetTable,
    worker: usize,
) -> Vec<usize> {
    (0..local.num_buckets())
        .map(|b| offsets.start(b) + local.preceding(worker, b))
        .collect()
}

/// Pass 2: each worker re-scans its chunk in source order and writes every
/// record at its running per-bucket cursor.
///
/// In every bucket, worker `w` writes only between its own first cursor and
/// that of worker `w + 1`. A record that would cross that bound, or a region
/// left short, fails with [`Error::CountMismatch`].
pub(crate) fn move_pass(
    records: &[Record],
    chunks: &[Chunk],
    local: &LocalCounts,
    offsets: &OffsetTable,
    workload: Workload,
    pin: bool,
) -> Result<Vec<Record>> {
    let len = records.len();
    let plan_matches = chunks.len() == local.num_workers()
        && chunks
            .iter()
            .enumerate()
            .all(|(w, c)| c.worker == w && c.start <= c.end && c.end <= len)
        && *offsets == reduce(local)
        && offsets.total() == len;
    if !plan_matches {
        return Err(Error::ChunkPlanMismatch);
    }

    let num_buckets = local.num_buckets();
    let mut output = vec![Record::default(); len];
    let out = SendPtr::new(output.as_mut_ptr());

    workers::run(chunks, pin, |chunk| {
        let mut cursors = worker_cursors(local, offsets, chunk.worker);
        let ends = worker_cursors(local, offsets, chunk.worker + 1);
        for record in &records[chunk.range()] {
            let record = workload.apply(*record);
            let bucket = bucket_of(record.key, num_buckets);
            let position = cursors[bucket];
            if position >= ends[bucket] {
                return Err(Error::CountMismatch {
                    worker: chunk.worker,
                    bucket,
                });
            }
            // SAFETY: worker ids are distinct, so the regions
            // [cursors[b], ends[b]) are disjoint across workers and buckets,
            // and `ends` never exceeds `len`.
            unsafe { out.get().add(position).write(record) };
            cursors[bucket] += 1;
        }
        match cursors.iter().zip(&ends).position(|(c, e)| c != e) {
            Some(bucket) => Err(Error::CountMismatch {
                worker: chunk.worker,
                bucket,
            }),
            None => Ok(()),
        }
    })?
    .into_iter()
    .collect::<Result<()>>()?;

    Ok(output)
}

/// Output of the two-pass strategy: one packed sequence plus the offset
/// table delimiting each bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedPartitions {
    records: Vec<Record>,
    offsets: OffsetTable,
    local: LocalCounts,
}

impl PackedPartitions {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn local_counts(&self) -> &LocalCounts {
        &self.local
    }

    /// The records `worker` contributed to `bucket`.
    pub fn contribution(&self, worker: usize, bucket: usize) -> &[Record] {
        let start = self.offsets.start(bucket) + self.local.preceding(worker, bucket);
        &self.records[start..start + self.local.get(worker, bucket)]
    }
}

impl Partitioned for PackedPartitions {
    fn num_buckets(&self) -> usize {
        self.offsets.num_buckets()
    }

    fn bucket(&self, bucket: usize) -> &[Record] {
        &self.records[self.offsets.range(bucket)]
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Runs count, reduce and move over `records`.
pub fn partition(records: &[Record], config: &PartitionConfig) -> Result<PackedPartitions> {
    config.validate_common()?;
    let chunks = chunk::plan(records.len(), config.num_workers)?;

    debug!(
        "count-then-move: {} records, {} workers, {} buckets",
        records.len(),
        config.num_workers,
        config.num_buckets
    );

    let start = Instant::now();
    let local = count_pass(records, &chunks, config.num_buckets, config.pin_workers)?;
    debug!("count-then-move: count took {:?}", start.elapsed());

    let offsets = reduce(&local);

    let start = Instant::now();
    let packed = move_pass(
        records,
        &chunks,
        &local,
        &offsets,
        config.workload,
        config.pin_workers,
    )?;
    debug!("count-then-move: move took {:?}", start.elapsed());

    Ok(PackedPartitions {
        records: packed,
        offsets,
        local,
    })
}
