//! Drives a strategy over synthetic input, times the partitioning phase and
//! checks the result.
use std::fmt;
use std::time::{Duration, Instant};

use log::info;

use crate::Partitioned;
use crate::affinity;
use crate::config::PartitionConfig;
use crate::error::{ConfigError, Result};
use crate::record::{self, Record, bucket_of};
use crate::{concurrent, count_move};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Strategy {
    /// Single pass, atomic per-bucket fill counters.
    #[value(name = "concurrent-output")]
    ConcurrentOutput,
    /// Count pass, prefix sum, move pass.
    #[value(name = "count-then-move")]
    CountThenMove,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::ConcurrentOutput, Strategy::CountThenMove];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::ConcurrentOutput => "concurrent-output",
            Strategy::CountThenMove => "count-then-move",
        }
    }

    /// Checks `config` for what this strategy uses; count-then-move has no
    /// bucket arena to size.
    pub fn validate(self, config: &PartitionConfig) -> Result<(), ConfigError> {
        match self {
            Strategy::ConcurrentOutput => config.validate(),
            Strategy::CountThenMove => config.validate_common(),
        }
    }

    pub fn partition(
        self,
        records: &[Record],
        config: &PartitionConfig,
    ) -> Result<Box<dyn Partitioned + Send + Sync>> {
        let output: Box<dyn Partitioned + Send + Sync> = match self {
            Strategy::ConcurrentOutput => Box::new(concurrent::partition(records, config)?),
            Strategy::CountThenMove => Box::new(count_move::partition(records, config)?),
        };
        Ok(output)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct RunReport {
    pub strategy: Strategy,
    pub config: PartitionConfig,
    /// Wall clock time of the partitioning phase only.
    pub elapsed: Duration,
    pub cores: usize,
    pub output: Box<dyn Partitioned + Send + Sync>,
}

impl RunReport {
    pub fn occupancy(&self) -> Vec<usize> {
        self.output.occupancy()
    }

    /// Millions of records per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return f64::INFINITY;
        }
        self.config.num_records as f64 / secs / 1e6
    }
}

impl fmt::Debug for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunReport")
            .field("strategy", &self.strategy)
            .field("config", &self.config)
            .field("elapsed", &self.elapsed)
            .field("cores", &self.cores)
            .field("records", &self.output.len())
            .finish()
    }
}

/// Generates `config.num_records` sequential records and partitions them.
///
/// The configuration is validated before the input is generated.
pub fn run(strategy: Strategy, config: &PartitionConfig) -> Result<RunReport> {
    strategy.validate(config)?;
    let records = record::sequential(config.num_records);
    run_on(strategy, &records, config)
}

/// Partitions caller-provided `records`; only the partitioning is timed.
pub fn run_on(
    strategy: Strategy,
    records: &[Record],
    config: &PartitionConfig,
) -> Result<RunReport> {
    let config = PartitionConfig {
        num_records: records.len(),
        ..config.clone()
    };
    let start = Instant::now();
    let output = strategy.partition(records, &config)?;
    let elapsed = start.elapsed();

    info!(
        "{strategy}: {} records, {} workers, {} buckets in {elapsed:?}",
        config.num_records, config.num_workers, config.num_buckets
    );

    Ok(RunReport {
        strategy,
        config,
        elapsed,
        cores: affinity::available_cores(),
        output,
    })
}

/// A partitioning that lost, duplicated or misplaced a record.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("key {key} found in bucket {bucket}, belongs in bucket {expected}")]
    Misplaced {
        key: i64,
        bucket: usize,
        expected: usize,
    },

    #[error("expected {expected} records in total, found {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("key multiset differs: expected key {expected}, found {found}")]
    KeyMismatch { expected: i64, found: i64 },
}

/// Checks that `output` holds exactly the keys of `source`, each in the
/// bucket its key maps to.
pub fn verify(source: &[Record], output: &dyn Partitioned) -> std::result::Result<(), Violation> {
    let num_buckets = output.num_buckets();
    let mut placed = Vec::with_capacity(source.len());
    for bucket in 0..num_buckets {
        for r in output.bucket(bucket) {
            let expected = bucket_of(r.key, num_buckets);
            if expected != bucket {
                return Err(Violation::Misplaced {
                    key: r.key,
                    bucket,
                    expected,
                });
            }
            placed.push(r.key);
        }
    }

    if placed.len() != source.len() {
        return Err(Violation::CountMismatch {
            expected: source.len(),
            found: placed.len(),
        });
    }

    let mut wanted: Vec<i64> = source.iter().map(|r| r.key).collect();
    wanted.sort_unstable();
    placed.sort_unstable();
    match wanted.iter().zip(&placed).find(|(a, b)| a != b) {
        Some((&expected, &found)) => Err(Violation::KeyMismatch { expected, found }),
        None => Ok(()),
    }
}
