use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use hashpart::harness::{self, Strategy};
use hashpart::{Capacity, PartitionConfig, Partitioned, Workload, metrics, record};

/// Number of records shown per bucket with `--debug`.
const PREVIEW: usize = 10;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CapacityArg {
    Uniform,
    WorstCase,
}

/// Partition `records` sequential records into `2^hash_bits` buckets.
#[derive(Parser, Debug)]
#[command(name = "hashpart", version)]
struct Args {
    #[arg(value_enum)]
    strategy: Strategy,

    /// Worker threads.
    threads: usize,

    /// Buckets are `1 << hash_bits`.
    hash_bits: u32,

    /// Number of records to generate.
    records: usize,

    /// Append a metrics row to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print timings and the first records of every bucket.
    #[arg(long)]
    debug: bool,

    /// Pin worker `w` to core `w mod cores`.
    #[arg(long)]
    pin: bool,

    /// Rounds of synthetic compute per record, 0 disables it.
    #[arg(long, default_value_t = 0)]
    work_rounds: u32,

    /// Check that every record landed exactly once in its bucket.
    #[arg(long)]
    verify: bool,

    /// Slots per bucket for `concurrent-output`.
    #[arg(long, value_enum, default_value = "uniform")]
    capacity: CapacityArg,

    /// Fixed slots per bucket, overrides `--capacity`.
    #[arg(long)]
    slots: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(if args.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let capacity = match (args.slots, args.capacity) {
        (Some(slots), _) => Capacity::Fixed(slots),
        (None, CapacityArg::Uniform) => Capacity::Uniform,
        (None, CapacityArg::WorstCase) => Capacity::WorstCase,
    };
    let config = PartitionConfig::from_hash_bits(args.records, args.threads, args.hash_bits)?
        .with_capacity(capacity)
        .with_pinning(args.pin)
        .with_workload(Workload::rounds(args.work_rounds));

    println!("Running {} with the following parameters:", args.strategy);
    println!("\tNumber of threads: {}", config.num_workers);
    println!("\tNumber of hash bits: {}", args.hash_bits);
    println!("\tNumber of buckets: {}", config.num_buckets);
    println!("\tData size: {}", config.num_records);

    let report = harness::run(args.strategy, &config)?;

    if args.debug {
        println!("Number of available CPU cores: {}", report.cores);
        println!(
            "Processing time: {:?} with {} threads ({:.2} M records/s)",
            report.elapsed,
            config.num_workers,
            report.throughput()
        );
        println!("Data (first {PREVIEW} elements from each partition):");
        for b in 0..report.output.num_buckets() {
            let bucket = report.output.bucket(b);
            let shown: Vec<String> = bucket
                .iter()
                .take(PREVIEW)
                .map(|r| format!("({},{})", r.key, r.value))
                .collect();
            println!("Partition {b} (size: {}): {}", bucket.len(), shown.join(" "));
        }
    }

    if args.verify {
        let source = record::sequential(config.num_records);
        if let Err(violation) = harness::verify(&source, report.output.as_ref()) {
            bail!("verification failed: {violation}");
        }
        println!("Verified {} records", source.len());
    }

    if let Some(path) = &args.csv {
        metrics::append(path, &report)
            .with_context(|| format!("unable to append metrics to {}", path.display()))?;
    }

    Ok(())
}
