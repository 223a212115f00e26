//! cellstore admin binary
//!
//! Runs external sorts over store files and dumps key records.

use std::path::PathBuf;

use cellstore::{layout, CellStoreError, FileStore, IntegerCodec, Mode, SortConfig, StoreConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// cellstore admin tool
#[derive(Parser, Debug)]
#[command(name = "cellstore")]
#[command(about = "Sort and inspect cellstore key files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sort the keys of one or more stores into `<output>.sortedKeys`
    Sort {
        /// Input store base paths (without extension)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output store base path
        #[arg(short, long)]
        output: PathBuf,

        /// Records sorted in memory per chunk
        #[arg(short, long, default_value = "100000")]
        memory_budget: usize,

        /// Worker threads for chunk sorting
        #[arg(short, long, default_value = "1")]
        threads: usize,

        /// Directory for temporary chunk files
        #[arg(long)]
        tmp_dir: Option<PathBuf>,
    },

    /// Print the key records of a store in sorted order
    Dump {
        /// Store base path (without extension)
        base: PathBuf,

        /// Keys on disk are already sorted; do not sort
        #[arg(long)]
        sorted: bool,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cellstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Sort {
            inputs,
            output,
            memory_budget,
            threads,
            tmp_dir,
        } => run_sort(inputs, output, memory_budget, threads, tmp_dir),
        Commands::Dump {
            base,
            sorted,
            limit,
        } => run_dump(base, sorted, limit),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run_sort(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    memory_budget: usize,
    threads: usize,
    tmp_dir: Option<PathBuf>,
) -> cellstore::Result<()> {
    let mut builder = SortConfig::builder()
        .memory_budget_records(memory_budget)
        .thread_count(threads);
    if let Some(tmp_dir) = tmp_dir {
        builder = builder.tmp_dir(tmp_dir);
    }
    let config = builder.build();

    tracing::info!("cellstore v{}", cellstore::VERSION);
    let summary = cellstore::external_sort(&inputs, &output, &config)?;

    println!(
        "sorted {} records from {} input(s) in {} chunk(s) with {} worker(s) -> {}",
        summary.records,
        summary.inputs,
        summary.chunks,
        summary.workers,
        layout::sorted_keys_path(&output).display()
    );
    Ok(())
}

fn run_dump(base: PathBuf, sorted: bool, limit: Option<usize>) -> cellstore::Result<()> {
    let keys = layout::keys_path(&base);
    if !sorted && !keys.exists() {
        return Err(CellStoreError::Config(format!(
            "no key file at {}",
            keys.display()
        )));
    }

    // Inline mode: records are printed raw, the value blob is never read
    let config = StoreConfig::builder()
        .mode(Mode::InlineInteger)
        .sorted(sorted)
        .build();
    let store: FileStore<u64, IntegerCodec> = FileStore::open(&base, config)?;

    let limit = limit.unwrap_or(usize::MAX);
    for record in store.records()?.take(limit) {
        let record = record?;
        println!(
            "{}\t{}\t{}",
            record.key(),
            record.payload_a,
            record.payload_b
        );
    }

    store.close(false)
}
