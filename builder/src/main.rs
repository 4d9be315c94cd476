use chem_index::bins::BinIndex;
use chem_index::error::{Error, Result};
use chem_index::index::build_record_index_with;
use chem_index::synthetic::SyntheticDataset;

use clap::Parser;
use glob::glob;
use kdam::tqdm;
use log::{error, info};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which task to carry out: record_index, stats or synthetic
    #[arg(short, long)]
    task: String,

    /// Records file, or glob of records files, for record_index; bin index file for stats
    #[arg(short, long)]
    input: Option<String>,

    /// Index file for record_index, data directory for synthetic
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of compounds if task is synthetic
    #[arg(long, default_value_t = 10_000)]
    num_records: usize,

    /// Number of bins if task is synthetic
    #[arg(long, default_value_t = 256)]
    num_bins: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let result = match args.task.as_str() {
        "record_index" => record_index(&args),
        "stats" => stats(&args),
        "synthetic" => synthetic(&args),
        _ => Err(Error::InvalidArgument(format!("unknown task: {}", args.task))),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn required<'a, T: ?Sized>(value: Option<&'a T>, flag: &str, task: &str) -> Result<&'a T> {
    value.ok_or_else(|| Error::InvalidArgument(format!("--{} is required for {}", flag, task)))
}

/// Writes an index next to each records file matching `--input`, or to `--output` when the
/// pattern matches a single file.
fn record_index(args: &Args) -> Result<()> {
    let pattern = required(args.input.as_deref(), "input", "record_index")?;

    let inputs = glob(pattern)
        .map_err(|e| Error::InvalidArgument(format!("{}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .collect::<Vec<PathBuf>>();

    let outputs = match (&args.output, inputs.as_slice()) {
        (_, []) => {
            return Err(Error::InvalidArgument(format!("no files match {}", pattern)));
        }
        (Some(output), [_]) => vec![output.clone()],
        (Some(_), _) => {
            return Err(Error::InvalidArgument(format!(
                "{} matches {} files but --output names one",
                pattern,
                inputs.len()
            )));
        }
        (None, _) => inputs.iter().map(|i| i.with_extension("idx")).collect(),
    };

    for (input, output) in inputs.iter().zip(outputs.iter()) {
        info!("Indexing {:?} into {:?}", input, output);
        let count = build_record_index_with(input, output, |spans| tqdm!(spans))?;
        info!("Wrote {} entries", count);
    }

    Ok(())
}

fn stats(args: &Args) -> Result<()> {
    let input = required(args.input.as_deref(), "input", "stats")?;
    let bins = BinIndex::from_file(Path::new(input))?;

    let serialized = serde_json::to_string_pretty(&bins.stats())
        .map_err(|e| Error::InvalidArgument(e.to_string()))?;
    println!("{}", serialized);

    Ok(())
}

fn synthetic(args: &Args) -> Result<()> {
    let output = required(args.output.as_deref(), "output", "synthetic")?;

    let mut rng = rand::thread_rng();
    let dataset = SyntheticDataset::random(&mut rng, args.num_records, args.num_bins);

    info!(
        "Writing {} compounds in {} bins to {:?}",
        args.num_records, args.num_bins, output
    );
    dataset.write(output)?;

    info!(
        "Variant id: {}.{}.{}",
        dataset.database_id, dataset.fingerprint_id, dataset.variant_id
    );

    Ok(())
}
