use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use fake_news_detector::{
    classification::Label,
    config::Config,
    dataset::{assemble, write_table},
    observability::init_tracing,
};
use tracing::info;

struct BuildArgs {
    raw_dir: PathBuf,
    output: PathBuf,
    min_words: usize,
}

fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::from_env().context("failed to load configuration")?;
    let args = parse_args(&config)?;

    let report = assemble(&args.raw_dir, args.min_words)?;
    write_table(&args.output, &report.records)?;

    let fake = report
        .records
        .iter()
        .filter(|record| record.label == Label::Fake)
        .count();
    info!(
        output = %args.output.display(),
        rows = report.records.len(),
        fake,
        real = report.records.len() - fake,
        "dataset written"
    );
    println!(
        "Wrote {} rows ({} fake, {} real) to {}",
        report.records.len(),
        fake,
        report.records.len() - fake,
        args.output.display()
    );
    Ok(())
}

fn parse_args(config: &Config) -> Result<BuildArgs> {
    let mut raw_dir = None;
    let mut output = None;
    let mut min_words = config.min_words();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--raw-dir" => {
                let value = args.next().context("--raw-dir requires a path argument")?;
                raw_dir = Some(PathBuf::from(value));
            }
            "--output" => {
                let value = args.next().context("--output requires a path argument")?;
                output = Some(PathBuf::from(value));
            }
            "--min-words" => {
                let value = args.next().context("--min-words requires an integer")?;
                min_words = value
                    .parse::<usize>()
                    .context("--min-words must be an integer")?;
            }
            "--help" => {
                print_usage();
                process::exit(0);
            }
            _ => {
                bail!("unknown argument: {}", arg);
            }
        }
    }

    Ok(BuildArgs {
        raw_dir: raw_dir.unwrap_or_else(|| config.raw_dir().clone()),
        output: output.unwrap_or_else(|| config.dataset_path().clone()),
        min_words,
    })
}

fn print_usage() {
    eprintln!("Usage: build-dataset [--raw-dir <dir>] [--output <path>] [--min-words 50]");
}
