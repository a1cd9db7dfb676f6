use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use fake_news_detector::{
    config::Config,
    dataset::load_table,
    observability::init_tracing,
    training::{Trainer, persist},
};
use tracing::info;

struct TrainArgs {
    dataset: PathBuf,
    model: PathBuf,
    metrics: PathBuf,
}

fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::from_env().context("failed to load configuration")?;
    let args = parse_args(&config)?;

    let records = load_table(&args.dataset)?;
    let trainer = Trainer::new(config.training_config());
    let outcome = trainer.run(&records)?;

    println!("Validation confusion matrix:\n{}", outcome.validation.matrix);
    println!("Test confusion matrix:\n{}", outcome.test.matrix);
    println!(
        "Test accuracy={:.4} f1_macro={:.4}",
        outcome.test.record.accuracy, outcome.test.record.f1_macro
    );

    persist(&outcome, &args.model, &args.metrics).into_result()?;
    info!(
        model = %args.model.display(),
        metrics = %args.metrics.display(),
        "training outputs written"
    );
    Ok(())
}

fn parse_args(config: &Config) -> Result<TrainArgs> {
    let mut dataset = None;
    let mut model = None;
    let mut metrics = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dataset" => {
                let value = args.next().context("--dataset requires a path argument")?;
                dataset = Some(PathBuf::from(value));
            }
            "--model" => {
                let value = args.next().context("--model requires a path argument")?;
                model = Some(PathBuf::from(value));
            }
            "--metrics" => {
                let value = args.next().context("--metrics requires a path argument")?;
                metrics = Some(PathBuf::from(value));
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

    Ok(TrainArgs {
        dataset: dataset.unwrap_or_else(|| config.dataset_path().clone()),
        model: model.unwrap_or_else(|| config.model_path().clone()),
        metrics: metrics.unwrap_or_else(|| config.metrics_path().clone()),
    })
}

fn print_usage() {
    eprintln!("Usage: train [--dataset <path>] [--model <path>] [--metrics <path>]");
}
