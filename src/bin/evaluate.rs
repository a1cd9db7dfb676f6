use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use fake_news_detector::{
    config::Config, dataset::load_table, evaluation::holdout::evaluate_artifact,
    observability::init_tracing,
};
use tracing::info;

struct EvaluateArgs {
    dataset: PathBuf,
    model: PathBuf,
    metrics: PathBuf,
}

fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::from_env().context("failed to load configuration")?;
    let args = parse_args(&config)?;

    let records = load_table(&args.dataset)?;
    let evaluation = evaluate_artifact(&args.model, &records)?;

    println!("Hold-out confusion matrix:\n{}", evaluation.matrix);
    println!(
        "Hold-out accuracy={:.4} f1_macro={:.4}",
        evaluation.record.accuracy, evaluation.record.f1_macro
    );

    evaluation
        .record
        .save(&args.metrics)
        .context("failed to write metrics record")?;
    info!(metrics = %args.metrics.display(), "holdout metrics record written");
    Ok(())
}

fn parse_args(config: &Config) -> Result<EvaluateArgs> {
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

    Ok(EvaluateArgs {
        dataset: dataset.unwrap_or_else(|| config.dataset_path().clone()),
        model: model.unwrap_or_else(|| config.model_path().clone()),
        metrics: metrics.unwrap_or_else(|| config.holdout_metrics_path().clone()),
    })
}

fn print_usage() {
    eprintln!("Usage: evaluate [--dataset <path>] [--model <path>] [--metrics <path>]");
}
