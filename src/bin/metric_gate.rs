use std::env;
use std::path::PathBuf;
use std::process::{self, ExitCode};

use anyhow::{Context, Result, bail};
use fake_news_detector::{
    config::Config,
    evaluation::gate::{GateThresholds, QualityGate, load_metrics},
};

/// 指標ファイルを読めず判定できなかった場合の終了コード。
const EXIT_PRECONDITION: u8 = 2;

struct GateArgs {
    metrics: PathBuf,
    thresholds: GateThresholds,
}

fn main() -> Result<ExitCode> {
    let config = Config::from_env().context("failed to load configuration")?;
    let args = parse_args(&config)?;

    let record = match load_metrics(&args.metrics) {
        Ok(record) => record,
        Err(error) => {
            eprintln!("{:#}", anyhow::Error::new(error));
            return Ok(ExitCode::from(EXIT_PRECONDITION));
        }
    };

    let report = QualityGate::new(args.thresholds).evaluate(&record);
    for criterion in &report.criteria {
        if criterion.passed {
            println!("{criterion}");
        } else {
            eprintln!("{criterion}");
        }
    }

    if report.passed() {
        println!("Metric gate passed.");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Metric gate failed.");
        Ok(ExitCode::FAILURE)
    }
}

fn parse_args(config: &Config) -> Result<GateArgs> {
    let mut metrics = None;
    let mut thresholds = config.gate_thresholds();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--metrics" => {
                let value = args.next().context("--metrics requires a path argument")?;
                metrics = Some(PathBuf::from(value));
            }
            "--min-f1" => {
                let value = args.next().context("--min-f1 requires a number")?;
                thresholds.min_f1_macro = value.parse().context("--min-f1 must be a number")?;
            }
            "--min-accuracy" => {
                let value = args.next().context("--min-accuracy requires a number")?;
                thresholds.min_accuracy =
                    value.parse().context("--min-accuracy must be a number")?;
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

    Ok(GateArgs {
        metrics: metrics.unwrap_or_else(|| config.metrics_path().clone()),
        thresholds,
    })
}

fn print_usage() {
    eprintln!("Usage: metric-gate [--metrics <path>] [--min-f1 0.75] [--min-accuracy 0.75]");
    eprintln!("Exit status: 0 passed, 1 below threshold, 2 metrics file missing or unreadable");
}
