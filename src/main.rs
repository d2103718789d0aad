use std::{
    io::IsTerminal,
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use gdpratio::{
    config::{self, PipelineConfig},
    pipeline::{self, PipelineError, RunOutcome},
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Compute Portugal GDP per capita as % of the mean of 16 developed economies."
)]
struct Args {
    /// CSV source URL
    #[arg(long, env = "GDPRATIO_SOURCE_URL", default_value = config::DEFAULT_SOURCE_URL)]
    source_url: String,
    /// Start year (inclusive)
    #[arg(long, default_value_t = config::DEFAULT_START_YEAR)]
    start_year: i32,
    /// End year (inclusive)
    #[arg(long, default_value_t = config::DEFAULT_END_YEAR)]
    end_year: i32,
    /// Output CSV path
    #[arg(long, default_value = config::DEFAULT_OUT_CSV)]
    out_csv: PathBuf,
    /// Output PNG path
    #[arg(long, default_value = config::DEFAULT_OUT_PNG)]
    out_png: PathBuf,
    /// Download timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// Basket members that must report for a year's mean to count
    #[arg(long, default_value_t = config::DEFAULT_MIN_COVERAGE)]
    min_coverage: usize,
    /// TrueType font for chart text (defaults to a system font)
    #[arg(long, env = "GDPRATIO_FONT")]
    font: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut cfg = PipelineConfig {
            source_url: self.source_url,
            timeout: Duration::from_secs(self.timeout_secs),
            start_year: self.start_year,
            end_year: self.end_year,
            out_csv: self.out_csv,
            out_png: self.out_png,
            ..Default::default()
        };
        cfg.basket.coverage.min_coverage = self.min_coverage;
        cfg.plot.font = self.font;
        cfg
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr) // stdout stays clean
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cfg = Args::parse().into_config();

    match pipeline::run(&cfg).await {
        Ok(RunOutcome::Complete { csv, png, rows }) => {
            info!(csv = %csv.display(), png = %png.display(), rows, "all done");
            Ok(ExitCode::SUCCESS)
        }
        Ok(RunOutcome::CsvOnly {
            csv,
            rows,
            plot_error,
        }) => {
            warn!(csv = %csv.display(), rows, "CSV written but chart failed: {:#}", plot_error);
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::Detect(e)) => {
            error!("error detecting columns: {e}");
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e.into()),
    }
}
