// src/pipeline.rs
use std::path::PathBuf;

use reqwest::Client;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    config::{ConfigError, PipelineConfig},
    fetch::{self, FetchError},
    output,
    process::{compare_to_basket, prepare_wide, RawTable, ResultTable},
    schema::{detect_columns, DetectError},
};

/// Failures that leave nothing on disk.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("reshaping data: {0:#}")]
    Reshape(anyhow::Error),

    #[error("writing CSV: {0:#}")]
    WriteCsv(anyhow::Error),
}

/// What a run managed to write.
#[derive(Debug)]
pub enum RunOutcome {
    /// CSV and chart both written.
    Complete {
        csv: PathBuf,
        png: PathBuf,
        rows: usize,
    },
    /// CSV written; the chart could not be produced.
    CsvOnly {
        csv: PathBuf,
        rows: usize,
        plot_error: anyhow::Error,
    },
}

impl RunOutcome {
    pub fn csv_path(&self) -> &PathBuf {
        match self {
            RunOutcome::Complete { csv, .. } | RunOutcome::CsvOnly { csv, .. } => csv,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RunOutcome::Complete { .. })
    }
}

/// Detect columns, reshape and aggregate a downloaded table. No I/O.
pub fn process_table(raw: &RawTable, cfg: &PipelineConfig) -> Result<ResultTable, PipelineError> {
    info!(columns = ?raw.headers, "available columns");
    let cols = detect_columns(&raw.headers)?;
    info!(
        year = %cols.year,
        entity = %cols.entity,
        code = %cols.code,
        value = %cols.value,
        "using columns"
    );

    let wide = prepare_wide(raw, &cols, cfg.start_year, cfg.end_year)
        .map_err(PipelineError::Reshape)?;
    Ok(compare_to_basket(&wide, &cfg.basket))
}

/// Write the CSV, then try the chart. A chart failure downgrades the outcome.
pub fn write_outputs(
    table: &ResultTable,
    cfg: &PipelineConfig,
) -> Result<RunOutcome, PipelineError> {
    output::write_csv(&cfg.out_csv, &table.rows).map_err(PipelineError::WriteCsv)?;
    let rows = table.rows.len();

    match output::plot_ratio(&table.rows, &cfg.out_png, &cfg.plot) {
        Ok(()) => Ok(RunOutcome::Complete {
            csv: cfg.out_csv.clone(),
            png: cfg.out_png.clone(),
            rows,
        }),
        Err(plot_error) => {
            warn!(error = %format!("{:#}", plot_error), "chart not written");
            Ok(RunOutcome::CsvOnly {
                csv: cfg.out_csv.clone(),
                rows,
                plot_error,
            })
        }
    }
}

/// Run the whole pipeline with a caller-supplied client.
#[instrument(level = "info", skip_all, fields(url = %cfg.source_url))]
pub async fn run_with_client(
    client: &Client,
    cfg: &PipelineConfig,
) -> Result<RunOutcome, PipelineError> {
    cfg.validate()?;
    info!("downloading data");
    let raw = fetch::download_csv(client, &cfg.source_url).await?;
    let table = process_table(&raw, cfg)?;
    write_outputs(&table, cfg)
}

/// Run the whole pipeline: download, detect, reshape, aggregate, write.
pub async fn run(cfg: &PipelineConfig) -> Result<RunOutcome, PipelineError> {
    let client = fetch::build_client(cfg.timeout).map_err(PipelineError::Client)?;
    run_with_client(&client, cfg).await
}
