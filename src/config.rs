// src/config.rs
use std::{path::PathBuf, time::Duration};

use thiserror::Error;
use url::Url;

pub const DEFAULT_SOURCE_URL: &str =
    "https://ourworldindata.org/grapher/gdp-per-capita-maddison-project-database.csv";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_START_YEAR: i32 = 1870;
pub const DEFAULT_END_YEAR: i32 = 2022;
pub const DEFAULT_OUT_CSV: &str = "portugal_vs_16_developed.csv";
pub const DEFAULT_OUT_PNG: &str = "grafico_portugal_pct_media16.png";

/// The 16 developed economies the target is compared against.
pub static DEVELOPED_16: &[&str] = &[
    "GBR", "FRA", "DEU", "DNK", "BEL", "NLD", "ESP", "ITA", "PRT", "SWE", "AUT", "USA", "CAN",
    "AUS", "NZL", "JPN",
];
pub const PORTUGAL: &str = "PRT";

/// Fewer basket members than this reporting in a year masks the mean.
pub const DEFAULT_MIN_COVERAGE: usize = 12;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid source URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("start year {start} is after end year {end}")]
    InvertedYearRange { start: i32, end: i32 },

    #[error("basket has {actual} codes but the coverage rule expects {expected}")]
    BasketSizeMismatch { expected: usize, actual: usize },

    #[error("minimum coverage {min_coverage} must be between 1 and {basket_size}")]
    InvalidCoverage {
        min_coverage: usize,
        basket_size: usize,
    },
}

/// How many basket members must report before a year's mean is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageRule {
    pub basket_size: usize,
    pub min_coverage: usize,
}

impl Default for CoverageRule {
    fn default() -> Self {
        Self {
            basket_size: DEVELOPED_16.len(),
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

/// Comparison group plus the country measured against it.
#[derive(Debug, Clone)]
pub struct Basket {
    pub codes: Vec<String>,
    pub target: String,
    pub coverage: CoverageRule,
}

impl Default for Basket {
    fn default() -> Self {
        Self {
            codes: DEVELOPED_16.iter().map(|c| c.to_string()).collect(),
            target: PORTUGAL.to_string(),
            coverage: CoverageRule::default(),
        }
    }
}

impl Basket {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rule = self.coverage;
        if rule.basket_size != self.codes.len() {
            return Err(ConfigError::BasketSizeMismatch {
                expected: rule.basket_size,
                actual: self.codes.len(),
            });
        }
        if rule.min_coverage == 0 || rule.min_coverage > rule.basket_size {
            return Err(ConfigError::InvalidCoverage {
                min_coverage: rule.min_coverage,
                basket_size: rule.basket_size,
            });
        }
        Ok(())
    }
}

/// Chart appearance. Text is Portuguese to match the CSV column names.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub title: String,
    /// Second title line naming the data source.
    pub subtitle: String,
    pub x_label: String,
    pub y_label: String,
    /// Shaded `(from, to)` year intervals drawn behind the line.
    pub bands: Vec<(i32, i32)>,
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub font: Option<PathBuf>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            title: "PIB per capita de Portugal (% da média de 16 economias desenvolvidas)".into(),
            subtitle: "Maddison Project 2023 (PPA 2011$)".into(),
            x_label: "Ano".into(),
            y_label: "% da média".into(),
            bands: vec![(1914, 1918), (1939, 1945)],
            width_in: 11.0,
            height_in: 6.0,
            dpi: 180,
            font: None,
        }
    }
}

impl PlotConfig {
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi as f64).round() as u32,
            (self.height_in * self.dpi as f64).round() as u32,
        )
    }
}

/// Everything one run needs, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_url: String,
    pub timeout: Duration,
    pub start_year: i32,
    pub end_year: i32,
    pub out_csv: PathBuf,
    pub out_png: PathBuf,
    pub basket: Basket,
    pub plot: PlotConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            out_csv: PathBuf::from(DEFAULT_OUT_CSV),
            out_png: PathBuf::from(DEFAULT_OUT_PNG),
            basket: Basket::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.source_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.source_url.clone(),
            reason: e.to_string(),
        })?;
        if self.start_year > self.end_year {
            return Err(ConfigError::InvertedYearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        self.basket.validate()
    }
}
