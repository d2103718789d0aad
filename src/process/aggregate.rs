// src/process/aggregate.rs
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::reshape::WideTable;
use crate::config::{Basket, CoverageRule};

/// One output row. `None` marks a missing value and serializes as an empty field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub year: i32,
    #[serde(rename = "Portugal_gdp_pc")]
    pub target: Option<f64>,
    #[serde(rename = "Media_16_gdp_pc")]
    pub basket_mean: Option<f64>,
    #[serde(rename = "Portugal_pct_da_media_16")]
    pub ratio_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
    /// Basket or target codes with no column at all in the data.
    pub missing_codes: Vec<String>,
}

/// Mean of the values present, masked when fewer than `min_coverage` report.
pub fn masked_mean(values: &[Option<f64>], rule: CoverageRule) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() || present.len() < rule.min_coverage {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// `target / mean * 100`, missing when either side is missing or the mean is zero.
pub fn ratio_pct(target: Option<f64>, mean: Option<f64>) -> Option<f64> {
    match (target, mean) {
        (Some(t), Some(m)) if m != 0.0 => Some(t / m * 100.0),
        _ => None,
    }
}

/// Codes of the basket plus the target that never appear in `wide`.
pub fn missing_codes(wide: &WideTable, basket: &Basket) -> Vec<String> {
    let mut missing: Vec<String> = basket
        .codes
        .iter()
        .filter(|c| !wide.has_code(c))
        .cloned()
        .collect();
    if !wide.has_code(&basket.target) && !missing.contains(&basket.target) {
        missing.push(basket.target.clone());
    }
    missing
}

/// Compare the target's series with the basket mean, year by year.
#[instrument(level = "info", skip_all, fields(years = wide.len()))]
pub fn compare_to_basket(wide: &WideTable, basket: &Basket) -> ResultTable {
    let missing = missing_codes(wide, basket);
    if !missing.is_empty() {
        warn!(?missing, "no data for some codes");
    }

    let present: Vec<&str> = basket
        .codes
        .iter()
        .map(String::as_str)
        .filter(|c| wide.has_code(c))
        .collect();

    let mut masked = 0usize;
    let rows: Vec<ResultRow> = wide
        .years()
        .map(|year| {
            let values: Vec<Option<f64>> = present.iter().map(|c| wide.get(year, c)).collect();
            let basket_mean = masked_mean(&values, basket.coverage);
            if basket_mean.is_none() {
                masked += 1;
            }
            let target = wide.get(year, &basket.target);
            ResultRow {
                year,
                target,
                basket_mean,
                ratio_pct: ratio_pct(target, basket_mean),
            }
        })
        .collect();

    info!(
        rows = rows.len(),
        masked_years = masked,
        basket_present = present.len(),
        "aggregated"
    );

    ResultTable {
        rows,
        missing_codes: missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEVELOPED_16;

    fn basket() -> Basket {
        Basket::default()
    }

    #[test]
    fn mean_is_masked_below_coverage() {
        let mut wide = WideTable::default();
        // 1900: 11 reporting, 1901: 12, 1902: all 16
        for (year, n) in [(1900, 11), (1901, 12), (1902, 16)] {
            for (i, code) in DEVELOPED_16.iter().take(n).enumerate() {
                wide.insert_first(year, code, 100.0 + i as f64);
            }
        }

        let out = compare_to_basket(&wide, &basket());
        let means: Vec<Option<f64>> = out.rows.iter().map(|r| r.basket_mean).collect();

        assert_eq!(means[0], None);
        // mean of 100..=111
        assert_eq!(means[1], Some(105.5));
        // mean of 100..=115
        assert_eq!(means[2], Some(107.5));
        assert!(out.missing_codes.is_empty());
    }

    #[test]
    fn coverage_threshold_is_configurable() {
        let values = vec![Some(1.0), Some(3.0), None, None];
        let loose = CoverageRule {
            basket_size: 4,
            min_coverage: 2,
        };
        let strict = CoverageRule {
            basket_size: 4,
            min_coverage: 3,
        };
        assert_eq!(masked_mean(&values, loose), Some(2.0));
        assert_eq!(masked_mean(&values, strict), None);
    }

    #[test]
    fn ratio_needs_both_operands() {
        assert_eq!(ratio_pct(Some(50.0), Some(100.0)), Some(50.0));
        assert_eq!(ratio_pct(None, Some(100.0)), None);
        assert_eq!(ratio_pct(Some(50.0), None), None);
        assert_eq!(ratio_pct(Some(50.0), Some(0.0)), None);
    }

    #[test]
    fn absent_target_becomes_missing_series() {
        let mut wide = WideTable::default();
        for code in DEVELOPED_16.iter().filter(|c| **c != "PRT") {
            wide.insert_first(1950, code, 100.0);
        }

        let out = compare_to_basket(&wide, &basket());
        assert_eq!(out.missing_codes, vec!["PRT".to_string()]);
        assert_eq!(
            out.rows,
            vec![ResultRow {
                year: 1950,
                target: None,
                basket_mean: Some(100.0),
                ratio_pct: None,
            }]
        );
    }

    #[test]
    fn empty_wide_table_gives_empty_result() {
        let out = compare_to_basket(&WideTable::default(), &basket());
        assert!(out.rows.is_empty());
        assert_eq!(out.missing_codes.len(), 16);
    }
}
