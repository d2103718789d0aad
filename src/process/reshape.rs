// src/process/reshape.rs
use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Result};
use tracing::{debug, instrument};

use super::raw_table::RawTable;
use crate::schema::{ColumnRole, DetectedColumns};

/// One long-form row after the detected columns are renamed.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub year: i32,
    pub entity: String,
    pub code: String,
    pub gdp_per_capita: Option<f64>,
}

/// Year-indexed table with one column per country code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    cells: BTreeMap<i32, BTreeMap<String, f64>>,
    codes: BTreeSet<String>,
}

impl WideTable {
    /// Years with at least one value, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.cells.keys().copied()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn get(&self, year: i32, code: &str) -> Option<f64> {
        self.cells.get(&year).and_then(|row| row.get(code)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Insert unless the cell is already filled. Returns whether it was stored.
    pub fn insert_first(&mut self, year: i32, code: &str, value: f64) -> bool {
        let row = self.cells.entry(year).or_default();
        if row.contains_key(code) {
            return false;
        }
        row.insert(code.to_string(), value);
        self.codes.insert(code.to_string());
        true
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    raw.parse::<i32>().ok().or_else(|| {
        // pandas round-trips integer columns with NaNs as "1950.0"
        raw.parse::<f64>()
            .ok()
            .filter(|y| y.fract() == 0.0 && y.is_finite())
            .map(|y| y as i32)
    })
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Rename the detected columns to canonical names and decode each row.
/// Rows whose year does not parse are dropped.
pub fn to_observations(raw: &RawTable, cols: &DetectedColumns) -> Result<Vec<Observation>> {
    let index = |role: ColumnRole| {
        let col = cols.get(role);
        if raw.headers.get(col.index) == Some(&col.name) {
            Ok(col.index)
        } else {
            Err(anyhow!(
                "column {:?} ({}) not at position {} in table",
                col.name,
                role.canonical_name(),
                col.index
            ))
        }
    };
    let (yi, ei, ci, vi) = (
        index(ColumnRole::Year)?,
        index(ColumnRole::Entity)?,
        index(ColumnRole::Code)?,
        index(ColumnRole::Value)?,
    );

    let mut bad_years = 0usize;
    let obs: Vec<Observation> = raw
        .rows
        .iter()
        .filter_map(|row| {
            let Some(year) = parse_year(&row[yi]) else {
                bad_years += 1;
                return None;
            };
            Some(Observation {
                year,
                entity: row[ei].clone(),
                code: row[ci].trim().to_string(),
                gdp_per_capita: parse_value(&row[vi]),
            })
        })
        .collect();

    if bad_years > 0 {
        debug!(dropped = bad_years, "rows with unparseable year");
    }
    Ok(obs)
}

/// Keep observations with `start_year <= year <= end_year`.
pub fn filter_years(obs: Vec<Observation>, start_year: i32, end_year: i32) -> Vec<Observation> {
    obs.into_iter()
        .filter(|o| (start_year..=end_year).contains(&o.year))
        .collect()
}

/// Pivot long rows into a [`WideTable`]. For duplicate (year, code) pairs the
/// first present value is kept. Rows without a code or value are skipped.
pub fn pivot(obs: &[Observation]) -> WideTable {
    let mut wide = WideTable::default();
    let mut duplicates = 0usize;
    for o in obs {
        let Some(value) = o.gdp_per_capita else {
            continue;
        };
        if o.code.is_empty() {
            continue;
        }
        if !wide.insert_first(o.year, &o.code, value) {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        debug!(duplicates, "duplicate (year, code) rows ignored");
    }
    wide
}

/// Rename, filter to the inclusive year range, and pivot.
#[instrument(level = "info", skip(raw, cols), fields(rows = raw.rows.len()))]
pub fn prepare_wide(
    raw: &RawTable,
    cols: &DetectedColumns,
    start_year: i32,
    end_year: i32,
) -> Result<WideTable> {
    let obs = filter_years(to_observations(raw, cols)?, start_year, end_year);
    let wide = pivot(&obs);
    debug!(
        observations = obs.len(),
        years = wide.len(),
        "reshaped to wide table"
    );
    Ok(wide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::detect_columns;

    fn raw(rows: &[[&str; 4]]) -> RawTable {
        RawTable {
            headers: ["Entity", "Code", "Year", "GDP per capita"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn obs(year: i32, code: &str, value: Option<f64>) -> Observation {
        Observation {
            year,
            entity: code.to_string(),
            code: code.to_string(),
            gdp_per_capita: value,
        }
    }

    #[test]
    fn year_filter_is_inclusive_on_both_ends() {
        let all = vec![
            obs(1899, "PRT", Some(1.0)),
            obs(1900, "PRT", Some(2.0)),
            obs(1950, "PRT", Some(3.0)),
            obs(2000, "PRT", Some(4.0)),
            obs(2001, "PRT", Some(5.0)),
        ];
        let years: Vec<i32> = filter_years(all, 1900, 2000)
            .into_iter()
            .map(|o| o.year)
            .collect();
        assert_eq!(years, vec![1900, 1950, 2000]);
    }

    #[test]
    fn pivot_keeps_first_value_for_duplicates() {
        let wide = pivot(&[
            obs(1950, "PRT", Some(80.0)),
            obs(1950, "PRT", Some(999.0)),
            obs(1950, "GBR", None),
            obs(1950, "GBR", Some(100.0)),
            obs(1951, "", Some(5.0)),
        ]);

        assert_eq!(wide.get(1950, "PRT"), Some(80.0));
        assert_eq!(wide.get(1950, "GBR"), Some(100.0));
        assert_eq!(wide.years().collect::<Vec<_>>(), vec![1950]);
        assert_eq!(wide.codes().collect::<Vec<_>>(), vec!["GBR", "PRT"]);
    }

    #[test]
    fn prepare_wide_renames_filters_and_pivots() -> Result<()> {
        let table = raw(&[
            ["Portugal", "PRT", "1949", "70"],
            ["Portugal", "PRT", "1950", "80"],
            ["Spain", "ESP", "1950.0", "90"],
            ["World", "", "1950", "50"],
            ["Portugal", "PRT", "n/a", "1"],
            ["Spain", "ESP", "1951", ""],
        ]);
        let cols = detect_columns(&table.headers)?;

        let wide = prepare_wide(&table, &cols, 1950, 1951)?;
        assert_eq!(wide.years().collect::<Vec<_>>(), vec![1950]);
        assert_eq!(wide.get(1950, "PRT"), Some(80.0));
        assert_eq!(wide.get(1950, "ESP"), Some(90.0));
        assert!(!wide.has_code("World"));
        assert!(!wide.has_code(""));
        Ok(())
    }

    #[test]
    fn columns_are_read_by_detected_position() -> Result<()> {
        let table = RawTable {
            headers: ["Code", "Entity", "Year", "GDP per capita", "Code (ISO)"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: vec![["PRT", "Portugal", "1950", "80", "620"]
                .iter()
                .map(|s| s.to_string())
                .collect()],
        };
        let cols = detect_columns(&table.headers)?;
        let obs = to_observations(&table, &cols)?;
        assert_eq!(obs[0].code, "PRT");

        // columns detected on one layout do not apply to another
        let shuffled = raw(&[["Portugal", "PRT", "1950", "80"]]);
        assert!(to_observations(&shuffled, &cols).is_err());
        Ok(())
    }

    #[test]
    fn empty_range_is_not_an_error() -> Result<()> {
        let table = raw(&[["Portugal", "PRT", "1950", "80"]]);
        let cols = detect_columns(&table.headers)?;
        let wide = prepare_wide(&table, &cols, 2000, 2010)?;
        assert!(wide.is_empty());
        Ok(())
    }
}
