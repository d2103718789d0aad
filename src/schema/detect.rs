// src/schema/detect.rs
use std::fmt;

use thiserror::Error;
use tracing::debug;

/// The four logical fields the pipeline needs from the source CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Year,
    Entity,
    Code,
    Value,
}

impl ColumnRole {
    /// Name the column takes after reshaping.
    pub fn canonical_name(self) -> &'static str {
        match self {
            ColumnRole::Year => "year",
            ColumnRole::Entity => "entity",
            ColumnRole::Code => "code",
            ColumnRole::Value => "gdp_per_capita",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnRole::Year => "year",
            ColumnRole::Entity => "country/entity",
            ColumnRole::Code => "code",
            ColumnRole::Value => "gdp",
        };
        f.write_str(label)
    }
}

/// A header predicate tried against lowercased column names.
pub type HeaderPredicate = fn(&str) -> bool;

/// Detection rules in priority order. Within a rule, columns are scanned by
/// position and the earliest match wins, so header order in the source file
/// decides ties (two "code" columns resolve to the leftmost).
pub static DETECTION_RULES: &[(ColumnRole, HeaderPredicate)] = &[
    (ColumnRole::Year, |h: &str| h.contains("year")),
    (ColumnRole::Entity, |h: &str| {
        h.contains("entity") || h.contains("country")
    }),
    (ColumnRole::Code, |h: &str| h.contains("code")),
    (ColumnRole::Value, |h: &str| h.contains("gdp")),
];

/// A header picked by a detection rule, with its position in the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedColumn {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for DetectedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Source columns chosen for each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedColumns {
    pub year: DetectedColumn,
    pub entity: DetectedColumn,
    pub code: DetectedColumn,
    pub value: DetectedColumn,
}

impl DetectedColumns {
    pub fn get(&self, role: ColumnRole) -> &DetectedColumn {
        match role {
            ColumnRole::Year => &self.year,
            ColumnRole::Entity => &self.entity,
            ColumnRole::Code => &self.code,
            ColumnRole::Value => &self.value,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "could not auto-detect columns: {}. Available columns: {:?}",
    fmt_roles(.missing),
    .available
)]
pub struct DetectError {
    pub missing: Vec<ColumnRole>,
    pub available: Vec<String>,
}

fn fmt_roles(roles: &[ColumnRole]) -> String {
    roles
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of applying one rule to the header list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched { index: usize, name: String },
    Unresolved,
}

/// Apply `predicate` to each header in column order; first hit wins.
pub fn resolve(headers: &[String], predicate: HeaderPredicate) -> Resolution {
    headers
        .iter()
        .enumerate()
        .find(|(_, h)| predicate(&h.to_lowercase()))
        .map(|(index, name)| Resolution::Matched {
            index,
            name: name.clone(),
        })
        .unwrap_or(Resolution::Unresolved)
}

/// Identify the year, entity, code and value columns of a raw header row.
pub fn detect_columns(headers: &[String]) -> Result<DetectedColumns, DetectError> {
    let (mut year, mut entity, mut code, mut value) = (None, None, None, None);
    let mut missing = Vec::new();

    for (role, predicate) in DETECTION_RULES {
        let column = match resolve(headers, *predicate) {
            Resolution::Matched { index, name } => {
                debug!(role = %role, column = %name, index, "column detected");
                DetectedColumn { index, name }
            }
            Resolution::Unresolved => {
                missing.push(*role);
                continue;
            }
        };
        let slot = match role {
            ColumnRole::Year => &mut year,
            ColumnRole::Entity => &mut entity,
            ColumnRole::Code => &mut code,
            ColumnRole::Value => &mut value,
        };
        slot.get_or_insert(column);
    }

    match (year, entity, code, value) {
        (Some(year), Some(entity), Some(code), Some(value)) => Ok(DetectedColumns {
            year,
            entity,
            code,
            value,
        }),
        _ => Err(DetectError {
            missing,
            available: headers.to_vec(),
        }),
    }
}
