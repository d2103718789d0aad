// src/output/write.rs
use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use tracing::info;

use crate::process::ResultRow;

/// Serialize rows with a header line and no index column.
pub fn write_rows<W: Write>(writer: W, rows: &[ResultRow]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    if rows.is_empty() {
        // serde only emits the header alongside the first record
        wtr.write_record([
            "year",
            "Portugal_gdp_pc",
            "Media_16_gdp_pc",
            "Portugal_pct_da_media_16",
        ])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the result table to `path`, creating its parent directory.
pub fn write_csv(path: &Path, rows: &[ResultRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_rows(file, rows).with_context(|| format!("writing CSV to {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "CSV written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_values_are_empty_fields() -> Result<()> {
        let rows = vec![
            ResultRow {
                year: 1950,
                target: Some(80.0),
                basket_mean: Some(100.0),
                ratio_pct: Some(80.0),
            },
            ResultRow {
                year: 1951,
                target: None,
                basket_mean: Some(101.5),
                ratio_pct: None,
            },
        ];
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows)?;

        assert_eq!(
            String::from_utf8(buf)?,
            "year,Portugal_gdp_pc,Media_16_gdp_pc,Portugal_pct_da_media_16\n\
             1950,80.0,100.0,80.0\n\
             1951,,101.5,\n"
        );
        Ok(())
    }

    #[test]
    fn empty_table_still_has_header() -> Result<()> {
        let mut buf = Vec::new();
        write_rows(&mut buf, &[])?;
        assert_eq!(
            String::from_utf8(buf)?,
            "year,Portugal_gdp_pc,Media_16_gdp_pc,Portugal_pct_da_media_16\n"
        );
        Ok(())
    }

    #[test]
    fn creates_parent_directory() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/out.csv");
        write_csv(&path, &[])?;
        assert!(path.exists());
        Ok(())
    }
}
