use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::io::Read;

/// A downloaded CSV, untouched apart from header trimming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Each data row, one String per field. Short rows are padded with empty fields.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse CSV text with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("reading CSV header row")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_pads_short_rows() -> Result<()> {
        let text = "Entity, Code ,Year,GDP per capita\nPortugal,PRT,1950,2086\nWorld,,1950\n";
        let table = RawTable::from_reader(text.as_bytes())?;

        assert_eq!(table.headers, vec!["Entity", "Code", "Year", "GDP per capita"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["Portugal", "PRT", "1950", "2086"]);
        assert_eq!(table.rows[1], vec!["World", "", "1950", ""]);
        Ok(())
    }

    #[test]
    fn header_only_is_empty_table() -> Result<()> {
        let table = RawTable::from_reader("a,b\n".as_bytes())?;
        assert_eq!(table.headers.len(), 2);
        assert!(table.rows.is_empty());
        Ok(())
    }
}
