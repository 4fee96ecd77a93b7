//! Parses MTR open data CSV files into header-keyed rows.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransitError};

/// One CSV record, keyed by column header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabularRow(BTreeMap<String, String>);

impl TabularRow {
    /// Value of `column`, if present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Numeric value of `column`, if present and parsable.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column)?.trim().parse().ok()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TabularRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Parses CSV text with a header line. Blank lines are skipped; short rows
/// simply lack the trailing columns.
pub fn parse_rows(source: &str, text: &str) -> Result<Vec<TabularRow>> {
    // Files published from Excel start with a byte order mark
    let text = text.trim_start_matches('\u{feff}');

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| csv_error(source, e))?
        .clone();
    if headers.iter().all(str::is_empty) {
        return Err(TransitError::InvalidResponseFormat {
            endpoint: source.to_string(),
            reason: "CSV has no header row".to_string(),
        });
    }

    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| csv_error(source, e))?;
            let row: TabularRow = headers.iter().zip(record.iter()).collect();
            Ok(row)
        })
        .collect()
}

fn csv_error(source: &str, error: csv::Error) -> TransitError {
    TransitError::InvalidResponseFormat {
        endpoint: source.to_string(),
        reason: format!("invalid CSV: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIONS: &str = "\u{feff}\"Line Code\",\"Direction\",\"Station Code\",\"Station ID\",\"Chinese Name\",\"English Name\",\"Sequence\"\n\
\"AEL\",\"DT\",\"HOK\",\"1\",\"香港\",\"Hong Kong\",\"1.00\"\n\
\"AEL\",\"DT\",\"KOW\",\"2\",\"九龍\",\"Kowloon\",\"2.00\"\n";

    #[test]
    fn test_parse_rows_with_bom_and_quotes() {
        let rows = parse_rows("stations", STATIONS).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Line Code"), Some("AEL"));
        assert_eq!(rows[1].get("Chinese Name"), Some("九龍"));
        assert_eq!(rows[1].get_f64("Sequence"), Some(2.0));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let rows = parse_rows("x", "a,b,c\n1,2\n").unwrap();
        assert_eq!(rows[0].get("b"), Some("2"));
        assert_eq!(rows[0].get("c"), None);
    }

    #[test]
    fn test_empty_input_is_invalid() {
        assert!(matches!(
            parse_rows("x", ""),
            Err(TransitError::InvalidResponseFormat { .. })
        ));
    }

    #[test]
    fn test_row_serializes_as_plain_map() {
        let row: TabularRow = [("Line Code", "TKL")].into_iter().collect();
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"Line Code":"TKL"}"#);
    }
}
