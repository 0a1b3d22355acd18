// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Tabular dataset model: an ordered column list plus rows of tagged scalars.

use crate::error::{DatasetError, DatasetResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::Path;

pub type Row = IndexMap<String, Scalar>;

pub const DEFAULT_TEMPORAL_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%Y%m%d",
];

/// A single untyped cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    Text(String),
    Number(f64),
    #[default]
    Missing,
}
impl Scalar {
    pub fn text(s: impl Into<String>) -> Self {
        Scalar::Text(s.into())
    }
    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Missing => true,
            Scalar::Text(s) => s.trim().is_empty(),
            Scalar::Number(_) => false,
        }
    }
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Scalar::Number(n) => *n,
            Scalar::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
            Scalar::Missing => return None,
        };
        n.is_finite().then_some(n)
    }
    /// Numeric value with missing or unparseable cells treated as zero.
    pub fn number_or_zero(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }
}
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Missing => Ok(()),
        }
    }
}
impl From<Value> for Scalar {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Scalar::Missing,
            Value::Bool(b) => Scalar::Text(b.to_string()),
            Value::Number(n) => n.as_f64().map_or(Scalar::Missing, Scalar::Number),
            Value::String(s) => Scalar::Text(s),
            other => Scalar::Text(other.to_string()),
        }
    }
}
impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}
impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}
impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Text(s) => serializer.serialize_str(s),
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Scalar::Number(n) => serializer.serialize_f64(*n),
            Scalar::Missing => serializer.serialize_none(),
        }
    }
}
impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Scalar::from)
    }
}

/// Date/time recognition over an ordered list of `chrono` formats.
#[derive(Debug, Clone)]
pub struct TemporalParser {
    formats: Vec<String>,
}
impl TemporalParser {
    pub fn new(formats: Vec<String>) -> Self {
        Self { formats }
    }
    pub fn parse(&self, value: &Scalar) -> Option<NaiveDateTime> {
        match value {
            Scalar::Text(s) => self.parse_str(s.trim()),
            Scalar::Number(_) | Scalar::Missing => None,
        }
    }
    pub fn parse_str(&self, value: &str) -> Option<NaiveDateTime> {
        if value.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_local());
        }
        for format in &self.formats {
            if let Some(dt) = parse_datetime_simple(value, format) {
                return Some(dt);
            }
        }
        // Bare year-month such as "2025-03".
        if value.len() == 7 && value.as_bytes()[4] == b'-' {
            return parse_datetime_simple(&format!("{value}-01"), "%Y-%m-%d");
        }
        None
    }
}
impl Default for TemporalParser {
    fn default() -> Self {
        Self::new(
            DEFAULT_TEMPORAL_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        )
    }
}
fn parse_datetime_simple(value: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, format) {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
    Sqlite,
}
impl DataFormat {
    pub fn from_path(path: &Path) -> DatasetResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        Self::from_extension(&ext)
    }
    pub fn from_extension(ext: &str) -> DatasetResult<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "sqlite" | "db" => Ok(DataFormat::Sqlite),
            other => Err(DatasetError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}
impl Dataset {
    /// Builds a dataset, dropping row keys outside `columns` and filling absent cells.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            if !unique.contains(&column) {
                unique.push(column);
            }
        }
        let rows = rows
            .into_iter()
            .map(|mut row| {
                unique
                    .iter()
                    .map(|c| (c.clone(), row.swap_remove(c).unwrap_or_default()))
                    .collect()
            })
            .collect();
        Self {
            columns: unique,
            rows,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
    pub fn value<'a>(row: &'a Row, column: &str) -> &'a Scalar {
        static MISSING: Scalar = Scalar::Missing;
        row.get(column).unwrap_or(&MISSING)
    }
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Scalar> + 'a {
        self.rows.iter().map(move |row| Self::value(row, column))
    }
    pub fn set_cell(&mut self, index: usize, column: &str, value: Scalar) -> DatasetResult<&Row> {
        let len = self.rows.len();
        if index >= len {
            return Err(DatasetError::RowOutOfBounds { index, len });
        }
        if !self.columns.iter().any(|c| c == column) {
            return Err(DatasetError::ColumnNotFound {
                column: column.to_string(),
            });
        }
        let row = &mut self.rows[index];
        row.insert(column.to_string(), value);
        Ok(row)
    }
    pub fn from_csv_str(content: &str) -> DatasetResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.trim().as_bytes());
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Row = columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), Scalar::text(record.get(i).unwrap_or(""))))
                .collect();
            rows.push(row);
        }
        Ok(Self::new(columns, rows))
    }
    pub fn from_json_str(content: &str) -> DatasetResult<Self> {
        let parsed: Value = serde_json::from_str(content)?;
        let records = match parsed {
            Value::Array(items) => items,
            Value::Object(mut obj) if matches!(obj.get("data"), Some(Value::Array(_))) => {
                match obj.remove("data") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                }
            }
            Value::Object(obj) => vec![Value::Object(obj)],
            other => {
                return Err(DatasetError::JsonShape {
                    details: format!("expected an array or object, found {other}"),
                })
            }
        };
        Self::from_json_records(None, records)
    }
    /// Builds a dataset from JSON objects; columns default to the first record's keys.
    pub fn from_json_records(
        columns: Option<Vec<String>>,
        records: Vec<Value>,
    ) -> DatasetResult<Self> {
        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            match record {
                Value::Object(map) => rows.push(
                    map.into_iter()
                        .map(|(k, v)| (k, Scalar::from(v)))
                        .collect::<Row>(),
                ),
                other => {
                    return Err(DatasetError::JsonShape {
                        details: format!("record {i} is not an object: {other}"),
                    })
                }
            }
        }
        let columns = columns.unwrap_or_else(|| {
            rows.first()
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default()
        });
        Ok(Self::new(columns, rows))
    }
    pub fn from_bytes(format: DataFormat, bytes: &[u8]) -> DatasetResult<Self> {
        let content = String::from_utf8_lossy(bytes);
        match format {
            DataFormat::Csv => Self::from_csv_str(&content),
            DataFormat::Json => Self::from_json_str(&content),
            DataFormat::Sqlite => Err(DatasetError::SqliteNotImplemented),
        }
    }
    pub fn from_path<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let path = path.as_ref();
        let format = DataFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        Self::from_bytes(format, &bytes)
    }
    pub fn to_csv_string(&self) -> DatasetResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|c| Self::value(row, c).to_string()),
            )?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DatasetError::Io(e.into_error()))?;
        let mut out = String::from_utf8_lossy(&bytes).into_owned();
        if out.ends_with('\n') {
            out.pop();
        }
        Ok(out)
    }
}

/// Pretty-prints JSON records verbatim, keeping booleans, arrays and objects intact.
pub fn records_to_json_pretty(records: &[Value]) -> DatasetResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_coercion_accepts_trimmed_finite_text() {
        assert_eq!(Scalar::text(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(Scalar::Number(3.0).as_number(), Some(3.0));
        assert_eq!(Scalar::text("").as_number(), None);
        assert_eq!(Scalar::text("abc").as_number(), None);
        assert_eq!(Scalar::text("inf").as_number(), None);
        assert_eq!(Scalar::text("NaN").as_number(), None);
        assert_eq!(Scalar::Missing.number_or_zero(), 0.0);
    }

    #[test]
    fn display_matches_plain_string_conversion() {
        assert_eq!(Scalar::Number(10.0).to_string(), "10");
        assert_eq!(Scalar::Number(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Missing.to_string(), "");
        assert_eq!(Scalar::text("Acme").to_string(), "Acme");
    }

    #[test]
    fn temporal_parser_handles_common_layouts() {
        let parser = TemporalParser::default();
        let parsed = parser.parse(&Scalar::text("2025-01-15")).unwrap();
        assert_eq!(parsed.format("%Y-%m").to_string(), "2025-01");
        assert!(parser.parse(&Scalar::text("2025-01-15T10:30:00Z")).is_some());
        assert!(parser.parse(&Scalar::text("2025-01-15T10:30:00+02:00")).is_some());
        assert!(parser.parse(&Scalar::text("03/25/2024")).is_some());
        assert!(parser.parse(&Scalar::text("2024-11")).is_some());
        assert!(parser.parse(&Scalar::text("not a date")).is_none());
        assert!(parser.parse(&Scalar::Number(20250115.0)).is_none());
        assert!(parser.parse(&Scalar::Missing).is_none());
    }

    #[test]
    fn csv_loading_fills_short_rows_and_honours_quotes() {
        let ds = Dataset::from_csv_str("cliente, valor\n\"Acme, Ltd\",10\nBeta\n").unwrap();
        assert_eq!(ds.columns, vec!["cliente", "valor"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(Dataset::value(&ds.rows[0], "cliente"), &Scalar::text("Acme, Ltd"));
        assert_eq!(Dataset::value(&ds.rows[1], "valor"), &Scalar::text(""));
    }

    #[test]
    fn json_loading_accepts_data_envelope_and_keeps_key_order() {
        let ds = Dataset::from_json_str(r#"{"data":[{"z":1,"a":"x"},{"a":"y"}]}"#).unwrap();
        assert_eq!(ds.columns, vec!["z", "a"]);
        assert_eq!(Dataset::value(&ds.rows[1], "z"), &Scalar::Missing);
        let single = Dataset::from_json_str(r#"{"k":true}"#).unwrap();
        assert_eq!(Dataset::value(&single.rows[0], "k"), &Scalar::text("true"));
        assert!(Dataset::from_json_str("[1,2]").is_err());
        let wrapped = Dataset::from_json_str(r#"{"data": 5, "a": 1, "b": 2}"#).unwrap();
        assert_eq!(wrapped.columns, vec!["data", "a", "b"]);
        assert_eq!(wrapped.row_count(), 1);
        assert!(Dataset::from_json_str("{oops").is_err());
    }

    #[test]
    fn set_cell_validates_bounds_and_column() {
        let mut ds = Dataset::from_json_records(None, vec![json!({"a": 1})]).unwrap();
        assert!(matches!(
            ds.set_cell(3, "a", Scalar::Missing),
            Err(DatasetError::RowOutOfBounds { index: 3, len: 1 })
        ));
        assert!(matches!(
            ds.set_cell(0, "b", Scalar::Missing),
            Err(DatasetError::ColumnNotFound { .. })
        ));
        let row = ds.set_cell(0, "a", Scalar::text("z")).unwrap();
        assert_eq!(row.get("a"), Some(&Scalar::text("z")));
    }

    #[test]
    fn csv_export_quotes_special_fields() {
        let ds = Dataset::from_json_records(
            Some(vec!["name".into(), "note".into()]),
            vec![json!({"name": "a,b", "note": "say \"hi\""}), json!({"name": 3})],
        )
        .unwrap();
        let csv = ds.to_csv_string().unwrap();
        assert_eq!(csv, "name,note\n\"a,b\",\"say \"\"hi\"\"\"\n3,");
    }

    #[test]
    fn json_records_pretty_print_without_coercion() {
        let records = vec![json!({"flag": true, "tags": [1, 2], "n": null})];
        let out = records_to_json_pretty(&records).unwrap();
        let back: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(back, records);
        assert!(out.contains("\n  {"));
    }

    #[test]
    fn data_format_from_extension() {
        assert_eq!(DataFormat::from_extension(".csv").unwrap(), DataFormat::Csv);
        assert_eq!(DataFormat::from_extension("db").unwrap(), DataFormat::Sqlite);
        assert!(DataFormat::from_extension("xlsx").is_err());
    }
}
