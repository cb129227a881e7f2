// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::catalog::{is_delimiter_safe, TableSchema};
use crate::errors::SchemaError;

/// CSV writer that only emits rows matching a graph table schema.
///
/// The header row is written on construction. Rows are numbered from 1
/// (the first data row) in errors.
///
/// ```
/// use corrgraph_infra::catalog::{GraphCsvWriter, EDGES};
///
/// let mut writer = GraphCsvWriter::new(Vec::new(), &EDGES).unwrap();
/// writer.write_row(["BTC", "ETH", "CORRELATES_WITH", "0.91", "2", "0.87"]).unwrap();
/// assert!(writer.write_row(["BTC", "ETH", "CORRELATES_WITH", "high", "2", "0.87"]).is_err());
///
/// let bytes = writer.into_inner().unwrap();
/// assert!(String::from_utf8(bytes).unwrap().starts_with("~from,~to,~label,"));
/// ```
pub struct GraphCsvWriter<W: Write> {
    schema: &'static TableSchema,
    writer: csv::Writer<W>,
    rows: usize,
}

impl GraphCsvWriter<File> {
    pub fn create<P: AsRef<Path>>(
        path: P,
        schema: &'static TableSchema,
    ) -> Result<Self, SchemaError> {
        Self::new(File::create(path)?, schema)
    }
}

impl<W: Write> GraphCsvWriter<W> {
    pub fn new(inner: W, schema: &'static TableSchema) -> Result<Self, SchemaError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(schema.headers())?;
        Ok(Self {
            schema,
            writer,
            rows: 0,
        })
    }

    pub fn write_row<I, S>(&mut self, values: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<S> = values.into_iter().collect();
        let row = self.rows + 1;
        let fields: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
        check_row(self.schema, row, &fields)?;
        self.writer
            .write_record(values.iter().map(|v| v.as_ref().as_bytes()))?;
        self.rows = row;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<(), SchemaError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, SchemaError> {
        self.writer
            .into_inner()
            .map_err(|e| SchemaError::Io(e.into_error()))
    }
}

fn check_row(schema: &TableSchema, row: usize, values: &[&str]) -> Result<(), SchemaError> {
    if values.len() != schema.columns.len() {
        return Err(SchemaError::ArityMismatch {
            table: schema.name.to_string(),
            row,
            expected: schema.columns.len(),
            found: values.len(),
        });
    }

    for (column, value) in schema.columns.iter().zip(values) {
        if !is_delimiter_safe(value) {
            return Err(SchemaError::UnsafeValue {
                table: schema.name.to_string(),
                row,
                column: column.name.to_string(),
                value: value.to_string(),
            });
        }
        if !column.column_type.accepts(value) {
            return Err(SchemaError::TypeMismatch {
                table: schema.name.to_string(),
                row,
                column: column.name.to_string(),
                expected: column.column_type.catalog_type().to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// Check an existing CSV against `schema`; returns the number of data rows.
pub fn validate_csv<R: Read>(reader: R, schema: &TableSchema) -> Result<usize, SchemaError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let expected: Vec<String> = schema.headers().iter().map(|h| h.to_string()).collect();
    if found != expected {
        return Err(SchemaError::HeaderMismatch {
            table: schema.name.to_string(),
            expected,
            found,
        });
    }

    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        rows += 1;
        let fields: Vec<&str> = record.iter().collect();
        check_row(schema, rows, &fields)?;
    }
    Ok(rows)
}

pub fn validate_csv_file<P: AsRef<Path>>(
    path: P,
    schema: &TableSchema,
) -> Result<usize, SchemaError> {
    validate_csv(File::open(path)?, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EDGES, NODES};

    #[test]
    fn writes_header_and_rows() {
        let mut writer = GraphCsvWriter::new(Vec::new(), &NODES).unwrap();
        writer.write_row(["BTC", "Asset", "Bitcoin"]).unwrap();
        writer.write_row(["ETH", "Asset", "Ethereum"]).unwrap();
        assert_eq!(writer.rows_written(), 2);

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output, "~id,~label,name\nBTC,Asset,Bitcoin\nETH,Asset,Ethereum\n");
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut writer = GraphCsvWriter::new(Vec::new(), &NODES).unwrap();
        match writer.write_row(["BTC", "Asset"]) {
            Err(SchemaError::ArityMismatch { row, expected, found, .. }) => {
                assert_eq!((row, expected, found), (1, 3, 2));
            }
            other => panic!("expected arity mismatch, got {:?}", other),
        }
        assert_eq!(writer.rows_written(), 0);
    }

    #[test]
    fn rejects_wrong_type() {
        let mut writer = GraphCsvWriter::new(Vec::new(), &EDGES).unwrap();
        writer
            .write_row(["BTC", "ETH", "CORRELATES_WITH", "0.9", "1", "0.8"])
            .unwrap();
        match writer.write_row(["BTC", "SOL", "CORRELATES_WITH", "0.9", "one", "0.8"]) {
            Err(SchemaError::TypeMismatch { row, column, expected, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "lag");
                assert_eq!(expected, "int");
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn validates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv");

        let mut writer = GraphCsvWriter::create(&path, &EDGES).unwrap();
        writer
            .write_row(["BTC", "ETH", "CORRELATES_WITH", "0.91", "0", "0.91"])
            .unwrap();
        writer.flush().unwrap();
        drop(writer);

        assert_eq!(validate_csv_file(&path, &EDGES).unwrap(), 1);
        assert!(matches!(
            validate_csv_file(&path, &NODES),
            Err(SchemaError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn rejects_values_an_unquoting_reader_would_split() {
        let mut writer = GraphCsvWriter::new(Vec::new(), &NODES).unwrap();
        match writer.write_row(["BTC", "Crypto", "Bitcoin, Inc"]) {
            Err(SchemaError::UnsafeValue { row, column, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "name");
            }
            other => panic!("expected unsafe value, got {:?}", other),
        }
        assert!(writer.write_row(["BTC", "Crypto", "the \"coin\""]).is_err());
        assert!(writer.write_row(["BTC", "Crypto", "line\nbreak"]).is_err());
        assert_eq!(writer.rows_written(), 0);

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output, "~id,~label,name\n");
    }

    #[test]
    fn validate_rejects_quoted_delimiters() {
        let data = "~id,~label,name\nBTC,Crypto,\"Bitcoin, Inc\"\n";
        assert!(matches!(
            validate_csv(data.as_bytes(), &NODES),
            Err(SchemaError::UnsafeValue { row: 1, .. })
        ));
    }

    #[test]
    fn rejects_lag_wider_than_catalog_int() {
        let mut writer = GraphCsvWriter::new(Vec::new(), &EDGES).unwrap();
        assert!(matches!(
            writer.write_row(["BTC", "ETH", "CORRELATES_WITH", "0.9", "3000000000", "0.8"]),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn validate_reports_bad_rows() {
        let data = "~id,~label,name\nBTC,Asset,Bitcoin\nETH,Asset\n";
        match validate_csv(data.as_bytes(), &NODES) {
            Err(SchemaError::ArityMismatch { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected arity mismatch, got {:?}", other),
        }
    }
}
