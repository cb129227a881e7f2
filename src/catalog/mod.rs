// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Graph CSV schemas shared by the analytics catalog and the files the ETL job writes.

pub mod schema;
pub mod writer;

pub use schema::{
    is_delimiter_safe, ColumnSpec, ColumnType, TableSchema, EDGES, FIELD_DELIMITER, NODES, TABLES,
};
pub use writer::{validate_csv, validate_csv_file, GraphCsvWriter};
