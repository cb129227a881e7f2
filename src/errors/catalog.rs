// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised when CSV output does not match a catalog table schema.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(
        "{table}: header mismatch, expected [{}] but found [{}]",
        .expected.join(", "), .found.join(", ")
    )]
    HeaderMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{table} row {row}: expected {expected} fields, found {found}")]
    ArityMismatch {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{table} row {row}: column '{column}' expects {expected}, found '{value}'")]
    TypeMismatch {
        table: String,
        row: usize,
        column: String,
        expected: String,
        value: String,
    },

    #[error("{table} row {row}: column '{column}' contains a delimiter, quote or newline: '{value}'")]
    UnsafeValue {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
