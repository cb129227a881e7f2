// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The two graph tables, defined once.
//!
//! Each column carries both its catalog name (what SQL sees) and the header
//! the graph bulk loader expects in the CSV file. Files under a table's prefix
//! are read by both, so the order and types must agree.

use crate::resources::Column;

/// Field delimiter of the export files. The catalog SerDe splits on it
/// without honoring quotes.
pub const FIELD_DELIMITER: char = ',';

/// Characters that would shift columns for an unquoting reader.
const UNSAFE_CHARS: [char; 4] = [FIELD_DELIMITER, '"', '\n', '\r'];

/// Whether `value` survives a plain split on [`FIELD_DELIMITER`] and newlines.
pub fn is_delimiter_safe(value: &str) -> bool {
    !value.contains(UNSAFE_CHARS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Double,
    Int,
}

impl ColumnType {
    /// Type name in the query catalog.
    pub fn catalog_type(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Double => "double",
            ColumnType::Int => "int",
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ColumnType::String => true,
            ColumnType::Double => value.trim().parse::<f64>().is_ok_and(f64::is_finite),
            // The catalog `int` is 32-bit; anything wider reads back as NULL.
            ColumnType::Int => value.trim().parse::<i32>().is_ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub header: &'static str,
    pub column_type: ColumnType,
}

const fn column(name: &'static str, header: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec {
        name,
        header,
        column_type,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    /// Key prefix under the raw bucket, with trailing slash.
    pub prefix: &'static str,
    pub columns: &'static [ColumnSpec],
}

pub const NODES: TableSchema = TableSchema {
    name: "nodes",
    prefix: "upload/nodes/",
    columns: &[
        column("id", "~id", ColumnType::String),
        column("label", "~label", ColumnType::String),
        column("name", "name", ColumnType::String),
    ],
};

pub const EDGES: TableSchema = TableSchema {
    name: "edges",
    prefix: "upload/edges/",
    columns: &[
        column("source", "~from", ColumnType::String),
        column("target", "~to", ColumnType::String),
        column("relationship", "~label", ColumnType::String),
        column("weight", "weight:Double", ColumnType::Double),
        column("lag", "lag:Int", ColumnType::Int),
        column("correlation", "correlation:Double", ColumnType::Double),
    ],
};

pub const TABLES: [&TableSchema; 2] = [&NODES, &EDGES];

impl TableSchema {
    pub fn by_name(name: &str) -> Option<&'static TableSchema> {
        TABLES.iter().copied().find(|schema| schema.name == name)
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header).collect()
    }

    /// Column list as the catalog declares it, in file order.
    pub fn catalog_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|c| Column {
                name: c.name.to_string(),
                column_type: c.column_type.catalog_type().to_string(),
            })
            .collect()
    }

    /// `s3://<bucket>/<prefix>`; `bucket` may be a reference placeholder.
    pub fn location(&self, bucket: &str) -> String {
        format!("s3://{}/{}", bucket, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_headers_follow_loader_format() {
        assert_eq!(
            EDGES.headers(),
            vec!["~from", "~to", "~label", "weight:Double", "lag:Int", "correlation:Double"]
        );
        assert_eq!(NODES.headers(), vec!["~id", "~label", "name"]);
    }

    #[test]
    fn catalog_columns_carry_sql_types() {
        let columns = EDGES.catalog_columns();
        let pairs: Vec<(&str, &str)> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("source", "string"),
                ("target", "string"),
                ("relationship", "string"),
                ("weight", "double"),
                ("lag", "int"),
                ("correlation", "double"),
            ]
        );
    }

    #[test]
    fn types_accept_only_their_values() {
        assert!(ColumnType::Double.accepts("0.87"));
        assert!(ColumnType::Double.accepts("-1"));
        assert!(!ColumnType::Double.accepts("NaN"));
        assert!(!ColumnType::Double.accepts(""));
        assert!(ColumnType::Int.accepts("3"));
        assert!(!ColumnType::Int.accepts("3.5"));
        assert!(ColumnType::String.accepts(""));
    }

    #[test]
    fn int_is_bounded_like_the_catalog_int() {
        assert!(ColumnType::Int.accepts("2147483647"));
        assert!(ColumnType::Int.accepts("-2147483648"));
        assert!(!ColumnType::Int.accepts("2147483648"));
        assert!(!ColumnType::Int.accepts("3000000000"));
    }

    #[test]
    fn delimiter_safety() {
        assert!(is_delimiter_safe("Bitcoin"));
        assert!(is_delimiter_safe(""));
        assert!(!is_delimiter_safe("Bitcoin, Inc"));
        assert!(!is_delimiter_safe("say \"hi\""));
        assert!(!is_delimiter_safe("two\nlines"));
    }

    #[test]
    fn lookup_and_location() {
        assert_eq!(TableSchema::by_name("nodes"), Some(&NODES));
        assert!(TableSchema::by_name("prices").is_none());
        assert_eq!(
            EDGES.location("${bucket.raw.bucket}"),
            "s3://${bucket.raw.bucket}/upload/edges/"
        );
    }
}
