// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use super::{names, reference};
use crate::catalog::{FIELD_DELIMITER, TABLES};
use crate::config::StackConfig;
use crate::resources::{
    CatalogDatabase, CatalogTable, Column, QueryWorkgroup, Resource, ResourceBody, ResourceKind,
};

const TEXT_INPUT_FORMAT: &str = "org.apache.hadoop.mapred.TextInputFormat";
const TEXT_OUTPUT_FORMAT: &str = "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat";
const LAZY_SIMPLE_SERDE: &str = "org.apache.hadoop.hive.serde2.lazy.LazySimpleSerDe";

/// The catalog database, one external table per graph schema, and the workgroup.
///
/// Table columns and locations come from [`crate::catalog::schema`] unless the
/// configuration overrides them.
pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let analytics = &config.analytics;
    let raw_bucket = reference(ResourceKind::Bucket, names::RAW, "bucket").to_string();

    let mut resources = vec![Resource::new(
        names::MAIN,
        ResourceBody::CatalogDatabase(CatalogDatabase {
            name: analytics.database_name.clone(),
            description: "Crypto correlation graph exports".to_string(),
        }),
    )];

    for schema in TABLES {
        let overrides = analytics.tables.get(schema.name);
        let columns = overrides
            .and_then(|o| o.columns.as_ref())
            .map(|columns| {
                columns
                    .iter()
                    .map(|c| Column {
                        name: c.name.clone(),
                        column_type: c.column_type.clone(),
                    })
                    .collect()
            })
            .unwrap_or_else(|| schema.catalog_columns());
        let location = overrides
            .and_then(|o| o.location.clone())
            .unwrap_or_else(|| schema.location(&raw_bucket));

        resources.push(Resource::new(
            schema.name,
            ResourceBody::CatalogTable(CatalogTable {
                name: schema.name.to_string(),
                database_name: reference(ResourceKind::CatalogDatabase, names::MAIN, "name"),
                table_type: "EXTERNAL_TABLE".to_string(),
                location,
                columns,
                input_format: TEXT_INPUT_FORMAT.to_string(),
                output_format: TEXT_OUTPUT_FORMAT.to_string(),
                serde_library: LAZY_SIMPLE_SERDE.to_string(),
                serde_parameters: BTreeMap::from([(
                    "field.delim".to_string(),
                    FIELD_DELIMITER.to_string(),
                )]),
                parameters: BTreeMap::from([
                    ("EXTERNAL".to_string(), "TRUE".to_string()),
                    ("classification".to_string(), "csv".to_string()),
                    ("skip.header.line.count".to_string(), "1".to_string()),
                ]),
            }),
        ));
    }

    resources.push(Resource::new(
        names::MAIN,
        ResourceBody::QueryWorkgroup(QueryWorkgroup {
            name: analytics.workgroup.clone(),
            output_location: format!(
                "s3://{}/query-results/",
                reference(ResourceKind::Bucket, names::ANALYSIS, "bucket")
            ),
            enforce_workgroup_configuration: true,
            publish_cloudwatch_metrics_enabled: true,
        }),
    ));

    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EDGES;
    use crate::config::{ColumnOverride, TableOverride};

    use crate::config::minimal_config;

    fn table(resources: &[Resource], name: &str) -> CatalogTable {
        resources
            .iter()
            .find_map(|r| match &r.body {
                ResourceBody::CatalogTable(t) if t.name == name => Some(t.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn tables_derive_from_writer_schemas() {
        let resources = declare(&minimal_config());
        let edges = table(&resources, "edges");
        assert_eq!(edges.columns, EDGES.catalog_columns());
        assert_eq!(edges.location, "s3://${bucket.raw.bucket}/upload/edges/");
        assert_eq!(edges.parameters["skip.header.line.count"], "1");
    }

    #[test]
    fn overrides_replace_columns() {
        let mut config = minimal_config();
        config.analytics.tables.insert(
            "nodes".to_string(),
            TableOverride {
                columns: Some(vec![ColumnOverride {
                    name: "id".to_string(),
                    column_type: "string".to_string(),
                }]),
                location: None,
            },
        );
        let nodes = table(&declare(&config), "nodes");
        assert_eq!(nodes.columns.len(), 1);
        assert_eq!(nodes.location, "s3://${bucket.raw.bucket}/upload/nodes/");
    }
}
