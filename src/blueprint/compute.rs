// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The scheduled ETL function and the two event-driven stages.
//!
//! All functions run in the private subnets under the compute security group
//! and role. Only the ETL function honors the configured packaging; the
//! stages always ship as archives.

use std::collections::BTreeMap;

use super::{names, reference};
use crate::config::{PackagingConfig, StackConfig, StageConfig};
use crate::resources::{
    ContainerRepository, Function, Packaging, Resource, ResourceBody, ResourceKind, VpcConfig,
};

const STAGE_RUNTIME: &str = "python3.11";

fn vpc_config(config: &StackConfig) -> VpcConfig {
    VpcConfig {
        subnet_ids: (0..config.network.private_subnet_cidrs.len())
            .map(|i| reference(ResourceKind::Subnet, &names::private_subnet(i), "id"))
            .collect(),
        security_group_ids: vec![reference(ResourceKind::SecurityGroup, names::COMPUTE, "id")],
    }
}

fn graph_endpoint() -> String {
    reference(ResourceKind::GraphCluster, names::MAIN, "endpoint").to_string()
}

fn loader_role_arn() -> String {
    reference(ResourceKind::IamRole, names::GRAPH_LOADER, "arn").to_string()
}

fn bucket_name(bucket: &str) -> String {
    reference(ResourceKind::Bucket, bucket, "bucket").to_string()
}

fn etl_packaging(config: &StackConfig) -> Packaging {
    match &config.compute.packaging {
        PackagingConfig::Archive {
            runtime,
            handler,
            archive_path,
            layers,
        } => Packaging::Archive {
            runtime: runtime.clone(),
            handler: handler.clone(),
            filename: archive_path.clone(),
            layers: if layers.is_empty() {
                vec![PackagingConfig::managed_layer(&config.region)]
            } else {
                layers.clone()
            },
        },
        PackagingConfig::Container { image_tag, .. } => Packaging::Image {
            image_uri: format!(
                "{}:{}",
                reference(ResourceKind::ContainerRepository, names::ETL, "repository_url"),
                image_tag
            ),
            command: Vec::new(),
        },
    }
}

fn stage(
    config: &StackConfig,
    name: &str,
    stage: &StageConfig,
    memory_size: u32,
    timeout: u32,
    layers: Vec<String>,
    environment: BTreeMap<String, String>,
) -> Resource {
    Resource::new(
        name,
        ResourceBody::Function(Function {
            function_name: stage
                .function_name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", config.name_prefix(), name)),
            role: reference(ResourceKind::IamRole, names::COMPUTE, "arn"),
            packaging: Packaging::Archive {
                runtime: STAGE_RUNTIME.to_string(),
                handler: stage.handler.clone(),
                filename: format!("build/{}.zip", name),
                layers,
            },
            memory_size,
            timeout,
            environment,
            vpc_config: vpc_config(config),
        }),
    )
}

pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let mut resources = Vec::new();

    if let PackagingConfig::Container { repository, .. } = &config.compute.packaging {
        resources.push(Resource::new(
            names::ETL,
            ResourceBody::ContainerRepository(ContainerRepository {
                name: repository
                    .clone()
                    .unwrap_or_else(|| format!("{}-etl", config.name_prefix())),
                image_tag_mutability: "MUTABLE".to_string(),
                scan_on_push: true,
            }),
        ));
    }

    resources.push(Resource::new(
        names::ETL,
        ResourceBody::Function(Function {
            function_name: config
                .compute
                .function_name
                .clone()
                .unwrap_or_else(|| format!("{}-etl", config.name_prefix())),
            role: reference(ResourceKind::IamRole, names::COMPUTE, "arn"),
            packaging: etl_packaging(config),
            memory_size: config.compute.memory_mb,
            timeout: config.compute.timeout_seconds,
            environment: BTreeMap::from([
                ("S3_BUCKET_NAME".to_string(), bucket_name(names::RAW)),
                ("NEPTUNE_ENDPOINT".to_string(), graph_endpoint()),
                ("NEPTUNE_LOADER_IAM_ROLE".to_string(), loader_role_arn()),
            ]),
            vpc_config: vpc_config(config),
        }),
    ));

    if config.loader.enabled {
        resources.push(stage(
            config,
            names::LOADER,
            &config.loader,
            256,
            60,
            Vec::new(),
            BTreeMap::from([
                ("NEPTUNE_ENDPOINT".to_string(), graph_endpoint()),
                ("NEPTUNE_PORT".to_string(), config.graph_database.port.to_string()),
                ("NEPTUNE_LOAD_ROLE_ARN".to_string(), loader_role_arn()),
            ]),
        ));
    }

    if config.signals.enabled {
        resources.push(stage(
            config,
            names::SIGNALS,
            &config.signals,
            512,
            120,
            vec![PackagingConfig::managed_layer(&config.region)],
            BTreeMap::from([
                ("INPUT_BUCKET".to_string(), bucket_name(names::ANALYSIS)),
                ("SIGNALS_BUCKET".to_string(), bucket_name(names::SIGNALS)),
            ]),
        ));
    }

    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::minimal_config;

    fn function(resources: &[Resource], name: &str) -> Function {
        resources
            .iter()
            .find_map(|r| match &r.body {
                ResourceBody::Function(f) if r.address.name == name => Some(f.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn etl_environment_references_bucket_and_endpoint() {
        let etl = function(&declare(&minimal_config()), names::ETL);
        assert_eq!(etl.environment["S3_BUCKET_NAME"], "${bucket.raw.bucket}");
        assert_eq!(etl.environment["NEPTUNE_ENDPOINT"], "${graph_cluster.main.endpoint}");
        assert_eq!(etl.memory_size, 1024);
        assert_eq!(etl.timeout, 300);
    }

    #[test]
    fn archive_packaging_pins_managed_layer() {
        let etl = function(&declare(&minimal_config()), names::ETL);
        match etl.packaging {
            Packaging::Archive { layers, filename, .. } => {
                assert_eq!(filename, "build/etl.zip");
                assert_eq!(layers.len(), 1);
                assert!(layers[0].starts_with("arn:aws:lambda:eu-west-1:"));
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[test]
    fn container_packaging_declares_repository() {
        let mut config = minimal_config();
        config.compute.packaging = PackagingConfig::Container {
            repository: None,
            image_tag: "bootstrap".to_string(),
        };
        let resources = declare(&config);
        assert_eq!(resources[0].kind(), ResourceKind::ContainerRepository);

        let etl = function(&resources, names::ETL);
        assert_eq!(
            etl.packaging,
            Packaging::Image {
                image_uri: "${container_repository.etl.repository_url}:bootstrap".to_string(),
                command: Vec::new(),
            }
        );
    }

    #[test]
    fn stages_follow_their_toggles() {
        let mut config = minimal_config();
        config.loader.enabled = false;
        let resources = declare(&config);
        assert!(resources.iter().all(|r| r.address.name != names::LOADER));

        let signals = function(&resources, names::SIGNALS);
        assert_eq!(signals.environment["INPUT_BUCKET"], "${bucket.analysis.bucket}");
        assert_eq!(signals.environment["SIGNALS_BUCKET"], "${bucket.signals.bucket}");
    }

    #[test]
    fn loader_environment_names_port_and_role() {
        let loader = function(&declare(&minimal_config()), names::LOADER);
        assert_eq!(loader.environment["NEPTUNE_PORT"], "8182");
        assert_eq!(loader.environment["NEPTUNE_LOAD_ROLE_ARN"], "${iam_role.graph_loader.arn}");
        match loader.packaging {
            Packaging::Archive { handler, .. } => assert_eq!(handler, "loader.lambda_handler"),
            other => panic!("expected archive, got {:?}", other),
        }
    }
}
