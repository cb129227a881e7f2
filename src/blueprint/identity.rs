// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One role per principal type: the functions, the graph database's bulk
//! loader, and the notebook host.

use super::{named_tags, names, reference};
use crate::config::{PackagingConfig, StackConfig};
use crate::resources::{IamRole, PolicyStatement, Resource, ResourceBody, ResourceKind, ServicePrincipal};

fn bucket_arns(bucket: &str, objects: bool) -> Vec<String> {
    let arn = reference(ResourceKind::Bucket, bucket, "arn").to_string();
    if objects {
        vec![arn.clone(), format!("{}/*", arn)]
    } else {
        vec![arn]
    }
}

fn graph_data_arn(config: &StackConfig) -> String {
    format!(
        "arn:aws:neptune-db:{}:{}:{}/*",
        config.region,
        config.account_id.as_deref().unwrap_or("*"),
        reference(ResourceKind::GraphCluster, names::MAIN, "cluster_resource_id")
    )
}

fn role(
    config: &StackConfig,
    name: &str,
    trust: ServicePrincipal,
    statements: Vec<PolicyStatement>,
) -> Resource {
    let suffix = format!("{}-role", name.replace('_', "-"));
    Resource::new(
        name,
        ResourceBody::IamRole(IamRole {
            name: format!("{}-{}", config.name_prefix(), suffix),
            trust,
            statements,
            tags: named_tags(config, &suffix),
        }),
    )
}

pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let mut compute_statements = vec![
        PolicyStatement::allow(
            "PipelineStorage",
            &["s3:GetObject", "s3:PutObject", "s3:DeleteObject", "s3:ListBucket"],
            [names::RAW, names::ANALYSIS, names::SIGNALS]
                .iter()
                .flat_map(|bucket| bucket_arns(bucket, true))
                .collect(),
        ),
        PolicyStatement::allow(
            "GraphDatabase",
            &[
                "neptune-db:connect",
                "neptune-db:ReadDataViaQuery",
                "neptune-db:WriteDataViaQuery",
                "neptune-db:StartLoaderJob",
                "neptune-db:GetLoaderJobStatus",
            ],
            vec![graph_data_arn(config)],
        ),
        PolicyStatement::allow(
            "NetworkInterfaces",
            &[
                "ec2:CreateNetworkInterface",
                "ec2:DescribeNetworkInterfaces",
                "ec2:DeleteNetworkInterface",
                "ec2:AssignPrivateIpAddresses",
                "ec2:UnassignPrivateIpAddresses",
            ],
            vec!["*".to_string()],
        ),
        PolicyStatement::allow(
            "Logs",
            &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
            vec!["arn:aws:logs:*:*:*".to_string()],
        ),
        PolicyStatement::allow(
            "PassLoaderRole",
            &["iam:PassRole"],
            vec![reference(ResourceKind::IamRole, names::GRAPH_LOADER, "arn").to_string()],
        ),
    ];
    if let PackagingConfig::Container { .. } = config.compute.packaging {
        compute_statements.push(PolicyStatement::allow(
            "PullImage",
            &[
                "ecr:BatchGetImage",
                "ecr:GetDownloadUrlForLayer",
                "ecr:BatchCheckLayerAvailability",
            ],
            vec![reference(ResourceKind::ContainerRepository, names::ETL, "arn").to_string()],
        ));
        compute_statements.push(PolicyStatement::allow(
            "RegistryAuth",
            &["ecr:GetAuthorizationToken"],
            vec!["*".to_string()],
        ));
    }

    let mut resources = vec![
        role(config, names::COMPUTE, ServicePrincipal::Lambda, compute_statements),
        role(
            config,
            names::GRAPH_LOADER,
            ServicePrincipal::GraphDatabase,
            vec![PolicyStatement::allow(
                "BulkLoadRead",
                &["s3:GetObject", "s3:ListBucket"],
                bucket_arns(names::RAW, true),
            )],
        ),
    ];

    if config.notebook.enabled {
        resources.push(role(
            config,
            names::NOTEBOOK,
            ServicePrincipal::Notebook,
            vec![
                PolicyStatement::allow(
                    "GraphDatabase",
                    &["neptune-db:*"],
                    vec![graph_data_arn(config)],
                ),
                PolicyStatement::allow(
                    "ReadPipelineData",
                    &["s3:GetObject", "s3:ListBucket"],
                    [names::RAW, names::ANALYSIS]
                        .iter()
                        .flat_map(|bucket| bucket_arns(bucket, true))
                        .collect(),
                ),
                PolicyStatement::allow(
                    "Logs",
                    &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                    vec!["arn:aws:logs:*:*:*".to_string()],
                ),
            ],
        ));
    }

    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::minimal_config;

    fn roles(config: &StackConfig) -> Vec<IamRole> {
        declare(config)
            .into_iter()
            .filter_map(|r| match r.body {
                ResourceBody::IamRole(role) => Some(role),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn one_role_per_principal() {
        let trusts: Vec<ServicePrincipal> = roles(&minimal_config()).iter().map(|r| r.trust).collect();
        assert_eq!(trusts, ServicePrincipal::ALL.to_vec());
    }

    #[test]
    fn container_packaging_adds_registry_pull() {
        let mut config = minimal_config();
        config.compute.packaging = PackagingConfig::Container {
            repository: None,
            image_tag: "bootstrap".to_string(),
        };
        let compute = roles(&config).remove(0);
        assert!(compute.statements.iter().any(|s| s.sid == "PullImage"));

        let archive = roles(&minimal_config()).remove(0);
        assert!(archive.statements.iter().all(|s| s.sid != "PullImage"));
    }

    #[test]
    fn loader_role_reads_raw_bucket_only() {
        let loader = roles(&minimal_config()).remove(1);
        assert_eq!(
            loader.statements[0].resources,
            vec!["${bucket.raw.arn}".to_string(), "${bucket.raw.arn}/*".to_string()]
        );
    }
}
