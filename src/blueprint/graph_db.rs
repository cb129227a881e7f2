// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{names, reference};
use crate::config::StackConfig;
use crate::resources::{
    GraphCluster, GraphInstance, GraphSubnetGroup, Resource, ResourceBody, ResourceKind,
};

const ENGINE: &str = "neptune";

/// Subnet group over the private subnets, the cluster, and its single instance.
pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let db = &config.graph_database;
    let identifier = format!("{}-graph", config.name_prefix());

    let subnet_ids = (0..config.network.private_subnet_cidrs.len())
        .map(|i| reference(ResourceKind::Subnet, &names::private_subnet(i), "id"))
        .collect();

    vec![
        Resource::new(
            names::MAIN,
            ResourceBody::GraphSubnetGroup(GraphSubnetGroup {
                name: format!("{}-subnets", identifier),
                subnet_ids,
            }),
        ),
        Resource::new(
            names::MAIN,
            ResourceBody::GraphCluster(GraphCluster {
                cluster_identifier: identifier.clone(),
                engine: ENGINE.to_string(),
                engine_version: db.engine_version.clone(),
                port: db.port,
                subnet_group_name: reference(ResourceKind::GraphSubnetGroup, names::MAIN, "name"),
                vpc_security_group_ids: vec![reference(
                    ResourceKind::SecurityGroup,
                    names::GRAPH_DB,
                    "id",
                )],
                iam_roles: vec![reference(ResourceKind::IamRole, names::GRAPH_LOADER, "arn")],
                skip_final_snapshot: db.skip_final_snapshot,
                apply_immediately: true,
            }),
        ),
        Resource::new(
            names::PRIMARY,
            ResourceBody::GraphInstance(GraphInstance {
                identifier: format!("{}-{}", identifier, names::PRIMARY),
                cluster_identifier: reference(
                    ResourceKind::GraphCluster,
                    names::MAIN,
                    "cluster_identifier",
                ),
                instance_class: db.instance_class.clone(),
                engine: ENGINE.to_string(),
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::minimal_config;

    #[test]
    fn instance_attaches_to_cluster() {
        let resources = declare(&minimal_config());
        let instance = resources
            .iter()
            .find(|r| r.kind() == ResourceKind::GraphInstance)
            .unwrap();
        let dependencies = instance.dependencies().unwrap();
        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].kind, ResourceKind::GraphCluster);
    }

    #[test]
    fn cluster_defaults() {
        let resources = declare(&minimal_config());
        match &resources[1].body {
            ResourceBody::GraphCluster(cluster) => {
                assert_eq!(cluster.port, 8182);
                assert!(cluster.skip_final_snapshot);
                assert_eq!(cluster.cluster_identifier, "corrgraph-test-graph");
            }
            other => panic!("expected cluster, got {:?}", other),
        }
    }
}
