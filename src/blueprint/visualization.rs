// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{named_tags, names, reference};
use crate::config::StackConfig;
use crate::resources::{
    BastionHost, NotebookInstance, NotebookLifecycleConfig, Resource, ResourceBody, ResourceKind,
};

/// Shell run on every notebook start; points the graph magics at the cluster.
fn on_start_script(config: &StackConfig) -> String {
    format!(
        "#!/bin/bash\n\
         set -e\n\
         echo \"export GRAPH_NOTEBOOK_AUTH_MODE=IAM\" >> ~/.bashrc\n\
         echo \"export GRAPH_NOTEBOOK_HOST={endpoint}\" >> ~/.bashrc\n\
         echo \"export GRAPH_NOTEBOOK_PORT={port}\" >> ~/.bashrc\n\
         echo \"export GRAPH_NOTEBOOK_SSL=True\" >> ~/.bashrc\n\
         echo \"export AWS_REGION={region}\" >> ~/.bashrc\n",
        endpoint = reference(ResourceKind::GraphCluster, names::MAIN, "endpoint"),
        port = config.graph_database.port,
        region = config.region,
    )
}

pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let mut resources = Vec::new();

    if config.notebook.enabled {
        let name = format!("{}-graph-notebook", config.name_prefix());
        resources.push(Resource::new(
            names::GRAPH_NOTEBOOK,
            ResourceBody::NotebookLifecycleConfig(NotebookLifecycleConfig {
                name: name.clone(),
                on_start: on_start_script(config),
            }),
        ));
        resources.push(Resource::new(
            names::MAIN,
            ResourceBody::NotebookInstance(NotebookInstance {
                name,
                instance_type: config.notebook.instance_type.clone(),
                role_arn: reference(ResourceKind::IamRole, names::NOTEBOOK, "arn"),
                subnet_id: reference(ResourceKind::Subnet, &names::private_subnet(0), "id"),
                security_groups: vec![reference(ResourceKind::SecurityGroup, names::NOTEBOOK, "id")],
                lifecycle_config_name: reference(
                    ResourceKind::NotebookLifecycleConfig,
                    names::GRAPH_NOTEBOOK,
                    "name",
                ),
                direct_internet_access: "Disabled".to_string(),
                tags: named_tags(config, "graph-notebook"),
            }),
        ));
    }

    resources.push(Resource::new(
        names::MAIN,
        ResourceBody::BastionHost(BastionHost {
            ami: config.bastion.ami.clone(),
            instance_type: config.bastion.instance_type.clone(),
            subnet_id: reference(ResourceKind::Subnet, names::PUBLIC, "id"),
            vpc_security_group_ids: vec![reference(ResourceKind::SecurityGroup, names::BASTION, "id")],
            key_name: config.bastion.key_name.clone(),
            associate_public_ip_address: true,
            tags: named_tags(config, "bastion"),
        }),
    ));

    resources
}
