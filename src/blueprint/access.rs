// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{named_tags, names, reference};
use crate::config::consts::{MANAGEMENT_PORT, OPEN_CIDR};
use crate::config::StackConfig;
use crate::resources::{Peer, Resource, ResourceBody, ResourceKind, SecurityGroup, SecurityRule};

fn group(
    config: &StackConfig,
    name: &str,
    description: &str,
    ingress: Vec<SecurityRule>,
) -> Resource {
    let suffix = format!("{}-sg", name.replace('_', "-"));
    Resource::new(
        name,
        ResourceBody::SecurityGroup(SecurityGroup {
            name: format!("{}-{}", config.name_prefix(), suffix),
            description: description.to_string(),
            vpc_id: reference(ResourceKind::Vpc, names::MAIN, "id"),
            ingress,
            egress: vec![SecurityRule::allow_all(Peer::Cidr(OPEN_CIDR.to_string()))],
            tags: named_tags(config, &suffix),
        }),
    )
}

fn peer(name: &str) -> Peer {
    Peer::SecurityGroup(reference(ResourceKind::SecurityGroup, name, "id"))
}

pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let port = config.graph_database.port;

    let mut peers = vec![
        (names::COMPUTE, "ETL and pipeline functions"),
        (names::BASTION, "Bastion host"),
    ];
    if config.notebook.enabled {
        peers.push((names::NOTEBOOK, "Graph notebook"));
    }

    let graph_ingress = peers
        .iter()
        .map(|(name, description)| SecurityRule::tcp(port, peer(name), *description))
        .collect();

    let mut resources = vec![
        group(config, names::COMPUTE, "Pipeline functions", Vec::new()),
        group(
            config,
            names::BASTION,
            "Operator access to the bastion host",
            vec![SecurityRule::tcp(
                MANAGEMENT_PORT,
                Peer::Cidr(config.bastion.management_cidr.clone()),
                "Operator SSH",
            )],
        ),
        group(
            config,
            names::GRAPH_DB,
            "Graph database, reachable from listed peers only",
            graph_ingress,
        ),
    ];
    if config.notebook.enabled {
        resources.push(group(config, names::NOTEBOOK, "Graph notebook", Vec::new()));
    }
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::minimal_config;

    fn graph_group(resources: &[Resource]) -> &SecurityGroup {
        resources
            .iter()
            .find_map(|r| match &r.body {
                ResourceBody::SecurityGroup(sg) if r.address.name == names::GRAPH_DB => Some(sg),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn graph_port_admits_only_peer_groups() {
        let resources = declare(&minimal_config());
        let sg = graph_group(&resources);
        assert_eq!(sg.ingress.len(), 3);
        for rule in &sg.ingress {
            assert!(rule.covers_tcp_port(8182));
            assert!(matches!(rule.peer, Peer::SecurityGroup(_)));
        }
    }

    #[test]
    fn notebook_peer_follows_notebook_toggle() {
        let mut config = minimal_config();
        config.notebook.enabled = false;
        let resources = declare(&config);
        assert_eq!(graph_group(&resources).ingress.len(), 2);
        assert!(resources.iter().all(|r| r.address.name != names::NOTEBOOK));
    }

    #[test]
    fn bastion_admits_management_port_from_operator_range() {
        let resources = declare(&minimal_config());
        let bastion = resources
            .iter()
            .find_map(|r| match &r.body {
                ResourceBody::SecurityGroup(sg) if r.address.name == names::BASTION => Some(sg),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            bastion.ingress,
            vec![SecurityRule::tcp(
                22,
                Peer::Cidr("203.0.113.0/24".to_string()),
                "Operator SSH"
            )]
        );
    }
}
