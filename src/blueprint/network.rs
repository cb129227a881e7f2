// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One public subnet routed to the internet gateway, one private subnet per
//! zone routed through the NAT gateway.

use super::{address, named_tags, names, reference};
use crate::config::consts::OPEN_CIDR;
use crate::config::StackConfig;
use crate::resources::{
    ElasticIp, InternetGateway, NatGateway, Resource, ResourceBody, ResourceKind, Route,
    RouteTable, RouteTableAssociation, RouteTarget, Subnet, SubnetTier, Vpc,
};

pub(super) fn declare(config: &StackConfig) -> Vec<Resource> {
    let network = &config.network;
    let vpc_id = reference(ResourceKind::Vpc, names::MAIN, "id");
    let igw = address(ResourceKind::InternetGateway, names::MAIN);

    let mut resources = vec![
        Resource::new(
            names::MAIN,
            ResourceBody::Vpc(Vpc {
                cidr_block: network.cidr_block.clone(),
                enable_dns_support: true,
                enable_dns_hostnames: true,
                tags: named_tags(config, "vpc"),
            }),
        ),
        Resource::new(
            names::MAIN,
            ResourceBody::InternetGateway(InternetGateway {
                vpc_id: vpc_id.clone(),
                tags: named_tags(config, "igw"),
            }),
        ),
        Resource::new(
            names::PUBLIC,
            ResourceBody::Subnet(Subnet {
                vpc_id: vpc_id.clone(),
                cidr_block: network.public_subnet_cidr.clone(),
                availability_zone: network.availability_zones.first().cloned().unwrap_or_default(),
                map_public_ip_on_launch: true,
                tier: SubnetTier::Public,
                tags: named_tags(config, "public"),
            }),
        ),
    ];

    let private_names: Vec<String> = (0..network.private_subnet_cidrs.len())
        .map(names::private_subnet)
        .collect();

    for (index, cidr) in network.private_subnet_cidrs.iter().enumerate() {
        let zone = if network.availability_zones.is_empty() {
            String::new()
        } else {
            network.availability_zones[index % network.availability_zones.len()].clone()
        };
        resources.push(Resource::new(
            private_names[index].clone(),
            ResourceBody::Subnet(Subnet {
                vpc_id: vpc_id.clone(),
                cidr_block: cidr.clone(),
                availability_zone: zone,
                map_public_ip_on_launch: false,
                tier: SubnetTier::Private,
                tags: named_tags(config, &private_names[index].replace('_', "-")),
            }),
        ));
    }

    // The gateway must be attached before an address or NAT can use it.
    resources.push(
        Resource::new(
            names::NAT,
            ResourceBody::ElasticIp(ElasticIp {
                domain: "vpc".to_string(),
                tags: named_tags(config, "nat-eip"),
            }),
        )
        .with_depends_on(igw.clone()),
    );
    resources.push(
        Resource::new(
            names::MAIN,
            ResourceBody::NatGateway(NatGateway {
                allocation_id: reference(ResourceKind::ElasticIp, names::NAT, "id"),
                subnet_id: reference(ResourceKind::Subnet, names::PUBLIC, "id"),
                tags: named_tags(config, "nat"),
            }),
        )
        .with_depends_on(igw),
    );

    resources.push(Resource::new(
        names::PUBLIC,
        ResourceBody::RouteTable(RouteTable {
            vpc_id: vpc_id.clone(),
            routes: vec![Route {
                destination_cidr_block: OPEN_CIDR.to_string(),
                target: RouteTarget::GatewayId(reference(
                    ResourceKind::InternetGateway,
                    names::MAIN,
                    "id",
                )),
            }],
            tags: named_tags(config, "public-rt"),
        }),
    ));
    resources.push(Resource::new(
        names::PRIVATE,
        ResourceBody::RouteTable(RouteTable {
            vpc_id,
            routes: vec![Route {
                destination_cidr_block: OPEN_CIDR.to_string(),
                target: RouteTarget::NatGatewayId(reference(
                    ResourceKind::NatGateway,
                    names::MAIN,
                    "id",
                )),
            }],
            tags: named_tags(config, "private-rt"),
        }),
    ));

    resources.push(association(names::PUBLIC, names::PUBLIC));
    for name in &private_names {
        resources.push(association(name, names::PRIVATE));
    }

    resources
}

fn association(subnet: &str, route_table: &str) -> Resource {
    Resource::new(
        subnet,
        ResourceBody::RouteTableAssociation(RouteTableAssociation {
            subnet_id: reference(ResourceKind::Subnet, subnet, "id"),
            route_table_id: reference(ResourceKind::RouteTable, route_table, "id"),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::minimal_config;

    #[test]
    fn private_subnets_span_configured_zones() {
        let resources = declare(&minimal_config());
        let zones: Vec<(String, String)> = resources
            .iter()
            .filter_map(|r| match &r.body {
                ResourceBody::Subnet(subnet) if subnet.tier == SubnetTier::Private => {
                    Some((r.address.name.clone(), subnet.availability_zone.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            zones,
            vec![
                ("private_a".to_string(), "eu-west-1a".to_string()),
                ("private_b".to_string(), "eu-west-1b".to_string()),
            ]
        );
    }

    #[test]
    fn private_route_table_egresses_through_nat() {
        let resources = declare(&minimal_config());
        let private = resources
            .iter()
            .find(|r| r.address == address(ResourceKind::RouteTable, names::PRIVATE))
            .unwrap();
        match &private.body {
            ResourceBody::RouteTable(table) => {
                assert_eq!(table.routes.len(), 1);
                assert!(matches!(table.routes[0].target, RouteTarget::NatGatewayId(_)));
            }
            other => panic!("expected route table, got {:?}", other),
        }
    }

    #[test]
    fn every_subnet_gets_one_association() {
        let resources = declare(&minimal_config());
        let subnets = resources
            .iter()
            .filter(|r| r.kind() == ResourceKind::Subnet)
            .count();
        let associations = resources
            .iter()
            .filter(|r| r.kind() == ResourceKind::RouteTableAssociation)
            .count();
        assert_eq!(subnets, 3);
        assert_eq!(associations, subnets);
    }

    #[test]
    fn nat_waits_for_internet_gateway() {
        let resources = declare(&minimal_config());
        let nat = resources
            .iter()
            .find(|r| r.kind() == ResourceKind::NatGateway)
            .unwrap();
        assert_eq!(
            nat.depends_on,
            vec![address(ResourceKind::InternetGateway, names::MAIN)]
        );
    }
}
