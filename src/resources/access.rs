// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Security groups and their allow rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    /// Every protocol on every port (`-1`).
    All,
}

/// The other side of an allow rule: an address range or another security group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    Cidr(String),
    SecurityGroup(Reference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    pub peer: Peer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecurityRule {
    pub fn tcp(port: u16, peer: Peer, description: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port: port,
            to_port: port,
            peer,
            description: Some(description.into()),
        }
    }

    pub fn allow_all(peer: Peer) -> Self {
        Self {
            protocol: Protocol::All,
            from_port: 0,
            to_port: 0,
            peer,
            description: None,
        }
    }

    /// Whether TCP traffic on `port` matches this rule.
    pub fn covers_tcp_port(&self, port: u16) -> bool {
        match self.protocol {
            Protocol::All => true,
            Protocol::Tcp => self.from_port <= port && port <= self.to_port,
            Protocol::Udp => false,
        }
    }

    /// Whether this rule admits all traffic to or from anywhere.
    pub fn is_open(&self) -> bool {
        self.protocol == Protocol::All
            && matches!(&self.peer, Peer::Cidr(cidr) if cidr == crate::config::consts::OPEN_CIDR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub name: String,
    pub description: String,
    pub vpc_id: Reference,
    #[serde(default)]
    pub ingress: Vec<SecurityRule>,
    #[serde(default)]
    pub egress: Vec<SecurityRule>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_protocol_rule_covers_every_port() {
        let rule = SecurityRule::allow_all(Peer::Cidr("0.0.0.0/0".to_string()));
        assert!(rule.covers_tcp_port(8182));
        assert!(rule.is_open());
    }

    #[test]
    fn tcp_rule_covers_only_its_range() {
        let rule = SecurityRule::tcp(22, Peer::Cidr("203.0.113.0/24".to_string()), "ssh");
        assert!(rule.covers_tcp_port(22));
        assert!(!rule.covers_tcp_port(8182));
        assert!(!rule.is_open());
    }
}
