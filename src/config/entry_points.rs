// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::resources::ResourceAddress;

/// Resources with no dependencies; the first level of any apply.
///
/// ```
/// use corrgraph_infra::config::EntryPoints;
/// use corrgraph_infra::resources::{ResourceAddress, ResourceKind};
///
/// let mut entry_points = EntryPoints::new();
/// entry_points.add(ResourceAddress::new(ResourceKind::Vpc, "main"));
/// entry_points.add(ResourceAddress::new(ResourceKind::Bucket, "raw"));
///
/// let addresses: Vec<String> = entry_points.iter().map(|a| a.to_string()).collect();
/// assert_eq!(addresses, vec!["vpc.main", "bucket.raw"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPoints(pub Vec<ResourceAddress>);

impl EntryPoints {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, address: ResourceAddress) {
        self.0.push(address);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceAddress> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ResourceAddress>> for EntryPoints {
    fn from(entry_points: Vec<ResourceAddress>) -> Self {
        Self(entry_points)
    }
}

impl From<EntryPoints> for Vec<ResourceAddress> {
    fn from(value: EntryPoints) -> Self {
        value.0
    }
}
