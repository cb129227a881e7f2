// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::ProviderError;
use crate::resources::{ResourceAddress, ResourceKind};

/// Attributes a resource exports once it exists (`id`, `arn`, `endpoint`, ...).
pub type Outputs = BTreeMap<String, String>;

/// The seam between the engine and whatever creates real infrastructure.
///
/// Documents handed to a provider are fully resolved: every `${...}`
/// placeholder has been replaced with a concrete value from earlier outputs.
/// `dependencies` names the resources those values came from.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn create(
        &self,
        address: &ResourceAddress,
        document: &Value,
        dependencies: &[ResourceAddress],
    ) -> Result<Outputs, ProviderError>;

    /// Apply an in-place change. `current` holds the outputs recorded at creation.
    async fn update(
        &self,
        address: &ResourceAddress,
        document: &Value,
        dependencies: &[ResourceAddress],
        current: &Outputs,
    ) -> Result<Outputs, ProviderError>;

    /// Fails while another resource still depends on `address`.

    async fn delete(
        &self,
        address: &ResourceAddress,
        kind: ResourceKind,
        current: &Outputs,
    ) -> Result<(), ProviderError>;

    fn name(&self) -> &'static str;
}
