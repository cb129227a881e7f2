// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failures reported by a provider for a single resource operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The managed service refused the request (quota, capacity or a service rule).
    #[error("{service} rejected {address}: {reason}")]
    Rejected {
        address: String,
        service: String,
        reason: String,
    },

    #[error("{address} conflicts with an existing resource: {reason}")]
    Conflict { address: String, reason: String },

    #[error("{address} not found")]
    NotFound { address: String },

    #[error("malformed document for {address}: {reason}")]
    MalformedDocument { address: String, reason: String },
}
