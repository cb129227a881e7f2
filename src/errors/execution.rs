// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ProviderError;

/// How the applier reacts when a resource change fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Let the in-flight level finish, record its successes, then stop.
    #[default]
    FailFast,
    /// Skip everything that depends on a failed resource and keep going.
    ContinueOnError,
    /// Attempt every change. Dependents of a failure fail at reference resolution.
    BestEffort,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("cannot resolve '{reference}' for {address}: {reason}")]
    UnresolvedReference {
        address: String,
        reference: String,
        reason: String,
    },

    #[error("{action} of {address} failed: {source}")]
    ResourceFailed {
        address: String,
        action: String,
        #[source]
        source: ProviderError,
    },

    #[error("task for {address} did not complete: {message}")]
    TaskFailed { address: String, message: String },

    #[error("internal error: {message}")]
    InternalError { message: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
