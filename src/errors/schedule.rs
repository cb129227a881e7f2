// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::schedule::InvocationState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("invalid rate expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("invalid transition from {from:?} on '{event}'")]
    InvalidTransition {
        from: InvocationState,
        event: &'static str,
    },

    #[error("invocation of {function} by {rule} denied: {reason}")]
    PermissionDenied {
        rule: String,
        function: String,
        reason: String,
    },

    #[error("schedule rule '{0}' is not declared")]
    UnknownRule(String),
}
