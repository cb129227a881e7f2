// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the lock record and state persistence.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Lock record acquired for an operation.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use corrgraph_infra::observability::messages::state::LockAcquired;
///
/// let msg = LockAcquired {
///     lock_id: "corrgraph-tfstate/infra/terraform.tfstate",
///     id: "6f1c4a52-0000-4000-8000-000000000000",
///     operation: "apply",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct LockAcquired<'a> {
    pub lock_id: &'a str,
    pub id: &'a str,
    pub operation: &'a str,
}

impl Display for LockAcquired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Acquired state lock {} for {} (id {})",
            self.lock_id, self.operation, self.id
        )
    }
}

impl StructuredLog for LockAcquired<'_> {
    fn log(&self) {
        tracing::info!(
            lock_id = self.lock_id,
            id = self.id,
            operation = self.operation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "state_lock",
            span_name = name,
            lock_id = self.lock_id,
            id = self.id,
            operation = self.operation,
        )
    }
}

/// Another run holds the lock.
///
/// # Log Level
/// `warn!` - The run will not proceed
pub struct LockContended<'a> {
    pub lock_id: &'a str,
    pub holder: &'a str,
    pub holder_operation: &'a str,
}

impl Display for LockContended<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "State lock {} is held by {} ({})",
            self.lock_id, self.holder, self.holder_operation
        )
    }
}

impl StructuredLog for LockContended<'_> {
    fn log(&self) {
        tracing::warn!(
            lock_id = self.lock_id,
            holder = self.holder,
            holder_operation = self.holder_operation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "state_lock_contended",
            span_name = name,
            lock_id = self.lock_id,
            holder = self.holder,
        )
    }
}

pub struct LockReleased<'a> {
    pub lock_id: &'a str,
    pub id: &'a str,
    pub forced: bool,
}

impl Display for LockReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.forced {
            write!(f, "Force-released state lock {} (id {})", self.lock_id, self.id)
        } else {
            write!(f, "Released state lock {} (id {})", self.lock_id, self.id)
        }
    }
}

impl StructuredLog for LockReleased<'_> {
    fn log(&self) {
        if self.forced {
            tracing::warn!(lock_id = self.lock_id, id = self.id, forced = true, "{}", self);
        } else {
            tracing::info!(lock_id = self.lock_id, id = self.id, forced = false, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "state_unlock",
            span_name = name,
            lock_id = self.lock_id,
            id = self.id,
            forced = self.forced,
        )
    }
}

/// State document persisted.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StateWritten<'a> {
    pub location: &'a str,
    pub serial: u64,
    pub resource_count: usize,
}

impl Display for StateWritten<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wrote state serial {} with {} resources to {}",
            self.serial, self.resource_count, self.location
        )
    }
}

impl StructuredLog for StateWritten<'_> {
    fn log(&self) {
        tracing::info!(
            location = self.location,
            serial = self.serial,
            resource_count = self.resource_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "state_write",
            span_name = name,
            location = self.location,
            serial = self.serial,
        )
    }
}
