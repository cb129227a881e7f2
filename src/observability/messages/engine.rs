// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for planning and apply events.
//!
//! This module contains message types for logging events related to:
//! * Plan computation and its summary
//! * Apply lifecycle (start, completion)
//! * Per-resource change lifecycle (started, completed, failed, skipped)
//! * Topological level computation

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A plan was computed against recorded state.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use corrgraph_infra::observability::messages::engine::PlanComputed;
///
/// let msg = PlanComputed {
///     creates: 3,
///     updates: 1,
///     replaces: 0,
///     deletes: 0,
///     unchanged: 40,
/// };
///
/// assert_eq!(msg.to_string(), "Plan: 3 to add, 1 to change, 0 to replace, 0 to destroy, 40 unchanged");
/// ```
pub struct PlanComputed {
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
    pub unchanged: usize,
}

impl Display for PlanComputed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to add, {} to change, {} to replace, {} to destroy, {} unchanged",
            self.creates, self.updates, self.replaces, self.deletes, self.unchanged
        )
    }
}

impl StructuredLog for PlanComputed {
    fn log(&self) {
        tracing::info!(
            creates = self.creates,
            updates = self.updates,
            replaces = self.replaces,
            deletes = self.deletes,
            unchanged = self.unchanged,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "plan",
            span_name = name,
            creates = self.creates,
            updates = self.updates,
            replaces = self.replaces,
            deletes = self.deletes,
        )
    }
}

/// Apply started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ApplyStarted {
    pub change_count: usize,
    pub level_count: usize,
    pub max_concurrency: usize,
}

impl Display for ApplyStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Applying {} changes across {} levels, max_concurrency={}",
            self.change_count, self.level_count, self.max_concurrency
        )
    }
}

impl StructuredLog for ApplyStarted {
    fn log(&self) {
        tracing::info!(
            change_count = self.change_count,
            level_count = self.level_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "apply",
            span_name = name,
            change_count = self.change_count,
            level_count = self.level_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Apply finished, successfully or not.
///
/// # Log Level
/// `info!` when nothing failed, `warn!` otherwise
pub struct ApplyCompleted {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: std::time::Duration,
}

impl Display for ApplyCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Apply complete: {} applied, {} failed, {} skipped in {:?}",
            self.applied, self.failed, self.skipped, self.duration
        )
    }
}

impl StructuredLog for ApplyCompleted {
    fn log(&self) {
        if self.failed == 0 {
            tracing::info!(
                applied = self.applied,
                failed = self.failed,
                skipped = self.skipped,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::warn!(
                applied = self.applied,
                failed = self.failed,
                skipped = self.skipped,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "apply_completed",
            span_name = name,
            applied = self.applied,
            failed = self.failed,
            skipped = self.skipped,
            duration = ?self.duration,
        )
    }
}

/// A resource change is about to be sent to the provider.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ChangeStarted<'a> {
    pub address: &'a str,
    pub action: &'a str,
    pub level: usize,
}

impl Display for ChangeStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: {} started (level {})", self.address, self.action, self.level)
    }
}

impl StructuredLog for ChangeStarted<'_> {
    fn log(&self) {
        tracing::info!(
            address = self.address,
            action = self.action,
            level = self.level,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "resource_change",
            span_name = name,
            address = self.address,
            action = self.action,
            level = self.level,
        )
    }
}

/// A resource change finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ChangeCompleted<'a> {
    pub address: &'a str,
    pub action: &'a str,
    pub duration: std::time::Duration,
}

impl Display for ChangeCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: {} complete after {:?}",
            self.address, self.action, self.duration
        )
    }
}

impl StructuredLog for ChangeCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            address = self.address,
            action = self.action,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "resource_change_completed",
            span_name = name,
            address = self.address,
            action = self.action,
            duration = ?self.duration,
        )
    }
}

/// A resource change failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ChangeFailed<'a> {
    pub address: &'a str,
    pub action: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ChangeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: {} failed: {}", self.address, self.action, self.error)
    }
}

impl StructuredLog for ChangeFailed<'_> {
    fn log(&self) {
        tracing::error!(
            address = self.address,
            action = self.action,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "resource_change_failed",
            span_name = name,
            address = self.address,
            action = self.action,
            error = %self.error,
        )
    }
}

/// A resource change was not attempted because something it depends on failed.
///
/// # Log Level
/// `warn!` - Degraded outcome
pub struct ChangeSkipped<'a> {
    pub address: &'a str,
    pub failed_dependency: &'a str,
}

impl Display for ChangeSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: skipped because {} failed",
            self.address, self.failed_dependency
        )
    }
}

impl StructuredLog for ChangeSkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            address = self.address,
            failed_dependency = self.failed_dependency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "resource_change_skipped",
            span_name = name,
            address = self.address,
            failed_dependency = self.failed_dependency,
        )
    }
}

/// Topological levels computed for a resource graph.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct LevelComputationCompleted {
    pub level_count: usize,
    pub resource_count: usize,
}

impl Display for LevelComputationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Computed {} topological levels for {} resources",
            self.level_count, self.resource_count
        )
    }
}

impl StructuredLog for LevelComputationCompleted {
    fn log(&self) {
        tracing::debug!(
            level_count = self.level_count,
            resource_count = self.resource_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "level_computation",
            span_name = name,
            level_count = self.level_count,
            resource_count = self.resource_count,
        )
    }
}
