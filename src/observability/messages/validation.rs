// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph validation and invariant checks.
//!
//! This module contains message types for logging events related to:
//! * Dependency graph validation (cycles, unresolved references, duplicates)
//! * Structural invariant violations
//! * Validation lifecycle

use crate::errors::InvariantViolation;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Cyclic dependency detected in the resource graph.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use corrgraph_infra::observability::messages::validation::CyclicDependencyDetected;
///
/// let cycle = vec!["function.etl".to_string(), "iam_role.compute".to_string(), "function.etl".to_string()];
/// let msg = CyclicDependencyDetected { cycle: &cycle };
///
/// assert_eq!(msg.to_string(), "Cyclic dependency detected: function.etl -> iam_role.compute -> function.etl");
/// ```
pub struct CyclicDependencyDetected<'a> {
    pub cycle: &'a [String],
}

impl Display for CyclicDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cyclic dependency detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for CyclicDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
        )
    }
}

/// A resource references an address nothing declares.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct UnresolvedReference<'a> {
    pub address: &'a str,
    pub missing: &'a str,
}

impl Display for UnresolvedReference<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resource '{}' references '{}' which is not declared",
            self.address, self.missing
        )
    }
}

impl StructuredLog for UnresolvedReference<'_> {
    fn log(&self) {
        tracing::error!(address = self.address, missing = self.missing, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            address = self.address,
            missing = self.missing,
        )
    }
}

pub struct DuplicateAddress<'a> {
    pub address: &'a str,
}

impl Display for DuplicateAddress<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Duplicate resource address: '{}'", self.address)
    }
}

impl StructuredLog for DuplicateAddress<'_> {
    fn log(&self) {
        tracing::error!(address = self.address, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            address = self.address,
        )
    }
}

/// A declared stack breaks one of its structural invariants.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct InvariantViolated<'a> {
    pub violation: &'a InvariantViolation,
}

impl Display for InvariantViolated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Invariant violated: {}", self.violation)
    }
}

impl StructuredLog for InvariantViolated<'_> {
    fn log(&self) {
        tracing::error!(violation = %self.violation, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            violation = %self.violation,
        )
    }
}

/// Stack validation started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ValidationStarted {
    pub resource_count: usize,
}

impl Display for ValidationStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting validation for {} resources",
            self.resource_count
        )
    }
}

impl StructuredLog for ValidationStarted {
    fn log(&self) {
        tracing::info!(resource_count = self.resource_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            resource_count = self.resource_count,
        )
    }
}

pub struct ValidationCompleted {
    pub resource_count: usize,
    pub level_count: usize,
}

impl Display for ValidationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validation completed successfully for {} resources in {} levels",
            self.resource_count, self.level_count
        )
    }
}

impl StructuredLog for ValidationCompleted {
    fn log(&self) {
        tracing::info!(
            resource_count = self.resource_count,
            level_count = self.level_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            resource_count = self.resource_count,
            level_count = self.level_count,
        )
    }
}

pub struct ValidationFailed {
    pub error_count: usize,
}

impl Display for ValidationFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Validation failed with {} errors", self.error_count)
    }
}

impl StructuredLog for ValidationFailed {
    fn log(&self) {
        tracing::error!(error_count = self.error_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            error_count = self.error_count,
        )
    }
}
