// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

/// Errors that can occur during configuration and dependency graph validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A circular reference was detected between declared resources
    CyclicDependency {
        /// The cycle path showing the circular dependency
        cycle: Vec<String>,
    },
    /// A resource references an address that is not declared
    UnresolvedReference {
        /// The resource holding the reference
        address: String,
        /// The address that couldn't be resolved
        missing: String,
    },
    /// Two resources share the same address
    DuplicateAddress {
        /// The duplicate address
        address: String,
    },
    /// A configuration field holds a value the stack cannot be built from
    InvalidField {
        /// Dotted path of the offending field, e.g. `network.availability_zones`
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ValidationError::UnresolvedReference { address, missing } => {
                write!(
                    f,
                    "Resource '{}' references '{}' which is not declared",
                    address, missing
                )
            }
            ValidationError::DuplicateAddress { address } => {
                write!(f, "Duplicate resource address: '{}'", address)
            }
            ValidationError::InvalidField { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a stack configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported configuration format '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
