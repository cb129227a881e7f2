// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod catalog;
mod config;
mod execution;
mod invariant;
mod provider;
mod schedule;
mod state;

pub use catalog::SchemaError;
pub use config::{ConfigError, ValidationError};
pub use execution::{ExecutionError, FailureStrategy};
pub use invariant::InvariantViolation;
pub use provider::ProviderError;
pub use schedule::ScheduleError;
pub use state::StateError;
