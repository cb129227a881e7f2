// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for structured logging, one module per subsystem.
//!
//! ```rust
//! use corrgraph_infra::observability::messages::engine::ApplyStarted;
//!
//! let msg = ApplyStarted {
//!     change_count: 12,
//!     level_count: 5,
//!     max_concurrency: 4,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

pub mod engine;
pub mod schedule;
pub mod state;
pub mod validation;

use tracing::Span;

/// Emit a message as a structured event, or open a span carrying its fields.
///
/// `log` chooses the level appropriate to the message. `span` lets callers
/// scope nested work under the same fields.
pub trait StructuredLog: std::fmt::Display {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
