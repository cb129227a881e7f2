// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for provisioning runs.
//!
//! Every diagnostic or operational event is a message struct with a `Display`
//! implementation and a [`messages::StructuredLog`] implementation that emits
//! it through `tracing` with typed fields. Call sites never format log strings
//! themselves.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - planning and apply lifecycle, per-resource changes
//! * `messages::schedule` - timer ticks through the invocation state machine
//! * `messages::state` - lock record and state document persistence
//! * `messages::validation` - graph validation and invariant checks
//!
//! # Usage
//!
//! ```rust
//! use corrgraph_infra::observability::messages::StructuredLog;
//! use corrgraph_infra::observability::messages::engine::ChangeFailed;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "capacity");
//! let msg = ChangeFailed {
//!     address: "graph_instance.primary",
//!     action: "create",
//!     error: &error,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
