// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recorded state: what was applied, with the outputs each resource exported.
//!
//! [`LocalBackend`] keeps the document under a state directory laid out like
//! the versioned bucket it stands in for, and serializes access with a
//! [`StateLock`] keyed by `<bucket>/<key>`.

mod document;
mod local;
mod lock;

pub use document::{ResourceState, StateDocument, FORMAT_VERSION};
pub use local::LocalBackend;
pub use lock::{LockGuard, LockInfo, StateLock, UNREADABLE_ID};
