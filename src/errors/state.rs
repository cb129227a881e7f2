// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::state::LockInfo;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed state document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "state is locked by {} (lock id {}, operation '{}', since {})",
        .holder.who, .holder.id, .holder.operation, .holder.created
    )]
    Locked { holder: Box<LockInfo> },

    #[error("lock id mismatch: lock is held by {held}, not {requested}")]
    LockMismatch { held: String, requested: String },

    #[error("no lock is held for {key}")]
    NotLocked { key: String },

    #[error("stale state: stored serial {stored} is newer than serial {attempted}")]
    SerialConflict { stored: u64, attempted: u64 },

    #[error("unsupported state format version {0}")]
    UnsupportedVersion(u32),
}
