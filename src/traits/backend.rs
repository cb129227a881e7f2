// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::StateError;
use crate::state::{LockGuard, LockInfo, StateDocument};

/// Where recorded state lives, and how access to it is serialized.
pub trait StateBackend: Send + Sync {
    /// Human-readable location of the current document.
    fn location(&self) -> String;

    /// The current document, or an empty one when nothing has been written.
    fn read(&self) -> Result<StateDocument, StateError>;

    /// Persist `document`, bumping its serial. Fails if the stored serial is newer.
    fn write(&self, document: &mut StateDocument) -> Result<(), StateError>;

    /// Serials of every preserved previous document, oldest first.
    fn versions(&self) -> Result<Vec<u64>, StateError>;

    fn lock(&self, operation: &str) -> Result<LockGuard, StateError>;

    fn force_unlock(&self, id: &str) -> Result<LockInfo, StateError>;
}
