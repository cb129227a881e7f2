// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::errors::StateError;
use crate::observability::messages::state::{LockAcquired, LockContended, LockReleased};
use crate::observability::messages::StructuredLog;

/// The record stored while a lock is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    pub lock_key: String,
    pub operation: String,
    pub who: String,
    pub created: DateTime<Utc>,
}

impl LockInfo {
    fn new(lock_key: &str, operation: &str) -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            id: Uuid::new_v4().to_string(),
            lock_key: lock_key.to_string(),
            operation: operation.to_string(),
            who: format!("{}@pid{}", user, std::process::id()),
            created: Utc::now(),
        }
    }

    /// Stand-in for a record that exists but cannot be parsed.
    fn unreadable(lock_key: &str) -> Self {
        Self {
            id: UNREADABLE_ID.to_string(),
            lock_key: lock_key.to_string(),
            operation: "unknown".to_string(),
            who: "unknown".to_string(),
            created: Utc::now(),
        }
    }
}

/// Id reported for a lock record that cannot be parsed.
pub const UNREADABLE_ID: &str = "<unreadable>";

enum Record {
    Held(LockInfo),
    Unreadable,
}

/// A lock record in the lock table, emulated as one file per lock key.
///
/// A record is written in full to a temporary file, then moved into place
/// without overwriting, so two processes sharing a state directory cannot both
/// hold the lock and nobody observes a half-written record.
#[derive(Debug, Clone)]
pub struct StateLock {
    path: PathBuf,
    lock_key: String,
}

impl StateLock {
    pub fn new(table_dir: impl AsRef<Path>, lock_key: impl Into<String>) -> Self {
        let lock_key = lock_key.into();
        let file_name = format!("{}.lock", lock_key.replace('/', "__"));
        Self {
            path: table_dir.as_ref().join(file_name),
            lock_key,
        }
    }

    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    pub fn acquire(&self, operation: &str) -> Result<LockGuard, StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let info = LockInfo::new(&self.lock_key, operation);
        // The record is complete before it appears under the lock path.
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(serde_json::to_string_pretty(&info)?.as_bytes())?;
        staged.as_file().sync_all()?;

        if let Err(e) = staged.persist_noclobber(&self.path) {
            if e.error.kind() != ErrorKind::AlreadyExists {
                return Err(e.error.into());
            }
            let holder = self.holder()?.ok_or_else(|| StateError::NotLocked {
                key: self.lock_key.clone(),
            })?;
            LockContended {
                lock_id: &self.lock_key,
                holder: &holder.who,
                holder_operation: &holder.operation,
            }
            .log();
            return Err(StateError::Locked {
                holder: Box::new(holder),
            });
        }

        LockAcquired {
            lock_id: &self.lock_key,
            id: &info.id,
            operation: &info.operation,
        }
        .log();

        Ok(LockGuard {
            lock: self.clone(),
            info,
            released: false,
        })
    }

    fn record(&self) -> Result<Option<Record>, StateError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(
                serde_json::from_str(&text).map_or(Record::Unreadable, Record::Held),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The current holder, if any. An unparseable record still counts as held,
    /// reported with id [`UNREADABLE_ID`].
    pub fn holder(&self) -> Result<Option<LockInfo>, StateError> {
        Ok(self.record()?.map(|record| match record {
            Record::Held(info) => info,
            Record::Unreadable => LockInfo::unreadable(&self.lock_key),
        }))
    }

    /// Remove a lock left behind by a crashed run. The id must match the
    /// holder's; an unreadable record is removed whatever id is given.
    pub fn force_unlock(&self, id: &str) -> Result<LockInfo, StateError> {
        let holder = match self.record()? {
            None => {
                return Err(StateError::NotLocked {
                    key: self.lock_key.clone(),
                })
            }
            Some(Record::Unreadable) => LockInfo::unreadable(&self.lock_key),
            Some(Record::Held(holder)) if holder.id != id => {
                return Err(StateError::LockMismatch {
                    held: holder.id,
                    requested: id.to_string(),
                })
            }
            Some(Record::Held(holder)) => holder,
        };
        fs::remove_file(&self.path)?;
        LockReleased {
            lock_id: &self.lock_key,
            id,
            forced: true,
        }
        .log();
        Ok(holder)
    }

    fn release_if_held_by(&self, id: &str) -> Result<(), StateError> {
        match self.holder()? {
            Some(holder) if holder.id == id => {
                fs::remove_file(&self.path)?;
                LockReleased {
                    lock_id: &self.lock_key,
                    id,
                    forced: false,
                }
                .log();
                Ok(())
            }
            Some(holder) => Err(StateError::LockMismatch {
                held: holder.id,
                requested: id.to_string(),
            }),
            None => Err(StateError::NotLocked {
                key: self.lock_key.clone(),
            }),
        }
    }
}

/// Holds the lock until released or dropped.
#[derive(Debug)]
pub struct LockGuard {
    lock: StateLock,
    info: LockInfo,
    released: bool,
}

impl LockGuard {
    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn release(mut self) -> Result<(), StateError> {
        self.released = true;
        self.lock.release_if_held_by(&self.info.id)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.lock.release_if_held_by(&self.info.id) {
                tracing::warn!(lock_id = %self.lock.lock_key, error = %e, "failed to release state lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "corrgraph-tfstate/infra/terraform.tfstate";

    #[test]
    fn second_acquire_reports_holder() {
        let dir = TempDir::new().unwrap();
        let lock = StateLock::new(dir.path(), KEY);
        let guard = lock.acquire("apply").unwrap();

        match lock.acquire("plan") {
            Err(StateError::Locked { holder }) => {
                assert_eq!(holder.id, guard.info().id);
                assert_eq!(holder.operation, "apply");
                assert_eq!(holder.lock_key, KEY);
            }
            other => panic!("expected Locked, got {:?}", other),
        }
    }

    #[test]
    fn dropping_guard_releases_lock() {
        let dir = TempDir::new().unwrap();
        let lock = StateLock::new(dir.path(), KEY);
        {
            let _guard = lock.acquire("apply").unwrap();
            assert!(lock.holder().unwrap().is_some());
        }
        assert!(lock.holder().unwrap().is_none());
        lock.acquire("destroy").unwrap().release().unwrap();
    }

    #[test]
    fn force_unlock_requires_matching_id() {
        let dir = TempDir::new().unwrap();
        let lock = StateLock::new(dir.path(), KEY);
        let guard = lock.acquire("apply").unwrap();
        let id = guard.info().id.clone();
        std::mem::forget(guard);

        assert!(matches!(
            lock.force_unlock("not-the-id"),
            Err(StateError::LockMismatch { .. })
        ));
        let removed = lock.force_unlock(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(lock.holder().unwrap().is_none());
        assert!(matches!(lock.force_unlock(&id), Err(StateError::NotLocked { .. })));
    }

    #[test]
    fn unreadable_record_blocks_until_force_unlocked() {
        let dir = TempDir::new().unwrap();
        let lock = StateLock::new(dir.path(), KEY);
        fs::write(dir.path().join("corrgraph-tfstate__infra__terraform.tfstate.lock"), "").unwrap();

        match lock.acquire("plan") {
            Err(StateError::Locked { holder }) => assert_eq!(holder.id, UNREADABLE_ID),
            other => panic!("expected Locked, got {:?}", other),
        }
        assert_eq!(lock.holder().unwrap().unwrap().id, UNREADABLE_ID);

        let removed = lock.force_unlock("whatever-id").unwrap();
        assert_eq!(removed.id, UNREADABLE_ID);
        lock.acquire("plan").unwrap().release().unwrap();
    }

    #[test]
    fn contended_acquire_leaves_no_stray_files() {
        let dir = TempDir::new().unwrap();
        let lock = StateLock::new(dir.path(), KEY);
        let _guard = lock.acquire("apply").unwrap();
        assert!(lock.acquire("plan").is_err());

        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
