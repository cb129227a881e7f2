// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::{LockGuard, LockInfo, StateDocument, StateLock};
use crate::config::BackendConfig;
use crate::errors::StateError;
use crate::observability::messages::state::StateWritten;
use crate::observability::messages::StructuredLog;
use crate::traits::StateBackend;

/// The configured remote backend, emulated on the local filesystem.
///
/// ```text
/// <root>/<bucket>/<key>                       current document
/// <root>/<bucket>/<key>.versions/<serial>.json  previous documents
/// <root>/<lock_table>/<bucket>__<key>.lock     lock record
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    config: BackendConfig,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>, config: &BackendConfig) -> Self {
        Self {
            root: root.into(),
            config: config.clone(),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(&self.config.bucket).join(&self.config.key)
    }

    pub fn versions_dir(&self) -> PathBuf {
        let mut dir = self.state_path().into_os_string();
        dir.push(".versions");
        PathBuf::from(dir)
    }

    pub fn state_lock(&self) -> StateLock {
        StateLock::new(self.root.join(&self.config.lock_table), self.config.lock_id())
    }

    /// A preserved previous document.
    pub fn read_version(&self, serial: u64) -> Result<StateDocument, StateError> {
        let text = fs::read_to_string(self.versions_dir().join(format!("{}.json", serial)))?;
        StateDocument::from_json(&text)
    }

    fn read_current(&self) -> Result<Option<StateDocument>, StateError> {
        match fs::read_to_string(self.state_path()) {
            Ok(text) => Ok(Some(StateDocument::from_json(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StateError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl StateBackend for LocalBackend {
    fn location(&self) -> String {
        format!("{} ({})", self.config.lock_id(), self.state_path().display())
    }

    fn read(&self) -> Result<StateDocument, StateError> {
        Ok(self
            .read_current()?
            .unwrap_or_else(|| StateDocument::new(self.config.lock_id())))
    }

    fn write(&self, document: &mut StateDocument) -> Result<(), StateError> {
        if let Some(stored) = self.read_current()? {
            if stored.serial > document.serial {
                return Err(StateError::SerialConflict {
                    stored: stored.serial,
                    attempted: document.serial,
                });
            }
            atomic_write(
                &self.versions_dir().join(format!("{}.json", stored.serial)),
                stored.to_json()?.as_bytes(),
            )?;
        }

        let path = self.state_path();
        document.commit_next(|json| atomic_write(&path, json.as_bytes()))?;

        StateWritten {
            location: &self.location(),
            serial: document.serial,
            resource_count: document.len(),
        }
        .log();
        Ok(())
    }

    fn versions(&self) -> Result<Vec<u64>, StateError> {
        let entries = match fs::read_dir(self.versions_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut serials = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(serial) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok())
            {
                serials.push(serial);
            }
        }
        serials.sort_unstable();
        Ok(serials)
    }

    fn lock(&self, operation: &str) -> Result<LockGuard, StateError> {
        self.state_lock().acquire(operation)
    }

    fn force_unlock(&self, id: &str) -> Result<LockInfo, StateError> {
        self.state_lock().force_unlock(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ResourceAddress, ResourceKind};
    use crate::state::ResourceState;
    use serde_json::json;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> LocalBackend {
        LocalBackend::new(
            dir.path(),
            &BackendConfig {
                bucket: "corrgraph-tfstate".to_string(),
                key: "infra/terraform.tfstate".to_string(),
                region: "eu-west-1".to_string(),
                lock_table: "corrgraph-locks".to_string(),
            },
        )
    }

    fn bucket_state() -> ResourceState {
        ResourceState {
            kind: ResourceKind::Bucket,
            document: json!({"kind": "bucket", "bucket": "corrgraph-test-raw"}),
            dependencies: vec![],
            outputs: Default::default(),
        }
    }

    #[test]
    fn missing_state_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let doc = backend(&dir).read().unwrap();
        assert_eq!(doc.serial, 0);
        assert!(doc.is_empty());
        assert_eq!(doc.backend, "corrgraph-tfstate/infra/terraform.tfstate");
    }

    #[test]
    fn overwrites_preserve_previous_versions() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);

        let mut doc = backend.read().unwrap();
        backend.write(&mut doc).unwrap();
        assert_eq!(doc.serial, 1);
        assert!(backend.versions().unwrap().is_empty());

        doc.insert(ResourceAddress::new(ResourceKind::Bucket, "raw"), bucket_state());
        backend.write(&mut doc).unwrap();
        assert_eq!(doc.serial, 2);
        assert_eq!(backend.versions().unwrap(), vec![1]);
        assert!(backend.read_version(1).unwrap().is_empty());
        assert_eq!(backend.read().unwrap().len(), 1);
        assert!(backend
            .state_path()
            .ends_with("corrgraph-tfstate/infra/terraform.tfstate"));
    }

    #[test]
    fn stale_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);

        let mut first = backend.read().unwrap();
        let mut stale = first.clone();
        backend.write(&mut first).unwrap();
        backend.write(&mut first).unwrap();

        match backend.write(&mut stale) {
            Err(StateError::SerialConflict { stored, attempted }) => {
                assert_eq!(stored, 2);
                assert_eq!(attempted, 0);
            }
            other => panic!("expected SerialConflict, got {:?}", other),
        }
    }

    #[test]
    fn lock_lives_in_lock_table_directory() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);
        let guard = backend.lock("plan").unwrap();
        assert_eq!(guard.info().lock_key, "corrgraph-tfstate/infra/terraform.tfstate");
        assert!(dir.path().join("corrgraph-locks").is_dir());
        assert!(matches!(backend.lock("apply"), Err(StateError::Locked { .. })));
        drop(guard);
        backend.lock("apply").unwrap();
    }
}
