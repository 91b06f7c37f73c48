//! Preference persistence.
//!
//! The mapper consumes a [`PreferenceMap`] snapshot; stores only have
//! to produce one and absorb merges. The file store keeps one YAML
//! file per scope under a directory, so concurrent workers touching
//! different domains never collide.

use async_trait::async_trait;
use knock_core::prefs::{PreferenceMap, PreferenceScope};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, scope: &PreferenceScope, key: &str) -> Result<Option<String>, StoreError>;

    /// Key-wise additive merge into one scope.
    async fn merge(
        &self,
        scope: &PreferenceScope,
        entries: &HashMap<String, String>,
    ) -> Result<(), StoreError>;

    /// Full in-memory view for the mapper.
    async fn snapshot(&self) -> Result<PreferenceMap, StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: Arc<Mutex<PreferenceMap>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        MemoryPreferenceStore::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, scope: &PreferenceScope, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.lock().unwrap();
        Ok(map.get(scope, key).map(|v| v.to_string()))
    }

    async fn merge(
        &self,
        scope: &PreferenceScope,
        entries: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().merge(scope, entries);
        Ok(())
    }

    async fn snapshot(&self) -> Result<PreferenceMap, StoreError> {
        Ok(self.inner.lock().unwrap().clone())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// One YAML file per scope: `global.yaml`, `example.com.yaml`, ...
pub struct FilePreferenceStore {
    dir: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FilePreferenceStore { dir: dir.into() }
    }

    /// `~/.knock/learned` when a home directory exists.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".knock").join("learned"))
    }

    fn scope_path(&self, scope: &PreferenceScope) -> PathBuf {
        self.dir.join(format!("{}.yaml", sanitize_scope(scope.as_key())))
    }

    async fn read_scope(&self, path: &Path) -> Result<HashMap<String, String>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(serde_yaml::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn get(&self, scope: &PreferenceScope, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.read_scope(&self.scope_path(scope)).await?;
        Ok(entries.get(key).cloned())
    }

    async fn merge(
        &self,
        scope: &PreferenceScope,
        entries: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.scope_path(scope);
        let mut merged = self.read_scope(&path).await?;
        for (key, value) in entries {
            merged.insert(key.clone(), value.clone());
        }
        let raw = serde_yaml::to_string(&merged)?;
        tokio::fs::write(&path, raw).await?;
        debug!(scope = scope.as_key(), entries = merged.len(), "preferences written");
        Ok(())
    }

    async fn snapshot(&self) -> Result<PreferenceMap, StoreError> {
        let mut map = PreferenceMap::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(map),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let entries = self.read_scope(&path).await?;
            map.merge(&PreferenceScope::from_key(stem), &entries);
        }
        Ok(map)
    }
}

/// Scope keys are normalized domains, but never trust them as raw
/// file names.
fn sanitize_scope(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
