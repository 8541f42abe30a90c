//! Persisted source set and the atomic-write helper shared by all stores

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ConfigError, Result};
use crate::source::{Source, SourceId};
use crate::validation::validate_source;

/// Serialize `value` to `path` atomically: write `<path>.tmp`, fsync,
/// rename. A crash mid-write never corrupts the previous contents.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent.display().to_string(), e))?;
    }

    let tmp = path.with_extension("tmp");
    let display = tmp.display().to_string();

    let mut file = fs::File::create(&tmp).map_err(|e| ConfigError::io(&display, e))?;
    let body = serde_json::to_vec_pretty(value).map_err(|e| ConfigError::json(&display, e))?;
    file.write_all(&body)
        .and_then(|_| file.sync_all())
        .map_err(|e| ConfigError::io(&display, e))?;

    fs::rename(&tmp, path).map_err(|e| ConfigError::io(path.display().to_string(), e))
}

/// The validated, persisted source set (`sources.json`).
///
/// All mutations validate first and persist before returning; on any
/// error the in-memory set is left untouched.
pub struct SourceStore {
    path: PathBuf,
    sources: BTreeMap<SourceId, Source>,
}

impl SourceStore {
    /// Open the store at `<data_dir>/sources.json`, loading any existing
    /// source set.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("sources.json");

        let sources = if path.exists() {
            let display = path.display().to_string();
            let body = fs::read_to_string(&path).map_err(|e| ConfigError::io(&display, e))?;
            let list: Vec<Source> =
                serde_json::from_str(&body).map_err(|e| ConfigError::json(&display, e))?;
            list.into_iter().map(|s| (s.id.clone(), s)).collect()
        } else {
            BTreeMap::new()
        };

        tracing::debug!(
            path = %path.display(),
            sources = sources.len(),
            "source store opened"
        );

        Ok(Self { path, sources })
    }

    /// Number of configured sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True when no sources are configured
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Look up a source by id
    pub fn get(&self, id: &SourceId) -> Option<&Source> {
        self.sources.get(id)
    }

    /// Clone the current source set
    pub fn snapshot(&self) -> Vec<Source> {
        self.sources.values().cloned().collect()
    }

    /// Add a new source after validating it against the existing set.
    pub fn add(&mut self, source: Source) -> Result<()> {
        validate_source(&source, self.sources.values())?;
        self.sources.insert(source.id.clone(), source);
        self.persist()
    }

    /// Replace an existing source atomically. The id must already exist.
    pub fn update(&mut self, source: Source) -> Result<()> {
        if !self.sources.contains_key(&source.id) {
            return Err(ConfigError::unknown_source(source.id.as_str()));
        }
        validate_source(&source, self.sources.values().filter(|s| s.id != source.id))?;
        self.sources.insert(source.id.clone(), source);
        self.persist()
    }

    /// Remove a source, returning its definition.
    pub fn delete(&mut self, id: &SourceId) -> Result<Source> {
        let source = self
            .sources
            .remove(id)
            .ok_or_else(|| ConfigError::unknown_source(id.as_str()))?;
        self.persist()?;
        Ok(source)
    }

    fn persist(&self) -> Result<()> {
        let list: Vec<&Source> = self.sources.values().collect();
        write_json_atomic(&self.path, &list)
    }
}

/// A directory of per-source JSON files (`<dir>/<source_id>.json`) with
/// an in-memory cache. Backs the template, policy, and filter stores.
///
/// Reads are lock-free once cached; writes persist before updating the
/// cache so readers never observe unpersisted state.
pub(crate) struct DirStore<T> {
    dir: PathBuf,
    cache: std::sync::RwLock<BTreeMap<SourceId, std::sync::Arc<T>>>,
}

impl<T> DirStore<T>
where
    T: Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    /// Open `<data_dir>/<name>` and load every `*.json` inside it.
    pub(crate) fn open(data_dir: &Path, name: &str) -> Result<Self> {
        let dir = data_dir.join(name);
        let mut cache = BTreeMap::new();

        if dir.exists() {
            let entries =
                fs::read_dir(&dir).map_err(|e| ConfigError::io(dir.display().to_string(), e))?;
            for entry in entries {
                let entry = entry.map_err(|e| ConfigError::io(dir.display().to_string(), e))?;
                let path = entry.path();
                if path.extension().is_none_or(|e| e != "json") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let display = path.display().to_string();
                let body = fs::read_to_string(&path).map_err(|e| ConfigError::io(&display, e))?;
                let value: T =
                    serde_json::from_str(&body).map_err(|e| ConfigError::json(&display, e))?;
                cache.insert(SourceId::from(stem), std::sync::Arc::new(value));
            }
        }

        Ok(Self {
            dir,
            cache: std::sync::RwLock::new(cache),
        })
    }

    pub(crate) fn get(&self, id: &SourceId) -> Option<std::sync::Arc<T>> {
        self.cache.read().expect("dir store lock").get(id).cloned()
    }

    pub(crate) fn set(&self, id: &SourceId, value: T) -> Result<std::sync::Arc<T>> {
        write_json_atomic(&self.path_for(id), &value)?;
        let value = std::sync::Arc::new(value);
        self.cache
            .write()
            .expect("dir store lock")
            .insert(id.clone(), std::sync::Arc::clone(&value));
        Ok(value)
    }

    pub(crate) fn remove(&self, id: &SourceId) -> Result<()> {
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        }
        self.cache.write().expect("dir store lock").remove(id);
        Ok(())
    }

    fn path_for(&self, id: &SourceId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
