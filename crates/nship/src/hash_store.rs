use crate::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
  collections::HashMap,
  fs, io,
  path::{Path, PathBuf},
};

pub const DEFAULT_HASH_FILE: &str = ".nship/hashes/step_hashes.json";

/// Persistent storage for step fingerprints, keyed by target name, job name
/// and step index.
///
/// Implementations must treat a missing entry as `Ok(None)` and must have
/// made a save durable by the time `save_hash` returns.
pub trait HashStore: Send + Sync {
  fn save_hash(&self, target: &str, job: &str, step_index: usize, hash: &str) -> Result<()>;

  fn get_hash(&self, target: &str, job: &str, step_index: usize) -> Result<Option<String>>;

  fn clear(&self) -> Result<()>;
}

fn hash_key(target: &str, job: &str, step_index: usize) -> String {
  format!("{}:{}:{}", target, job, step_index)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct StepHashRecord {
  target: String,
  job: String,
  step: usize,
  hash: String,
}

/// A [`HashStore`] backed by a single JSON file.
///
/// The file is read once, on first access. Every save rewrites it entirely.
pub struct FileHashStore {
  path: PathBuf,
  records: RwLock<Option<HashMap<String, StepHashRecord>>>,
}

impl FileHashStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    FileHashStore {
      path: path.into(),
      records: RwLock::new(None),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn load(&self) -> Result<HashMap<String, StepHashRecord>> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
      Err(err) => {
        return Err(Error::hash_store_error(format!(
          "Failed to read {}: {}",
          self.path.display(),
          err
        )))
      }
    };

    if content.trim().is_empty() {
      return Ok(HashMap::new());
    }

    let records: Vec<StepHashRecord> = serde_json::from_str(&content).map_err(|err| {
      Error::hash_store_error(format!("Failed to parse {}: {}", self.path.display(), err))
    })?;

    Ok(
      records
        .into_iter()
        .map(|record| (hash_key(&record.target, &record.job, record.step), record))
        .collect(),
    )
  }

  fn ensure_loaded(&self) -> Result<()> {
    if self.records.read().is_some() {
      return Ok(());
    }

    let mut records = self.records.write();
    if records.is_none() {
      *records = Some(self.load()?);
    }

    Ok(())
  }

  fn persist(&self, records: &HashMap<String, StepHashRecord>) -> Result<()> {
    let mut sorted: Vec<&StepHashRecord> = records.values().collect();
    sorted.sort_by(|a, b| (&a.target, &a.job, a.step).cmp(&(&b.target, &b.job, b.step)));

    let content = serde_json::to_string_pretty(&sorted)
      .map_err(|err| Error::hash_store_error(format!("Failed to serialize hashes: {}", err)))?;

    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
      }
    }

    fs::write(&self.path, content).map_err(|err| {
      Error::hash_store_error(format!("Failed to write {}: {}", self.path.display(), err))
    })
  }
}

impl Default for FileHashStore {
  fn default() -> Self {
    FileHashStore::new(DEFAULT_HASH_FILE)
  }
}

impl HashStore for FileHashStore {
  fn save_hash(&self, target: &str, job: &str, step_index: usize, hash: &str) -> Result<()> {
    self.ensure_loaded()?;

    let mut guard = self.records.write();
    let records = guard.get_or_insert_with(HashMap::new);

    records.insert(
      hash_key(target, job, step_index),
      StepHashRecord {
        target: target.to_string(),
        job: job.to_string(),
        step: step_index,
        hash: hash.to_string(),
      },
    );

    self.persist(records)
  }

  fn get_hash(&self, target: &str, job: &str, step_index: usize) -> Result<Option<String>> {
    self.ensure_loaded()?;

    let records = self.records.read();

    Ok(
      records
        .as_ref()
        .and_then(|records| records.get(&hash_key(target, job, step_index)))
        .map(|record| record.hash.clone()),
    )
  }

  fn clear(&self) -> Result<()> {
    let mut records = self.records.write();

    match fs::remove_file(&self.path) {
      Ok(()) => {}
      Err(err) if err.kind() == io::ErrorKind::NotFound => {}
      Err(err) => {
        return Err(Error::hash_store_error(format!(
          "Failed to remove {}: {}",
          self.path.display(),
          err
        )))
      }
    }

    *records = Some(HashMap::new());

    Ok(())
  }
}

/// A [`HashStore`] that lives only as long as the process.
#[derive(Default)]
pub struct MemoryHashStore {
  hashes: RwLock<HashMap<String, String>>,
}

impl MemoryHashStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.hashes.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.hashes.read().is_empty()
  }
}

impl HashStore for MemoryHashStore {
  fn save_hash(&self, target: &str, job: &str, step_index: usize, hash: &str) -> Result<()> {
    self
      .hashes
      .write()
      .insert(hash_key(target, job, step_index), hash.to_string());

    Ok(())
  }

  fn get_hash(&self, target: &str, job: &str, step_index: usize) -> Result<Option<String>> {
    Ok(
      self
        .hashes
        .read()
        .get(&hash_key(target, job, step_index))
        .cloned(),
    )
  }

  fn clear(&self) -> Result<()> {
    self.hashes.write().clear();

    Ok(())
  }
}
