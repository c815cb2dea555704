//! Step fingerprints used to detect unchanged steps.

use crate::{
  copier::{file_mode, walk_metadata},
  exclude::is_excluded,
  Error, Result, Step, Target, DEFAULT_SHELL,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::{
  fs, io,
  path::Path,
  time::UNIX_EPOCH,
};

#[derive(Serialize)]
struct HashInput<'a> {
  step: &'a Step,
  target: &'a Target,
}

/// Computes SHA-256 fingerprints over a step, its target and, for copy
/// steps, the observable state of the source tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepHasher;

impl StepHasher {
  pub fn new() -> Self {
    StepHasher
  }

  pub fn compute_hash(&self, step: &Step, target: &Target) -> Result<String> {
    let mut hasher = Sha256::new();

    match step {
      Step::Copy(copy) => {
        // Exclude patterns are a set
        let mut canonical = copy.clone();
        canonical.exclude.sort();
        canonical.exclude.dedup();

        hasher.update(serialize(&Step::Copy(canonical), target)?);
        hash_source(&mut hasher, Path::new(&copy.src), &copy.exclude)?;
      }
      Step::Run(run) if run.shell.as_deref() == Some(DEFAULT_SHELL) => {
        // An explicit default shell runs the same command as no shell
        let mut canonical = run.clone();
        canonical.shell = None;

        hasher.update(serialize(&Step::Run(canonical), target)?);
      }
      _ => hasher.update(serialize(step, target)?),
    }

    Ok(format!("{:x}", hasher.finalize()))
  }
}

fn serialize(step: &Step, target: &Target) -> Result<Vec<u8>> {
  serde_json::to_vec(&HashInput { step, target })
    .map_err(|err| Error::hash_error(format!("Failed to serialize step: {}", err)))
}

fn hash_source(hasher: &mut Sha256, root: &Path, exclude: &[String]) -> Result<()> {
  let metadata = match fs::metadata(root) {
    Ok(metadata) => metadata,
    Err(err) if err.kind() == io::ErrorKind::NotFound => {
      log::debug!(
        "Copy source {} does not exist, hashing step config only",
        root.display()
      );
      return Ok(());
    }
    Err(err) => return Err(stat_error(root, err)),
  };

  if metadata.is_dir() {
    hash_dir(hasher, root, "", exclude)
  } else {
    hasher.update(format!("{}|{}\n", modified_nanos(&metadata), metadata.len()));
    Ok(())
  }
}

fn hash_dir(hasher: &mut Sha256, dir: &Path, prefix: &str, exclude: &[String]) -> Result<()> {
  let mut entries = fs::read_dir(dir)
    .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
    .map_err(|err| stat_error(dir, err))?;

  entries.sort_by_key(|entry| entry.file_name());

  for entry in entries {
    let name = entry.file_name().to_string_lossy().into_owned();
    let relative = if prefix.is_empty() {
      name.clone()
    } else {
      format!("{}/{}", prefix, name)
    };

    if is_excluded(&relative, &name, exclude) {
      log::trace!("Excluded from hash: {}", relative);
      continue;
    }

    let path = entry.path();
    let metadata = match walk_metadata(&path).map_err(|err| stat_error(&path, err))? {
      Some(metadata) => metadata,
      None => continue,
    };

    hasher.update(format!(
      "{}|{}|{}|{:o}\n",
      relative,
      modified_nanos(&metadata),
      metadata.len(),
      file_mode(&metadata)
    ));

    if metadata.is_dir() {
      hash_dir(hasher, &path, &relative, exclude)?;
    }
  }

  Ok(())
}

fn modified_nanos(metadata: &fs::Metadata) -> u128 {
  metadata
    .modified()
    .ok()
    .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
    .map(|duration| duration.as_nanos())
    .unwrap_or(0)
}

fn stat_error(path: &Path, err: io::Error) -> Error {
  Error::hash_error(format!("Failed to read {}: {}", path.display(), err))
}
