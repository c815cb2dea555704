use crate::{Error, Job, Result, Step, Target, UserStep};
use serde::{Deserialize, Serialize};
use std::{
  collections::{BTreeMap, HashSet},
  fs,
  path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["nship.yaml", "nship.yml"];

/// A snapshot of environment variables used for `${VAR}` substitution.
///
/// The snapshot is an explicit value: loading `.env` files adds to it and
/// never touches the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
  vars: BTreeMap<String, String>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_process() -> Self {
    Environment {
      vars: std::env::vars().collect(),
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.set(key, value);
    self
  }

  /// Reads a `.env` file into the snapshot, overriding existing keys.
  pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    // The only dotenv entry point that reads a file without setting process variables
    #[allow(deprecated)]
    let iter = dotenv::from_path_iter(path).map_err(|err| {
      Error::config_error(format!("Failed to read env file {}: {}", path.display(), err))
    })?;

    for item in iter {
      let (key, value) = item.map_err(|err| {
        Error::config_error(format!("Failed to parse env file {}: {}", path.display(), err))
      })?;
      self.vars.insert(key, value);
    }

    log::debug!("Loaded environment from {}", path.display());

    Ok(())
  }

  /// Replaces every `${NAME}` in `input`. Unknown names become empty.
  pub fn substitute(&self, input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
      output.push_str(&rest[..start]);
      let after = &rest[start + 2..];

      match after.find('}') {
        Some(end) if is_var_name(&after[..end]) => {
          let name = &after[..end];
          match self.get(name) {
            Some(value) => output.push_str(value),
            None => log::debug!("Environment variable `{}` is not set", name),
          }
          rest = &after[end + 1..];
        }
        _ => {
          output.push_str("${");
          rest = after;
        }
      }
    }

    output.push_str(rest);
    output
  }
}

fn is_var_name(name: &str) -> bool {
  let mut chars = name.chars();

  match chars.next() {
    Some(first) if first.is_ascii_alphabetic() || first == '_' => {
      chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
    _ => false,
  }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct UserJob {
  pub name: Option<String>,
  #[serde(default)]
  pub steps: Vec<UserStep>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
  #[serde(default)]
  pub targets: Vec<Target>,
  #[serde(default)]
  pub jobs: Vec<UserJob>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
  Yaml,
  Json,
}

impl ConfigFormat {
  pub fn from_path(path: &Path) -> Result<Self> {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
      Some("json") => Ok(ConfigFormat::Json),
      _ => Err(Error::config_error(format!(
        "Unsupported config file {}, expected .yaml, .yml or .json",
        path.display()
      ))),
    }
  }
}

/// Validated deployment configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub targets: Vec<Target>,
  pub jobs: Vec<Job>,
}

impl Config {
  pub fn load(path: impl AsRef<Path>, env: &Environment) -> Result<Config> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|err| {
      Error::config_error(format!("Failed to read {}: {}", path.display(), err))
    })?;

    log::debug!("Loading config from {}", path.display());

    Config::parse(&content, format, env)
  }

  pub fn parse(content: &str, format: ConfigFormat, env: &Environment) -> Result<Config> {
    let content = env.substitute(content);

    let user_config: UserConfig = match format {
      ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(Error::config_error)?,
      ConfigFormat::Json => serde_json::from_str(&content).map_err(Error::config_error)?,
    };

    Config::try_from(user_config)
  }

  pub fn job(&self, name: &str) -> Option<&Job> {
    self.jobs.iter().find(|job| job.name == name)
  }

  /// Keeps only the job called `name`.
  pub fn select_job(mut self, name: &str) -> Result<Config> {
    self.jobs.retain(|job| job.name == name);

    if self.jobs.is_empty() {
      return Err(Error::config_error(format!("Job `{}` is not defined", name)));
    }

    Ok(self)
  }

  fn validate_target(target: &Target, position: usize) -> Result<()> {
    let label = target
      .name
      .clone()
      .unwrap_or_else(|| format!("#{}", position + 1));

    if target.host.trim().is_empty() {
      return Err(Error::config_error(format!("Target `{}` has no host", label)));
    }
    if target.user.trim().is_empty() {
      return Err(Error::config_error(format!("Target `{}` has no user", label)));
    }
    if !target.has_auth() {
      return Err(Error::config_error(format!(
        "Target `{}` needs a password or a private_key",
        label
      )));
    }

    Ok(())
  }
}

impl TryFrom<UserConfig> for Config {
  type Error = Error;

  fn try_from(config: UserConfig) -> Result<Self> {
    if config.targets.is_empty() {
      return Err(Error::config_error("Config must have at least one target"));
    }
    if config.jobs.is_empty() {
      return Err(Error::config_error("Config must have at least one job"));
    }

    for (position, target) in config.targets.iter().enumerate() {
      Config::validate_target(target, position)?;
    }

    let mut names = HashSet::new();
    let mut jobs = Vec::with_capacity(config.jobs.len());

    for (position, job) in config.jobs.into_iter().enumerate() {
      let name = job
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| Job::default_name(position));

      if !names.insert(name.clone()) {
        return Err(Error::config_error(format!("Job `{}` is defined twice", name)));
      }

      if job.steps.is_empty() {
        return Err(Error::config_error(format!(
          "Job `{}` must have at least one step",
          name
        )));
      }

      let steps = job
        .steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| {
          Step::try_from(step).map_err(|err| {
            Error::config_error(format!("Job `{}` step {}: {}", name, index + 1, err))
          })
        })
        .collect::<Result<Vec<_>>>()?;

      jobs.push(Job { name, steps });
    }

    Ok(Config {
      targets: config.targets,
      jobs,
    })
  }
}

/// Resolves the config file: `explicit` if given, otherwise the first of
/// [`DEFAULT_CONFIG_FILES`] that exists in `dir`.
pub fn find_config(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf> {
  if let Some(path) = explicit {
    return Ok(path.to_path_buf());
  }

  DEFAULT_CONFIG_FILES
    .iter()
    .map(|name| dir.join(name))
    .find(|path| path.is_file())
    .ok_or_else(|| {
      Error::config_error(format!(
        "No config file found, looked for {}",
        DEFAULT_CONFIG_FILES.join(", ")
      ))
    })
}
