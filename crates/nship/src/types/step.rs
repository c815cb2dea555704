use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SHELL: &str = "sh";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RunStep {
  pub command: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shell: Option<String>,
}

impl RunStep {
  pub fn new(command: impl Into<String>) -> Self {
    RunStep {
      command: command.into(),
      shell: None,
    }
  }

  pub fn shell(&self) -> &str {
    match &self.shell {
      Some(shell) if !shell.is_empty() => shell,
      _ => DEFAULT_SHELL,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyStep {
  #[serde(alias = "local")]
  pub src: String,
  #[serde(alias = "remote")]
  pub dst: String,
  #[serde(default)]
  pub exclude: Vec<String>,
}

impl CopyStep {
  pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
    CopyStep {
      src: src.into(),
      dst: dst.into(),
      exclude: vec![],
    }
  }

  pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
    self.exclude.push(pattern.into());
    self
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
  No,
  OnFailure,
  Always,
  UnlessStopped,
}

impl std::fmt::Display for RestartPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let policy = match self {
      RestartPolicy::No => "no",
      RestartPolicy::OnFailure => "on-failure",
      RestartPolicy::Always => "always",
      RestartPolicy::UnlessStopped => "unless-stopped",
    };

    write!(f, "{}", policy)
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DockerBuild {
  pub context: String,
  #[serde(default)]
  pub args: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DockerStep {
  pub image: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub build: Option<DockerBuild>,
  #[serde(default)]
  pub environment: BTreeMap<String, String>,
  #[serde(default)]
  pub ports: Vec<String>,
  #[serde(default)]
  pub volumes: Vec<String>,
  #[serde(default)]
  pub networks: Vec<String>,
  #[serde(default)]
  pub command: Vec<String>,
  #[serde(default)]
  pub labels: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub restart: Option<RestartPolicy>,
}

impl DockerStep {
  pub fn new(image: impl Into<String>, name: impl Into<String>) -> Self {
    DockerStep {
      image: image.into(),
      name: name.into(),
      ..Default::default()
    }
  }
}

/// A single unit of deployment work.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
  Run(RunStep),
  Copy(CopyStep),
  Docker(DockerStep),
}

impl Step {
  pub fn run(command: impl Into<String>) -> Self {
    Step::Run(RunStep::new(command))
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Step::Run(_) => "run",
      Step::Copy(_) => "copy",
      Step::Docker(_) => "docker",
    }
  }

  pub fn describe(&self) -> String {
    match self {
      Step::Run(run) => run.command.lines().next().unwrap_or_default().to_string(),
      Step::Copy(copy) => format!("{} -> {}", copy.src, copy.dst),
      Step::Docker(docker) => format!("{} ({})", docker.name, docker.image),
    }
  }
}

impl From<RunStep> for Step {
  fn from(step: RunStep) -> Self {
    Step::Run(step)
  }
}

impl From<CopyStep> for Step {
  fn from(step: CopyStep) -> Self {
    Step::Copy(step)
  }
}

impl From<DockerStep> for Step {
  fn from(step: DockerStep) -> Self {
    Step::Docker(step)
  }
}

/// A step as written in the config file, before it is known which variant it is.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct UserStep {
  pub run: Option<String>,
  pub shell: Option<String>,
  pub copy: Option<CopyStep>,
  pub docker: Option<DockerStep>,
}

impl TryFrom<UserStep> for Step {
  type Error = Error;

  fn try_from(step: UserStep) -> Result<Self, Self::Error> {
    let run = step.run.filter(|run| !run.trim().is_empty());

    match (run, step.copy, step.docker) {
      (Some(command), None, None) => Ok(Step::Run(RunStep {
        command,
        shell: step.shell,
      })),
      (None, Some(copy), None) => {
        if copy.src.is_empty() || copy.dst.is_empty() {
          return Err(Error::invalid_step("copy step requires both `src` and `dst`"));
        }
        Ok(Step::Copy(copy))
      }
      (None, None, Some(docker)) => {
        if docker.image.is_empty() || docker.name.is_empty() {
          return Err(Error::invalid_step(
            "docker step requires both `image` and `name`",
          ));
        }
        Ok(Step::Docker(docker))
      }
      (None, None, None) => Err(Error::invalid_step(
        "step must set one of `run`, `copy` or `docker`",
      )),
      _ => Err(Error::invalid_step(
        "step must set only one of `run`, `copy` or `docker`",
      )),
    }
  }
}
