#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("Failed to load config: {0}")]
  ConfigError(String),

  #[error("Invalid step: {0}")]
  InvalidStep(String),

  #[error("Failed to connect to target '{target}': {message}")]
  ConnectionError { target: String, message: String },

  #[error("Command `{command}` failed: {message}")]
  CommandError {
    command: String,
    output: String,
    message: String,
  },

  #[error("Failed to copy '{src}' to '{dst}': {message}")]
  CopyError {
    src: String,
    dst: String,
    message: String,
  },

  #[error("Docker {operation} failed for container '{container}': {message}")]
  DockerError {
    container: String,
    operation: String,
    message: String,
  },

  #[error("job '{job}' failed on target '{target}': step {step} failed: {message}")]
  JobFailed {
    job: String,
    target: String,
    step: usize,
    message: String,
  },

  #[error("Failed to compute step hash: {0}")]
  HashError(String),

  #[error("Hash store error: {0}")]
  HashStoreError(String),

  #[error("IO error: {0}")]
  IOError(#[from] std::io::Error),
}

impl Error {
  pub fn config_error<T: ToString>(message: T) -> Self {
    Self::ConfigError(message.to_string())
  }

  pub fn invalid_step<T: ToString>(message: T) -> Self {
    Self::InvalidStep(message.to_string())
  }

  pub fn connection_error<T: ToString>(target: impl Into<String>, message: T) -> Self {
    Self::ConnectionError {
      target: target.into(),
      message: message.to_string(),
    }
  }

  pub fn command_error<T: ToString>(
    command: impl Into<String>,
    output: impl Into<String>,
    message: T,
  ) -> Self {
    Self::CommandError {
      command: command.into(),
      output: output.into(),
      message: message.to_string(),
    }
  }

  pub fn copy_error<T: ToString>(src: impl Into<String>, dst: impl Into<String>, message: T) -> Self {
    Self::CopyError {
      src: src.into(),
      dst: dst.into(),
      message: message.to_string(),
    }
  }

  pub fn docker_error<T: ToString>(
    container: impl Into<String>,
    operation: impl Into<String>,
    message: T,
  ) -> Self {
    Self::DockerError {
      container: container.into(),
      operation: operation.into(),
      message: message.to_string(),
    }
  }

  pub fn job_failed<T: ToString>(
    job: impl Into<String>,
    target: impl Into<String>,
    step: usize,
    message: T,
  ) -> Self {
    Self::JobFailed {
      job: job.into(),
      target: target.into(),
      step,
      message: message.to_string(),
    }
  }

  pub fn hash_error<T: ToString>(message: T) -> Self {
    Self::HashError(message.to_string())
  }

  pub fn hash_store_error<T: ToString>(message: T) -> Self {
    Self::HashStoreError(message.to_string())
  }

  pub fn io_error(source: std::io::Error) -> Self {
    Self::IOError(source)
  }
}

// implement PartialEq for Error so that we can compare errors in tests
impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::ConfigError(a), Self::ConfigError(b)) => a == b,
      (Self::InvalidStep(a), Self::InvalidStep(b)) => a == b,
      (
        Self::ConnectionError {
          target: t1,
          message: m1,
        },
        Self::ConnectionError {
          target: t2,
          message: m2,
        },
      ) => t1 == t2 && m1 == m2,
      (
        Self::CommandError {
          command: c1,
          output: o1,
          message: m1,
        },
        Self::CommandError {
          command: c2,
          output: o2,
          message: m2,
        },
      ) => c1 == c2 && o1 == o2 && m1 == m2,
      (
        Self::CopyError {
          src: s1,
          dst: d1,
          message: m1,
        },
        Self::CopyError {
          src: s2,
          dst: d2,
          message: m2,
        },
      ) => s1 == s2 && d1 == d2 && m1 == m2,
      (
        Self::DockerError {
          container: c1,
          operation: o1,
          message: m1,
        },
        Self::DockerError {
          container: c2,
          operation: o2,
          message: m2,
        },
      ) => c1 == c2 && o1 == o2 && m1 == m2,
      (
        Self::JobFailed {
          job: j1,
          target: t1,
          step: s1,
          message: m1,
        },
        Self::JobFailed {
          job: j2,
          target: t2,
          step: s2,
          message: m2,
        },
      ) => j1 == j2 && t1 == t2 && s1 == s2 && m1 == m2,
      (Self::HashError(a), Self::HashError(b)) => a == b,
      (Self::HashStoreError(a), Self::HashStoreError(b)) => a == b,
      (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
      _ => false,
    }
  }
}
