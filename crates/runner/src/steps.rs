use crate::docker::build_commands;
use nship::{Copier, CopyStats, CopyStep, DockerStep, Error, RemoteFs, Result, DEFAULT_SHELL};
use std::path::Path;

/// Runs one shell command on a target. A non-zero exit is an error.
pub trait CommandRunner {
  fn run(&self, command: &str, shell: &str) -> Result<()>;
}

/// Copies the source of `copy` through `fs`. Any failure is reported as a
/// [`Error::CopyError`] for the step's source and destination.
pub fn copy_step(fs: &dyn RemoteFs, copy: &CopyStep) -> Result<CopyStats> {
  let stats = Copier::new(fs)
    .copy_path(Path::new(&copy.src), &copy.dst, &copy.exclude)
    .map_err(|err| Error::copy_error(&copy.src, &copy.dst, err))?;

  log::info!(
    "Copied {} to {}: {} file(s) transferred, {} unchanged",
    copy.src,
    copy.dst,
    stats.transferred,
    stats.skipped
  );

  Ok(stats)
}

/// The script that (re)creates and starts the container, stopping at the
/// first failing command.
pub fn docker_script(docker: &DockerStep) -> String {
  format!("set -e\n{}", build_commands(docker).join("\n"))
}

/// Runs [`docker_script`] with the default shell. Any failure is reported as
/// a [`Error::DockerError`] for the container.
pub fn docker_step(runner: &dyn CommandRunner, docker: &DockerStep) -> Result<()> {
  runner
    .run(&docker_script(docker), DEFAULT_SHELL)
    .map_err(|err| Error::docker_error(&docker.name, "create/start", err))
}
