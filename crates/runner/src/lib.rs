mod docker;
mod escape;
mod session;
mod sftp;
mod ssh_client;
mod steps;

pub use docker::build_commands;
pub use escape::{escape_command, shell_command};
pub use session::{drain, Output};
pub use sftp::SftpFs;
pub use ssh_client::{SshClient, SshClientFactory, DEFAULT_CONNECT_TIMEOUT};
pub use steps::{copy_step, docker_script, docker_step, CommandRunner};
