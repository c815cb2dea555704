use crate::{
  escape::shell_command,
  session,
  sftp::SftpFs,
  steps::{copy_step, docker_step, CommandRunner},
};
use nship::{Client, ClientFactory, Error, Result, Step, Target};
use parking_lot::Mutex;
use ssh2::{Session, Sftp};
use std::{
  io,
  net::{TcpStream, ToSocketAddrs},
  path::PathBuf,
  sync::Arc,
  time::Duration,
};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens one SSH session with an SFTP subsystem per target.
pub struct SshClientFactory {
  connect_timeout: Duration,
}

impl SshClientFactory {
  pub fn new() -> Self {
    SshClientFactory {
      connect_timeout: DEFAULT_CONNECT_TIMEOUT,
    }
  }

  pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
    self.connect_timeout = connect_timeout;
    self
  }
}

impl Default for SshClientFactory {
  fn default() -> Self {
    Self::new()
  }
}

#[nship::async_trait]
impl ClientFactory for SshClientFactory {
  async fn connect(&self, target: &Target) -> Result<Box<dyn Client>> {
    let name = target.name().to_string();
    let target = target.clone();
    let timeout = self.connect_timeout;

    let connection = tokio::task::spawn_blocking(move || Connection::open(&target, timeout))
      .await
      .map_err(|err| Error::connection_error(&name, err))??;

    log::debug!("Connected to target '{}'", name);

    Ok(Box::new(SshClient {
      target: name,
      connection: Arc::new(Mutex::new(connection)),
    }))
  }
}

/// A live SSH connection to one target.
///
/// libssh2 calls block, so every operation runs on tokio's blocking pool.
pub struct SshClient {
  target: String,
  connection: Arc<Mutex<Connection>>,
}

impl SshClient {
  async fn blocking<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    let connection = self.connection.clone();

    tokio::task::spawn_blocking(move || f(&*connection.lock()))
      .await
      .map_err(|err| Error::connection_error(&self.target, err))?
  }
}

#[nship::async_trait]
impl Client for SshClient {
  async fn execute_step(&mut self, step: &Step, number: usize, total: usize) -> Result<()> {
    log::debug!(
      "[{}/{}] Executing {} step on target '{}'",
      number,
      total,
      step.kind(),
      self.target
    );

    let step = step.clone();
    self
      .blocking(move |connection| match &step {
        Step::Run(run) => connection.run(&run.command, run.shell()),
        Step::Copy(copy) => copy_step(&SftpFs::new(&connection.sftp), copy).map(|_| ()),
        Step::Docker(docker) => docker_step(connection, docker),
      })
      .await
  }

  async fn close(&mut self) -> Result<()> {
    let target = self.target.clone();

    self
      .blocking(move |connection| {
        connection
          .session
          .disconnect(None, "nship finished", None)
          .map_err(|err| Error::connection_error(&target, err))
      })
      .await?;

    log::debug!("Disconnected from target '{}'", self.target);

    Ok(())
  }
}

struct Connection {
  session: Session,
  sftp: Sftp,
}

impl Connection {
  fn open(target: &Target, timeout: Duration) -> Result<Connection> {
    let name = target.name();
    let tcp = dial(&target.address(), timeout).map_err(|err| Error::connection_error(name, err))?;

    let mut session = Session::new().map_err(|err| Error::connection_error(name, err))?;
    session.set_tcp_stream(tcp);
    session
      .handshake()
      .map_err(|err| Error::connection_error(name, format!("SSH handshake failed: {}", err)))?;

    authenticate(&session, target)?;

    let sftp = match session.sftp() {
      Ok(sftp) => sftp,
      Err(err) => {
        if let Err(err) = session.disconnect(None, "SFTP unavailable", None) {
          log::debug!("Failed to disconnect from target '{}': {}", name, err);
        }

        return Err(Error::connection_error(
          name,
          format!("Failed to start SFTP subsystem: {}", err),
        ));
      }
    };

    Ok(Connection { session, sftp })
  }
}

impl CommandRunner for Connection {
  fn run(&self, command: &str, shell: &str) -> Result<()> {
    let mut channel = self
      .session
      .channel_session()
      .map_err(|err| Error::command_error(command, "", err))?;

    channel
      .exec(&shell_command(shell, command))
      .map_err(|err| Error::command_error(command, "", err))?;

    // Both streams share the session, so nothing may block while reading
    self.session.set_blocking(false);
    let output = session::drain(
      channel.stream(0),
      io::stdout(),
      channel.stderr(),
      io::stderr(),
    );
    self.session.set_blocking(true);

    let output = output.map_err(|err| Error::command_error(command, "", err))?;

    channel
      .wait_close()
      .map_err(|err| Error::command_error(command, output.combined(), err))?;

    let status = channel
      .exit_status()
      .map_err(|err| Error::command_error(command, output.combined(), err))?;

    if status != 0 {
      return Err(Error::command_error(
        command,
        output.combined(),
        format!("exited with status {}", status),
      ));
    }

    Ok(())
  }
}

fn dial(address: &str, timeout: Duration) -> io::Result<TcpStream> {
  let mut last_error = None;

  for socket in address.to_socket_addrs()? {
    match TcpStream::connect_timeout(&socket, timeout) {
      Ok(stream) => return Ok(stream),
      Err(err) => last_error = Some(err),
    }
  }

  Err(last_error.unwrap_or_else(|| {
    io::Error::new(
      io::ErrorKind::NotFound,
      format!("{} did not resolve to any address", address),
    )
  }))
}

fn authenticate(session: &Session, target: &Target) -> Result<()> {
  let name = target.name();

  if let Some(private_key) = &target.private_key {
    let private_key = expand_home(private_key);

    if let Err(err) = session.userauth_pubkey_file(&target.user, None, &private_key, None) {
      log::debug!(
        "Private key {} not usable for target '{}': {}",
        private_key.display(),
        name,
        err
      );
    }
  }

  if !session.authenticated() {
    if let Some(password) = &target.password {
      session
        .userauth_password(&target.user, password)
        .map_err(|err| Error::connection_error(name, format!("Authentication failed: {}", err)))?;
    }
  }

  if !session.authenticated() {
    return Err(Error::connection_error(
      name,
      format!("Authentication failed for user '{}'", target.user),
    ));
  }

  Ok(())
}

fn expand_home(path: &str) -> PathBuf {
  match (path.strip_prefix("~/"), dirs::home_dir()) {
    (Some(rest), Some(home)) => home.join(rest),
    _ => PathBuf::from(path),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expand_home() {
    assert_eq!(expand_home("/etc/key"), PathBuf::from("/etc/key"));
    assert_eq!(expand_home("keys/id"), PathBuf::from("keys/id"));

    if let Some(home) = dirs::home_dir() {
      assert_eq!(expand_home("~/.ssh/id_ed25519"), home.join(".ssh/id_ed25519"));
    }
  }

  #[test]
  fn test_dial_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    assert!(dial(&address, Duration::from_secs(1)).is_err());
  }
}
