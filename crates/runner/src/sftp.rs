use nship::{RemoteFs, RemoteMetadata};
use ssh2::{ErrorCode, FileStat, Sftp};
use std::{
  io::{self, Write},
  path::Path,
};

// SSH_FX_NO_SUCH_FILE and SSH_FX_NO_SUCH_PATH
const SFTP_NOT_FOUND_CODES: [i32; 2] = [2, 10];

const DIR_MODE: i32 = 0o755;

/// [`RemoteFs`] over an open SFTP subsystem.
pub struct SftpFs<'a> {
  sftp: &'a Sftp,
}

impl<'a> SftpFs<'a> {
  pub fn new(sftp: &'a Sftp) -> Self {
    SftpFs { sftp }
  }
}

impl RemoteFs for SftpFs<'_> {
  fn stat(&self, path: &str) -> io::Result<RemoteMetadata> {
    let stat = self.sftp.stat(Path::new(path)).map_err(to_io_error)?;

    Ok(RemoteMetadata {
      size: stat.size.unwrap_or(0),
      is_dir: stat.is_dir(),
    })
  }

  fn create_dir_all(&self, path: &str) -> io::Result<()> {
    let mut current = if path.starts_with('/') {
      String::from("/")
    } else {
      String::new()
    };

    for component in path.split('/').filter(|component| !component.is_empty()) {
      if !current.is_empty() && !current.ends_with('/') {
        current.push('/');
      }
      current.push_str(component);

      match self.stat(&current) {
        Ok(metadata) if metadata.is_dir => continue,
        Ok(_) => {
          return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", current),
          ))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
      }

      log::trace!("Creating remote directory {}", current);

      if let Err(err) = self.sftp.mkdir(Path::new(&current), DIR_MODE) {
        // Another writer may have created it in the meantime
        if !self.stat(&current).map(|metadata| metadata.is_dir).unwrap_or(false) {
          return Err(to_io_error(err));
        }
      }
    }

    Ok(())
  }

  fn create(&self, path: &str) -> io::Result<Box<dyn Write + '_>> {
    let file = self.sftp.create(Path::new(path)).map_err(to_io_error)?;

    Ok(Box::new(file))
  }

  fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
    let stat = FileStat {
      size: None,
      uid: None,
      gid: None,
      perm: Some(mode),
      atime: None,
      mtime: None,
    };

    self
      .sftp
      .setstat(Path::new(path), stat)
      .map_err(to_io_error)
  }
}

fn to_io_error(err: ssh2::Error) -> io::Error {
  match err.code() {
    ErrorCode::SFTP(code) if SFTP_NOT_FOUND_CODES.contains(&code) => {
      io::Error::new(io::ErrorKind::NotFound, err)
    }
    _ => io::Error::from(err),
  }
}
