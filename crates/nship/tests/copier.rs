use nship::{Copier, CopyStats, RemoteFs, RemoteMetadata};
use parking_lot::Mutex;
use std::{
  collections::{BTreeMap, BTreeSet},
  fs,
  io::{self, Write},
};

#[derive(Default)]
struct MemoryFs {
  files: Mutex<BTreeMap<String, Vec<u8>>>,
  dirs: Mutex<BTreeSet<String>>,
  modes: Mutex<BTreeMap<String, u32>>,
  writes: Mutex<Vec<String>>,
  read_only: bool,
}

impl MemoryFs {
  fn with_file(self, path: &str, content: &str) -> Self {
    self
      .files
      .lock()
      .insert(path.to_string(), content.as_bytes().to_vec());
    self
  }

  fn content(&self, path: &str) -> Option<String> {
    self
      .files
      .lock()
      .get(path)
      .map(|content| String::from_utf8_lossy(content).into_owned())
  }

  fn writes(&self) -> Vec<String> {
    self.writes.lock().clone()
  }
}

struct MemoryFile<'a> {
  fs: &'a MemoryFs,
  path: String,
}

impl Write for MemoryFile<'_> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self
      .fs
      .files
      .lock()
      .entry(self.path.clone())
      .or_default()
      .extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl RemoteFs for MemoryFs {
  fn stat(&self, path: &str) -> io::Result<RemoteMetadata> {
    if self.dirs.lock().contains(path) {
      return Ok(RemoteMetadata {
        size: 0,
        is_dir: true,
      });
    }

    match self.files.lock().get(path) {
      Some(content) => Ok(RemoteMetadata {
        size: content.len() as u64,
        is_dir: false,
      }),
      None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
    }
  }

  fn create_dir_all(&self, path: &str) -> io::Result<()> {
    if self.read_only {
      return Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "permission denied",
      ));
    }

    let mut current = String::new();
    let mut dirs = self.dirs.lock();
    for component in path.split('/').filter(|component| !component.is_empty()) {
      current.push('/');
      current.push_str(component);
      dirs.insert(current.clone());
    }

    Ok(())
  }

  fn create(&self, path: &str) -> io::Result<Box<dyn Write + '_>> {
    self.files.lock().insert(path.to_string(), Vec::new());
    self.writes.lock().push(path.to_string());

    Ok(Box::new(MemoryFile {
      fs: self,
      path: path.to_string(),
    }))
  }

  fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
    self.modes.lock().insert(path.to_string(), mode);
    Ok(())
  }
}

fn site() -> tempfile::TempDir {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
  fs::create_dir_all(dir.path().join("assets/img")).unwrap();
  fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
  fs::write(dir.path().join("assets/img/logo.svg"), "<svg/>").unwrap();
  fs::write(dir.path().join("debug.log"), "noise").unwrap();
  fs::create_dir_all(dir.path().join("node_modules/left-pad")).unwrap();
  fs::write(dir.path().join("node_modules/left-pad/index.js"), "pad").unwrap();
  dir
}

#[test]
fn test_copy_directory_tree() {
  let source = site();
  let remote = MemoryFs::default();

  let stats = Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &[])
    .unwrap();

  assert_eq!(
    stats,
    CopyStats {
      transferred: 5,
      skipped: 0
    }
  );
  assert_eq!(
    remote.content("/srv/www/index.html").as_deref(),
    Some("<h1>hello</h1>")
  );
  assert_eq!(
    remote.content("/srv/www/assets/img/logo.svg").as_deref(),
    Some("<svg/>")
  );
  assert!(remote.dirs.lock().contains("/srv/www/assets/img"));
}

#[test]
fn test_copy_with_exclusions() {
  let source = site();
  let remote = MemoryFs::default();
  let exclude = vec!["*.log".to_string(), "node_modules".to_string()];

  let stats = Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &exclude)
    .unwrap();

  assert_eq!(stats.transferred, 3);
  assert_eq!(remote.content("/srv/www/debug.log"), None);
  assert_eq!(remote.content("/srv/www/node_modules/left-pad/index.js"), None);
  assert!(!remote.dirs.lock().contains("/srv/www/node_modules"));
}

#[test]
fn test_copy_excludes_nested_paths() {
  let source = site();
  let remote = MemoryFs::default();
  let exclude = vec!["assets/img/**".to_string()];

  Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &exclude)
    .unwrap();

  assert_eq!(remote.content("/srv/www/assets/img/logo.svg"), None);
  assert!(remote.content("/srv/www/assets/app.js").is_some());
}

#[test]
fn test_same_size_files_are_skipped() {
  let source = site();
  let remote = MemoryFs::default()
    .with_file("/srv/www/index.html", "<h1>HELLO</h1>")
    .with_file("/srv/www/assets/app.js", "old");

  let stats = Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &["node_modules".to_string()])
    .unwrap();

  assert_eq!(
    stats,
    CopyStats {
      transferred: 3,
      skipped: 1
    }
  );
  // Same size, so the remote content is left alone
  assert_eq!(
    remote.content("/srv/www/index.html").as_deref(),
    Some("<h1>HELLO</h1>")
  );
  assert_eq!(
    remote.content("/srv/www/assets/app.js").as_deref(),
    Some("console.log(1)")
  );
  assert!(!remote.writes().contains(&"/srv/www/index.html".to_string()));
}

#[test]
fn test_second_copy_transfers_nothing() {
  let source = site();
  let remote = MemoryFs::default();
  let copier = Copier::new(&remote);

  copier.copy_path(source.path(), "/srv/www", &[]).unwrap();
  let stats = copier.copy_path(source.path(), "/srv/www", &[]).unwrap();

  assert_eq!(
    stats,
    CopyStats {
      transferred: 0,
      skipped: 5
    }
  );
}

#[test]
fn test_remote_directory_in_place_of_file() {
  let source = site();
  let remote = MemoryFs::default();
  remote.dirs.lock().insert("/srv/www/index.html".to_string());

  let exclude = vec![
    "assets".to_string(),
    "node_modules".to_string(),
    "*.log".to_string(),
  ];

  let stats = Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &exclude)
    .unwrap();

  assert_eq!(stats.transferred, 1);
}

#[test]
fn test_single_file_is_always_sent() {
  let source = site();
  let remote = MemoryFs::default().with_file("/etc/app/index.html", "<h1>hello</h1>");

  let stats = Copier::new(&remote)
    .copy_path(&source.path().join("index.html"), "/etc/app/index.html", &[])
    .unwrap();

  assert_eq!(stats.transferred, 1);
  assert!(remote.dirs.lock().contains("/etc/app"));
  assert_eq!(remote.writes(), vec!["/etc/app/index.html".to_string()]);
}

#[cfg(unix)]
#[test]
fn test_permissions_are_preserved() {
  use std::os::unix::fs::PermissionsExt;

  let source = site();
  let script = source.path().join("deploy.sh");
  fs::write(&script, "#!/bin/sh\n").unwrap();
  fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

  let remote = MemoryFs::default();
  Copier::new(&remote)
    .copy_path(&script, "/opt/deploy.sh", &[])
    .unwrap();

  assert_eq!(remote.modes.lock().get("/opt/deploy.sh"), Some(&0o750));
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_is_not_followed() {
  let source = tempfile::tempdir().unwrap();
  fs::write(source.path().join("a.txt"), "a").unwrap();
  std::os::unix::fs::symlink(".", source.path().join("loop")).unwrap();

  let remote = MemoryFs::default();
  let stats = Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &[])
    .unwrap();

  assert_eq!(stats.transferred, 1);
  assert_eq!(remote.writes(), vec!["/srv/www/a.txt".to_string()]);
  assert!(!remote.dirs.lock().contains("/srv/www/loop"));
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_is_skipped() {
  let source = site();
  std::os::unix::fs::symlink(
    source.path().join("node_modules/missing"),
    source.path().join("assets/stale"),
  )
  .unwrap();

  let remote = MemoryFs::default();
  let stats = Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &[])
    .unwrap();

  assert_eq!(stats.transferred, 5);
  assert_eq!(remote.content("/srv/www/assets/stale"), None);
}

#[test]
fn test_missing_source() {
  let source = site();
  let remote = MemoryFs::default();

  let err = Copier::new(&remote)
    .copy_path(&source.path().join("missing"), "/srv/www", &[])
    .unwrap_err();

  assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
fn test_remote_errors_propagate() {
  let source = site();
  let remote = MemoryFs {
    read_only: true,
    ..Default::default()
  };

  let err = Copier::new(&remote)
    .copy_path(source.path(), "/srv/www", &[])
    .unwrap_err();

  assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
}
