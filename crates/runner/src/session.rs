use std::{
  io::{self, Read, Write},
  thread,
  time::Duration,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything a remote command printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
  pub stdout: String,
  pub stderr: String,
}

impl Output {
  pub fn combined(&self) -> String {
    format!("{}{}", self.stdout, self.stderr)
  }
}

/// Drains `stdout` and `stderr` at the same time, forwarding each to its sink
/// as it arrives and capturing it.
///
/// Returns once both readers hit end of stream. A reader reporting
/// [`io::ErrorKind::WouldBlock`] is polled again.
pub fn drain<O, E, OW, EW>(stdout: O, stdout_sink: OW, stderr: E, stderr_sink: EW) -> io::Result<Output>
where
  O: Read + Send,
  E: Read + Send,
  OW: Write + Send,
  EW: Write + Send,
{
  thread::scope(|scope| {
    let out = scope.spawn(move || tee(stdout, stdout_sink));
    let err = scope.spawn(move || tee(stderr, stderr_sink));

    let stdout = join(out)?;
    let stderr = join(err)?;

    Ok(Output {
      stdout: String::from_utf8_lossy(&stdout).into_owned(),
      stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
  })
}

fn tee(mut reader: impl Read, mut sink: impl Write) -> io::Result<Vec<u8>> {
  let mut captured = vec![];
  let mut buffer = [0u8; 8192];

  loop {
    match reader.read(&mut buffer) {
      Ok(0) => break,
      Ok(size) => {
        sink.write_all(&buffer[..size])?;
        sink.flush()?;
        captured.extend_from_slice(&buffer[..size]);
      }
      Err(err) if err.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
      Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
      Err(err) => return Err(err),
    }
  }

  Ok(captured)
}

fn join(handle: thread::ScopedJoinHandle<'_, io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
  handle
    .join()
    .map_err(|_| io::Error::new(io::ErrorKind::Other, "output reader panicked"))?
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  struct SlowReader {
    chunks: Vec<io::Result<Vec<u8>>>,
  }

  impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      if self.chunks.is_empty() {
        return Ok(0);
      }

      let chunk = self.chunks.remove(0)?;
      buf[..chunk.len()].copy_from_slice(&chunk);
      Ok(chunk.len())
    }
  }

  fn would_block() -> io::Result<Vec<u8>> {
    Err(io::Error::new(io::ErrorKind::WouldBlock, "again"))
  }

  #[test]
  fn test_drain() {
    let mut stdout_sink = vec![];
    let mut stderr_sink = vec![];

    let output = drain(
      Cursor::new("hello\nworld\n"),
      &mut stdout_sink,
      Cursor::new("warning: deprecated\n"),
      &mut stderr_sink,
    )
    .unwrap();

    assert_eq!(output.stdout, "hello\nworld\n");
    assert_eq!(output.stderr, "warning: deprecated\n");
    assert_eq!(output.combined(), "hello\nworld\nwarning: deprecated\n");
    assert_eq!(stdout_sink, b"hello\nworld\n");
    assert_eq!(stderr_sink, b"warning: deprecated\n");
  }

  #[test]
  fn test_drain_retries_would_block() {
    let stdout = SlowReader {
      chunks: vec![
        would_block(),
        Ok(b"first ".to_vec()),
        would_block(),
        would_block(),
        Ok(b"second".to_vec()),
      ],
    };
    let stderr = SlowReader {
      chunks: vec![would_block(), Ok(b"oops".to_vec())],
    };

    let output = drain(stdout, io::sink(), stderr, io::sink()).unwrap();

    assert_eq!(output.stdout, "first second");
    assert_eq!(output.stderr, "oops");
  }

  #[test]
  fn test_drain_error() {
    let stderr = SlowReader {
      chunks: vec![Err(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "channel closed",
      ))],
    };

    let err = drain(Cursor::new("ok"), io::sink(), stderr, io::sink()).unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
  }
}
