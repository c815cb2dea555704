use colored::Colorize;
use log::{Level, LevelFilter};
use std::sync::OnceLock;

/// Terminal logger for nship. Step output from remote hosts is written
/// straight to stdout/stderr, so log lines go to stderr to keep the two apart.
#[derive(Clone)]
pub struct Logger {
  max_level: LevelFilter,
}

impl Logger {
  pub fn new(max_level: LevelFilter) -> Self {
    Logger { max_level }
  }

  fn format(&self, record: &log::Record) -> String {
    let time = chrono::Local::now()
      .format("%Y-%m-%d %H:%M:%S")
      .to_string()
      .magenta();

    let level = match record.level() {
      Level::Error => "ERROR".red(),
      Level::Warn => "WARN".yellow(),
      Level::Info => "INFO".green(),
      Level::Debug => "DEBUG".blue(),
      Level::Trace => "TRACE".dimmed(),
    };

    // file:line prefix at trace level only
    let prefix = match (self.max_level >= LevelFilter::Trace, record.file(), record.line()) {
      (true, Some(file), Some(line)) => format!("{}:{} ", file, line).cyan().to_string(),
      _ => String::new(),
    };

    format!("{}{} {} {}", prefix, time, level, record.args())
  }
}

impl log::Log for Logger {
  fn enabled(&self, metadata: &log::Metadata) -> bool {
    metadata.level() <= self.max_level
  }

  fn log(&self, record: &log::Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    eprintln!("{}", self.format(record));
  }

  fn flush(&self) {}
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Installs the global logger. `verbose` lowers the level from `Info` to
/// `Debug`, twice to `Trace`. Later calls are no-ops.
pub fn init_logger(verbose: u8) {
  if LOGGER.get().is_some() {
    return;
  }

  let max_level = match verbose {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };

  let logger = LOGGER.get_or_init(|| Logger::new(max_level));

  if log::set_logger(logger).is_ok() {
    log::set_max_level(max_level);
  }
}
