use anyhow::{Context, Result};
use clap::Parser;
use nship::{find_config, Config, Environment, FileHashStore, Service};
use nship_runner::SshClientFactory;
use std::{path::PathBuf, process::ExitCode, sync::Arc};

const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Parser, Debug)]
#[command(name = "nship")]
#[command(version, about = "Deploy jobs to remote targets over SSH, skipping unchanged steps")]
struct Cli {
  /// Config file, defaults to nship.yaml or nship.yml in the current directory
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Run only this job
  #[arg(short, long)]
  job: Option<String>,

  /// Env files used for ${VAR} substitution, later files win
  #[arg(short, long = "env-file", value_delimiter = ',')]
  env_file: Vec<PathBuf>,

  /// Run every step even if it did not change
  #[arg(long)]
  no_skip: bool,

  /// Forget every stored step hash before running
  #[arg(long)]
  clear_hashes: bool,

  /// More output, repeat for trace logs
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();

  nship_logger::init_logger(cli.verbose);

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      log::error!("{:#}", err);
      ExitCode::FAILURE
    }
  }
}

async fn run(cli: Cli) -> Result<()> {
  let cwd = std::env::current_dir().context("Failed to read the current directory")?;

  let mut env = Environment::from_process();
  if cli.env_file.is_empty() {
    let default_env_file = cwd.join(DEFAULT_ENV_FILE);
    if default_env_file.is_file() {
      env.load_file(&default_env_file)?;
    }
  }
  for env_file in &cli.env_file {
    env.load_file(env_file)?;
  }

  let config_path = find_config(cli.config.as_deref(), &cwd)?;
  let mut config = Config::load(&config_path, &env)?;

  if let Some(job) = &cli.job {
    config = config.select_job(job)?;
  }

  let service = Service::builder()
    .client_factory(Arc::new(SshClientFactory::new()))
    .hash_store(Arc::new(FileHashStore::default()))
    .skip_unchanged(!cli.no_skip)
    .build()?;

  if cli.clear_hashes {
    service.clear_hashes()?;
    log::info!("Cleared stored step hashes");
  }

  log::info!(
    "Deploying {} job(s) to {} target(s) from {}",
    config.jobs.len(),
    config.targets.len(),
    config_path.display()
  );

  let results = service.run(&config.targets, &config.jobs).await?;

  let executed: usize = results.iter().map(|result| result.executed().len()).sum();
  let skipped: usize = results.iter().map(|result| result.skipped().len()).sum();

  log::info!(
    "Deployment finished: {} step(s) executed, {} skipped",
    executed,
    skipped
  );

  Ok(())
}
