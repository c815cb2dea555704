use crate::{
  ClientFactory, Error, HashStore, Job, JobRunResult, Result, StepHasher, StepRunResult,
  StepState, Target,
};
use std::sync::Arc;

/// Runs jobs on targets, one step at a time.
///
/// Targets are visited in order and, for each target, jobs in order. Nothing
/// runs in parallel. A step is skipped when its fingerprint matches the one
/// stored after its last successful run, until some step of the job
/// executes: from then on every later step of that job executes too.
pub struct Service {
  client_factory: Arc<dyn ClientFactory>,
  hash_store: Option<Arc<dyn HashStore>>,
  hasher: StepHasher,
  skip_unchanged: bool,
}

impl Service {
  pub fn builder() -> ServiceBuilder {
    ServiceBuilder::new()
  }

  pub fn skip_unchanged(&self) -> bool {
    self.skip_unchanged
  }

  /// Runs every job on every target and stops at the first failing job.
  pub async fn run(&self, targets: &[Target], jobs: &[Job]) -> Result<Vec<JobRunResult>> {
    let mut results = Vec::with_capacity(targets.len() * jobs.len());

    for target in targets {
      for job in jobs {
        results.push(self.run_job(target, job).await?);
      }
    }

    Ok(results)
  }

  pub async fn run_job(&self, target: &Target, job: &Job) -> Result<JobRunResult> {
    let target_name = target.name();

    log::info!("Running job '{}' on target '{}'", job.name, target_name);

    let mut client = self.client_factory.connect(target).await?;

    let result = self.execute_steps(client.as_mut(), target, job).await;

    if let Err(err) = client.close().await {
      log::warn!(
        "Failed to close connection to target '{}': {}",
        target_name,
        err
      );
    }

    let result = result?;

    log::info!(
      "Job '{}' finished on target '{}': {} executed, {} skipped",
      job.name,
      target_name,
      result.executed().len(),
      result.skipped().len()
    );

    Ok(result)
  }

  pub fn clear_hashes(&self) -> Result<()> {
    match &self.hash_store {
      Some(store) => store.clear(),
      None => Ok(()),
    }
  }

  async fn execute_steps(
    &self,
    client: &mut dyn crate::Client,
    target: &Target,
    job: &Job,
  ) -> Result<JobRunResult> {
    let target_name = target.name();
    let total = job.steps.len();
    let mut force_execute = false;
    let mut steps = Vec::with_capacity(total);

    for (index, step) in job.steps.iter().enumerate() {
      let number = index + 1;

      let hash = match self.hasher.compute_hash(step, target) {
        Ok(hash) => Some(hash),
        Err(err) => {
          log::warn!(
            "[{}/{}] Could not fingerprint step, running it: {}",
            number,
            total,
            err
          );
          None
        }
      };

      let stored = self.stored_hash(target_name, &job.name, index);

      if !self.should_execute_step(force_execute, hash.as_deref(), stored.as_deref()) {
        log::info!(
          "[{}/{}] Skipping unchanged {} step: {}",
          number,
          total,
          step.kind(),
          step.describe()
        );
        steps.push(StepRunResult {
          number,
          state: StepState::Skipped,
        });
        continue;
      }

      log::info!(
        "[{}/{}] Running {} step: {}",
        number,
        total,
        step.kind(),
        step.describe()
      );

      client
        .execute_step(step, number, total)
        .await
        .map_err(|err| Error::job_failed(&job.name, target_name, number, err))?;

      // Later steps may depend on what this one changed
      force_execute = true;

      steps.push(StepRunResult {
        number,
        state: StepState::Executed,
      });

      if let (Some(store), Some(hash)) = (&self.hash_store, hash) {
        if let Err(err) = store.save_hash(target_name, &job.name, index, &hash) {
          log::warn!("[{}/{}] Failed to save step hash: {}", number, total, err);
        }
      }
    }

    Ok(JobRunResult {
      target: target_name.to_string(),
      job: job.name.clone(),
      steps,
    })
  }

  fn stored_hash(&self, target: &str, job: &str, index: usize) -> Option<String> {
    let store = self.hash_store.as_ref()?;

    match store.get_hash(target, job, index) {
      Ok(hash) => hash,
      Err(err) => {
        log::warn!("Failed to read stored hash: {}", err);
        None
      }
    }
  }

  pub fn should_execute_step(
    &self,
    force_execute: bool,
    computed: Option<&str>,
    stored: Option<&str>,
  ) -> bool {
    if force_execute || !self.skip_unchanged || self.hash_store.is_none() {
      return true;
    }

    match (computed, stored) {
      (Some(computed), Some(stored)) => stored.is_empty() || computed != stored,
      _ => true,
    }
  }
}

pub struct ServiceBuilder {
  client_factory: Option<Arc<dyn ClientFactory>>,
  hash_store: Option<Arc<dyn HashStore>>,
  skip_unchanged: bool,
}

impl ServiceBuilder {
  pub fn new() -> Self {
    ServiceBuilder {
      client_factory: None,
      hash_store: None,
      skip_unchanged: true,
    }
  }

  pub fn client_factory(mut self, client_factory: Arc<dyn ClientFactory>) -> Self {
    self.client_factory = Some(client_factory);
    self
  }

  pub fn hash_store(mut self, hash_store: Arc<dyn HashStore>) -> Self {
    self.hash_store = Some(hash_store);
    self
  }

  pub fn skip_unchanged(mut self, skip_unchanged: bool) -> Self {
    self.skip_unchanged = skip_unchanged;
    self
  }

  pub fn build(self) -> Result<Service> {
    let client_factory = self
      .client_factory
      .ok_or(Error::config_error("Client factory is not set in service builder"))?;

    Ok(Service {
      client_factory,
      hash_store: self.hash_store,
      hasher: StepHasher::new(),
      skip_unchanged: self.skip_unchanged,
    })
  }
}

impl Default for ServiceBuilder {
  fn default() -> Self {
    Self::new()
  }
}
