#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
  Executed,
  Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRunResult {
  /// 1-based position of the step in its job
  pub number: usize,
  pub state: StepState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRunResult {
  pub target: String,
  pub job: String,
  pub steps: Vec<StepRunResult>,
}

impl JobRunResult {
  pub fn executed(&self) -> Vec<usize> {
    self.numbers_in(StepState::Executed)
  }

  pub fn skipped(&self) -> Vec<usize> {
    self.numbers_in(StepState::Skipped)
  }

  fn numbers_in(&self, state: StepState) -> Vec<usize> {
    self
      .steps
      .iter()
      .filter(|step| step.state == state)
      .map(|step| step.number)
      .collect()
  }
}
