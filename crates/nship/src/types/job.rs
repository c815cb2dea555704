use crate::Step;

/// An ordered list of steps deployed together. Steps are addressed by their
/// position, so reordering them invalidates previously stored hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
  pub name: String,
  pub steps: Vec<Step>,
}

impl Job {
  pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
    Job {
      name: name.into(),
      steps,
    }
  }

  pub fn default_name(position: usize) -> String {
    format!("job-{}", position + 1)
  }
}
