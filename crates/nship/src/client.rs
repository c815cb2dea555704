use crate::{Result, Step, Target};

/// # Client
/// One live connection to a target. A client turns a [`Step`] into a remote
/// side effect: a shell command, a file transfer or a Docker container
/// lifecycle.
///
/// A client is created per (target, job) by a [`ClientFactory`] and is always
/// closed by the [`Service`](crate::Service) once the job is done, whether
/// the job succeeded or not.
///
/// ## Example
///
/// ```rust
/// struct EchoClient;
///
/// #[nship::async_trait]
/// impl nship::Client for EchoClient {
///   async fn execute_step(
///     &mut self,
///     step: &nship::Step,
///     number: usize,
///     total: usize,
///   ) -> nship::Result<()> {
///     println!("[{}/{}] {}", number, total, step.describe());
///     Ok(())
///   }
///
///   async fn close(&mut self) -> nship::Result<()> {
///     Ok(())
///   }
/// }
/// ```
#[async_trait::async_trait]
pub trait Client: Send {
  /// `number` is 1-based, `total` is the number of steps in the job.
  async fn execute_step(&mut self, step: &Step, number: usize, total: usize) -> Result<()>;

  async fn close(&mut self) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ClientFactory: Send + Sync {
  async fn connect(&self, target: &Target) -> Result<Box<dyn Client>>;
}
