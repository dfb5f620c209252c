// Seams between the resolver components

use async_trait::async_trait;

use super::errors::ResolveError;
use super::models::{Milestone, ProbedSize};

/// Measures a remote locator's size without fetching its body
#[async_trait]
pub trait SizeProber: Send + Sync {
    /// Never fails: any problem yields `ProbedSize::unknown()`
    async fn probe(&self, locator: &str) -> ProbedSize;
}

/// Runs the external short-link tool in "print direct locators" mode
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Name of the runner (for logging)
    fn name(&self) -> &'static str;

    /// Full standard output of one invocation against `url`.
    /// Non-zero exit is an error.
    async fn run(&self, url: &str) -> Result<String, ResolveError>;
}

/// Receives progress milestones for caller-visible feedback.
///
/// Must return quickly; errors are logged and ignored.
pub trait ProgressSink: Send + Sync {
    fn update(&self, milestone: &Milestone) -> Result<(), String>;
}

/// Sink that drops every milestone
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _milestone: &Milestone) -> Result<(), String> {
        Ok(())
    }
}

/// Sink that logs milestones through `tracing`
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&self, milestone: &Milestone) -> Result<(), String> {
        tracing::info!(status = %milestone, "progress");
        Ok(())
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&Milestone) -> Result<(), String> + Send + Sync,
{
    fn update(&self, milestone: &Milestone) -> Result<(), String> {
        self(milestone)
    }
}
