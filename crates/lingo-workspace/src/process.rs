//! The external process-runner collaborator.
use std::path::Path;

use async_trait::async_trait;

/// Exit status of an external tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(pub i32);

impl ExitStatus {
    /// Whether the process exited cleanly.
    pub fn succeeded(&self) -> bool {
        self.0 == 0
    }
}

/// Runs external build/restore tools.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` in `working_dir` and wait for exit.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> std::io::Result<ExitStatus>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Default)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> std::io::Result<ExitStatus> {
        let status = tokio::process::Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .status()
            .await?;
        Ok(ExitStatus(status.code().unwrap_or(-1)))
    }
}
