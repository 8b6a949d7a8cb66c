//! Dependency restore, gated against restore storms.
//!
//! Restores are expensive external-tool runs. Two guards bound them:
//! a global semaphore sized at half the available parallelism, and a
//! per-working-directory collapse so concurrent requests for the same
//! directory share one in-flight run instead of duplicating it.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, Semaphore};

use crate::events::{EventEmitter, ServerEvent};
use crate::process::ProcessRunner;

/// Invoked when a restore run fails.
pub type FailureCallback = Box<dyn FnOnce() + Send>;

/// Runs dependency restores through the external process runner.
pub struct RestoreService {
    runner: Arc<dyn ProcessRunner>,
    emitter: Arc<dyn EventEmitter>,
    semaphore: Arc<Semaphore>,
    in_flight: Mutex<HashMap<PathBuf, watch::Receiver<Option<bool>>>>,
    program: String,
    args: Vec<String>,
}

/// Semaphore size: half the available parallelism, at least one.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

impl RestoreService {
    /// Create a service invoking `program args…` per restore.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        emitter: Arc<dyn EventEmitter>,
        program: impl Into<String>,
        args: Vec<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            runner,
            emitter,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            in_flight: Mutex::new(HashMap::new()),
            program: program.into(),
            args,
        }
    }

    /// Restore dependencies for `working_dir`.
    ///
    /// Returns whether the restore succeeded. A request arriving while
    /// a restore for the same directory is in flight waits for that
    /// run's outcome instead of launching a second process. Failures
    /// are reported via the emitter and the optional `on_failure`
    /// callback; this method never returns an error.
    pub async fn restore(
        &self,
        working_dir: &Path,
        on_failure: Option<FailureCallback>,
    ) -> bool {
        let sender = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(receiver) = in_flight.get(working_dir) {
                let mut receiver = receiver.clone();
                drop(in_flight);
                return Self::await_outcome(&mut receiver).await;
            }
            let (sender, receiver) = watch::channel(None);
            in_flight.insert(working_dir.to_path_buf(), receiver);
            sender
        };

        self.emitter.emit(ServerEvent::RestoreStarted {
            directory: working_dir.to_path_buf(),
        });
        tracing::info!(directory = %working_dir.display(), "begin dependency restore");

        let succeeded = match self.semaphore.acquire().await {
            Ok(_permit) => match self
                .runner
                .run(&self.program, &self.args, working_dir)
                .await
            {
                Ok(status) => status.succeeded(),
                Err(error) => {
                    tracing::warn!(
                        directory = %working_dir.display(),
                        %error,
                        "restore process failed to run"
                    );
                    false
                }
            },
            // The semaphore is never closed while the service lives.
            Err(_) => false,
        };

        self.in_flight.lock().await.remove(working_dir);
        let _ = sender.send(Some(succeeded));

        self.emitter.emit(ServerEvent::RestoreFinished {
            directory: working_dir.to_path_buf(),
            succeeded,
        });
        tracing::info!(
            directory = %working_dir.display(),
            succeeded,
            "finish dependency restore"
        );

        if !succeeded {
            if let Some(callback) = on_failure {
                callback();
            }
        }
        succeeded
    }

    async fn await_outcome(receiver: &mut watch::Receiver<Option<bool>>) -> bool {
        loop {
            if let Some(outcome) = *receiver.borrow() {
                return outcome;
            }
            if receiver.changed().await.is_err() {
                // Leader dropped without publishing an outcome.
                return false;
            }
        }
    }
}
