//! The file-system watcher collaborator.
//!
//! Project systems subscribe to paths or whole extensions; the host
//! wires a real watcher in production. [`ManualWatcher`] dispatches
//! notifications by hand and drives the reconciliation tests.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lingo_protocol::request::ChangeKind;

/// Callback invoked when a watched file changes.
pub type WatchCallback = Box<dyn Fn(&Path, ChangeKind) + Send + Sync>;

/// What a subscription covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// A single file path.
    Path(PathBuf),
    /// Every file with the given extension (without the dot).
    Extension(String),
}

impl WatchTarget {
    fn matches(&self, path: &Path) -> bool {
        match self {
            WatchTarget::Path(p) => p == path,
            WatchTarget::Extension(ext) => {
                path.extension().and_then(|e| e.to_str()) == Some(ext.as_str())
            }
        }
    }
}

/// Delivers file-change notifications to registered callbacks.
pub trait FileWatcher: Send + Sync {
    /// Subscribe `callback` to changes covered by `target`.
    fn watch(&self, target: WatchTarget, callback: WatchCallback);
}

/// An in-memory watcher driven by explicit [`ManualWatcher::notify`]
/// calls.
#[derive(Default)]
pub struct ManualWatcher {
    subscriptions: Mutex<Vec<(WatchTarget, WatchCallback)>>,
}

impl ManualWatcher {
    /// Create a watcher with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a change notification to every matching subscription.
    pub fn notify(&self, path: &Path, kind: ChangeKind) {
        let guard = match self.subscriptions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (target, callback) in guard.iter() {
            if target.matches(path) {
                callback(path, kind);
            }
        }
    }

    /// Number of registered subscriptions.
    pub fn subscription_count(&self) -> usize {
        match self.subscriptions.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl FileWatcher for ManualWatcher {
    fn watch(&self, target: WatchTarget, callback: WatchCallback) {
        let mut guard = match self.subscriptions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((target, callback));
    }
}
