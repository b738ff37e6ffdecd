use std::fmt::{self, Debug};

use thiserror::Error;

use crate::entry::Action;

/// Error from a failed rollback action.
#[derive(Debug, Error)]
#[error("rollback action {index} failed")]
pub struct RollbackError<E> {
    /// Registration position of the action within the scope.
    pub index: usize,
    /// The underlying error.
    #[source]
    pub error: E,
}

/// A commit action that was never run because an earlier commit action
/// failed.
///
/// The original action is kept so the caller can decide whether manual
/// remediation is needed and run it afterwards.
pub struct SkippedCommit<E> {
    index: usize,
    action: Action<E>,
}

impl<E> SkippedCommit<E> {
    pub(crate) fn new(index: usize, action: Action<E>) -> Self {
        Self { index, action }
    }

    /// Registration position of the action within the scope.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Run the skipped action, consuming it.
    ///
    /// # Errors
    ///
    /// Returns the action's own error if it fails.
    pub fn run(self) -> Result<(), E> {
        (self.action)()
    }
}

impl<E> fmt::Debug for SkippedCommit<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkippedCommit")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Error from resolving a compensation scope.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScopeError<E: Debug> {
    /// `enter` was called while a scope was already active on the handle.
    #[error("a compensation scope is already active on this handle")]
    Reentry,

    /// A registration or exit call was made without an active scope.
    #[error("no compensation scope is active on this handle")]
    Inactive,

    /// The scope body failed and every rollback action completed.
    ///
    /// Carries the triggering failure unchanged.
    #[error("scope aborted")]
    Aborted(#[source] E),

    /// The scope body failed and one or more rollback actions failed too.
    #[error("scope aborted, and {} rollback action(s) also failed", secondary.len())]
    RollbackFailed {
        /// The failure that triggered the rollback.
        trigger: E,
        /// Rollback failures, in the order the actions ran.
        secondary: Vec<RollbackError<E>>,
    },

    /// A commit action failed during normal exit.
    ///
    /// Already-run commit actions are not rolled back; the not-yet-run
    /// actions are returned for manual remediation.
    #[error("commit action {index} failed, {} commit action(s) not run", remaining.len())]
    CommitFailed {
        /// Registration position of the failing action.
        index: usize,
        /// The failing action's error.
        #[source]
        source: E,
        /// Commit actions that were not run, in registration order.
        remaining: Vec<SkippedCommit<E>>,
    },
}

impl<E: Debug> ScopeError<E> {
    /// The failure that triggered an abnormal exit, if this error carries
    /// one.
    #[must_use]
    pub fn trigger(&self) -> Option<&E> {
        match self {
            Self::Aborted(trigger) | Self::RollbackFailed { trigger, .. } => Some(trigger),
            _ => None,
        }
    }
}
