use std::fmt::Debug;

use tracing::debug;

use crate::audit::ScopeAuditLog;
use crate::entry::{Action, Entry};
use crate::error::{RollbackError, ScopeError, SkippedCommit};

/// A reusable handle for scoped compensation.
///
/// A handle alternates between inactive and active. [`enter`] begins a
/// scope; the registration operations append actions while the scope is
/// active; [`exit`] resolves the scope against the observed outcome and
/// returns the handle to the inactive state. The handle is reusable, a
/// scope is consumed exactly once.
///
/// Rollback actions run in reverse registration order on abnormal exit.
/// Commit actions run in forward registration order on normal exit. Exit
/// actions run last on every path, in reverse registration order.
///
/// Handles are single-threaded: registered actions run on the caller's
/// thread of control and the handle is never shared. Nested scopes are
/// supported through separate handles only; re-entering an active handle
/// is an error.
///
/// # Examples
///
/// ```
/// use rollback_scope::CompensationScope;
///
/// #[derive(Debug)]
/// struct SyncError(&'static str);
///
/// let mut scope: CompensationScope<SyncError> = CompensationScope::new();
/// scope.enter()?;
///
/// // db_save() succeeded, cover it:
/// scope.on_failure(|| /* db_rollback() */ Ok(()))?;
/// scope.on_success(|| /* db_commit() */ Ok(()))?;
///
/// // webservice() succeeded, cover it:
/// scope.on_failure(|| /* webservice_rollback() */ Ok(()))?;
///
/// // log_file() succeeded; nothing left to fail, resolve the scope.
/// scope.exit(Ok(()))?;
/// # Ok::<(), rollback_scope::ScopeError<SyncError>>(())
/// ```
///
/// [`enter`]: CompensationScope::enter
/// [`exit`]: CompensationScope::exit
pub struct CompensationScope<E> {
    entries: Option<Vec<Entry<E>>>,
}

impl<E: Debug> CompensationScope<E> {
    /// Create an inactive handle.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: None }
    }

    /// Whether a scope is currently active on this handle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.entries.is_some()
    }

    /// Begin a scope on this handle.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Reentry`] if a scope is already active on this
    /// handle; the active scope's state is left untouched. Nested
    /// independent scopes require separate handles.
    pub fn enter(&mut self) -> Result<(), ScopeError<E>> {
        if self.entries.is_some() {
            return Err(ScopeError::Reentry);
        }
        self.entries = Some(Vec::new());
        Ok(())
    }

    /// Register a rollback action, run only if the scope exits abnormally.
    ///
    /// The action is not invoked at registration time. Rollback actions run
    /// in strict reverse registration order; two registrations from one
    /// conceptual step are two independent entries.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Inactive`] if no scope is active.
    pub fn on_failure<F>(&mut self, action: F) -> Result<(), ScopeError<E>>
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        self.push(Entry::Rollback(Box::new(action)))
    }

    /// Register a commit action, run only if the scope exits normally.
    ///
    /// Commit actions run in forward registration order and are assumed
    /// irreversible; see [`ScopeError::CommitFailed`] for what happens when
    /// one fails.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Inactive`] if no scope is active.
    pub fn on_success<F>(&mut self, action: F) -> Result<(), ScopeError<E>>
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        self.push(Entry::Commit(Box::new(action)))
    }

    /// Register an exit action, run on every exit path after the rollback
    /// or commit actions, in reverse registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Inactive`] if no scope is active.
    pub fn on_exit<F>(&mut self, action: F) -> Result<(), ScopeError<E>>
    where
        F: FnOnce() + 'static,
    {
        self.push(Entry::Always(Box::new(action)))
    }

    /// Terminate the scope with the observed outcome.
    ///
    /// `Ok(())` is a normal completion and runs the commit actions;
    /// `Err(trigger)` is an abnormal completion and runs the rollback
    /// actions. Either way the entry sequence is consumed and the handle
    /// returns to the inactive state.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Inactive`] if no scope is active. On abnormal
    /// exit, returns [`ScopeError::Aborted`] carrying the trigger unchanged
    /// once every rollback action completed, or
    /// [`ScopeError::RollbackFailed`] if rollback actions failed too. On
    /// normal exit, returns [`ScopeError::CommitFailed`] if a commit action
    /// failed. The triggering failure is never swallowed.
    pub fn exit(&mut self, outcome: Result<(), E>) -> Result<(), ScopeError<E>> {
        self.exit_internal(outcome).0
    }

    /// Terminate the scope and also return an audit log recording what
    /// happened to every registered action.
    ///
    /// # Errors
    ///
    /// As for [`exit`](CompensationScope::exit).
    pub fn exit_with_audit(
        &mut self,
        outcome: Result<(), E>,
    ) -> (Result<(), ScopeError<E>>, ScopeAuditLog) {
        self.exit_internal(outcome)
    }

    /// Run `body` inside a fresh scope on this handle.
    ///
    /// The scope is entered before `body` runs and exited with the body's
    /// outcome on every return path, so registered actions always resolve.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Reentry`] if a scope is already active, or any
    /// error [`exit`](CompensationScope::exit) produces for the body's
    /// outcome.
    pub fn run<T, F>(&mut self, body: F) -> Result<T, ScopeError<E>>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.enter()?;
        match body(self) {
            Ok(value) => self.exit(Ok(())).map(|()| value),
            Err(trigger) => Err(self
                .exit(Err(trigger))
                .expect_err("abnormal exit always surfaces an error")),
        }
    }

    fn push(&mut self, entry: Entry<E>) -> Result<(), ScopeError<E>> {
        self.entries
            .as_mut()
            .ok_or(ScopeError::Inactive)?
            .push(entry);
        Ok(())
    }

    fn exit_internal(
        &mut self,
        outcome: Result<(), E>,
    ) -> (Result<(), ScopeError<E>>, ScopeAuditLog) {
        let mut audit = ScopeAuditLog::new();
        let Some(entries) = self.entries.take() else {
            return (Err(ScopeError::Inactive), audit);
        };

        let mut rollbacks = Vec::new();
        let mut commits = Vec::new();
        let mut always = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            audit.record_registered(index, entry.kind());
            match entry {
                Entry::Rollback(action) => rollbacks.push((index, action)),
                Entry::Commit(action) => commits.push((index, action)),
                Entry::Always(action) => always.push((index, action)),
            }
        }

        let result = match outcome {
            Ok(()) => run_commits(commits, &mut audit),
            Err(trigger) => Err(roll_back(trigger, rollbacks, &mut audit)),
        };

        // Exit actions run last on every path, even after rollback or
        // commit failures.
        for (index, action) in always.into_iter().rev() {
            action();
            audit.record_ran(index);
        }

        (result, audit)
    }
}

impl<E: Debug> Default for CompensationScope<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn roll_back<E: Debug>(
    trigger: E,
    rollbacks: Vec<(usize, Action<E>)>,
    audit: &mut ScopeAuditLog,
) -> ScopeError<E> {
    debug!(actions = rollbacks.len(), "rolling back scope");
    let mut secondary = Vec::new();

    for (index, action) in rollbacks.into_iter().rev() {
        match action() {
            Ok(()) => audit.record_ran(index),
            Err(error) => {
                debug!(index, "rollback action failed");
                audit.record_failed(index);
                secondary.push(RollbackError { index, error });
            }
        }
    }

    if secondary.is_empty() {
        ScopeError::Aborted(trigger)
    } else {
        ScopeError::RollbackFailed { trigger, secondary }
    }
}

fn run_commits<E: Debug>(
    commits: Vec<(usize, Action<E>)>,
    audit: &mut ScopeAuditLog,
) -> Result<(), ScopeError<E>> {
    debug!(actions = commits.len(), "committing scope");
    let mut iter = commits.into_iter();

    while let Some((index, action)) = iter.next() {
        match action() {
            Ok(()) => audit.record_ran(index),
            Err(source) => {
                debug!(index, "commit action failed");
                audit.record_failed(index);
                let remaining = iter
                    .map(|(skipped_index, skipped_action)| {
                        SkippedCommit::new(skipped_index, skipped_action)
                    })
                    .collect();
                return Err(ScopeError::CommitFailed {
                    index,
                    source,
                    remaining,
                });
            }
        }
    }

    Ok(())
}
