/// Which action list a registration targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Registered with `on_failure`.
    Rollback,
    /// Registered with `on_success`.
    Commit,
    /// Registered with `on_exit`.
    Always,
}

/// Final status of a registered action after scope exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActionStatus {
    /// The action was not run on this exit path.
    Skipped,
    /// The action ran and completed.
    Ran,
    /// The action ran and failed.
    Failed,
}

/// Record of one registered action.
#[derive(Debug)]
pub struct ActionRecord {
    /// Registration position within the scope.
    pub index: usize,
    /// Which list the action was registered on.
    pub kind: ActionKind,
    /// What happened to the action at exit.
    pub status: ActionStatus,
}

/// Audit log tracking every registered action across one scope exit.
#[derive(Debug, Default)]
pub struct ScopeAuditLog {
    records: Vec<ActionRecord>,
}

impl ScopeAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registered action. Records are added in registration order,
    /// so an action's record sits at its own index.
    pub(crate) fn record_registered(&mut self, index: usize, kind: ActionKind) {
        self.records.push(ActionRecord {
            index,
            kind,
            status: ActionStatus::Skipped,
        });
    }

    pub(crate) fn record_ran(&mut self, index: usize) {
        self.set_status(index, ActionStatus::Ran);
    }

    pub(crate) fn record_failed(&mut self, index: usize) {
        self.set_status(index, ActionStatus::Failed);
    }

    fn set_status(&mut self, index: usize, status: ActionStatus) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = status;
        }
    }

    /// All records, in registration order.
    #[must_use]
    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// Get a summary of the scope exit for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                ActionStatus::Ran => "✓",
                ActionStatus::Failed => "✗",
                ActionStatus::Skipped => "-",
            };
            let kind = match record.kind {
                ActionKind::Rollback => "rollback",
                ActionKind::Commit => "commit",
                ActionKind::Always => "always",
            };
            lines.push(format!("{status} {kind} action {}", record.index));
        }
        lines.join("\n")
    }
}
