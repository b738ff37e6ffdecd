//! Scoped compensation for multi-step operations.
//!
//! This crate provides a compensation scope: a block of sequential
//! operations where each operation may register a rollback action (run if a
//! *later* operation in the same scope fails) and/or a commit action (run
//! only if the whole scope succeeds). Rollback actions run in reverse
//! registration order, commit actions in forward registration order, so an
//! ordered chain of heterogeneous side effects is undone in reverse
//! dependency order when any later step fails.

mod audit;
mod entry;
mod error;
mod scope;

pub use audit::{ActionKind, ActionRecord, ActionStatus, ScopeAuditLog};
pub use error::{RollbackError, ScopeError, SkippedCommit};
pub use scope::CompensationScope;
