//! Transaction handles.

use sqlweave_core::IsolationLevel;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// An open transaction on a session.
///
/// Finish it with [`ReadOnlySession::commit`](crate::ReadOnlySession::commit)
/// or [`ReadOnlySession::rollback`](crate::ReadOnlySession::rollback). A handle
/// dropped without either is rolled back by the session before its next
/// operation, or when the session closes.
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    isolation: IsolationLevel,
    abandoned: Arc<AtomicBool>,
    completed: bool,
}

/// The session's side of an open transaction.
#[derive(Debug)]
pub(crate) struct ActiveTransaction {
    pub(crate) id: u64,
    abandoned: Arc<AtomicBool>,
}

impl ActiveTransaction {
    pub(crate) fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }
}

impl Transaction {
    pub(crate) fn begin(id: u64, isolation: IsolationLevel) -> (Self, ActiveTransaction) {
        let abandoned = Arc::new(AtomicBool::new(false));
        let active = ActiveTransaction {
            id,
            abandoned: Arc::clone(&abandoned),
        };
        let transaction = Self {
            id,
            isolation,
            abandoned,
            completed: false,
        };
        (transaction, active)
    }

    /// Session-local sequence number of this transaction.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Isolation level the transaction was started with.
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    pub(crate) fn belongs_to(&self, active: &ActiveTransaction) -> bool {
        self.id == active.id && Arc::ptr_eq(&self.abandoned, &active.abandoned)
    }

    pub(crate) fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                transaction = self.id,
                "Transaction dropped without commit or rollback; it will be rolled back"
            );
            self.abandoned.store(true, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_without_completion_marks_abandoned() {
        let (transaction, active) = Transaction::begin(1, IsolationLevel::Serializable);
        assert!(transaction.belongs_to(&active));
        assert_eq!(transaction.isolation_level(), IsolationLevel::Serializable);
        drop(transaction);
        assert!(active.is_abandoned());
    }

    #[test]
    fn test_completed_handle_is_not_abandoned() {
        let (mut transaction, active) = Transaction::begin(2, IsolationLevel::ReadCommitted);
        transaction.complete();
        drop(transaction);
        assert!(!active.is_abandoned());
    }

    #[test]
    fn test_handle_from_other_session_does_not_match() {
        let (transaction, _active) = Transaction::begin(1, IsolationLevel::ReadCommitted);
        let (mut other, other_active) = Transaction::begin(1, IsolationLevel::ReadCommitted);
        assert!(!transaction.belongs_to(&other_active));
        other.complete();
        let mut transaction = transaction;
        transaction.complete();
    }
}
