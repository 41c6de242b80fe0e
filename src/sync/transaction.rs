//! Transaction coordinator.
//!
//! Drives one unit of work through `Idle -> Open -> Committed | RolledBack`.
//! A failed phase rolls the unit back and reports the phase and its cause;
//! if the rollback fails as well both errors are kept.

use std::fmt;

use thiserror::Error;

use crate::db::{RaceStore, StoreError, UnitOfWork};

/// Write phase that failed inside a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Races,
    Languages,
    Links,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Races => write!(f, "race population"),
            Phase::Languages => write!(f, "language population"),
            Phase::Links => write!(f, "link population"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Open,
    Committed,
    RolledBack,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxState::Idle => write!(f, "idle"),
            TxState::Open => write!(f, "open"),
            TxState::Committed => write!(f, "committed"),
            TxState::RolledBack => write!(f, "rolled back"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("failed to open transaction: {0}")]
    Begin(#[source] StoreError),

    #[error("{phase} failed, transaction rolled back: {cause}")]
    Aborted {
        phase: Phase,
        #[source]
        cause: StoreError,
    },

    #[error("{phase} failed ({cause}) and rollback failed: {rollback}")]
    RollbackFailed {
        phase: Phase,
        #[source]
        cause: StoreError,
        rollback: StoreError,
    },

    #[error("commit failed: {0}")]
    Commit(#[source] StoreError),

    #[error("transaction is {0}, not open")]
    NotOpen(TxState),
}

impl TransactionError {
    /// The store error that started the failure.
    pub fn cause(&self) -> Option<&StoreError> {
        match self {
            TransactionError::Begin(e) | TransactionError::Commit(e) => Some(e),
            TransactionError::Aborted { cause, .. }
            | TransactionError::RollbackFailed { cause, .. } => Some(cause),
            TransactionError::NotOpen(_) => None,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            TransactionError::Aborted { phase, .. }
            | TransactionError::RollbackFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub struct Transaction<U: UnitOfWork> {
    state: TxState,
    unit: Option<U>,
}

impl<U: UnitOfWork> Default for Transaction<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: UnitOfWork> Transaction<U> {
    pub fn new() -> Self {
        Self {
            state: TxState::Idle,
            unit: None,
        }
    }

    /// Create a coordinator and open it against `store`.
    pub async fn begin<S>(store: &S) -> Result<Self, TransactionError>
    where
        S: RaceStore<Unit = U> + ?Sized,
    {
        let mut tx = Self::new();
        tx.open(store).await?;
        Ok(tx)
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub async fn open<S>(&mut self, store: &S) -> Result<(), TransactionError>
    where
        S: RaceStore<Unit = U> + ?Sized,
    {
        if self.state != TxState::Idle {
            return Err(TransactionError::NotOpen(self.state));
        }
        let unit = store.begin().await.map_err(|e| {
            tracing::error!("Failed to create transaction: {}", e);
            TransactionError::Begin(e)
        })?;
        self.unit = Some(unit);
        self.state = TxState::Open;
        Ok(())
    }

    /// The open unit of work.
    pub fn unit(&mut self) -> Result<&mut U, TransactionError> {
        match (self.state, self.unit.as_mut()) {
            (TxState::Open, Some(unit)) => Ok(unit),
            (state, _) => Err(TransactionError::NotOpen(state)),
        }
    }

    pub async fn commit(&mut self) -> Result<(), TransactionError> {
        let unit = self.take_open()?;
        match unit.commit().await {
            Ok(()) => {
                self.state = TxState::Committed;
                Ok(())
            }
            Err(e) => {
                // A failed commit leaves nothing applied.
                tracing::error!("Commit transaction failed: {}", e);
                self.state = TxState::RolledBack;
                Err(TransactionError::Commit(e))
            }
        }
    }

    /// Roll back after `phase` failed with `cause` and return the error to
    /// hand to the caller.
    pub async fn abort(&mut self, phase: Phase, cause: StoreError) -> TransactionError {
        tracing::warn!("{} failed, rolling back: {}", phase, cause);
        let unit = match self.take_open() {
            Ok(unit) => unit,
            Err(e) => return e,
        };
        self.state = TxState::RolledBack;
        match unit.rollback().await {
            Ok(()) => TransactionError::Aborted { phase, cause },
            Err(rollback) => {
                tracing::error!("Rollback failed after {} error: {}", phase, rollback);
                TransactionError::RollbackFailed {
                    phase,
                    cause,
                    rollback,
                }
            }
        }
    }

    fn take_open(&mut self) -> Result<U, TransactionError> {
        if self.state != TxState::Open {
            return Err(TransactionError::NotOpen(self.state));
        }
        self.unit.take().ok_or(TransactionError::NotOpen(self.state))
    }
}

impl<U: UnitOfWork> Drop for Transaction<U> {
    fn drop(&mut self) {
        if self.state == TxState::Open {
            tracing::warn!("Transaction dropped while open; its writes are discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryUnit;
    use crate::db::{FailPoint, MemoryRaceStore};
    use crate::models::Race;

    #[tokio::test]
    async fn test_commit_moves_to_committed() {
        let store = MemoryRaceStore::new();
        let mut tx: Transaction<MemoryUnit> = Transaction::new();
        assert_eq!(tx.state(), TxState::Idle);

        tx.open(&store).await.unwrap();
        assert_eq!(tx.state(), TxState::Open);

        tx.unit().unwrap().insert_language("Common").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(tx.state(), TxState::Committed);
        assert_eq!(store.list_languages().await.unwrap(), vec!["Common"]);
    }

    #[tokio::test]
    async fn test_abort_rolls_back_and_keeps_cause() {
        let store = MemoryRaceStore::new();
        let mut tx: Transaction<MemoryUnit> = Transaction::begin(&store).await.unwrap();
        tx.unit().unwrap().insert_race(&Race::new("Elf")).await.unwrap();

        let cause = StoreError::Query("boom".to_string());
        let err = tx.abort(Phase::Links, cause.clone()).await;

        assert_eq!(tx.state(), TxState::RolledBack);
        assert!(matches!(err, TransactionError::Aborted { phase: Phase::Links, .. }));
        assert_eq!(err.cause(), Some(&cause));
        assert!(store.list_races().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_failure_reports_both_errors() {
        let store = MemoryRaceStore::new();
        store.fail_at(FailPoint::Rollback);
        let mut tx: Transaction<MemoryUnit> = Transaction::begin(&store).await.unwrap();

        let err = tx
            .abort(Phase::Races, StoreError::Query("copy failed".to_string()))
            .await;

        match &err {
            TransactionError::RollbackFailed { phase, cause, rollback } => {
                assert_eq!(*phase, Phase::Races);
                assert_eq!(cause, &StoreError::Query("copy failed".to_string()));
                assert!(matches!(rollback, StoreError::Query(_)));
            }
            other => panic!("expected RollbackFailed, got {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("copy failed"));
        assert!(message.contains("Rollback"));
    }

    #[tokio::test]
    async fn test_commit_failure_is_distinct_error() {
        let store = MemoryRaceStore::new();
        store.fail_at(FailPoint::Commit);
        let mut tx: Transaction<MemoryUnit> = Transaction::begin(&store).await.unwrap();
        tx.unit().unwrap().insert_language("Common").await.unwrap();

        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, TransactionError::Commit(_)));
        assert_eq!(tx.state(), TxState::RolledBack);
        assert!(store.list_languages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_begin_failure_stays_idle() {
        let store = MemoryRaceStore::new();
        store.fail_at(FailPoint::Begin);
        let mut tx: Transaction<MemoryUnit> = Transaction::new();
        let err = tx.open(&store).await.unwrap_err();
        assert!(matches!(err, TransactionError::Begin(StoreError::Unavailable(_))));
        assert_eq!(tx.state(), TxState::Idle);
    }

    #[tokio::test]
    async fn test_unit_after_commit_is_not_open() {
        let store = MemoryRaceStore::new();
        let mut tx: Transaction<MemoryUnit> = Transaction::begin(&store).await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(
            tx.unit(),
            Err(TransactionError::NotOpen(TxState::Committed))
        ));
        assert!(matches!(
            tx.commit().await,
            Err(TransactionError::NotOpen(TxState::Committed))
        ));
    }
}
