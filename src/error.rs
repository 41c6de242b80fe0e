use thiserror::Error;

use crate::db::StoreError;
use crate::sync::TransactionError;

#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before touching the store.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, Error>;
