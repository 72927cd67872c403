use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("document store: {0}")]
    Document(#[from] redb::Error),
    #[error("document encoding: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("invalid collection name {0:?}: must not be blank")]
    InvalidCollection(String),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Collapse redb's per-operation error types into [`StoreError::Document`].
pub(crate) fn doc_err<E: Into<redb::Error>>(err: E) -> StoreError {
    StoreError::Document(err.into())
}
