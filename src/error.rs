use crate::transaction::TransactionId;
use thiserror::Error;

/// The crate-wide result alias. Every fallible public operation returns this.
pub type DbResult<T> = Result<T, DbError>;

/// The crate-wide error type.
///
/// Every error kind named by the storage/execution core lives here; callers
/// match on variants rather than string messages.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("page is full")]
    PageFull,

    #[error("tuple is not on this page")]
    NotOnPage,

    #[error("invalid page id: {0:?}")]
    InvalidPageId(String),

    #[error("transaction {0:?} was aborted")]
    TransactionAborted(TransactionId),

    #[error("transaction {0:?} deadlocked and is the designated victim")]
    Deadlock(TransactionId),

    #[error("no clean page available for eviction")]
    NoCleanPage,

    #[error("iterator used before open or after close")]
    IteratorClosed,

    #[error("unsupported aggregate operation for this field type")]
    IllegalOp,

    #[error("no such field: {0}")]
    NoSuchField(String),

    #[error("malformed page data: {0}")]
    MalformedPage(String),

    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
