use thiserror::Error;

/// Errors returned by catalog operations.
///
/// Validation failures are always reported before anything is written, so a
/// failed `create_table` leaves no namespace state behind.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("corrupt table scheme: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Substrate(#[from] redb::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }
}

// redb splits its errors per call site; all of them surface unmodified as Substrate.
impl From<redb::DatabaseError> for Error {
    fn from(e: redb::DatabaseError) -> Self {
        Error::Substrate(e.into())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Error::Substrate(e.into())
    }
}

impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Error::Substrate(e.into())
    }
}

impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Error::Substrate(e.into())
    }
}

impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Error::Substrate(e.into())
    }
}
