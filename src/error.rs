use thiserror::Error;

/// Errors produced while building or reading string tables.
#[derive(Error, Debug)]
pub enum Error {
    /// Perfect hash construction was asked to encode zero keys.
    #[error("cannot build a perfect hash over an empty key set")]
    EmptyInput,

    /// No displacement within the iteration budget placed a bucket.
    #[error("perfect hash construction failed after {iterations} iterations")]
    ConstructionFailed { iterations: u32 },

    /// The inline fallback is too large to store in the sidecar.
    #[error("table {table:?} needs {size} inline bytes, limit is {limit}")]
    TableTooLarge {
        table: String,
        size: usize,
        limit: usize,
    },

    /// A key or value cannot be stored as a null-terminated string.
    #[error("invalid string content: {0}")]
    InvalidStringContent(String),

    /// The verification pass found a key resolving to the wrong slot.
    #[error("perfect hash integrity check failed for key {key:?}")]
    ConstructionIntegrity { key: String },

    /// The key is not present in the table.
    #[error("key not found")]
    NotFound,

    /// The same table name was given twice to one write.
    #[error("duplicate table {0:?}")]
    DuplicateTable(String),

    /// The table name is not present in the file.
    #[error("unknown table {0:?}")]
    UnknownTable(String),

    /// A section descriptor or element index points outside the mapped bytes.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sidecar error: {0}")]
    Sidecar(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
