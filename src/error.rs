use std::path::PathBuf;
use thiserror::Error;

/// Errors from the spool store.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// The spool directory is missing, not a directory, or lacks the
    /// requested permissions at configure time.
    #[error("spool directory {path:?} is not usable: {detail}")]
    Configuration { path: PathBuf, detail: String },

    /// I/O failed while reading or writing a marker after the store was
    /// successfully configured.
    #[error("spool operation failed on {path:?}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A marker file exists but its contents are not a valid record.
    #[error("malformed down-marker at {path:?}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The service name cannot be used as a spool key.
    #[error("invalid service name {name:?}: {detail}")]
    InvalidService { name: String, detail: String },
}
