pub mod cli;
pub mod error;
pub mod spool;
pub mod validation;

// Re-export commonly used types
pub use error::SpoolError;
pub use spool::{DownRecord, MemoryStore, ServiceState, Spool, StatusStore};
