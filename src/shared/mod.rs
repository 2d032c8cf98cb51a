//! Shared Module
//!
//! The platform-agnostic progress core: the record model, the pure
//! operations that mutate it, the local/remote merge and the shared
//! configuration and error types.
//!
//! Nothing in this module performs I/O. The `client` module wraps these
//! types with the local snapshot file, the remote HTTP store and the
//! coordinator that owns the live record.

/// Progress record, patch and stage layout
pub mod progress;

/// Stage-progression operations
pub mod state_machine;

/// Local/remote reconciliation
pub mod merge;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use progress::{ProgressPatch, ProgressRecord, StageLayout};
pub use state_machine::{apply_update, begin, complete_room, stage_status, StageStatus};
pub use merge::merge;
pub use error::ProgressError;
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
