//! # Client Module
//!
//! Everything that touches the outside world around the progress core:
//!
//! - **`config`** - environment/TOML configuration and platform paths
//! - **`local_store`** - the on-disk snapshot of the live record
//! - **`remote`** - the HTTP client for the remote progress store
//! - **`sync`** - the coordinator that owns the live record
//! - **`command`** - command parsing and summaries for the `progress` binary
//!
//! ## Flow
//!
//! ```text
//! LocalSnapshotStore ──load──┐
//!                            ├─ merge ─> SyncCoordinator (live record)
//! RemoteProgressClient ─fetch┘                 │
//!        ^                                     │ update / complete_room
//!        └──── write (detached) <── save ──────┘
//! ```

pub mod config;
pub mod local_store;
pub mod remote;
pub mod sync;
pub mod command;

// Re-export commonly used types
pub use config::Config;
pub use local_store::LocalSnapshotStore;
pub use remote::{RemoteError, RemoteProgressClient};
pub use sync::{SyncCoordinator, SyncError};
