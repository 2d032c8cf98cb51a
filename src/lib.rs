//! Escape Progress - Main Library
//!
//! Tracks a team's progress through a sequence of escape-room stages and
//! keeps it durable across restarts and devices, by reconciling a fast
//! local snapshot with a slower, authoritative remote record.
//!
//! # Module Structure
//!
//! - **`shared`** - The progress core, free of I/O
//!   - `ProgressRecord`, `ProgressPatch`, `StageLayout`
//!   - `apply_update` / `complete_room` state machine
//!   - `merge` of local and remote records
//!   - Error and configuration types
//!
//! - **`client`** - Adapters and orchestration
//!   - Local snapshot file
//!   - Remote progress store over HTTP
//!   - `SyncCoordinator` owning the live record
//!
//! # Usage
//!
//! ```rust,no_run
//! use escape_progress::client::{Config, SyncCoordinator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut coordinator = SyncCoordinator::new(&Config::from_env()?);
//! coordinator.load().await;
//! coordinator.begin("Alpha").await?;
//! coordinator.complete_room(1)?;
//! coordinator.flush().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Guarantees
//!
//! - Completed stages are never duplicated or lost.
//! - `startTime`, `endTime` and stage entry times are fixed once set.
//! - `currentRoom` never decreases.
//! - No storage failure is fatal; the worst case is progress that only
//!   lives locally until the next successful write.
//!
//! # Error Handling
//!
//! - `Result<T, E>` for fallible operations
//! - Custom error types in `shared::error`, `shared::config`,
//!   `client::remote` and `client::sync`

/// Progress core shared by every surface
pub mod shared;

/// Storage adapters and the sync coordinator
pub mod client;
