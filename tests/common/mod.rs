//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Record fixtures with fixed timestamps
//! - A mock remote progress store
//! - Custom assertion macros

pub mod assertions;
pub mod mock_server;

// Re-export commonly used utilities
pub use fixtures::*;
pub use mock_server::*;
