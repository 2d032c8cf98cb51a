//! Integration tests against a mock remote progress store

pub mod sync_test;
