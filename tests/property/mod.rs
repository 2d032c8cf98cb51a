//! Property-based tests

pub mod progress_proptest;
