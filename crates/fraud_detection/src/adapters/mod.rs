// Rust guideline compliant 2026-10-16

//! Adapters (secondary ports) for the fraud-detection binary.
//!
//! Each sub-module implements one or more port traits defined in the `domain`
//! crate.

pub mod in_memory_queue;
pub mod log_topic;
