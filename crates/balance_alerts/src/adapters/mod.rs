// Rust guideline compliant 2026-10-19

//! Network adapters shared by the service binaries.
//!
//! Each sub-module implements one or more hexagonal port traits defined in the
//! `domain` crate. State stores and simulator adapters are pulled in per
//! binary with `#[path]`, so each binary compiles only the adapters it wires.

pub mod runpod_client;
pub mod telegram;
