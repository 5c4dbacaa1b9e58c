//! Core domain + orchestration logic for chatsink.
//!
//! This crate is intentionally platform-agnostic. Telegram and Redis live
//! behind ports (traits) implemented in adapter crates; the binary crate
//! wires them together and owns the process fleet.

pub mod canonical;
pub mod config;
pub mod distributor;
pub mod errors;
pub mod logging;
pub mod provider;
pub mod sink;
pub mod supervisor;

pub use errors::{Error, Result};
