//! Shared types for the Open511 schedule crates: the error type,
//! TOML configuration and structured trace events.

pub mod config;
pub mod error;
pub mod trace;

pub use error::{Error, Result};
