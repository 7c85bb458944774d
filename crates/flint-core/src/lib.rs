//! Flint Core - Foundational types for the Flint engine
//!
//! This crate provides the error type and result alias that the rest of
//! the engine depends on.

mod error;

pub use error::{FlintError, Result};
