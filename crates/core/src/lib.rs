//! Core types for SnapDB
//!
//! This crate defines what every other layer shares:
//! - Error: Error type hierarchy for the writer and the store
//! - Codec: JSON encode/decode and the round-trip deep copy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;

pub use codec::{decode, deep_copy, encode};
pub use error::{Error, Result};
