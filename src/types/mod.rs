//! Core types for Cadence.

pub mod message;
pub mod transcript;

pub use message::*;
pub use transcript::*;
