//! # Domain Layer
//!
//! Pure authorization logic with no I/O dependencies.

pub mod content;
pub mod ecdsa;
pub mod entities;
pub mod errors;
