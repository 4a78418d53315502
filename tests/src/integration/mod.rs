//! # Integration Tests
//!
//! Cross-chain flows between two aggregators.

pub mod scenarios;
