//! Ladder maker: a tiered market-making agent for on-chain order books.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod chain;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod markets;
pub mod status;
pub mod strategy;
pub mod types;
pub mod wallet;
