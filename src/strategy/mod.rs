//! Pricing strategy.

pub mod ladder;
