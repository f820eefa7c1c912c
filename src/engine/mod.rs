//! Core engine: the snapshot → ladder → submit loop and the background
//! blockhash refresher it depends on.

pub mod blockhash;
pub mod maker;
pub mod open_orders;
pub mod snapshot;
pub mod submitter;
