//! Integration tests: the full maker against an in-memory chain.

mod maker_loop;
mod mock_chain;
