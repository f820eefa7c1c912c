//! Critbit order-book slabs.
//!
//! A slab account is the common head (padding + flags), a 32-byte slab
//! header, then fixed 72-byte nodes. Only leaf nodes hold orders; the key's
//! high 64 bits are the limit price in quote lots per base lot.

use super::layout::{check_header, flags, read_u128, read_u32, read_u64, TAIL_PADDING_LEN};
use super::DecodeError;
use crate::types::Side;

const SLAB_HEADER_OFFSET: usize = 13;
const NODES_OFFSET: usize = SLAB_HEADER_OFFSET + 32;
pub const NODE_LEN: usize = 72;

const TAG_LEAF: u32 = 2;

/// Best resting price in lots, or `None` when the side is empty.
///
/// Scans the allocated node region linearly rather than walking the tree;
/// removed leaves are retagged as free nodes so every leaf seen is live.
pub fn best_price_lots(data: &[u8], side: Side) -> Result<Option<u64>, DecodeError> {
    let side_flag = match side {
        Side::Bid => flags::BIDS,
        Side::Ask => flags::ASKS,
    };
    check_header(data, flags::INITIALIZED | side_flag)?;

    let bump_index = read_u64(data, SLAB_HEADER_OFFSET)? as usize;
    let leaf_count = read_u64(data, SLAB_HEADER_OFFSET + 24)?;
    if leaf_count == 0 {
        return Ok(None);
    }

    let capacity = data.len().saturating_sub(NODES_OFFSET + TAIL_PADDING_LEN) / NODE_LEN;
    if bump_index > capacity {
        return Err(DecodeError::Invalid(format!(
            "bump index {bump_index} exceeds slab capacity {capacity}"
        )));
    }

    let mut best: Option<u64> = None;
    for i in 0..bump_index {
        let node = NODES_OFFSET + i * NODE_LEN;
        if read_u32(data, node)? != TAG_LEAF {
            continue;
        }
        let price = (read_u128(data, node + 8)? >> 64) as u64;
        best = Some(match (best, side) {
            (None, _) => price,
            (Some(b), Side::Bid) => b.max(price),
            (Some(b), Side::Ask) => b.min(price),
        });
    }
    Ok(best)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
