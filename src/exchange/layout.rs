//! Byte layouts of the dex program's accounts.
//!
//! Every dex account starts with the 5-byte `"serum"` head padding and a
//! little-endian `u64` of account flags, and ends with 7 bytes of
//! `"padding"`. Offsets below are absolute within the account data.

use solana_sdk::pubkey::Pubkey;

use super::DecodeError;

pub const HEAD_PADDING: &[u8; 5] = b"serum";
pub const TAIL_PADDING_LEN: usize = 7;

/// Account flag bits.
pub mod flags {
    pub const INITIALIZED: u64 = 1 << 0;
    pub const MARKET: u64 = 1 << 1;
    pub const OPEN_ORDERS: u64 = 1 << 2;
    pub const EVENT_QUEUE: u64 = 1 << 4;
    pub const BIDS: u64 = 1 << 5;
    pub const ASKS: u64 = 1 << 6;
}

/// Size of a v2 market state account.
pub const MARKET_STATE_LEN: usize = 388;

/// Size of an open-orders account.
pub const OPEN_ORDERS_LEN: usize = 3228;
/// Offset of the market address inside an open-orders account.
pub const OPEN_ORDERS_MARKET_OFFSET: usize = 13;
/// Offset of the owner address inside an open-orders account.
pub const OPEN_ORDERS_OWNER_OFFSET: usize = 45;

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(slice(data, offset, 4)?);
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64, DecodeError> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice(data, offset, 8)?);
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_u128(data: &[u8], offset: usize) -> Result<u128, DecodeError> {
    let mut buf = [0u8; 16];
    buf.copy_from_slice(slice(data, offset, 16)?);
    Ok(u128::from_le_bytes(buf))
}

pub(crate) fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey, DecodeError> {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(slice(data, offset, 32)?);
    Ok(Pubkey::new_from_array(buf))
}

fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    data.get(offset..offset + len).ok_or(DecodeError::TooShort {
        needed: offset + len,
        actual: data.len(),
    })
}

/// Check the head padding and that `required` flags are set; returns the flags.
pub(crate) fn check_header(data: &[u8], required: u64) -> Result<u64, DecodeError> {
    if data.len() < HEAD_PADDING.len() + 8 + TAIL_PADDING_LEN {
        return Err(DecodeError::TooShort {
            needed: HEAD_PADDING.len() + 8 + TAIL_PADDING_LEN,
            actual: data.len(),
        });
    }
    if &data[..HEAD_PADDING.len()] != HEAD_PADDING {
        return Err(DecodeError::BadPadding);
    }
    let account_flags = read_u64(data, 5)?;
    if account_flags & required != required {
        return Err(DecodeError::UnexpectedFlags {
            expected: required,
            actual: account_flags,
        });
    }
    Ok(account_flags)
}

// ---------------------------------------------------------------------------
// Market state
// ---------------------------------------------------------------------------

/// The fields of a market state account the maker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    pub own_address: Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub fee_rate_bps: u64,
}

impl MarketState {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MARKET_STATE_LEN {
            return Err(DecodeError::TooShort {
                needed: MARKET_STATE_LEN,
                actual: data.len(),
            });
        }
        check_header(data, flags::INITIALIZED | flags::MARKET)?;

        let state = Self {
            own_address: read_pubkey(data, 13)?,
            vault_signer_nonce: read_u64(data, 45)?,
            base_mint: read_pubkey(data, 53)?,
            quote_mint: read_pubkey(data, 85)?,
            base_vault: read_pubkey(data, 117)?,
            quote_vault: read_pubkey(data, 165)?,
            request_queue: read_pubkey(data, 221)?,
            event_queue: read_pubkey(data, 253)?,
            bids: read_pubkey(data, 285)?,
            asks: read_pubkey(data, 317)?,
            base_lot_size: read_u64(data, 349)?,
            quote_lot_size: read_u64(data, 357)?,
            fee_rate_bps: read_u64(data, 365)?,
        };

        if state.base_lot_size == 0 || state.quote_lot_size == 0 {
            return Err(DecodeError::Invalid("lot size is zero".to_string()));
        }
        Ok(state)
    }

    /// Encode into a zero-filled v2 market account.
    #[cfg(test)]
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; MARKET_STATE_LEN];
        data[..5].copy_from_slice(HEAD_PADDING);
        data[5..13].copy_from_slice(&(flags::INITIALIZED | flags::MARKET).to_le_bytes());
        let mut put_key = |offset: usize, key: &Pubkey| {
            data[offset..offset + 32].copy_from_slice(key.as_ref());
        };
        put_key(13, &self.own_address);
        put_key(53, &self.base_mint);
        put_key(85, &self.quote_mint);
        put_key(117, &self.base_vault);
        put_key(165, &self.quote_vault);
        put_key(221, &self.request_queue);
        put_key(253, &self.event_queue);
        put_key(285, &self.bids);
        put_key(317, &self.asks);
        data[45..53].copy_from_slice(&self.vault_signer_nonce.to_le_bytes());
        data[349..357].copy_from_slice(&self.base_lot_size.to_le_bytes());
        data[357..365].copy_from_slice(&self.quote_lot_size.to_le_bytes());
        data[365..373].copy_from_slice(&self.fee_rate_bps.to_le_bytes());
        data[MARKET_STATE_LEN - TAIL_PADDING_LEN..].copy_from_slice(b"padding");
        data
    }
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

/// Number of unconsumed events in an event queue account.
pub fn event_queue_depth(data: &[u8]) -> Result<u64, DecodeError> {
    check_header(data, flags::INITIALIZED | flags::EVENT_QUEUE)?;
    // head u64 at 13, count u64 at 21
    read_u64(data, 21)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_state() -> MarketState {
        MarketState {
            own_address: Pubkey::new_unique(),
            vault_signer_nonce: 3,
            base_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            base_lot_size: 1_000_000,
            quote_lot_size: 100,
            fee_rate_bps: 22,
        }
    }

    pub(crate) fn event_queue_with_depth(depth: u64) -> Vec<u8> {
        let mut data = vec![0u8; 37 + 88 * 4 + TAIL_PADDING_LEN];
        data[..5].copy_from_slice(HEAD_PADDING);
        data[5..13].copy_from_slice(&(flags::INITIALIZED | flags::EVENT_QUEUE).to_le_bytes());
        data[21..29].copy_from_slice(&depth.to_le_bytes());
        data
    }

    #[test]
    fn test_market_state_decodes_encoded() {
        let state = sample_state();
        let decoded = MarketState::decode(&state.encode()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_market_state_too_short() {
        let err = MarketState::decode(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, DecodeError::TooShort { needed: 388, actual: 100 }));
    }

    #[test]
    fn test_market_state_bad_padding() {
        let mut data = sample_state().encode();
        data[0] = b'x';
        assert!(matches!(MarketState::decode(&data), Err(DecodeError::BadPadding)));
    }

    #[test]
    fn test_market_state_wrong_flags() {
        let mut data = sample_state().encode();
        data[5..13].copy_from_slice(&flags::INITIALIZED.to_le_bytes());
        assert!(matches!(
            MarketState::decode(&data),
            Err(DecodeError::UnexpectedFlags { .. })
        ));
    }

    #[test]
    fn test_market_state_zero_lot_size() {
        let mut state = sample_state();
        state.quote_lot_size = 0;
        assert!(matches!(MarketState::decode(&state.encode()), Err(DecodeError::Invalid(_))));
    }

    #[test]
    fn test_event_queue_depth() {
        assert_eq!(event_queue_depth(&event_queue_with_depth(0)).unwrap(), 0);
        assert_eq!(event_queue_depth(&event_queue_with_depth(117)).unwrap(), 117);
    }

    #[test]
    fn test_event_queue_rejects_market_account() {
        assert!(event_queue_depth(&sample_state().encode()).is_err());
    }
}
