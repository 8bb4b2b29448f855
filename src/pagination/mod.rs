//! Cursor Codec
//!
//! Opaque resumption cursors for paginated reads, sealed with the
//! [`TokenCodec`](crate::auth::TokenCodec).

pub mod cursor;

pub use cursor::{TransactionCursor, decode_balance_cursor, encode_balance_cursor};

use thiserror::Error;

use crate::auth::TokenError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("malformed page cursor: {0}")]
    Malformed(String),

    #[error("month must be between 1 and 12, got {0}")]
    Month(u32),

    #[error("year {0} is out of range")]
    Year(i32),

    #[error("unknown timezone: {0}")]
    Timezone(String),
}

/// Requested page size, defaulted when absent or non-positive and capped at `max`
pub fn clamp_page_size(requested: Option<i64>, default: i64, max: i64) -> i64 {
    match requested {
        Some(size) if size > 0 => size.min(max),
        _ => default,
    }
}
