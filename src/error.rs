//! Canonical error kinds surfaced to the HTTP layer.
//!
//! Every component keeps its own `thiserror` enum; they all collapse into
//! [`ExchangeError`] here. The HTTP status is a property of the kind, the
//! gateway turns it into a response.

use serde_json::Value;
use thiserror::Error;

use crate::auth::TokenError;
use crate::ledger::LedgerError;
use crate::money::MoneyError;
use crate::offers::CacheError;
use crate::pagination::CursorError;
use crate::quotes::QuoteError;

/// Message attached to every retryable failure
pub const RETRY_MESSAGE: &str = "please retry your request later";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Forbidden,
    NotFound,
    OfferExpired,
    Conflict,
    RangeNotSatisfiable,
    Upstream,
    TransactFailed,
    CacheMiss,
    CacheSet,
    CacheDel,
    CacheUnknown,
    Internal,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::OfferExpired => "OFFER_EXPIRED",
            Self::Conflict => "CONFLICT",
            Self::RangeNotSatisfiable => "RANGE_NOT_SATISFIABLE",
            Self::Upstream => "UPSTREAM",
            Self::TransactFailed => "TRANSACT_FAILED",
            Self::CacheMiss => "CACHE_MISS",
            Self::CacheSet => "CACHE_SET",
            Self::CacheDel => "CACHE_DEL",
            Self::CacheUnknown => "CACHE_UNKNOWN",
            Self::Internal => "INTERNAL",
        }
    }

    /// HTTP status suggestion
    pub fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::OfferExpired => 408,
            Self::Conflict => 409,
            Self::RangeNotSatisfiable => 416,
            Self::Upstream
            | Self::TransactFailed
            | Self::CacheMiss
            | Self::CacheSet
            | Self::CacheDel
            | Self::CacheUnknown
            | Self::Internal => 500,
        }
    }

    /// Whether the client may simply try again
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Upstream | Self::TransactFailed)
    }
}

/// Error value returned by every core operation
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExchangeError {
    pub kind: ErrorKind,
    pub message: String,
    pub payload: Option<Value>,
}

impl ExchangeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn offer_expired() -> Self {
        Self::new(
            ErrorKind::OfferExpired,
            "exchange offer has expired, please request a new quote",
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn range_not_satisfiable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeNotSatisfiable, message)
    }

    pub fn upstream(detail: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Upstream, RETRY_MESSAGE).with_payload(detail.to_string())
    }

    pub fn transact_failed() -> Self {
        Self::new(ErrorKind::TransactFailed, RETRY_MESSAGE)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn status(&self) -> u16 {
        self.kind.http_status()
    }
}

impl From<MoneyError> for ExchangeError {
    fn from(e: MoneyError) -> Self {
        ExchangeError::bad_request(e.to_string())
    }
}

impl From<TokenError> for ExchangeError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Entropy => ExchangeError::internal("failed to generate token"),
            TokenError::InvalidKey => ExchangeError::internal("token codec misconfigured"),
            _ => ExchangeError::bad_request("invalid or tampered token"),
        }
    }
}

impl From<CursorError> for ExchangeError {
    fn from(e: CursorError) -> Self {
        match e {
            CursorError::Token(inner) => inner.into(),
            other => ExchangeError::bad_request(other.to_string()),
        }
    }
}

impl From<QuoteError> for ExchangeError {
    fn from(e: QuoteError) -> Self {
        ExchangeError::upstream(e)
    }
}

impl From<CacheError> for ExchangeError {
    fn from(e: CacheError) -> Self {
        let kind = match e {
            CacheError::Miss => ErrorKind::CacheMiss,
            CacheError::Set(_) => ErrorKind::CacheSet,
            CacheError::Del(_) => ErrorKind::CacheDel,
            CacheError::Unknown(_) => ErrorKind::CacheUnknown,
        };
        ExchangeError::new(kind, RETRY_MESSAGE)
    }
}

impl From<LedgerError> for ExchangeError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AccountExists => ExchangeError::conflict("account already exists"),
            LedgerError::NotFound => ExchangeError::not_found("records not found"),
            LedgerError::UnknownClient => ExchangeError::forbidden("client is not registered"),
            LedgerError::InsufficientFunds => {
                ExchangeError::bad_request("insufficient funds in source account")
            }
            LedgerError::Timeout | LedgerError::Transaction(_) => ExchangeError::transact_failed(),
            LedgerError::Database(_) | LedgerError::Corrupt(_) => {
                ExchangeError::internal(RETRY_MESSAGE)
            }
        }
    }
}

impl ExchangeError {
    /// Map a failed posting (deposit or offer redemption). A row that vanishes
    /// under the lock is a failed transaction, not a lookup miss.
    pub fn from_posting(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound => ExchangeError::transact_failed(),
            other => ExchangeError::from(other),
        }
    }
}
