//! Exchange Orchestrator
//!
//! Drives the quote lifecycle: mint → cache → redeem → evict.

pub mod offer;
pub mod service;

#[cfg(test)]
mod scenario_tests;

pub use offer::{OfferDirection, OfferResponse};
pub use service::ExchangeService;
