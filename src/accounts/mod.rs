//! Account opening, deposits and balance/history reads

pub mod service;

pub use service::{AccountService, BalancePage, TransactionPage, TransactionPageRequest};
