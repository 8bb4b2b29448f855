//! Gateway types module
//!
//! ## Input Types
//! - [`StrictDecimal`]: Format-validated decimal for API input
//! - [`requests`]: camelCase request bodies and query strings
//! - [`ValidatedJson`] / [`ValidatedQuery`]: extractors with envelope rejections
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: `{message, payload}` wrapper
//! - [`Links`]: pagination pointers

pub mod extract;
pub mod money;
pub mod requests;
pub mod response;

pub use extract::{ValidatedJson, ValidatedQuery};
pub use money::StrictDecimal;
pub use requests::{
    BalancesQuery, CryptoOfferRequest, DepositRequest, FiatOfferRequest, OpenAccountRequest,
    RedeemOfferRequest, TransactionsQuery,
};
pub use response::{ApiResponse, ApiResult, BalancesPayload, Links, TransactionsPayload, ok};
