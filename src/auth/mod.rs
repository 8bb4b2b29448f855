//! Client authentication and opaque token handling

pub mod jwt;
pub mod middleware;
pub mod token;

pub use jwt::{AuthenticatedClient, Claims, JwtAuth, JwtError};
pub use middleware::jwt_auth_middleware;
pub use token::{TokenCodec, TokenError};
