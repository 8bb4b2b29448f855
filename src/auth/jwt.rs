use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // client_id as UUID string
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Identity attached to every authenticated request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedClient {
    pub client_id: Uuid,
    pub expires_at: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid or expired token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("token subject is not a client id")]
    Subject,
}

/// Verifies HS256 client tokens issued by the login collaborator
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
}

impl JwtAuth {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            encoding: EncodingKey::from_secret(config.jwt_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_key.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
        }
    }

    /// Verify a token and return the client it was issued to
    pub fn validate(&self, token: &str) -> Result<AuthenticatedClient, JwtError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        let client_id = Uuid::parse_str(&data.claims.sub).map_err(|_| JwtError::Subject)?;
        Ok(AuthenticatedClient {
            client_id,
            expires_at: data.claims.exp as i64,
        })
    }

    /// Sign a token for `client_id`; used by tooling and tests
    pub fn issue(&self, client_id: Uuid, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: client_id.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: self.issuer.clone(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }
}
