use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use vidtube_types::api::TokenPair;
use vidtube_types::models::User;

/// Claims of the short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of the refresh token. `jti` makes every issued token distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub struct TokenService {
    access: Keys,
    refresh: Keys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    pub fn new(access_secret: &str, refresh_secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access: Keys::new(access_secret),
            refresh: Keys::new(refresh_secret),
            access_ttl,
            refresh_ttl,
            validation,
        }
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        let iat = Utc::now();
        let claims = AccessClaims {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iat: iat.timestamp(),
            exp: (iat + self.access_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.access.encoding).map_err(TokenError::Signing)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let iat = Utc::now();
        let claims = RefreshClaims {
            id: user_id,
            jti: Uuid::new_v4(),
            iat: iat.timestamp(),
            exp: (iat + self.refresh_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh.encoding).map_err(TokenError::Signing)
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user.id)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token, &self.access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token, &self.refresh)
    }

    fn verify<C: DeserializeOwned>(&self, token: &str, keys: &Keys) -> Result<C, TokenError> {
        decode::<C>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}
