use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::Error;
use crate::schema::{Id, User};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Id,
    iat: i64,
    exp: i64,
}

impl TokenClaims {
    pub fn new(user_id: Id, lifetime: Duration) -> Self {
        let now = Utc::now();

        Self {
            user_id,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Utc::now().timestamp()).is_negative()
    }
}

fn invalid_token() -> Error {
    Error::Authentication(String::from("Invalid token."))
}

/// Signs and verifies HMAC-SHA256 bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|e| Error::Internal(format!("invalid token secret: {e}")))?;

        Ok(Self { key, lifetime })
    }

    /// Issuer with a random secret; its tokens die with the process.
    pub fn ephemeral(lifetime: Duration) -> Result<Self, Error> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);

        Self::new(&secret, lifetime)
    }

    pub fn issue(&self, user: &User) -> Result<String, Error> {
        let claims = TokenClaims::new(user.id, self.lifetime);

        claims
            .sign_with_key(&self.key)
            .map_err(|e| Error::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, Error> {
        let claims: TokenClaims = token
            .verify_with_key(&self.key)
            .map_err(|_| invalid_token())?;

        if claims.is_expired() {
            return Err(Error::Authentication(String::from("Token has expired.")));
        }
        Ok(claims)
    }
}
