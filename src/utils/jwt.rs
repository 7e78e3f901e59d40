// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::user::UserId};

/// Claims carried by the backend's access token.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Claims {
    /// ID of the user the token was issued to.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Expiration time as Unix timestamp.
    #[serde(default)]
    pub exp: Option<u64>,
    /// "access" or "refresh".
    #[serde(default)]
    pub token_type: Option<String>,
}

impl Claims {
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// Reads the claims of a token without verifying its signature.
///
/// The client never holds the signing key; the backend still verifies every
/// request. This is only used to find the user id and to spot an expired
/// session before making any call.
pub fn peek_claims(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(token_data.claims)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
