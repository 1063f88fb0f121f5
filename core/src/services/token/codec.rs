//! Signing and parsing of token strings
//!
//! The codec turns records and claims into opaque strings and back. It does
//! not decide whether a token is still usable: expiry is judged against the
//! injected `Clock`, revocation against the store.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::token::{
    AccessTokenClaims, RefreshTokenClaims, RefreshTokenRecord, TOKEN_TYPE_ACCESS,
    TOKEN_TYPE_REFRESH,
};
use crate::errors::TokenError;

/// Opaque sign/parse capability for access and refresh tokens
pub trait TokenCodec: Send + Sync {
    /// Signed projection of a refresh token record
    fn sign_refresh(&self, record: &RefreshTokenRecord) -> Result<String, TokenError>;

    /// Recover the claims identifying a refresh token record
    fn parse_refresh(&self, token: &str) -> Result<RefreshTokenClaims, TokenError>;

    fn sign_access(&self, claims: &AccessTokenClaims) -> Result<String, TokenError>;

    fn parse_access(&self, token: &str) -> Result<AccessTokenClaims, TokenError>;
}

/// Registered claims written into every JWT
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    /// Client id
    sub: String,
    /// Refresh token record id, absent on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    iat: i64,
    exp: i64,
    iss: String,
    typ: String,
}

/// HS256 JWT codec
pub struct JwtTokenCodec {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenCodec {
    /// Creates a codec signing with `secret` and stamping `issuer` into every token
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.validate_exp = false;
        validation.validate_nbf = false;

        Self {
            issuer,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn encode_jwt(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::codec(format!("failed to sign token: {}", e)))
    }

    fn decode_jwt(&self, token: &str, expected_type: &str) -> Result<JwtClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::codec(format!("failed to parse token: {}", e)))?;

        if data.claims.typ != expected_type {
            return Err(TokenError::codec(format!(
                "expected {} token, got {}",
                expected_type, data.claims.typ
            )));
        }

        Ok(data.claims)
    }
}

fn parse_uuid(value: &str, claim: &str) -> Result<Uuid, TokenError> {
    Uuid::parse_str(value).map_err(|_| TokenError::codec(format!("malformed {} claim", claim)))
}

fn parse_instant(secs: i64, claim: &str) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TokenError::codec(format!("malformed {} claim", claim)))
}

impl TokenCodec for JwtTokenCodec {
    fn sign_refresh(&self, record: &RefreshTokenRecord) -> Result<String, TokenError> {
        self.encode_jwt(&JwtClaims {
            sub: record.client_id.to_string(),
            jti: Some(record.id.to_string()),
            iat: record.created_at.timestamp(),
            exp: record.expires_at.timestamp(),
            iss: self.issuer.clone(),
            typ: TOKEN_TYPE_REFRESH.to_string(),
        })
    }

    fn parse_refresh(&self, token: &str) -> Result<RefreshTokenClaims, TokenError> {
        let claims = self.decode_jwt(token, TOKEN_TYPE_REFRESH)?;
        let jti = claims
            .jti
            .as_deref()
            .ok_or_else(|| TokenError::codec("refresh token carries no id"))?;

        Ok(RefreshTokenClaims {
            token_id: parse_uuid(jti, "jti")?,
            client_id: parse_uuid(&claims.sub, "sub")?,
            issued_at: parse_instant(claims.iat, "iat")?,
            expires_at: parse_instant(claims.exp, "exp")?,
        })
    }

    fn sign_access(&self, claims: &AccessTokenClaims) -> Result<String, TokenError> {
        self.encode_jwt(&JwtClaims {
            sub: claims.client_id.to_string(),
            jti: None,
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
            iss: self.issuer.clone(),
            typ: TOKEN_TYPE_ACCESS.to_string(),
        })
    }

    fn parse_access(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let claims = self.decode_jwt(token, TOKEN_TYPE_ACCESS)?;

        Ok(AccessTokenClaims {
            client_id: parse_uuid(&claims.sub, "sub")?,
            issued_at: parse_instant(claims.iat, "iat")?,
            expires_at: parse_instant(claims.exp, "exp")?,
        })
    }
}
