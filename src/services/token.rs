use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization boundary of an upload token.
///
/// A bare bucket admits any key and leaves key collisions to the store. A
/// `bucket:key` scope admits exactly one key and allows replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutScope {
    pub bucket: String,
    pub key: Option<String>,
}

impl PutScope {
    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: None,
        }
    }

    pub fn object(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: Some(key.into()),
        }
    }

    /// Scope used to upload one archive entry.
    pub fn for_entry(bucket: &str, key: &str, overwrite: bool) -> Self {
        if overwrite {
            Self::object(bucket, key)
        } else {
            Self::bucket(bucket)
        }
    }

    pub fn allows_overwrite(&self) -> bool {
        self.key.is_some()
    }

    pub fn admits(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|scoped| scoped == key)
    }
}

impl fmt::Display for PutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}:{}", self.bucket, key),
            None => f.write_str(&self.bucket),
        }
    }
}

/// What a verified upload token grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutPolicy {
    pub scope: PutScope,
    /// Unix timestamp after which the token is rejected.
    pub deadline: i64,
}

/// Signs and verifies short-lived upload tokens.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, scope: &PutScope) -> Result<String>;
    fn verify(&self, token: &str) -> Result<PutPolicy>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct UploadClaims {
    bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    exp: i64,
    jti: String,
}

/// HS256 upload tokens.
pub struct JwtTokenSigner {
    secret: String,
    ttl: Duration,
}

impl JwtTokenSigner {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }
}

impl TokenSigner for JwtTokenSigner {
    fn sign(&self, scope: &PutScope) -> Result<String> {
        let deadline = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow!("upload token deadline out of range"))?
            .timestamp();

        let claims = UploadClaims {
            bucket: scope.bucket.clone(),
            key: scope.key.clone(),
            exp: deadline,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?;

        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<PutPolicy> {
        let token_data = decode::<UploadClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )?;

        let UploadClaims {
            bucket, key, exp, ..
        } = token_data.claims;
        Ok(PutPolicy {
            scope: PutScope { bucket, key },
            deadline: exp,
        })
    }
}
