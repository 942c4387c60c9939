// src/auth.rs
use crate::error::{Error, Result};
use crate::models::OwnerId;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{Filter, Rejection};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Resolves the owner identity from an `Authorization: Bearer` header value.
pub fn resolve_owner(header: Option<&str>, secret: &str) -> Result<OwnerId> {
    let header = header.ok_or_else(|| Error::Unauthorized("missing bearer token".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthorized("malformed authorization header".to_string()))?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| Error::Unauthorized(e.to_string()))?;

    if data.claims.sub.trim().is_empty() {
        return Err(Error::Unauthorized("token has no subject".to_string()));
    }
    Ok(OwnerId::new(data.claims.sub))
}

pub fn with_owner(
    secret: Arc<String>,
) -> impl Filter<Extract = (OwnerId,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move { resolve_owner(header.as_deref(), &secret).map_err(warp::reject::custom) }
    })
}

/// Token issuance lives outside this service; tests mint their own.
#[cfg(test)]
pub fn create_token(user_id: &str, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .unwrap()
}
