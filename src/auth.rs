//! Caller-identity extraction: decodes a bearer JWT into a `CallerIdentity`
//! for the Selection Compiler's `Ref` resolution (`jwt.user`, `jwt.groups`).
//!
//! A plain bearer-claims model: the `sub`/`groups` claims of a verified
//! RS256 JWT map onto `user_id`/`roles`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        CallerIdentity { user_id: String::new(), roles: vec![] }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    groups: Vec<String>,
}

/// Shared JWT verification settings, threaded through `axum::State` rather
/// than a global.
#[derive(Clone)]
pub struct AuthConfig {
    pub decoding_key: Option<Arc<DecodingKey>>,
    pub force_auth: bool,
    pub force_user: Option<String>,
}

impl AuthConfig {
    pub fn decode(&self, token: &str) -> Option<CallerIdentity> {
        let key = self.decoding_key.as_ref()?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, key, &validation).ok()?;
        Some(CallerIdentity { user_id: data.claims.sub, roles: data.claims.groups })
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
    Arc<AuthConfig>: axum::extract::FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AuthConfig>::from_ref(state);
        let bearer = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if let Some(token) = bearer {
            if let Some(identity) = state.decode(token) {
                return Ok(identity);
            }
            if state.force_auth {
                return Err(StatusCode::UNAUTHORIZED);
            }
        } else if state.force_auth {
            return Err(StatusCode::UNAUTHORIZED);
        }

        if let Some(user) = &state.force_user {
            return Ok(CallerIdentity { user_id: user.clone(), roles: vec![] });
        }
        Ok(CallerIdentity::anonymous())
    }
}
