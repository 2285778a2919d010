use crate::{errors::AppError, models::UserId, AppState};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderName},
};
use std::sync::Arc;

/// Resolves the caller's identity. Session handling lives outside this
/// service; handlers only see the resulting user id.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// Trusts a user id header injected by the upstream auth gateway.
#[derive(Debug, Clone)]
pub struct TrustedHeaderAuthenticator {
    header: HeaderName,
}

impl TrustedHeaderAuthenticator {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Authenticator for TrustedHeaderAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<UserId> {
        headers
            .get(&self.header)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }
}

/// Extractor for routes that require a signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match state.authenticator.authenticate(&parts.headers) {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                tracing::debug!(path = %parts.uri.path(), "Rejecting unauthenticated request");
                Err(AppError::Unauthorized)
            }
        }
    }
}
