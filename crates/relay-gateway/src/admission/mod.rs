//! Room admission
//!
//! Every join request passes through an [`AdmissionGate`] before a session
//! object exists. A rejection never touches a room or consumes a client id.

use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Bearer, Authorization, Cookie, HeaderMapExt};
use relay_common::{AppError, JwtService};
use thiserror::Error;

/// Identity of an admitted caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Token subject
    pub subject: String,
    /// Display name, if the issuer provided one
    pub name: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            name: None,
        }
    }
}

/// Why a credential was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionRejected {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("credential expired")]
    Expired,
}

/// Credential check run before a connection is upgraded
pub trait AdmissionGate: Send + Sync + 'static {
    /// Validate a bearer credential (absent when the request carried none)
    fn validate(&self, credential: Option<&str>) -> Result<Identity, AdmissionRejected>;
}

/// Admission backed by HMAC-signed JWTs
#[derive(Debug, Clone)]
pub struct JwtAdmissionGate {
    jwt: JwtService,
}

impl JwtAdmissionGate {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

impl AdmissionGate for JwtAdmissionGate {
    fn validate(&self, credential: Option<&str>) -> Result<Identity, AdmissionRejected> {
        let token = match credential.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AdmissionRejected::MissingCredential),
        };

        let claims = self.jwt.decode_token(token).map_err(|e| match e {
            AppError::TokenExpired => AdmissionRejected::Expired,
            _ => AdmissionRejected::InvalidCredential,
        })?;

        Ok(Identity {
            subject: claims.sub,
            name: claims.name,
        })
    }
}

/// Pull the credential from `Authorization: Bearer`, falling back to a cookie
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(cookie_name).map(String::from))
}
