use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;

/// Verified subject id forwarded by the platform's auth layer.
pub const IDENTITY_HEADER: HeaderName = HeaderName::from_static("x-identity-sub");

/// The caller's identity, if the platform attached one.
///
/// Credentials are checked upstream; handlers only decide whether an
/// identity is required.
#[derive(Debug, Clone)]
pub struct Identity(pub Option<String>);

impl Identity {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Identity(subject))
    }
}
