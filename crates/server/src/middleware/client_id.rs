//! Per-tab client identifier.
//!
//! Browsers send `x-client-id` on writes and when opening a stream. The
//! notifier uses it to avoid echoing a write back to the tab that made it.

use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the client identifier.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Longest accepted client identifier.
const MAX_CLIENT_ID_LEN: usize = 128;

/// Extractor for the optional client identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientId(pub Option<String>);

impl ClientId {
    /// Borrow the identifier, if any.
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_CLIENT_ID_LEN)
            .map(String::from);

        Ok(Self(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(header: Option<&str>) -> ClientId {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(CLIENT_ID_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        ClientId::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_client_id_header() {
        assert_eq!(extract(Some(" tab-1 ")).await, ClientId(Some("tab-1".to_string())));
        assert_eq!(extract(Some("")).await, ClientId(None));
        assert_eq!(extract(None).await, ClientId(None));
        assert_eq!(extract(Some(&"x".repeat(200))).await, ClientId(None));
    }
}
