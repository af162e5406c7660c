use crate::model::Subject;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

/// Axum extractor for the subject a request acts as.
///
/// The identity is taken from the `X-User` header; `anonymous` maps to the
/// anonymous subject. Requests without the header run as the admin
/// superuser, matching a single-user local deployment.
#[async_trait]
impl<S> FromRequestParts<S> for Subject
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(name) = extract_header_value(&parts.headers, "x-user") {
            Ok(Subject::user(name))
        } else {
            Ok(Subject::admin())
        }
    }
}

fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}
