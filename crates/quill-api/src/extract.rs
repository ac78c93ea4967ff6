//! Body and query extractors that report every rejection as an `ApiError`,
//! so clients always get a `{ "message": ... }` body.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use quill_types::api::{
    DeletePromptsRequest, LoginRequest, PromptsQuery, SavePromptRequest, SignupRequest,
};

use crate::error::ApiError;

/// A request shape accepted by one route. `INVALID` is the validation message
/// returned when the payload cannot be decoded at all.
pub trait Payload: DeserializeOwned + Default + Send {
    const INVALID: &'static str;
}

impl Payload for SignupRequest {
    const INVALID: &'static str = "All fields are required.";
}

impl Payload for LoginRequest {
    const INVALID: &'static str = "All fields are required.";
}

impl Payload for SavePromptRequest {
    const INVALID: &'static str = "Invalid prompt payload";
}

impl Payload for DeletePromptsRequest {
    const INVALID: &'static str = "Username is required";
}

impl Payload for PromptsQuery {
    const INVALID: &'static str = "Username is required";
}

/// JSON body. A request without a JSON content type decodes as an empty
/// payload, so its fields read as missing.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: Payload,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => Ok(ApiJson(T::default())),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(ApiError::PayloadTooLarge)
            }
            Err(rejection) => {
                debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::Validation(T::INVALID.to_string()))
            }
        }
    }
}

/// Query string.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: Payload,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => {
                debug!("Rejected query string: {}", rejection.body_text());
                Err(ApiError::Validation(T::INVALID.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;

    fn post(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn json_body_decodes() {
        let req = post(Some("application/json"), r#"{"username":"alice"}"#);
        let ApiJson(body) = ApiJson::<DeletePromptsRequest>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(body.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn missing_content_type_reads_as_empty() {
        let req = post(None, r#"{"username":"alice"}"#);
        let ApiJson(body) = ApiJson::<DeletePromptsRequest>::from_request(req, &())
            .await
            .unwrap();
        assert!(body.username.is_none());
    }

    #[tokio::test]
    async fn undecodable_body_uses_route_message() {
        for raw in ["{bad", r#"{"username":123}"#] {
            let req = post(Some("application/json"), raw);
            let err = ApiJson::<DeletePromptsRequest>::from_request(req, &())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, ApiError::Validation(ref m) if m == "Username is required"));
        }
    }
}
