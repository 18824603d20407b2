//! JSON bodies shared by the admin API and the stub handler's error paths.
//!
//! Every error body has the shape `{"errors": [{"code", "field"?, "message"}]}`.
//! Request-level failures carry the HTTP status as `code`; query validation
//! failures carry the invalid-input code and the offending field.

use crate::journal::{FieldError, ValidationErrors};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde::Serialize;

const JSON: &str = "application/json";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl ErrorResponse {
    /// One error whose code is the HTTP status
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorDetail {
                code: status.as_u16(),
                field: None,
                message: message.into(),
            }],
        }
    }
}

impl From<&FieldError> for ErrorDetail {
    fn from(error: &FieldError) -> Self {
        Self {
            code: error.code,
            field: Some(error.field.clone()),
            message: error.message.clone(),
        }
    }
}

impl From<&ValidationErrors> for ErrorResponse {
    fn from(errors: &ValidationErrors) -> Self {
        Self {
            errors: errors.errors.iter().map(ErrorDetail::from).collect(),
        }
    }
}

/// Serialize `body` as pretty JSON
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [(CONTENT_TYPE.as_str(), JSON)], json)
}

/// Build a response with the given headers.
///
/// Falls back to a bare 500 if a header is rejected.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut fallback = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &ErrorResponse::status(status, message))
}

/// 400 listing every invalid field
pub fn validation_response(errors: &ValidationErrors) -> Response<Full<Bytes>> {
    json_response(StatusCode::BAD_REQUEST, &ErrorResponse::from(errors))
}

pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "No admin route for this path")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_error_has_no_field() {
        let resp = error_response(StatusCode::INTERNAL_SERVER_ERROR, "File not found: a.txt");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()[CONTENT_TYPE], JSON);
        assert_eq!(
            body_json(resp).await,
            json!({ "errors": [{ "code": 500, "message": "File not found: a.txt" }] })
        );
    }

    #[tokio::test]
    async fn test_validation_errors_keep_field_and_code() {
        let errors = ValidationErrors {
            errors: vec![
                FieldError::new("limit", "'x' is not a valid integer"),
                FieldError::new("since", "'y' is not a valid ISO-8601 timestamp"),
            ],
        };
        let resp = validation_response(&errors);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json = body_json(resp).await;
        assert_eq!(json["errors"].as_array().unwrap().len(), 2);
        assert_eq!(json["errors"][0]["code"], 10);
        assert_eq!(json["errors"][0]["field"], "limit");
        assert_eq!(json["errors"][1]["field"], "since");
    }

    #[test]
    fn test_not_found_response() {
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
    }
}
