use super::{ResponseTransformer, TransformerError};
use crate::backends::BlobStore;
use crate::model::{HttpHeader, LoggedRequest, Parameters, Response};
use async_trait::async_trait;
use serde_json::Value;

/// Adds the headers named in the `headers` transformer parameter
///
/// ```yaml
/// transformers: [stamp-headers]
/// transformerParameters:
///   headers:
///     X-Env: staging
///     X-Tags: [a, b]
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderStampTransformer;

impl HeaderStampTransformer {
    pub const NAME: &'static str = "stamp-headers";
}

#[async_trait]
impl ResponseTransformer for HeaderStampTransformer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn transform(
        &self,
        _request: &LoggedRequest,
        response: Response,
        _files: &dyn BlobStore,
        parameters: &Parameters,
    ) -> Result<Response, TransformerError> {
        let Some(headers) = parameters.get("headers") else {
            return Ok(response);
        };
        let Value::Object(headers) = headers else {
            return Err(TransformerError::new(
                "'headers' parameter must be an object of header names to values",
            ));
        };

        let mut response = response;
        for (name, value) in headers {
            match value {
                Value::String(v) => response.headers.push(HttpHeader::new(name, v.clone())),
                Value::Array(items) => {
                    let values = items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect();
                    response.headers.push(HttpHeader::with_values(name, values));
                }
                Value::Number(_) | Value::Bool(_) => {
                    response.headers.push(HttpHeader::new(name, value.to_string()))
                }
                _ => {}
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryBlobStore;
    use serde_json::json;

    async fn stamp(parameters: Value) -> Result<Response, TransformerError> {
        let parameters = parameters.as_object().cloned().unwrap_or_default();
        HeaderStampTransformer
            .transform(
                &LoggedRequest::new("GET", "/"),
                Response::builder().header("X-Existing", "1").build(),
                &InMemoryBlobStore::new(),
                &parameters,
            )
            .await
    }

    #[tokio::test]
    async fn test_adds_headers() {
        let out = stamp(json!({ "headers": { "X-Env": "staging", "X-Tags": ["a", "b"], "X-Retry": 3 } }))
            .await
            .unwrap();

        assert_eq!(out.headers.first_value("x-existing"), Some("1"));
        assert_eq!(out.headers.first_value("x-env"), Some("staging"));
        assert_eq!(out.headers.all_values("x-tags"), vec!["a", "b"]);
        assert_eq!(out.headers.first_value("x-retry"), Some("3"));
    }

    #[tokio::test]
    async fn test_no_parameter_is_noop() {
        let out = stamp(json!({})).await.unwrap();
        assert_eq!(out.headers.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_object() {
        let err = stamp(json!({ "headers": "X-Env: staging" })).await.unwrap_err();
        assert!(err.message().contains("must be an object"));
    }
}
