//! Minimal stub lookup used by the binary.

use crate::model::{LoggedRequest, ResponseDefinition, ServedEvent, StubReference};
use serde::Deserialize;
use uuid::Uuid;

/// Which requests a stub answers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    /// HTTP method, or `ANY`
    #[serde(default = "default_method")]
    pub method: String,
    /// Exact path and query
    #[serde(default)]
    pub url: Option<String>,
    /// Exact path, any query
    #[serde(default)]
    pub url_path: Option<String>,
}

fn default_method() -> String {
    "ANY".to_string()
}

impl RequestPattern {
    pub fn matches(&self, request: &LoggedRequest) -> bool {
        let method_matches =
            self.method.eq_ignore_ascii_case("ANY") || self.method.eq_ignore_ascii_case(&request.method);
        let url_matches = match (&self.url, &self.url_path) {
            (Some(url), _) => url == &request.url,
            (None, Some(path)) => path == request.path(),
            (None, None) => true,
        };
        method_matches && url_matches
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StubMapping {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub request: RequestPattern,
    pub response: ResponseDefinition,
}

impl StubMapping {
    pub fn new(request: RequestPattern, response: ResponseDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            request,
            response,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn reference(&self) -> StubReference {
        StubReference::new(self.id, self.name.clone())
    }
}

/// Ordered stub list; the first matching stub wins
#[derive(Debug, Default)]
pub struct StubMappings {
    stubs: Vec<StubMapping>,
}

impl StubMappings {
    pub fn new(stubs: Vec<StubMapping>) -> Self {
        Self { stubs }
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// Pair `request` with the first matching stub, or mark it unmatched
    pub fn serve_event(&self, request: LoggedRequest) -> ServedEvent {
        let found = self
            .stubs
            .iter()
            .find(|stub| stub.request.matches(&request))
            .map(|stub| (stub.reference(), stub.response.clone()));

        match found {
            Some((stub, definition)) => ServedEvent::matched(request, stub, definition),
            None => ServedEvent::unmatched(request),
        }
    }
}
