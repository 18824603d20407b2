//! Served events: one record per request handled by the stub server.

use super::definition::ResponseDefinition;
use super::headers::HttpHeaders;
use super::request::LoggedRequest;
use crate::fault::Fault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the stub mapping that produced a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubReference {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StubReference {
    pub fn new(id: Uuid, name: Option<String>) -> Self {
        Self { id, name }
    }
}

/// Summary of what was sent back, filled in after rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
    pub from_proxy: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedEvent {
    pub id: Uuid,
    pub request: LoggedRequest,
    pub response_definition: ResponseDefinition,
    #[serde(rename = "stubMapping", skip_serializing_if = "Option::is_none")]
    pub stub: Option<StubReference>,
    pub was_matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<LoggedResponse>,
}

impl ServedEvent {
    pub fn matched(
        request: LoggedRequest,
        stub: StubReference,
        response_definition: ResponseDefinition,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            response_definition,
            stub: Some(stub),
            was_matched: true,
            response: None,
        }
    }

    /// Event for a request no stub matched
    pub fn unmatched(request: LoggedRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            response_definition: ResponseDefinition::not_configured(),
            stub: None,
            was_matched: false,
            response: None,
        }
    }

    /// Event with an arbitrary definition and no stub attached
    pub fn of(request: LoggedRequest, response_definition: ResponseDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            response_definition,
            stub: None,
            was_matched: false,
            response: None,
        }
    }

    /// Capture time, taken from the request
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.request.logged_date
    }

    /// The stub, only when the match succeeded
    pub fn matched_stub(&self) -> Option<&StubReference> {
        if self.was_matched {
            self.stub.as_ref()
        } else {
            None
        }
    }

    pub fn with_response(mut self, response: LoggedResponse) -> Self {
        self.response = Some(response);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_stub_requires_match_flag() {
        let stub = StubReference::new(Uuid::new_v4(), Some("greet".into()));
        let mut event = ServedEvent::matched(
            LoggedRequest::new("GET", "/hello"),
            stub.clone(),
            ResponseDefinition::ok(),
        );
        assert_eq!(event.matched_stub(), Some(&stub));

        event.was_matched = false;
        assert!(event.matched_stub().is_none());
    }

    #[test]
    fn test_unmatched_event_carries_placeholder_definition() {
        let event = ServedEvent::unmatched(LoggedRequest::new("GET", "/missing"));
        assert!(!event.response_definition.was_configured());
        assert!(event.stub.is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let event = ServedEvent::matched(
            LoggedRequest::new("GET", "/hello"),
            StubReference::new(Uuid::nil(), None),
            ResponseDefinition::ok().text_body("hi"),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["wasMatched"], true);
        assert_eq!(json["stubMapping"]["id"], Uuid::nil().to_string());
        assert_eq!(json["responseDefinition"]["body"], "hi");
        assert_eq!(json["request"]["url"], "/hello");
        assert!(json.get("response").is_none());
    }
}
