use crate::model::ServedEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Error code reported for every invalid admin input field
pub const INVALID_INPUT_CODE: u16 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: u16,
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: INVALID_INPUT_CODE,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every problem found in one admin query, reported together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Invalid input: {}", join_messages(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Which events a journal lookup returns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeEventQuery {
    pub unmatched_only: bool,
    pub stub_id: Option<Uuid>,
}

impl ServeEventQuery {
    pub fn matches(&self, event: &ServedEvent) -> bool {
        if self.unmatched_only && event.was_matched {
            return false;
        }
        match self.stub_id {
            Some(id) => event.matched_stub().is_some_and(|stub| stub.id == id),
            None => true,
        }
    }
}

/// Pagination cursor and page size
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalQuery {
    /// Inclusive lower bound on event timestamps
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Parse admin query parameters into a journal lookup and pagination
///
/// All offending fields are collected before returning.
pub fn parse_journal_request(
    params: &HashMap<String, String>,
) -> Result<(ServeEventQuery, JournalQuery), ValidationErrors> {
    let mut errors = Vec::new();

    let since = match params.get("since") {
        None => None,
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(since) => Some(since.with_timezone(&Utc)),
            Err(_) => {
                errors.push(FieldError::new(
                    "since",
                    format!("'{raw}' is not a valid ISO-8601 timestamp"),
                ));
                None
            }
        },
    };

    let limit = match params.get("limit") {
        None => None,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(n) if n < 0 => {
                errors.push(FieldError::new(
                    "limit",
                    format!("limit must be zero or greater, got {n}"),
                ));
                None
            }
            Ok(n) => Some(usize::try_from(n).unwrap_or(usize::MAX)),
            Err(_) => {
                errors.push(FieldError::new(
                    "limit",
                    format!("'{raw}' is not a valid integer"),
                ));
                None
            }
        },
    };

    let unmatched_only = match params.get("unmatched").map(String::as_str) {
        None | Some("false") => false,
        Some("true") | Some("") => true,
        Some(other) => {
            errors.push(FieldError::new(
                "unmatched",
                format!("'{other}' is not a boolean"),
            ));
            false
        }
    };

    let stub_id = match params.get("matchingStub") {
        None => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError::new(
                    "matchingStub",
                    format!("'{raw}' is not a valid UUID"),
                ));
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(ValidationErrors { errors });
    }

    Ok((
        ServeEventQuery {
            unmatched_only,
            stub_id,
        },
        JournalQuery { since, limit },
    ))
}
