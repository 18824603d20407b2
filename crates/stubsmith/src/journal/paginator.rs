use super::JournalQuery;
use crate::model::ServedEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Events the journal returned before the cursor and limit were applied
    pub total_matching: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Body of `GET /__admin/requests`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub requests: Vec<ServedEvent>,
    pub meta: PageMeta,
    pub is_request_journal_disabled: bool,
}

impl Page {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Keep events at or after `since`, then the first `limit` of those
///
/// Input order is preserved.
pub fn paginate(events: Vec<ServedEvent>, query: &JournalQuery, journal_disabled: bool) -> Page {
    let total_matching = events.len();
    let selected = events
        .into_iter()
        .filter(|event| query.since.map_or(true, |since| event.timestamp() >= since))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();

    Page {
        requests: selected,
        meta: PageMeta {
            total_matching,
            since: query.since,
            limit: query.limit,
        },
        is_request_journal_disabled: journal_disabled,
    }
}
