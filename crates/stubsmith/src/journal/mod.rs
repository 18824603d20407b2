//! Request journal and the paginated view served by the admin API.

use crate::model::ServedEvent;
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::debug;

mod paginator;
mod query;

pub use paginator::{paginate, Page, PageMeta};
pub use query::{parse_journal_request, FieldError, JournalQuery, ServeEventQuery, ValidationErrors};

/// Events returned by a journal lookup
#[derive(Debug, Clone, Default)]
pub struct JournalSnapshot {
    /// Newest first
    pub events: Vec<ServedEvent>,
    pub journal_disabled: bool,
}

pub trait RequestJournal: Send + Sync {
    fn record(&self, event: ServedEvent);

    fn serve_events(&self, query: &ServeEventQuery) -> JournalSnapshot;

    fn reset(&self);

    fn count(&self) -> usize;
}

/// In-memory journal holding events newest first
#[derive(Debug, Default)]
pub struct InMemoryRequestJournal {
    events: RwLock<VecDeque<ServedEvent>>,
    max_entries: Option<usize>,
    disabled: bool,
}

impl InMemoryRequestJournal {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_entries,
            disabled: false,
        }
    }

    /// A journal that records nothing
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl RequestJournal for InMemoryRequestJournal {
    fn record(&self, event: ServedEvent) {
        if self.disabled {
            return;
        }
        let mut events = self.events.write();
        events.push_front(event);
        if let Some(max) = self.max_entries {
            while events.len() > max {
                events.pop_back();
            }
        }
    }

    fn serve_events(&self, query: &ServeEventQuery) -> JournalSnapshot {
        let events = self
            .events
            .read()
            .iter()
            .filter(|event| query.matches(event))
            .cloned()
            .collect();
        JournalSnapshot {
            events,
            journal_disabled: self.disabled,
        }
    }

    fn reset(&self) {
        let mut events = self.events.write();
        debug!("Clearing {} journal entries", events.len());
        events.clear();
    }

    fn count(&self) -> usize {
        self.events.read().len()
    }
}
