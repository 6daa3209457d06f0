//! Live collection subscriptions.
//!
//! A `LiveCollection` owns at most one listener on its record type's
//! collection and the working set materialized from the latest snapshot.
//! Deliveries tagged with any other listener id (including one released
//! earlier) are ignored.

use tracing::{debug, warn};

use crate::backend::{
    BackendError, BackendEvent, DocumentStore, EventSender, ListenerId, ListenerRegistration,
};
use crate::models::{DirectoryRecord, Entry};

/// Outcome of feeding one event to a live collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Not addressed to this collection's active listener
    Ignored,
    /// Working set replaced; carries the new entry count
    Replaced(usize),
    /// Listener failed; the previous working set is kept
    Failed(BackendError),
}

pub struct LiveCollection<T: DirectoryRecord> {
    registration: Option<ListenerRegistration>,
    entries: Vec<Entry<T>>,
    loaded: bool,
}

impl<T: DirectoryRecord> Default for LiveCollection<T> {
    fn default() -> Self {
        Self {
            registration: None,
            entries: Vec::new(),
            loaded: false,
        }
    }
}

impl<T: DirectoryRecord> LiveCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start listening, releasing any previous listener first.
    pub fn subscribe(&mut self, store: &dyn DocumentStore, events: EventSender) -> ListenerId {
        self.unsubscribe();
        let registration = store.watch_collection(T::COLLECTION, events);
        let id = registration.id();
        debug!(collection = T::COLLECTION, listener = %id, "Subscribed");
        self.registration = Some(registration);
        id
    }

    pub fn unsubscribe(&mut self) {
        if let Some(registration) = self.registration.take() {
            debug!(collection = T::COLLECTION, listener = %registration.id(), "Unsubscribed");
        }
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.registration.as_ref().map(ListenerRegistration::id)
    }

    /// Whether a snapshot has been received since construction.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub fn apply(&mut self, event: &BackendEvent) -> Applied {
        let BackendEvent::Collection { listener, result } = event else {
            return Applied::Ignored;
        };
        if self.listener() != Some(*listener) {
            return Applied::Ignored;
        }

        match result {
            Ok(docs) => {
                self.entries = docs.iter().map(T::from_document).collect();
                self.loaded = true;

                let malformed = self.entries.iter().filter(|e| e.is_err()).count();
                if malformed > 0 {
                    warn!(collection = T::COLLECTION, malformed, "Snapshot contains malformed records");
                }
                Applied::Replaced(self.entries.len())
            }
            Err(e) => {
                warn!(collection = T::COLLECTION, error = %e, "Snapshot delivery failed");
                Applied::Failed(e.clone())
            }
        }
    }
}
