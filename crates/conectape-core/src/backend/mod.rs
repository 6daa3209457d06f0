//! Backend services consumed by the directory.
//!
//! The app only observes the managed backend: an authentication service and
//! a document store, both push-based. Listeners deliver `BackendEvent`s into
//! an mpsc channel owned by the front end, each event tagged with the id of
//! the listener that produced it so consumers can drop deliveries from
//! listeners they have already released.
//!
//! Two implementations are provided:
//! - `FirebaseBackend`: Identity Toolkit + Firestore over REST
//! - `MemoryBackend`: in-process store used by tests and demo mode

pub mod error;
pub mod firebase;
pub mod firestore;
pub mod memory;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

pub use error::{AuthError, AuthErrorCode, BackendError};
pub use firebase::{FirebaseBackend, FirebaseSettings};
pub use memory::MemoryBackend;

use crate::auth::phone_from_email;

/// Channel endpoint listeners push their deliveries into.
pub type EventSender = mpsc::UnboundedSender<BackendEvent>;

/// Receiving side drained by the front end's event loop.
pub type EventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// Create the channel shared by every listener of one front end.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Process-wide unique id of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ListenerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Handle to a live listener. Dropping it (or calling `remove`) unsubscribes.
pub struct ListenerRegistration {
    id: ListenerId,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new(id: ListenerId, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Explicitly unsubscribe.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .finish()
    }
}

/// A document as delivered by the store: its id and untyped fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
    /// Server-side modification stamp, when the store reports one
    #[serde(default)]
    pub update_time: Option<String>,
}

impl Document {
    /// Build a document from a JSON object. Non-object values yield no fields.
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            fields,
            update_time: None,
        }
    }
}

/// Signed-in subject as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

impl AuthUser {
    /// Phone number recovered from the synthetic email, if any.
    pub fn phone(&self) -> Option<&str> {
        self.email.as_deref().and_then(phone_from_email)
    }
}

/// A push delivered by a listener.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// Current auth state; sent on registration and on every transition
    AuthState {
        listener: ListenerId,
        user: Option<AuthUser>,
    },
    /// Full snapshot of a collection, or the error that ended the listener
    Collection {
        listener: ListenerId,
        result: Result<Vec<Document>, BackendError>,
    },
    /// Snapshot of one document (`None` when it does not exist)
    Document {
        listener: ListenerId,
        result: Result<Option<Document>, BackendError>,
    },
}

impl BackendEvent {
    pub fn listener(&self) -> ListenerId {
        match self {
            BackendEvent::AuthState { listener, .. }
            | BackendEvent::Collection { listener, .. }
            | BackendEvent::Document { listener, .. } => *listener,
        }
    }
}

/// Authentication service.
pub trait AuthService: Send + Sync {
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthUser, AuthError>>;

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;

    fn current_user(&self) -> Option<AuthUser>;

    /// Register an auth-state listener. The current state is delivered
    /// right away, then every sign-in and sign-out.
    fn watch_auth_state(&self, events: EventSender) -> ListenerRegistration;
}

/// Read-only document store with realtime listeners.
pub trait DocumentStore: Send + Sync {
    /// Listen to every document of a collection. Each delivery is the full set.
    fn watch_collection(&self, collection: &str, events: EventSender) -> ListenerRegistration;

    /// Listen to a single document.
    fn watch_document(&self, collection: &str, id: &str, events: EventSender)
        -> ListenerRegistration;

    /// One-off point lookup.
    fn get_document<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>, BackendError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_listener_ids_are_unique() {
        let a = ListenerId::next();
        let b = ListenerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_registration_releases_once_on_drop() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let registration = ListenerRegistration::new(ListenerId::next(), move || {
            assert!(!flag.swap(true, Ordering::SeqCst));
        });
        assert!(!released.load(Ordering::SeqCst));
        registration.remove();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_auth_user_phone() {
        let user = AuthUser {
            uid: "u1".into(),
            email: Some("987654321@conectape.pe".into()),
        };
        assert_eq!(user.phone(), Some("987654321"));

        let anonymous = AuthUser {
            uid: "u2".into(),
            email: None,
        };
        assert_eq!(anonymous.phone(), None);
    }
}
