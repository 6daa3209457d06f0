//! In-process backend with the same push semantics as the managed one.
//!
//! Used by the test suites and by the binary's demo mode. Every mutation
//! (`put_document`, `set_collection`, sign-in/out, injected failures) is
//! pushed synchronously to the matching listeners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::{self, BoxFuture, FutureExt};
use tracing::debug;

use super::{
    AuthError, AuthErrorCode, AuthService, AuthUser, BackendError, BackendEvent, Document,
    DocumentStore, EventSender, ListenerId, ListenerRegistration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Auth,
    Collection(String),
    Document(String, String),
}

struct Listener {
    target: Target,
    events: EventSender,
}

struct Account {
    uid: String,
    password: String,
    disabled: bool,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    current: Option<AuthUser>,
    forced_sign_in_failure: Option<AuthErrorCode>,
    fail_sign_out: bool,
    sign_in_attempts: Vec<String>,
    collections: HashMap<String, Vec<Document>>,
    listeners: HashMap<ListenerId, Listener>,
}

impl Inner {
    fn collection_snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections.get(collection).cloned().unwrap_or_default()
    }

    fn document_snapshot(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned())
    }

    fn event_for(&self, id: ListenerId, target: &Target) -> BackendEvent {
        match target {
            Target::Auth => BackendEvent::AuthState {
                listener: id,
                user: self.current.clone(),
            },
            Target::Collection(name) => BackendEvent::Collection {
                listener: id,
                result: Ok(self.collection_snapshot(name)),
            },
            Target::Document(collection, doc_id) => BackendEvent::Document {
                listener: id,
                result: Ok(self.document_snapshot(collection, doc_id)),
            },
        }
    }

    /// Push a fresh snapshot to every listener selected by `affected`.
    fn notify(&mut self, affected: impl Fn(&Target) -> bool) {
        let mut closed = Vec::new();
        for (id, listener) in &self.listeners {
            if affected(&listener.target) {
                let event = self.event_for(*id, &listener.target);
                if listener.events.send(event).is_err() {
                    closed.push(*id);
                }
            }
        }
        for id in closed {
            self.listeners.remove(&id);
        }
    }

    fn notify_collection(&mut self, collection: &str) {
        self.notify(|target| match target {
            Target::Collection(name) => name == collection,
            Target::Document(name, _) => name == collection,
            Target::Auth => false,
        });
    }
}

/// Shared in-memory auth service and document store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, target: Target, events: EventSender) -> ListenerRegistration {
        let id = ListenerId::next();
        {
            let mut inner = self.lock();
            let initial = inner.event_for(id, &target);
            // A closed channel means nobody will ever read this listener.
            if events.send(initial).is_ok() {
                inner.listeners.insert(id, Listener { target, events });
            }
        }

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        ListenerRegistration::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
                inner.listeners.remove(&id);
                debug!(listener = %id, "Listener released");
            }
        })
    }

    // ===== Accounts =====

    pub fn add_account(&self, email: &str, password: &str, uid: &str) {
        self.lock().accounts.insert(
            email.to_lowercase(),
            Account {
                uid: uid.to_string(),
                password: password.to_string(),
                disabled: false,
            },
        );
    }

    pub fn disable_account(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    /// Make the next sign-in fail with `code` regardless of credentials.
    pub fn fail_next_sign_in(&self, code: AuthErrorCode) {
        self.lock().forced_sign_in_failure = Some(code);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.lock().fail_sign_out = fail;
    }

    /// Identifiers passed to `sign_in`, oldest first.
    pub fn sign_in_attempts(&self) -> Vec<String> {
        self.lock().sign_in_attempts.clone()
    }

    /// Replace the signed-in user directly, as a restored or switched session would.
    pub fn set_current_user(&self, user: Option<AuthUser>) {
        let mut inner = self.lock();
        inner.current = user;
        inner.notify(|target| *target == Target::Auth);
    }

    // ===== Documents =====

    /// Replace a whole collection.
    pub fn set_collection(&self, collection: &str, docs: Vec<Document>) {
        let mut inner = self.lock();
        inner.collections.insert(collection.to_string(), docs);
        inner.notify_collection(collection);
    }

    /// Insert or replace one document, keeping collection order.
    pub fn put_document(&self, collection: &str, doc: Document) {
        let mut inner = self.lock();
        let docs = inner.collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
        inner.notify_collection(collection);
    }

    pub fn remove_document(&self, collection: &str, id: &str) {
        let mut inner = self.lock();
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        inner.notify_collection(collection);
    }

    /// Deliver `error` to every listener on `collection` (and its documents).
    /// Listeners survive a transient error and see the next change; any other
    /// error ends them.
    pub fn fail_listeners(&self, collection: &str, error: BackendError) {
        let mut inner = self.lock();
        let failed: Vec<ListenerId> = inner
            .listeners
            .iter()
            .filter(|(_, l)| match &l.target {
                Target::Collection(name) | Target::Document(name, _) => name == collection,
                Target::Auth => false,
            })
            .map(|(id, _)| *id)
            .collect();

        for id in failed {
            let Some(listener) = inner.listeners.get(&id) else {
                continue;
            };
            let event = match &listener.target {
                Target::Document(..) => BackendEvent::Document {
                    listener: id,
                    result: Err(error.clone()),
                },
                _ => BackendEvent::Collection {
                    listener: id,
                    result: Err(error.clone()),
                },
            };
            let _ = listener.events.send(event);
            if !error.is_transient() {
                inner.listeners.remove(&id);
            }
        }
    }

    /// Number of registered listeners (auth and store).
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn try_sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let mut inner = self.lock();
        inner.sign_in_attempts.push(email.to_string());

        if let Some(code) = inner.forced_sign_in_failure.take() {
            return Err(AuthError::new(code, "forced failure"));
        }

        let (local, domain) = email.split_once('@').unwrap_or_default();
        if local.is_empty() || domain.is_empty() {
            return Err(AuthError::new(AuthErrorCode::InvalidEmail, "badly formatted email"));
        }

        let account = inner
            .accounts
            .get(&email.to_lowercase())
            .ok_or_else(|| AuthError::new(AuthErrorCode::UserNotFound, "no such account"))?;
        if account.disabled {
            return Err(AuthError::new(AuthErrorCode::UserDisabled, "account disabled"));
        }
        if account.password != password {
            return Err(AuthError::new(AuthErrorCode::WrongPassword, "wrong password"));
        }

        let user = AuthUser {
            uid: account.uid.clone(),
            email: Some(email.to_lowercase()),
        };
        inner.current = Some(user.clone());
        inner.notify(|target| *target == Target::Auth);
        Ok(user)
    }
}

impl AuthService for MemoryBackend {
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthUser, AuthError>> {
        future::ready(self.try_sign_in(email, password)).boxed()
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        let mut inner = self.lock();
        let result = if inner.fail_sign_out {
            Err(AuthError::new(AuthErrorCode::Other, "sign-out failed"))
        } else {
            inner.current = None;
            inner.notify(|target| *target == Target::Auth);
            Ok(())
        };
        future::ready(result).boxed()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.lock().current.clone()
    }

    fn watch_auth_state(&self, events: EventSender) -> ListenerRegistration {
        self.register(Target::Auth, events)
    }
}

impl DocumentStore for MemoryBackend {
    fn watch_collection(&self, collection: &str, events: EventSender) -> ListenerRegistration {
        self.register(Target::Collection(collection.to_string()), events)
    }

    fn watch_document(
        &self,
        collection: &str,
        id: &str,
        events: EventSender,
    ) -> ListenerRegistration {
        self.register(
            Target::Document(collection.to_string(), id.to_string()),
            events,
        )
    }

    fn get_document<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>, BackendError>> {
        let doc = self.lock().document_snapshot(collection, id);
        future::ready(Ok(doc)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::event_channel;
    use serde_json::json;

    #[test]
    fn test_collection_listener_gets_initial_and_updates() {
        let backend = MemoryBackend::new();
        backend.put_document("contactos", Document::new("a", json!({"primerNombre": "Ana"})));

        let (tx, mut rx) = event_channel();
        let registration = backend.watch_collection("contactos", tx);

        match rx.try_recv().unwrap() {
            BackendEvent::Collection { listener, result } => {
                assert_eq!(listener, registration.id());
                assert_eq!(result.unwrap().len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }

        backend.put_document("contactos", Document::new("b", json!({})));
        match rx.try_recv().unwrap() {
            BackendEvent::Collection { result, .. } => assert_eq!(result.unwrap().len(), 2),
            other => panic!("unexpected event {:?}", other),
        }

        // Other collections do not reach this listener.
        backend.put_document("congresales", Document::new("k", json!({})));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_released_listener_receives_nothing() {
        let backend = MemoryBackend::new();
        let (tx, mut rx) = event_channel();
        let registration = backend.watch_collection("contactos", tx);
        let _ = rx.try_recv();
        assert_eq!(backend.listener_count(), 1);

        registration.remove();
        assert_eq!(backend.listener_count(), 0);

        backend.put_document("contactos", Document::new("a", json!({})));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_document_listener_sees_missing_then_created() {
        let backend = MemoryBackend::new();
        let (tx, mut rx) = event_channel();
        let _registration = backend.watch_document("usuarios", "u1", tx);

        match rx.try_recv().unwrap() {
            BackendEvent::Document { result, .. } => assert_eq!(result.unwrap(), None),
            other => panic!("unexpected event {:?}", other),
        }

        backend.put_document("usuarios", Document::new("u1", json!({"rol": "admin"})));
        match rx.try_recv().unwrap() {
            BackendEvent::Document { result, .. } => {
                assert_eq!(result.unwrap().unwrap().fields["rol"], "admin");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_fail_listeners_ends_them() {
        let backend = MemoryBackend::new();
        let (tx, mut rx) = event_channel();
        let _registration = backend.watch_collection("congresales", tx);
        let _ = rx.try_recv();

        backend.fail_listeners("congresales", BackendError::PermissionDenied("rules".into()));
        match rx.try_recv().unwrap() {
            BackendEvent::Collection { result, .. } => {
                assert!(matches!(result, Err(BackendError::PermissionDenied(_))));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(backend.listener_count(), 0);
    }

    #[test]
    fn test_transient_failure_keeps_listener() {
        let backend = MemoryBackend::new();
        let (tx, mut rx) = event_channel();
        let _registration = backend.watch_collection("congresales", tx);
        let _ = rx.try_recv();

        backend.fail_listeners("congresales", BackendError::Network("offline".into()));
        assert!(matches!(
            rx.try_recv().unwrap(),
            BackendEvent::Collection { result: Err(BackendError::Network(_)), .. }
        ));
        assert_eq!(backend.listener_count(), 1);

        backend.put_document("congresales", Document::new("k1", json!({})));
        match rx.try_recv().unwrap() {
            BackendEvent::Collection { result, .. } => assert_eq!(result.unwrap().len(), 1),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_in_outcomes() {
        let backend = MemoryBackend::new();
        backend.add_account("987654321@conectape.pe", "secret", "uid-1");

        let user = backend.sign_in("987654321@conectape.pe", "secret").await.unwrap();
        assert_eq!(user.uid, "uid-1");
        assert_eq!(backend.current_user(), Some(user));

        let err = backend.sign_in("987654321@conectape.pe", "nope").await.unwrap_err();
        assert_eq!(err.code, AuthErrorCode::WrongPassword);

        let err = backend.sign_in("111111111@conectape.pe", "secret").await.unwrap_err();
        assert_eq!(err.code, AuthErrorCode::UserNotFound);

        let err = backend.sign_in("not-an-email", "secret").await.unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidEmail);

        backend.disable_account("987654321@conectape.pe");
        let err = backend.sign_in("987654321@conectape.pe", "secret").await.unwrap_err();
        assert_eq!(err.code, AuthErrorCode::UserDisabled);

        backend.fail_next_sign_in(AuthErrorCode::TooManyRequests);
        let err = backend.sign_in("987654321@conectape.pe", "secret").await.unwrap_err();
        assert_eq!(err.code, AuthErrorCode::TooManyRequests);

        assert_eq!(backend.sign_in_attempts().len(), 6);
    }

    #[tokio::test]
    async fn test_auth_listener_sees_transitions() {
        let backend = MemoryBackend::new();
        backend.add_account("987654321@conectape.pe", "secret", "uid-1");
        let (tx, mut rx) = event_channel();
        let _registration = backend.watch_auth_state(tx);

        assert!(matches!(rx.try_recv().unwrap(), BackendEvent::AuthState { user: None, .. }));

        backend.sign_in("987654321@conectape.pe", "secret").await.unwrap();
        match rx.try_recv().unwrap() {
            BackendEvent::AuthState { user: Some(user), .. } => assert_eq!(user.uid, "uid-1"),
            other => panic!("unexpected event {:?}", other),
        }

        backend.sign_out().await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), BackendEvent::AuthState { user: None, .. }));
    }
}
