//! Firebase backend over REST.
//!
//! Authentication goes through the Identity Toolkit password sign-in
//! endpoint; documents are read from the Firestore REST API with the
//! signed-in user's ID token. Realtime listeners are emulated by polling:
//! the first poll always delivers a snapshot, later polls only when the
//! `(name, updateTime)` fingerprint changes. A failed poll is delivered once
//! per outage and polling backs off until the store answers again; only a
//! session or permission failure ends the listener.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::error::ErrorBody;
use super::firestore::{ListDocumentsResponse, RestDocument};
use super::{
    AuthError, AuthErrorCode, AuthService, AuthUser, BackendError, BackendEvent, Document,
    DocumentStore, EventSender, ListenerId, ListenerRegistration,
};
use crate::auth::{CredentialStore, Session, SessionData};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for Identity Toolkit (password sign-in)
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Token endpoint exchanging refresh tokens for fresh ID tokens
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Base URL for the Firestore REST API
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Documents requested per page when listing a collection.
const PAGE_SIZE: u32 = 300;

/// Default interval between listener polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Upper bound of the delay between polls while the store keeps failing.
const MAX_BACKOFF_SECS: u64 = 60;

/// Connection settings for one Firebase project.
#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub api_key: String,
    pub project_id: String,
    pub poll_interval: Duration,
    /// Directory holding `session.json`
    pub cache_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: Option<String>,
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

struct Shared {
    client: Client,
    settings: FirebaseSettings,
    session: Mutex<Session>,
    auth_listeners: Mutex<HashMap<ListenerId, EventSender>>,
}

/// Firebase auth service and document store.
/// Clone is cheap - all state is behind one Arc.
#[derive(Clone)]
pub struct FirebaseBackend {
    shared: Arc<Shared>,
}

impl FirebaseBackend {
    pub fn new(settings: FirebaseSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let session = Session::new(settings.cache_dir.clone());

        Ok(Self {
            shared: Arc::new(Shared {
                client,
                settings,
                session: Mutex::new(session),
                auth_listeners: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Restore the previous session from disk and the keychain.
    ///
    /// Returns the restored user, or `None` when there was nothing to restore
    /// or the refresh token was rejected (in which case the leftovers are cleared).
    pub async fn restore_session(&self) -> Result<Option<AuthUser>> {
        let uid = {
            let mut session = self.shared.lock_session();
            if !session.load()? {
                return Ok(None);
            }
            match session.data.as_ref() {
                Some(data) => data.uid.clone(),
                None => return Ok(None),
            }
        };

        let refresh_token = match CredentialStore::get_refresh_token(&uid) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "No refresh token for saved session");
                self.shared.lock_session().clear()?;
                return Ok(None);
            }
        };

        match self.shared.refresh(&refresh_token).await {
            Ok(refreshed) => {
                let user = self.shared.apply_refresh(refreshed);
                info!(uid = %uid, "Session restored");
                self.shared.broadcast_auth_state(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Saved session could not be refreshed");
                self.shared
                    .lock_session()
                    .clear()
                    .context("Failed to clear stale session")?;
                if let Err(e) = CredentialStore::delete(&uid) {
                    debug!(error = %e, "Failed to delete stale refresh token");
                }
                Ok(None)
            }
        }
    }
}

impl Shared {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_listeners(&self) -> MutexGuard<'_, HashMap<ListenerId, EventSender>> {
        self.auth_listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn broadcast_auth_state(&self, user: Option<AuthUser>) {
        self.lock_listeners().retain(|id, events| {
            events
                .send(BackendEvent::AuthState {
                    listener: *id,
                    user: user.clone(),
                })
                .is_ok()
        });
    }

    fn documents_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            FIRESTORE_URL, self.settings.project_id, path
        )
    }

    // ===== Authentication =====

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            IDENTITY_TOOLKIT_URL, self.settings.api_key
        );
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = ErrorBody::parse(&text).message;
            let code = AuthErrorCode::from_identity_toolkit(&message);
            debug!(code = code.as_str(), "Sign-in rejected");
            return Err(AuthError::new(code, message));
        }

        let signed_in: SignInResponse = response.json().await.map_err(|e| {
            AuthError::new(AuthErrorCode::Other, format!("Failed to parse sign-in response: {}", e))
        })?;

        let data = SessionData::new(
            signed_in.local_id,
            signed_in.email.or_else(|| Some(email.to_string())),
            signed_in.id_token,
            signed_in.refresh_token,
        );
        let user = data.user();

        if let Err(e) = CredentialStore::store(&data.uid, &data.refresh_token) {
            warn!(error = %e, "Failed to store refresh token");
        }
        {
            let mut session = self.lock_session();
            session.update(data);
            if let Err(e) = session.save() {
                warn!(error = %e, "Failed to save session");
            }
        }

        info!(uid = %user.uid, "Signed in");
        self.broadcast_auth_state(Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        let uid = {
            let mut session = self.lock_session();
            let uid = session.data.as_ref().map(|d| d.uid.clone());
            session
                .clear()
                .map_err(|e| AuthError::new(AuthErrorCode::Other, e.to_string()))?;
            uid
        };

        if let Some(ref uid) = uid {
            if let Err(e) = CredentialStore::delete(uid) {
                debug!(error = %e, "Failed to delete refresh token");
            }
            info!(uid = %uid, "Signed out");
        }
        self.broadcast_auth_state(None);
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, BackendError> {
        let url = format!("{}?key={}", SECURE_TOKEN_URL, self.settings.api_key);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    /// Store refreshed tokens; returns the session user.
    fn apply_refresh(&self, refreshed: RefreshResponse) -> Option<AuthUser> {
        let mut session = self.lock_session();
        let data = session.data.as_mut()?;
        if data.uid != refreshed.user_id {
            warn!(expected = %data.uid, got = %refreshed.user_id, "Refresh returned another subject");
        }
        data.id_token = refreshed.id_token;
        if data.refresh_token != refreshed.refresh_token {
            data.refresh_token = refreshed.refresh_token;
            if let Err(e) = CredentialStore::store(&data.uid, &data.refresh_token) {
                warn!(error = %e, "Failed to store rotated refresh token");
            }
        }
        data.created_at = chrono::Utc::now();
        let user = data.user();
        if let Err(e) = session.save() {
            warn!(error = %e, "Failed to save session");
        }
        Some(user)
    }

    /// Current ID token, refreshed first when close to expiry.
    async fn id_token(&self) -> Result<String, BackendError> {
        let (token, refresh_token, needs_refresh) = {
            let session = self.lock_session();
            let data = session.data.as_ref().ok_or(BackendError::Unauthenticated)?;
            (data.id_token.clone(), data.refresh_token.clone(), data.needs_refresh())
        };
        if !needs_refresh {
            return Ok(token);
        }

        debug!("Refreshing ID token");
        let refreshed = self.refresh(&refresh_token).await?;
        let token = refreshed.id_token.clone();
        self.apply_refresh(refreshed);
        Ok(token)
    }

    // ===== Firestore =====

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let url = self.documents_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.id_token().await?;
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page)]);
            }

            let response = check_response(request.send().await?).await?;
            let page: ListDocumentsResponse = response.json().await?;
            documents.extend(page.documents.into_iter().map(RestDocument::into_document));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!(collection, count = documents.len(), "Collection fetched");
        Ok(documents)
    }

    async fn fetch_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, BackendError> {
        let url = self.documents_url(&format!("{}/{}", collection, id));
        let token = self.id_token().await?;
        let response = self.client.get(&url).bearer_auth(&token).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_response(response).await?;
        let doc: RestDocument = response.json().await?;
        Ok(Some(doc.into_document()))
    }
}

/// Check if response is successful, returning an error with body if not.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::from_firestore(status, ErrorBody::parse(&body)))
    }
}

fn collection_fingerprint(docs: &[Document]) -> Vec<(String, Option<String>)> {
    docs.iter()
        .map(|d| (d.id.clone(), d.update_time.clone()))
        .collect()
}

/// Delay before the next poll after `failures` consecutive transient errors.
fn backoff_delay(interval: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return interval;
    }
    let factor = 2u32.saturating_pow(failures.min(16));
    interval
        .saturating_mul(factor)
        .min(Duration::from_secs(MAX_BACKOFF_SECS).max(interval))
}

/// Poll `fetch` until `deliver` reports a closed channel or the error is not
/// transient.
///
/// A snapshot is delivered when its fingerprint differs from the last one
/// delivered. Only the first error of a run of failures is delivered, and
/// after it the next good snapshot always goes out, so consumers that kept
/// stale data or fell back to a default get the real state back.
async fn run_poller<T, K, F, Fut>(
    label: String,
    interval: Duration,
    mut fetch: F,
    fingerprint: impl Fn(&T) -> K,
    deliver: impl Fn(Result<T, BackendError>) -> bool,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
    K: PartialEq,
{
    let mut last: Option<K> = None;
    let mut failures: u32 = 0;

    loop {
        match fetch().await {
            Ok(value) => {
                if failures > 0 {
                    info!(listener = %label, failures, "Listener recovered");
                    failures = 0;
                }
                let key = fingerprint(&value);
                if last.as_ref() != Some(&key) {
                    last = Some(key);
                    if !deliver(Ok(value)) {
                        return;
                    }
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let transient = e.is_transient();
                if failures == 1 || !transient {
                    warn!(listener = %label, error = %e, "Listener poll failed");
                    last = None;
                    if !deliver(Err(e)) {
                        return;
                    }
                } else {
                    debug!(listener = %label, error = %e, failures, "Listener still failing");
                }
                if !transient {
                    return;
                }
            }
        }
        tokio::time::sleep(backoff_delay(interval, failures)).await;
    }
}

impl AuthService for FirebaseBackend {
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthUser, AuthError>> {
        self.shared.sign_in(email, password).boxed()
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        futures::future::ready(self.shared.sign_out()).boxed()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.shared.lock_session().user()
    }

    fn watch_auth_state(&self, events: EventSender) -> ListenerRegistration {
        let id = ListenerId::next();
        let initial = BackendEvent::AuthState {
            listener: id,
            user: self.current_user(),
        };
        if events.send(initial).is_ok() {
            self.shared.lock_listeners().insert(id, events);
        }

        let shared = Arc::downgrade(&self.shared);
        ListenerRegistration::new(id, move || {
            if let Some(shared) = shared.upgrade() {
                shared.lock_listeners().remove(&id);
            }
        })
    }
}

impl DocumentStore for FirebaseBackend {
    fn watch_collection(&self, collection: &str, events: EventSender) -> ListenerRegistration {
        let id = ListenerId::next();
        let shared = self.shared.clone();
        let collection = collection.to_string();
        let interval = self.shared.settings.poll_interval;

        let task = tokio::spawn(run_poller(
            collection.clone(),
            interval,
            move || {
                let shared = shared.clone();
                let collection = collection.clone();
                async move { shared.list_documents(&collection).await }
            },
            |docs: &Vec<Document>| collection_fingerprint(docs),
            move |result| {
                events
                    .send(BackendEvent::Collection { listener: id, result })
                    .is_ok()
            },
        ));

        ListenerRegistration::new(id, move || task.abort())
    }

    fn watch_document(
        &self,
        collection: &str,
        doc_id: &str,
        events: EventSender,
    ) -> ListenerRegistration {
        let id = ListenerId::next();
        let shared = self.shared.clone();
        let collection = collection.to_string();
        let doc_id = doc_id.to_string();
        let interval = self.shared.settings.poll_interval;

        let task = tokio::spawn(run_poller(
            format!("{}/{}", collection, doc_id),
            interval,
            move || {
                let shared = shared.clone();
                let collection = collection.clone();
                let doc_id = doc_id.clone();
                async move { shared.fetch_document(&collection, &doc_id).await }
            },
            |doc: &Option<Document>| {
                doc.as_ref()
                    .map(|d| d.update_time.clone().unwrap_or_default())
            },
            move |result| {
                events
                    .send(BackendEvent::Document { listener: id, result })
                    .is_ok()
            },
        ));

        ListenerRegistration::new(id, move || task.abort())
    }

    fn get_document<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>, BackendError>> {
        self.shared.fetch_document(collection, id).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::backend::event_channel;

    fn settings(dir: &std::path::Path) -> FirebaseSettings {
        FirebaseSettings {
            api_key: "test-key".into(),
            project_id: "demo-project".into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cache_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_documents_url() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FirebaseBackend::new(settings(dir.path())).unwrap();
        assert_eq!(
            backend.shared.documents_url("usuarios/u1"),
            "https://firestore.googleapis.com/v1/projects/demo-project/databases/(default)/documents/usuarios/u1"
        );
    }

    #[test]
    fn test_fingerprint_tracks_update_time() {
        let mut a = Document::new("a", json!({}));
        a.update_time = Some("t1".into());
        let before = collection_fingerprint(std::slice::from_ref(&a));
        a.update_time = Some("t2".into());
        let after = collection_fingerprint(std::slice::from_ref(&a));
        assert_ne!(before, after);
    }

    #[test]
    fn test_auth_listener_without_session_reports_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FirebaseBackend::new(settings(dir.path())).unwrap();
        let (tx, mut rx) = event_channel();
        let registration = backend.watch_auth_state(tx);

        match rx.try_recv().unwrap() {
            BackendEvent::AuthState { listener, user } => {
                assert_eq!(listener, registration.id());
                assert!(user.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }

        registration.remove();
        assert!(backend.shared.lock_listeners().is_empty());
    }

    #[test]
    fn test_backoff_delay() {
        let interval = Duration::from_secs(5);
        assert_eq!(backoff_delay(interval, 0), interval);
        assert_eq!(backoff_delay(interval, 1), Duration::from_secs(10));
        assert_eq!(backoff_delay(interval, 2), Duration::from_secs(20));
        assert_eq!(backoff_delay(interval, 10), Duration::from_secs(MAX_BACKOFF_SECS));
    }

    #[tokio::test]
    async fn test_poller_keeps_going_after_network_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let task = tokio::spawn(run_poller(
            "usuarios/u1".to_string(),
            Duration::from_millis(5),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        1 | 2 => Err(BackendError::Network("connection reset".into())),
                        _ => Ok("admin"),
                    }
                }
            },
            |role: &&str| role.to_string(),
            move |result| tx.send(result).is_ok(),
        ));

        let mut received = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(event);
        }
        task.abort();

        // Snapshot, one error for the outage, then the same snapshot again.
        assert_eq!(received[0], Ok("admin"));
        assert_eq!(received[1], Err(BackendError::Network("connection reset".into())));
        assert_eq!(received[2], Ok("admin"));
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_poller_stops_on_permission_denied() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();

        let poller = run_poller(
            "congresales".to_string(),
            Duration::from_millis(5),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<Vec<Document>, _>(BackendError::PermissionDenied("rules".into())) }
            },
            |docs: &Vec<Document>| collection_fingerprint(docs),
            move |result| {
                sink.lock().unwrap().push(result);
                true
            },
        );
        tokio::time::timeout(Duration::from_secs(5), poller).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *delivered.lock().unwrap(),
            vec![Err(BackendError::PermissionDenied("rules".into()))]
        );
    }

    #[tokio::test]
    async fn test_documents_require_session() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FirebaseBackend::new(settings(dir.path())).unwrap();
        let err = backend.get_document("usuarios", "u1").await.unwrap_err();
        assert_eq!(err, BackendError::Unauthenticated);
    }
}
