//! Application state for the ConectaPe terminal front end.
//!
//! `App` owns the navigator, the login form and the overlays, and drains
//! two channels between input polls: backend listener deliveries and the
//! results of spawned sign-in tasks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use conectape_core::backend::{
    event_channel, AuthError, AuthService, AuthUser, DocumentStore, EventReceiver,
};
use conectape_core::intents::UrlLauncher;
use conectape_core::navigation::{NavKind, Section};
use conectape_core::screens::{diagnose_failed_sign_in, LoginForm, Notice};
use conectape_core::{Config, Navigator};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task result channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Overlay state on top of the current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Results sent back by spawned tasks.
enum TaskResult {
    SignIn {
        phone: String,
        result: Result<AuthUser, AuthError>,
    },
}

pub struct App {
    pub config: Config,
    pub navigator: Navigator,
    pub login: LoginForm,
    pub state: AppState,
    /// Latest notice, shown in the status bar until dismissed or replaced
    pub notice: Option<Notice>,
    pub demo: bool,
    launcher: Box<dyn UrlLauncher>,
    events_rx: EventReceiver,
    task_tx: mpsc::Sender<TaskResult>,
    task_rx: mpsc::Receiver<TaskResult>,
}

impl App {
    pub fn new(
        config: Config,
        auth: Arc<dyn AuthService>,
        store: Arc<dyn DocumentStore>,
        launcher: Box<dyn UrlLauncher>,
    ) -> Self {
        let (events, events_rx) = event_channel();
        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let login = config
            .last_phone
            .as_deref()
            .map(LoginForm::with_phone)
            .unwrap_or_default();

        Self {
            config,
            navigator: Navigator::new(auth, store, events),
            login,
            state: AppState::Normal,
            notice: None,
            demo: false,
            launcher,
            events_rx,
            task_tx,
            task_rx,
        }
    }

    /// Start watching the auth state; the first delivery picks the screen.
    pub fn start(&mut self) {
        self.navigator.start();
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.navigator.kind(), NavKind::Admin | NavKind::Basic)
    }

    fn show(&mut self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            debug!(title = %notice.title, "Notice");
            self.notice = Some(notice);
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Validate the form and run the sign-in in the background.
    pub fn submit_login(&mut self) {
        let request = match self.login.begin_submit() {
            Ok(request) => request,
            Err(notice) => {
                self.show(notice);
                return;
            }
        };

        let auth = self.navigator.auth();
        let store = self.navigator.store();
        let tx = self.task_tx.clone();

        tokio::spawn(async move {
            let result = auth.sign_in(&request.email, &request.password).await;
            if let Err(ref e) = result {
                diagnose_failed_sign_in(store.as_ref(), &request.phone, e.code).await;
            }
            let _ = tx
                .send(TaskResult::SignIn {
                    phone: request.phone,
                    result,
                })
                .await;
        });
    }

    fn finish_login(&mut self, phone: String, result: Result<AuthUser, AuthError>) {
        let notice = self.login.finish_submit(&result);
        if result.is_ok() && self.config.last_phone.as_deref() != Some(phone.as_str()) {
            self.config.last_phone = Some(phone);
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
        self.show(Some(notice));
    }

    // =========================================================================
    // Directory actions
    // =========================================================================

    pub fn active_section(&self) -> Option<Section> {
        self.navigator.active_section()
    }

    pub fn push_search_char(&mut self, c: char) {
        match self.active_section() {
            Some(Section::Contacts) => {
                if let Some(list) = self.navigator.contacts_mut() {
                    list.push_query_char(c);
                }
            }
            Some(Section::Congress) => {
                if let Some(list) = self.navigator.congress_mut() {
                    list.push_query_char(c);
                }
            }
            _ => {}
        }
    }

    pub fn pop_search_char(&mut self) {
        match self.active_section() {
            Some(Section::Contacts) => {
                if let Some(list) = self.navigator.contacts_mut() {
                    list.pop_query_char();
                }
            }
            Some(Section::Congress) => {
                if let Some(list) = self.navigator.congress_mut() {
                    list.pop_query_char();
                }
            }
            _ => {}
        }
    }

    pub fn clear_search(&mut self) {
        if let Some(list) = self.navigator.contacts_mut() {
            list.set_query("");
        }
        if let Some(list) = self.navigator.congress_mut() {
            list.set_query("");
        }
    }

    pub fn select_next(&mut self) {
        match self.active_section() {
            Some(Section::Contacts) => {
                if let Some(list) = self.navigator.contacts_mut() {
                    list.select_next();
                }
            }
            Some(Section::Congress) => {
                if let Some(list) = self.navigator.congress_mut() {
                    list.select_next();
                }
            }
            _ => {}
        }
    }

    pub fn select_previous(&mut self) {
        match self.active_section() {
            Some(Section::Contacts) => {
                if let Some(list) = self.navigator.contacts_mut() {
                    list.select_previous();
                }
            }
            Some(Section::Congress) => {
                if let Some(list) = self.navigator.congress_mut() {
                    list.select_previous();
                }
            }
            _ => {}
        }
    }

    pub fn call_selected(&mut self) {
        let launcher = self.launcher.as_ref();
        let notice = match self.active_section() {
            Some(Section::Contacts) => self
                .navigator
                .contacts()
                .and_then(|list| list.call_selected(launcher)),
            Some(Section::Congress) => self
                .navigator
                .congress()
                .and_then(|list| list.call_selected(launcher)),
            _ => None,
        };
        self.show(notice);
    }

    pub fn whatsapp_selected(&mut self) {
        let launcher = self.launcher.as_ref();
        let notice = match self.active_section() {
            Some(Section::Contacts) => self
                .navigator
                .contacts()
                .and_then(|list| list.whatsapp_selected(launcher)),
            Some(Section::Congress) => self
                .navigator
                .congress()
                .and_then(|list| list.whatsapp_selected(launcher)),
            _ => None,
        };
        self.show(notice);
    }

    pub async fn sign_out(&mut self) {
        let notice = self.navigator.sign_out().await;
        self.show(notice);
    }

    // =========================================================================
    // Background work
    // =========================================================================

    /// Drain task results and backend deliveries.
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.task_rx.try_recv() {
            results.push(result);
        }
        for result in results {
            match result {
                TaskResult::SignIn { phone, result } => self.finish_login(phone, result),
            }
        }

        let was_signed_in = self.is_signed_in();
        while let Ok(event) = self.events_rx.try_recv() {
            let notice = self.navigator.handle(&event);
            self.show(notice);
        }
        if was_signed_in && self.navigator.kind() == NavKind::Unauthenticated {
            info!("Returned to login");
            self.state = AppState::Normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use conectape_core::backend::{Document, MemoryBackend};
    use conectape_core::intents::IntentError;
    use conectape_core::models::{CONTACTS_COLLECTION, PROFILES_COLLECTION};
    use serde_json::json;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl UrlLauncher for Recorder {
        fn open_url(&self, url: &str) -> Result<(), IntentError> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn app_with(backend: &MemoryBackend, recorder: &Recorder) -> App {
        let mut app = App::new(
            Config::default(),
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Box::new(recorder.clone()),
        );
        app.start();
        app.check_background_tasks();
        app
    }

    #[test]
    fn test_starts_on_login_without_session() {
        let backend = MemoryBackend::new();
        let app = app_with(&backend, &Recorder::default());
        assert_eq!(app.navigator.kind(), NavKind::Unauthenticated);
        assert!(!app.is_signed_in());
    }

    #[test]
    fn test_invalid_login_shows_notice() {
        let backend = MemoryBackend::new();
        let mut app = app_with(&backend, &Recorder::default());
        app.login.set_phone("123");
        app.submit_login();
        assert_eq!(app.notice.as_ref().unwrap().title, "Campos inválidos");
        assert!(backend.sign_in_attempts().is_empty());
    }

    #[test]
    fn test_call_from_contacts_tab() {
        let backend = MemoryBackend::new();
        backend.put_document(PROFILES_COLLECTION, Document::new("u1", json!({"rol": "admin"})));
        backend.put_document(
            CONTACTS_COLLECTION,
            Document::new("c1", json!({"primerNombre": "Ana", "telefono": "+51 987 654 321"})),
        );
        backend.set_current_user(Some(AuthUser {
            uid: "u1".into(),
            email: Some("987654321@conectape.pe".into()),
        }));

        let recorder = Recorder::default();
        let mut app = app_with(&backend, &recorder);
        assert!(app.is_signed_in());

        app.call_selected();
        app.whatsapp_selected();
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["tel:987654321", "whatsapp://send?phone=51987654321"]
        );
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_round_trip() {
        let backend = MemoryBackend::new();
        backend.add_account("987654321@conectape.pe", "secret", "u1");
        let mut app = app_with(&backend, &Recorder::default());
        // Already remembered, so the config file is left alone.
        app.config.last_phone = Some("987654321".into());

        app.login.set_phone("987654321");
        app.login.set_password("secret");
        app.submit_login();
        assert!(app.login.is_loading());

        // Let the spawned task finish.
        let result = app.task_rx.recv().await.unwrap();
        let TaskResult::SignIn { phone, result } = result;
        app.finish_login(phone, result);
        app.check_background_tasks();

        assert!(!app.login.is_loading());
        assert_eq!(app.notice.as_ref().unwrap().title, "¡Bienvenido!");
        assert_eq!(app.navigator.kind(), NavKind::Basic);
    }
}
