//! Keyboard input handling for the TUI.
//!
//! Overlays take precedence over the screen underneath: the login form while
//! signed out, then help, quit confirmation and the search box.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use conectape_core::navigation::{NavKind, Section};

use crate::app::{App, AppState};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('s')
            | KeyCode::Char('S')
            | KeyCode::Char('y')
            | KeyCode::Char('Y')
            | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match app.navigator.kind() {
        NavKind::Unauthenticated => return handle_login_input(app, key),
        // Nothing to interact with until the session resolves
        NavKind::Initializing | NavKind::RoleChecking => {
            return Ok(key.code == KeyCode::Esc);
        }
        NavKind::Admin | NavKind::Basic => {}
    }

    // Handle search mode
    if matches!(app.state, AppState::Searching) {
        return handle_search_input(app, key);
    }

    match key.code {
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Esc => app.dismiss_notice(),

        // Sections
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if let Some(section) = app.navigator.sections().get(index).copied() {
                app.navigator.set_section(section);
            }
        }
        KeyCode::Right | KeyCode::Tab => app.navigator.next_section(),
        KeyCode::Left | KeyCode::BackTab => app.navigator.previous_section(),

        // List navigation
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),

        // Actions
        KeyCode::Char('/') => {
            if app.active_section() != Some(Section::Account) {
                app.state = AppState::Searching;
            }
        }
        KeyCode::Char('c') | KeyCode::Enter => app.call_selected(),
        KeyCode::Char('w') => app.whatsapp_selected(),
        KeyCode::Char('d') => {
            if app.active_section() == Some(Section::Account) {
                app.navigator.set_section(Section::Contacts);
            }
        }
        KeyCode::Char('o') => app.sign_out().await,
        _ => {}
    }

    Ok(false)
}

fn handle_search_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.clear_search();
        }
        KeyCode::Enter => {
            // Keep the query active
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Char(c) => app.push_search_char(c),
        _ => {}
    }
    Ok(false)
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login.toggle_focus();
        }
        KeyCode::F(2) => app.login.toggle_password_visibility(),
        KeyCode::Enter => app.submit_login(),
        KeyCode::Backspace => app.login.backspace(),
        KeyCode::Char(c) => app.login.push_char(c),
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use conectape_core::backend::{AuthUser, Document, MemoryBackend};
    use conectape_core::intents::SystemLauncher;
    use conectape_core::models::{CONTACTS_COLLECTION, PROFILES_COLLECTION};
    use conectape_core::screens::LoginField;
    use conectape_core::Config;
    use crossterm::event::KeyModifiers;
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_for(backend: &MemoryBackend) -> App {
        let mut app = App::new(
            Config::default(),
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Box::new(SystemLauncher),
        );
        app.start();
        app.check_background_tasks();
        app
    }

    fn signed_in_admin() -> App {
        let backend = MemoryBackend::new();
        backend.put_document(PROFILES_COLLECTION, Document::new("u1", json!({"rol": "admin"})));
        backend.put_document(
            CONTACTS_COLLECTION,
            Document::new("c1", json!({"primerNombre": "Ana", "telefono": "987654321"})),
        );
        backend.put_document(
            CONTACTS_COLLECTION,
            Document::new("c2", json!({"primerNombre": "Luis", "telefono": "912345678"})),
        );
        backend.set_current_user(Some(AuthUser {
            uid: "u1".into(),
            email: Some("987654321@conectape.pe".into()),
        }));
        app_for(&backend)
    }

    #[tokio::test]
    async fn test_login_typing() {
        let backend = MemoryBackend::new();
        let mut app = app_for(&backend);

        for c in "98a7".chars() {
            assert!(!handle_input(&mut app, key(KeyCode::Char(c))).await.unwrap());
        }
        assert_eq!(app.login.phone(), "987");

        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.login.focus, LoginField::Password);
        handle_input(&mut app, key(KeyCode::Char('x'))).await.unwrap();
        assert_eq!(app.login.password(), "x");

        handle_input(&mut app, key(KeyCode::F(2))).await.unwrap();
        assert!(app.login.show_password);
    }

    #[tokio::test]
    async fn test_esc_on_login_quits() {
        let backend = MemoryBackend::new();
        let mut app = app_for(&backend);
        assert!(handle_input(&mut app, key(KeyCode::Esc)).await.unwrap());
        assert_eq!(app.state, AppState::Quitting);
    }

    #[tokio::test]
    async fn test_section_keys() {
        let mut app = signed_in_admin();
        assert_eq!(app.active_section(), Some(Section::Contacts));

        handle_input(&mut app, key(KeyCode::Char('2'))).await.unwrap();
        assert_eq!(app.active_section(), Some(Section::Congress));
        handle_input(&mut app, key(KeyCode::Right)).await.unwrap();
        assert_eq!(app.active_section(), Some(Section::Account));

        // Search is not available on the account tab
        handle_input(&mut app, key(KeyCode::Char('/'))).await.unwrap();
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Char('d'))).await.unwrap();
        assert_eq!(app.active_section(), Some(Section::Contacts));
    }

    #[tokio::test]
    async fn test_search_esc_clears_enter_keeps() {
        let mut app = signed_in_admin();

        handle_input(&mut app, key(KeyCode::Char('/'))).await.unwrap();
        assert_eq!(app.state, AppState::Searching);
        for c in "lu".chars() {
            handle_input(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.state, AppState::Normal);
        let contacts = app.navigator.contacts().unwrap();
        assert_eq!(contacts.query(), "lu");
        assert_eq!(contacts.visible().len(), 1);

        handle_input(&mut app, key(KeyCode::Char('/'))).await.unwrap();
        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.navigator.contacts().unwrap().query(), "");
    }

    #[tokio::test]
    async fn test_quit_confirmation() {
        let mut app = signed_in_admin();

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert_eq!(app.state, AppState::ConfirmingQuit);
        handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap();
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, key(KeyCode::Char('s'))).await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_out_returns_to_login() {
        let mut app = signed_in_admin();
        handle_input(&mut app, key(KeyCode::Char('o'))).await.unwrap();
        app.check_background_tasks();
        assert_eq!(app.navigator.kind(), NavKind::Unauthenticated);
    }
}
