//! Auth/role state machine.
//!
//! Two layered listeners drive navigation: the auth-state listener (owned by
//! the `Navigator` for its whole life) and, while a session exists, a listener
//! on the user's profile document. States own their registrations, so
//! replacing a state releases everything the old one was subscribed to.
//!
//! ```text
//! Initializing ─┬─> Unauthenticated
//!               └─> RoleChecking ─┬─> Admin
//!                                 └─> Basic
//! ```
//!
//! A role change rebuilds the section subtree from scratch; a snapshot that
//! repeats the current role leaves it alone. A failed profile read resolves
//! to Basic.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{
    AuthService, AuthUser, BackendError, BackendEvent, Document, DocumentStore, EventSender,
    ListenerId, ListenerRegistration,
};
use crate::models::{Role, UserProfile, PROFILES_COLLECTION};
use crate::screens::{sign_out_failed, CongressListScreen, ContactListScreen, Dashboard, Notice};

/// A navigable section of the signed-in subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Contacts,
    Congress,
    Account,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Section::Contacts => "Directorio",
            Section::Congress => "Congresistas",
            Section::Account => "Cuenta",
        }
    }
}

const ADMIN_SECTIONS: &[Section] = &[Section::Contacts, Section::Congress, Section::Account];
const BASIC_SECTIONS: &[Section] = &[Section::Contacts, Section::Account];

/// Signed-in user plus the listener on their profile document.
pub struct ActiveSession {
    pub user: AuthUser,
    profile: ListenerRegistration,
}

impl ActiveSession {
    pub fn profile_listener(&self) -> ListenerId {
        self.profile.id()
    }
}

pub struct AdminTabs {
    pub contacts: ContactListScreen,
    pub congress: CongressListScreen,
    pub active: Section,
}

pub struct BasicTabs {
    pub contacts: ContactListScreen,
    pub active: Section,
}

pub enum NavState {
    /// Waiting for the first auth-state delivery
    Initializing,
    Unauthenticated,
    /// Session present, profile not yet resolved
    RoleChecking(ActiveSession),
    Admin(ActiveSession, AdminTabs),
    Basic(ActiveSession, BasicTabs),
}

/// Discriminant of `NavState`, for display and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKind {
    Initializing,
    Unauthenticated,
    RoleChecking,
    Admin,
    Basic,
}

impl NavState {
    pub fn kind(&self) -> NavKind {
        match self {
            NavState::Initializing => NavKind::Initializing,
            NavState::Unauthenticated => NavKind::Unauthenticated,
            NavState::RoleChecking(_) => NavKind::RoleChecking,
            NavState::Admin(..) => NavKind::Admin,
            NavState::Basic(..) => NavKind::Basic,
        }
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        match self {
            NavState::RoleChecking(session)
            | NavState::Admin(session, _)
            | NavState::Basic(session, _) => Some(session),
            NavState::Initializing | NavState::Unauthenticated => None,
        }
    }
}

pub struct Navigator {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn DocumentStore>,
    events: EventSender,
    auth_registration: Option<ListenerRegistration>,
    state: NavState,
    /// Bumped every time a section subtree is built
    generation: u64,
}

impl Navigator {
    pub fn new(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn DocumentStore>,
        events: EventSender,
    ) -> Self {
        Self {
            auth,
            store,
            events,
            auth_registration: None,
            state: NavState::Initializing,
            generation: 0,
        }
    }

    /// Register the auth-state listener. Calling it again re-registers.
    pub fn start(&mut self) {
        let registration = self.auth.watch_auth_state(self.events.clone());
        debug!(listener = %registration.id(), "Watching auth state");
        self.auth_registration = Some(registration);
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn kind(&self) -> NavKind {
        self.state.kind()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.state.session().map(|s| &s.user)
    }

    pub fn profile_listener(&self) -> Option<ListenerId> {
        self.state.session().map(ActiveSession::profile_listener)
    }

    pub fn role(&self) -> Option<Role> {
        match self.state {
            NavState::Admin(..) => Some(Role::Admin),
            NavState::Basic(..) => Some(Role::Basic),
            _ => None,
        }
    }

    // ===== Sections =====

    /// Sections of the current subtree; empty outside Admin/Basic.
    pub fn sections(&self) -> &'static [Section] {
        match self.state {
            NavState::Admin(..) => ADMIN_SECTIONS,
            NavState::Basic(..) => BASIC_SECTIONS,
            _ => &[],
        }
    }

    pub fn active_section(&self) -> Option<Section> {
        match &self.state {
            NavState::Admin(_, tabs) => Some(tabs.active),
            NavState::Basic(_, tabs) => Some(tabs.active),
            _ => None,
        }
    }

    /// Switch to `section` if the current subtree has it.
    pub fn set_section(&mut self, section: Section) {
        if !self.sections().contains(&section) {
            return;
        }
        match &mut self.state {
            NavState::Admin(_, tabs) => tabs.active = section,
            NavState::Basic(_, tabs) => tabs.active = section,
            _ => {}
        }
    }

    pub fn next_section(&mut self) {
        self.cycle_section(1);
    }

    pub fn previous_section(&mut self) {
        let len = self.sections().len();
        self.cycle_section(len.saturating_sub(1));
    }

    fn cycle_section(&mut self, step: usize) {
        let sections = self.sections();
        let Some(active) = self.active_section() else {
            return;
        };
        if let Some(pos) = sections.iter().position(|s| *s == active) {
            self.set_section(sections[(pos + step) % sections.len()]);
        }
    }

    pub fn contacts(&self) -> Option<&ContactListScreen> {
        match &self.state {
            NavState::Admin(_, tabs) => Some(&tabs.contacts),
            NavState::Basic(_, tabs) => Some(&tabs.contacts),
            _ => None,
        }
    }

    pub fn contacts_mut(&mut self) -> Option<&mut ContactListScreen> {
        match &mut self.state {
            NavState::Admin(_, tabs) => Some(&mut tabs.contacts),
            NavState::Basic(_, tabs) => Some(&mut tabs.contacts),
            _ => None,
        }
    }

    pub fn congress(&self) -> Option<&CongressListScreen> {
        match &self.state {
            NavState::Admin(_, tabs) => Some(&tabs.congress),
            _ => None,
        }
    }

    pub fn congress_mut(&mut self) -> Option<&mut CongressListScreen> {
        match &mut self.state {
            NavState::Admin(_, tabs) => Some(&mut tabs.congress),
            _ => None,
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::from_user(self.user(), self.role())
    }

    // ===== Events =====

    /// Route one backend event. Returns a notice for the user, if any.
    pub fn handle(&mut self, event: &BackendEvent) -> Option<Notice> {
        match event {
            BackendEvent::AuthState { listener, user }
                if self.auth_registration.as_ref().map(ListenerRegistration::id)
                    == Some(*listener) =>
            {
                self.on_auth_state(user.clone());
                None
            }
            BackendEvent::Document { listener, result }
                if self.profile_listener() == Some(*listener) =>
            {
                self.on_profile(result);
                None
            }
            _ => self.forward_to_sections(event),
        }
    }

    fn forward_to_sections(&mut self, event: &BackendEvent) -> Option<Notice> {
        match &mut self.state {
            NavState::Admin(_, tabs) => tabs
                .contacts
                .handle_event(event)
                .or_else(|| tabs.congress.handle_event(event)),
            NavState::Basic(_, tabs) => tabs.contacts.handle_event(event),
            _ => {
                debug!(listener = %event.listener(), "Dropping event for inactive listener");
                None
            }
        }
    }

    fn on_auth_state(&mut self, user: Option<AuthUser>) {
        let Some(user) = user else {
            if self.kind() != NavKind::Unauthenticated {
                info!("No session");
            }
            self.state = NavState::Unauthenticated;
            return;
        };

        if self.user().map(|u| u.uid.as_str()) == Some(user.uid.as_str()) {
            debug!(uid = %user.uid, "Auth state repeats current session");
            return;
        }

        let profile = self
            .store
            .watch_document(PROFILES_COLLECTION, &user.uid, self.events.clone());
        info!(uid = %user.uid, listener = %profile.id(), "Session started, checking role");
        self.state = NavState::RoleChecking(ActiveSession { user, profile });
    }

    fn on_profile(&mut self, result: &Result<Option<Document>, BackendError>) {
        let Some(uid) = self.user().map(|u| u.uid.clone()) else {
            return;
        };
        let role = match result {
            Ok(doc) => UserProfile::from_snapshot(&uid, doc.as_ref()).resolved_role(),
            Err(e) => {
                warn!(uid = %uid, error = %e, "Profile read failed, falling back to basic");
                Role::Basic
            }
        };

        let current = std::mem::replace(&mut self.state, NavState::Initializing);
        self.state = match (current, role) {
            (NavState::Admin(session, tabs), Role::Admin) => NavState::Admin(session, tabs),
            (NavState::Basic(session, tabs), Role::Basic) => NavState::Basic(session, tabs),
            (NavState::RoleChecking(session), role) => self.build(session, role),
            (NavState::Admin(session, tabs), role) => {
                drop(tabs);
                self.build(session, role)
            }
            (NavState::Basic(session, tabs), role) => {
                drop(tabs);
                self.build(session, role)
            }
            (other, _) => other,
        };
    }

    /// Build a fresh subtree for `role`, with new list subscriptions.
    fn build(&mut self, session: ActiveSession, role: Role) -> NavState {
        self.generation += 1;
        info!(uid = %session.user.uid, role = role.label(), generation = self.generation, "Building sections");

        let contacts = ContactListScreen::open(self.store.as_ref(), self.events.clone());
        match role {
            Role::Admin => {
                let congress = CongressListScreen::open(self.store.as_ref(), self.events.clone());
                NavState::Admin(
                    session,
                    AdminTabs {
                        contacts,
                        congress,
                        active: Section::Contacts,
                    },
                )
            }
            Role::Basic => NavState::Basic(
                session,
                BasicTabs {
                    contacts,
                    active: Section::Contacts,
                },
            ),
        }
    }

    /// Ask the auth service to end the session. Navigation follows from
    /// the auth-state delivery, not from this call.
    pub async fn sign_out(&self) -> Option<Notice> {
        match self.auth.sign_out().await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Sign-out failed");
                Some(sign_out_failed())
            }
        }
    }
}
