//! Searchable directory lists.
//!
//! `DirectoryScreen` combines a live collection with the search box and a
//! row selection. The visible rows are recomputed from the latest snapshot
//! and the current query each time they are asked for.

use super::Notice;
use crate::backend::{BackendEvent, DocumentStore, EventSender, ListenerId};
use crate::intents::{open_whatsapp, place_call, UrlLauncher};
use crate::live::{Applied, LiveCollection};
use crate::models::{CongressionalContact, Contact, DirectoryRecord, Entry};
use crate::utils::filter_records;

/// Per-collection texts of a directory list.
pub trait DirectorySection: DirectoryRecord {
    const TITLE: &'static str;
    const EMPTY_MESSAGE: &'static str;
    const LOAD_ERROR: &'static str;
}

impl DirectorySection for Contact {
    const TITLE: &'static str = "Directorio del Congreso";
    const EMPTY_MESSAGE: &'static str = "No hay contactos encontrados.";
    const LOAD_ERROR: &'static str = "No se pudieron cargar los contactos";
}

impl DirectorySection for CongressionalContact {
    const TITLE: &'static str = "CONTACTOS CONGRESALES";
    const EMPTY_MESSAGE: &'static str = "NO HAY CONTACTOS.";
    const LOAD_ERROR: &'static str = "No se pudieron cargar los contactos congresales.";
}

pub type ContactListScreen = DirectoryScreen<Contact>;
pub type CongressListScreen = DirectoryScreen<CongressionalContact>;

pub struct DirectoryScreen<T: DirectorySection> {
    live: LiveCollection<T>,
    query: String,
    selected: usize,
}

impl<T: DirectorySection> Default for DirectoryScreen<T> {
    fn default() -> Self {
        Self {
            live: LiveCollection::new(),
            query: String::new(),
            selected: 0,
        }
    }
}

impl<T: DirectorySection> DirectoryScreen<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screen with its subscription already open.
    pub fn open(store: &dyn DocumentStore, events: EventSender) -> Self {
        let mut screen = Self::new();
        screen.live.subscribe(store, events);
        screen
    }

    pub fn close(&mut self) {
        self.live.unsubscribe();
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.live.listener()
    }

    pub fn is_loading(&self) -> bool {
        !self.live.is_loaded()
    }

    pub fn title(&self) -> &'static str {
        T::TITLE
    }

    pub fn empty_message(&self) -> &'static str {
        T::EMPTY_MESSAGE
    }

    // ===== Search =====

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.selected = 0;
    }

    pub fn push_query_char(&mut self, c: char) {
        self.query.push(c);
        self.selected = 0;
    }

    pub fn pop_query_char(&mut self) {
        self.query.pop();
        self.selected = 0;
    }

    /// Rows matching the current query, in snapshot order.
    pub fn visible(&self) -> Vec<&Entry<T>> {
        filter_records(&self.query, self.live.entries())
    }

    pub fn total(&self) -> usize {
        self.live.entries().len()
    }

    // ===== Selection =====

    pub fn selected_index(&self) -> usize {
        let len = self.visible().len();
        if len == 0 {
            0
        } else {
            self.selected.min(len - 1)
        }
    }

    pub fn selected(&self) -> Option<&Entry<T>> {
        self.visible().get(self.selected_index()).copied()
    }

    pub fn select_next(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.selected = (self.selected_index() + 1) % len;
        }
    }

    pub fn select_previous(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.selected = (self.selected_index() + len - 1) % len;
        }
    }

    // ===== Events and actions =====

    /// Feed a backend event. Returns a notice when the listener failed.
    pub fn handle_event(&mut self, event: &BackendEvent) -> Option<Notice> {
        match self.live.apply(event) {
            Applied::Ignored => None,
            Applied::Replaced(_) => {
                self.selected = self.selected_index();
                None
            }
            Applied::Failed(_) => Some(Notice::error("Error", T::LOAD_ERROR)),
        }
    }

    fn selected_phone(&self) -> Option<&str> {
        self.selected()
            .and_then(|entry| entry.as_ref().ok())
            .and_then(|record| record.raw_phone())
    }

    /// Dial the selected row. Malformed rows count as having no number.
    pub fn call_selected(&self, launcher: &dyn UrlLauncher) -> Option<Notice> {
        self.selected()?;
        place_call(launcher, self.selected_phone())
    }

    pub fn whatsapp_selected(&self, launcher: &dyn UrlLauncher) -> Option<Notice> {
        self.selected()?;
        open_whatsapp(launcher, self.selected_phone())
    }
}
