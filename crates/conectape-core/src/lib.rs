//! Core library for the ConectaPe contact directory.
//!
//! This crate holds everything that is independent of the front end:
//!
//! - `backend`: auth service and document store traits, plus the Firebase
//!   REST adapter and an in-memory backend
//! - `models`: directory records and user profiles
//! - `live`: live collection subscriptions feeding a screen's working set
//! - `navigation`: the auth/role state machine selecting the visible sections
//! - `screens`: UI-agnostic view-models for login, lists and dashboard
//! - `intents`: dial and WhatsApp deep links through a URL launcher
//! - `diagnostics`: the one-off diagnostic file writer
//! - `utils`: phone normalization, search filtering and formatting

pub mod auth;
pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod intents;
pub mod live;
pub mod models;
pub mod navigation;
pub mod screens;
pub mod utils;

pub use config::Config;
pub use navigation::{NavState, Navigator};
