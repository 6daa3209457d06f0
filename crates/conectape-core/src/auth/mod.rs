//! Authentication helpers.
//!
//! This module provides:
//! - the synthetic identifier scheme (`<phone>@conectape.pe`) used to sign in
//!   with a phone number against an email/password auth service
//! - `Session`: persisted record of the signed-in subject and its tokens
//! - `CredentialStore`: refresh token storage in the OS keychain
//!
//! ID tokens expire after 60 minutes and are refreshed 5 minutes early.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};

/// Domain of the synthetic identifiers. Not a real mailbox.
pub const SYNTHETIC_DOMAIN: &str = "conectape.pe";

/// Build the email-shaped identifier for a phone number.
pub fn synthetic_identifier(phone: &str) -> String {
    format!("{}@{}", phone, SYNTHETIC_DOMAIN)
        .trim()
        .to_lowercase()
}

/// Recover the phone number from an email-shaped identifier (text before `@`).
pub fn phone_from_email(email: &str) -> Option<&str> {
    email.split('@').next().filter(|p| !p.is_empty())
}
