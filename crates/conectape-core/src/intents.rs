//! Dial and WhatsApp intents.
//!
//! Phones are normalized to their local 9 digits before any URL is built;
//! anything shorter is rejected without touching the launcher. WhatsApp
//! tries the app scheme first and falls back to the web link.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, warn};

use crate::screens::Notice;
use crate::utils::{is_local_number, normalize_phone};

/// Country calling code prefixed to WhatsApp numbers.
const COUNTRY_CODE: &str = "51";

#[derive(Error, Debug)]
pub enum IntentError {
    #[error("No URL opener available: {0}")]
    OpenerNotFound(String),

    #[error("Opener exited with {0}")]
    Rejected(String),

    #[error("Failed to run opener: {0}")]
    Io(#[from] std::io::Error),
}

/// Hands a URL to whatever the platform registers for its scheme.
pub trait UrlLauncher: Send + Sync {
    fn open_url(&self, url: &str) -> Result<(), IntentError>;
}

/// Launcher backed by the desktop opener (`xdg-open`, `open` or `start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

impl UrlLauncher for SystemLauncher {
    fn open_url(&self, url: &str) -> Result<(), IntentError> {
        let mut cmd = Self::command(url);
        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IntentError::OpenerNotFound(
                    cmd.get_program().to_string_lossy().into_owned(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if output.status.success() {
            debug!(url, "URL opened");
            Ok(())
        } else {
            Err(IntentError::Rejected(output.status.to_string()))
        }
    }
}

pub fn dial_url(local: &str) -> String {
    format!("tel:{}", local)
}

pub fn whatsapp_app_url(local: &str) -> String {
    format!("whatsapp://send?phone={}{}", COUNTRY_CODE, local)
}

pub fn whatsapp_web_url(local: &str) -> String {
    format!("https://wa.me/{}{}", COUNTRY_CODE, local)
}

fn invalid_number() -> Notice {
    Notice::error("Número inválido", "El contacto no tiene un número válido.")
}

/// Normalize `raw` and dial it. Returns the notice to show, if any.
pub fn place_call(launcher: &dyn UrlLauncher, raw: Option<&str>) -> Option<Notice> {
    let local = normalize_phone(raw);
    if !is_local_number(&local) {
        return Some(invalid_number());
    }

    match launcher.open_url(&dial_url(&local)) {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "Dial intent failed");
            Some(Notice::error("Error", "No se pudo iniciar la llamada."))
        }
    }
}

/// Normalize `raw` and open a WhatsApp chat, falling back to the web link.
pub fn open_whatsapp(launcher: &dyn UrlLauncher, raw: Option<&str>) -> Option<Notice> {
    let local = normalize_phone(raw);
    if !is_local_number(&local) {
        return Some(invalid_number());
    }

    let app_error = match launcher.open_url(&whatsapp_app_url(&local)) {
        Ok(()) => return None,
        Err(e) => e,
    };
    debug!(error = %app_error, "WhatsApp app unavailable, trying web");

    match launcher.open_url(&whatsapp_web_url(&local)) {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "WhatsApp intents failed");
            Some(Notice::error("Error", "No se pudo abrir WhatsApp ni el navegador."))
        }
    }
}
