//! One-off diagnostic file writer.
//!
//! Writes the given IP address to `ip.txt` in the application data
//! directory, replacing any previous content.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::screens::Notice;

/// File name of the diagnostic IP file.
pub const IP_FILE: &str = "ip.txt";

/// Write `ip` to `<dir>/ip.txt` (UTF-8, overwriting) and return the file path.
pub fn save_ip_to_file(dir: &Path, ip: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(IP_FILE);
    std::fs::write(&path, ip).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Save the IP and describe the outcome as a notice. Failures are not retried.
pub fn save_ip_notice(dir: &Path, ip: &str) -> Notice {
    match save_ip_to_file(dir, ip) {
        Ok(path) => {
            info!(path = %path.display(), "IP file saved");
            Notice::success(
                "✅ Guardado exitoso",
                format!("Archivo guardado en:\n{}", path.display()),
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to save IP file");
            let message = format!("{:#}", e);
            let message = if message.is_empty() {
                "Ocurrió un error desconocido.".to_string()
            } else {
                message
            };
            Notice::error("❌ Error al guardar IP", message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_ip_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_ip_to_file(dir.path(), "192.168.1.10").unwrap();
        assert_eq!(path, dir.path().join(IP_FILE));

        save_ip_to_file(dir.path(), "10.0.0.2").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "10.0.0.2");
    }

    #[test]
    fn test_save_ip_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("conectape");
        let path = save_ip_to_file(&nested, "10.0.0.2").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_ip_notice_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let notice = save_ip_notice(dir.path(), "10.0.0.2");
        assert!(!notice.is_error());
        assert!(notice.message.ends_with(IP_FILE));
    }

    #[test]
    fn test_save_ip_notice_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "x").unwrap();

        let notice = save_ip_notice(&blocker, "10.0.0.2");
        assert!(notice.is_error());
        assert_eq!(notice.title, "❌ Error al guardar IP");
    }
}
