use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::AuthUser;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// ID token lifetime in minutes.
const TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Signed-in subject and its tokens.
///
/// Only the subject and timestamps reach `session.json`; the ID token lives
/// in memory and the refresh token in the keychain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub uid: String,
    pub email: Option<String>,
    #[serde(skip)]
    pub id_token: String,
    #[serde(skip)]
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(uid: String, email: Option<String>, id_token: String, refresh_token: String) -> Self {
        Self {
            uid,
            email,
            id_token,
            refresh_token,
            created_at: Utc::now(),
        }
    }

    /// Check if the ID token will expire soon (or is missing) and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at = self.created_at
            + Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        self.id_token.is_empty() || Utc::now() > refresh_at
    }

    pub fn user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load the persisted subject from disk. Tokens must be restored separately.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let data: SessionData = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;
            self.data = Some(data);
            return Ok(true);
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Update session with new data
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.data.as_ref().map(SessionData::user)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionData {
        SessionData::new(
            "uid-1".into(),
            Some("987654321@conectape.pe".into()),
            "id-token".into(),
            "refresh-token".into(),
        )
    }

    #[test]
    fn test_fresh_session_does_not_need_refresh() {
        let data = sample();
        assert!(!data.needs_refresh());
    }

    #[test]
    fn test_old_session_needs_refresh() {
        let mut data = sample();
        data.created_at = Utc::now() - Duration::minutes(56);
        assert!(data.needs_refresh());

        data.created_at = Utc::now() - Duration::minutes(30);
        assert!(!data.needs_refresh());
        data.id_token.clear();
        assert!(data.needs_refresh());
    }

    #[test]
    fn test_save_load_skips_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(sample());
        session.save().unwrap();

        let contents = std::fs::read_to_string(dir.path().join(SESSION_FILE)).unwrap();
        assert!(!contents.contains("id-token"));
        assert!(!contents.contains("refresh-token"));

        let mut restored = Session::new(dir.path().to_path_buf());
        assert!(restored.load().unwrap());
        let data = restored.data.as_ref().unwrap();
        assert_eq!(data.uid, "uid-1");
        assert!(data.id_token.is_empty());
        assert!(data.needs_refresh());

        restored.clear().unwrap();
        assert!(!dir.path().join(SESSION_FILE).exists());
        assert!(restored.user().is_none());
    }
}
