use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "conectape";

/// Refresh tokens kept in the OS keychain, keyed by auth subject id.
pub struct CredentialStore;

impl CredentialStore {
    /// Store the refresh token for a subject
    pub fn store(uid: &str, refresh_token: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, uid)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(refresh_token)
            .context("Failed to store refresh token in keychain")?;
        Ok(())
    }

    /// Retrieve the refresh token for a subject
    pub fn get_refresh_token(uid: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, uid)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve refresh token from keychain")
    }

    /// Delete the stored refresh token for a subject
    pub fn delete(uid: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, uid)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}
