use serde::{Deserialize, Serialize};

use super::lenient;
use crate::backend::Document;

/// Role literal granting the admin sections.
const ADMIN_ROLE: &str = "admin";

/// Navigation role resolved from a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum Role {
    Admin,
    Basic,
}

impl Role {
    /// `admin` (trimmed, any case) is Admin; anything else, including absent, is Basic.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case(ADMIN_ROLE) => Role::Admin,
            _ => Role::Basic,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::Basic => "Usuario",
        }
    }
}

/// Profile document of a signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(skip_deserializing)]
    pub id: String,
    #[serde(rename = "rol", default, deserialize_with = "lenient::opt_string")]
    pub role: Option<String>,
}

impl UserProfile {
    /// Decode a profile snapshot. A missing document or an unreadable `rol`
    /// field yields an empty profile, which resolves to Basic.
    pub fn from_snapshot(id: &str, doc: Option<&Document>) -> Self {
        let mut profile = doc
            .and_then(|d| serde_json::from_value(serde_json::Value::Object(d.fields.clone())).ok())
            .unwrap_or_else(UserProfile::default);
        profile.id = id.to_string();
        profile
    }

    pub fn resolved_role(&self) -> Role {
        Role::from_raw(self.role.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_from_raw() {
        assert_eq!(Role::from_raw(Some("admin")), Role::Admin);
        assert_eq!(Role::from_raw(Some("Admin ")), Role::Admin);
        assert_eq!(Role::from_raw(Some("  ADMIN")), Role::Admin);
        assert_eq!(Role::from_raw(Some("administrador")), Role::Basic);
        assert_eq!(Role::from_raw(Some("")), Role::Basic);
        assert_eq!(Role::from_raw(None), Role::Basic);
    }

    #[test]
    fn test_profile_from_snapshot() {
        let doc = Document::new("u1", json!({"rol": "Admin "}));
        let profile = UserProfile::from_snapshot("u1", Some(&doc));
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.resolved_role(), Role::Admin);

        let missing = UserProfile::from_snapshot("u2", None);
        assert_eq!(missing.resolved_role(), Role::Basic);

        let weird = Document::new("u3", json!({"rol": ["admin"]}));
        assert_eq!(UserProfile::from_snapshot("u3", Some(&weird)).resolved_role(), Role::Basic);
    }
}
