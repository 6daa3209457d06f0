//! Offline demo data for `--demo`.
//!
//! Seeds an in-memory backend with two accounts (one admin, one basic) and a
//! handful of directory rows, including one that does not decode.

use serde_json::json;

use conectape_core::auth::synthetic_identifier;
use conectape_core::backend::{Document, MemoryBackend};
use conectape_core::models::{CONGRESS_COLLECTION, CONTACTS_COLLECTION, PROFILES_COLLECTION};

pub const DEMO_PASSWORD: &str = "demo1234";

/// Accounts as (phone, uid, role).
const ACCOUNTS: [(&str, &str, &str); 2] = [
    ("987654321", "demo-admin", "admin"),
    ("912345678", "demo-basic", "usuario"),
];

/// Credentials shown on the login screen in demo mode.
pub fn login_hint() -> String {
    let phones: Vec<&str> = ACCOUNTS.iter().map(|(phone, _, _)| *phone).collect();
    format!("Demo: {} / {}", phones.join(" o "), DEMO_PASSWORD)
}

pub fn seeded_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();

    for (phone, uid, role) in ACCOUNTS {
        backend.add_account(&synthetic_identifier(phone), DEMO_PASSWORD, uid);
        backend.put_document(PROFILES_COLLECTION, Document::new(uid, json!({ "rol": role })));
    }

    backend.set_collection(
        CONTACTS_COLLECTION,
        vec![
            Document::new(
                "987654321",
                json!({
                    "primerNombre": "María",
                    "segundoNombre": "Elena",
                    "primerApellido": "Quispe",
                    "segundoApellido": "Huamán",
                    "telefono": "987654321",
                    "cargo": "Asesora",
                    "area": "Comisión de Presupuesto",
                    "operador": "Claro"
                }),
            ),
            Document::new(
                "912345678",
                json!({
                    "primerNombre": "Jorge",
                    "primerApellido": "Ramírez",
                    "telefono": "+51 912 345 678",
                    "cargo": "Técnico",
                    "area": "Logística",
                    "operador": "Movistar"
                }),
            ),
            Document::new(
                "955111222",
                json!({
                    "primerNombre": "Lucía",
                    "primerApellido": "Torres",
                    "telefono": "955111222",
                    "area": "Prensa"
                }),
            ),
            Document::new(
                "900000001",
                json!({
                    "primerNombre": "Pedro",
                    "primerApellido": "Sin Número",
                    "telefono": "12345"
                }),
            ),
        ],
    );

    backend.set_collection(
        CONGRESS_COLLECTION,
        vec![
            Document::new(
                "k1",
                json!({
                    "primerNombre": "Rosa",
                    "primerApellido": "Mendoza",
                    "telefono": "944555666",
                    "operador": "Entel"
                }),
            ),
            Document::new(
                "k2",
                json!({
                    "primerNombre": "Alberto",
                    "primerApellido": "Castillo",
                    "segundoApellido": "Vega",
                    "telefono": "51933222111"
                }),
            ),
            Document::new("k3", json!({ "telefono": { "numero": 1 } })),
        ],
    );

    backend
}

#[cfg(test)]
mod tests {
    use super::*;
    use conectape_core::backend::{AuthService, DocumentStore};

    #[test]
    fn test_login_hint_lists_accounts() {
        assert_eq!(login_hint(), "Demo: 987654321 o 912345678 / demo1234");
    }

    #[tokio::test]
    async fn test_demo_accounts_sign_in() {
        let backend = seeded_backend();
        let user = backend
            .sign_in("987654321@conectape.pe", DEMO_PASSWORD)
            .await
            .unwrap();
        assert_eq!(user.uid, "demo-admin");

        let profile = backend
            .get_document(PROFILES_COLLECTION, "demo-basic")
            .await
            .unwrap();
        assert!(profile.is_some());
    }
}
