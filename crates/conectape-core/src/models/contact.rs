use serde::{Deserialize, Serialize};

use super::{lenient, DirectoryRecord, CONGRESS_COLLECTION, CONTACTS_COLLECTION};
use crate::utils::{join_name_parts, normalize_phone, Searchable};

/// Entry of the general directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Contact {
    #[serde(skip_deserializing)]
    pub id: String,
    #[serde(rename = "primerNombre", default, deserialize_with = "lenient::string")]
    pub first_name: String,
    #[serde(rename = "segundoNombre", default, deserialize_with = "lenient::opt_string")]
    pub middle_name: Option<String>,
    #[serde(rename = "primerApellido", default, deserialize_with = "lenient::string")]
    pub last_name: String,
    #[serde(rename = "segundoApellido", default, deserialize_with = "lenient::opt_string")]
    pub second_last_name: Option<String>,
    #[serde(rename = "telefono", default, deserialize_with = "lenient::string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub area: Option<String>,
    /// Job title or position (`cargo`)
    #[serde(rename = "cargo", default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(rename = "operador", default, deserialize_with = "lenient::opt_string")]
    pub carrier: Option<String>,
}

impl Contact {
    /// Full name built from the non-empty name parts.
    pub fn display_name(&self) -> String {
        join_name_parts([
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
            self.second_last_name.as_deref(),
        ])
    }

    /// Phone reduced to its local 9-digit form.
    pub fn local_phone(&self) -> String {
        normalize_phone(Some(&self.phone))
    }
}

impl Searchable for Contact {
    fn search_text(&self) -> String {
        [
            self.first_name.as_str(),
            self.middle_name.as_deref().unwrap_or_default(),
            self.last_name.as_str(),
            self.second_last_name.as_deref().unwrap_or_default(),
            self.phone.as_str(),
            self.area.as_deref().unwrap_or_default(),
            self.title.as_deref().unwrap_or_default(),
        ]
        .join(" ")
    }
}

impl DirectoryRecord for Contact {
    const COLLECTION: &'static str = CONTACTS_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn raw_phone(&self) -> Option<&str> {
        Some(&self.phone)
    }
}

/// Entry of the restricted congressional directory.
///
/// The carrier is kept because it exists in storage, but it is neither
/// searched nor rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CongressionalContact {
    #[serde(skip_deserializing)]
    pub id: String,
    #[serde(rename = "primerNombre", default, deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,
    #[serde(rename = "segundoNombre", default, deserialize_with = "lenient::opt_string")]
    pub middle_name: Option<String>,
    #[serde(rename = "primerApellido", default, deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,
    #[serde(rename = "segundoApellido", default, deserialize_with = "lenient::opt_string")]
    pub second_last_name: Option<String>,
    #[serde(rename = "telefono", default, deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(rename = "operador", default, deserialize_with = "lenient::opt_string")]
    pub carrier: Option<String>,
}

impl CongressionalContact {
    fn name_parts(&self) -> [Option<&str>; 4] {
        [
            self.first_name.as_deref(),
            self.middle_name.as_deref(),
            self.last_name.as_deref(),
            self.second_last_name.as_deref(),
        ]
    }

    /// Uppercase full name, or `(SIN NOMBRE)` when every part is empty.
    pub fn display_name(&self) -> String {
        let name = join_name_parts(self.name_parts()).to_uppercase();
        if name.is_empty() {
            "(SIN NOMBRE)".to_string()
        } else {
            name
        }
    }

    pub fn local_phone(&self) -> String {
        normalize_phone(self.phone.as_deref())
    }

    /// Normalized phone for display, or an em dash when there is none.
    pub fn phone_label(&self) -> String {
        let phone = self.local_phone();
        if phone.is_empty() {
            "—".to_string()
        } else {
            phone
        }
    }
}

impl Searchable for CongressionalContact {
    fn search_text(&self) -> String {
        let mut parts: Vec<Option<&str>> = self.name_parts().to_vec();
        parts.push(self.phone.as_deref());
        join_name_parts(parts)
    }
}

impl DirectoryRecord for CongressionalContact {
    const COLLECTION: &'static str = CONGRESS_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn raw_phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}
