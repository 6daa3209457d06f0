use crate::backend::AuthUser;
use crate::models::Role;

/// Shown when the session carries no phone-shaped email.
const GUEST_LABEL: &str = "Invitado";

/// Account summary of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub phone: String,
    pub email: Option<String>,
    pub uid: Option<String>,
    pub role: Option<Role>,
}

impl Dashboard {
    pub fn from_user(user: Option<&AuthUser>, role: Option<Role>) -> Self {
        Self {
            phone: user
                .and_then(AuthUser::phone)
                .unwrap_or(GUEST_LABEL)
                .to_string(),
            email: user.and_then(|u| u.email.clone()),
            uid: user.map(|u| u.uid.clone()),
            role,
        }
    }

    pub fn welcome(&self) -> String {
        format!("Bienvenido: {}", self.phone)
    }
}
