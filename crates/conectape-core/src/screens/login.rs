//! Login form state.
//!
//! The phone field keeps digits only (at most 9); both fields are validated
//! before anything reaches the auth service. A submission in flight disables
//! the form, so a second submit is dropped.

use tracing::{debug, info, warn};

use super::Notice;
use crate::auth::synthetic_identifier;
use crate::backend::{AuthError, AuthErrorCode, AuthService, AuthUser, DocumentStore};
use crate::models::CONTACTS_COLLECTION;
use crate::utils::LOCAL_NUMBER_LEN;

const PHONE_REQUIRED: &str = "Ingresa un número de 9 dígitos";
const PASSWORD_REQUIRED: &str = "Ingresa tu contraseña";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Phone,
    Password,
}

/// Credentials ready to hand to the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub phone: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    phone: String,
    password: String,
    pub focus: LoginField,
    pub show_password: bool,
    loading: bool,
    phone_error: Option<&'static str>,
    password_error: Option<&'static str>,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form pre-filled with a previously used phone number.
    pub fn with_phone(phone: &str) -> Self {
        let mut form = Self::new();
        form.set_phone(phone);
        if !form.phone.is_empty() {
            form.focus = LoginField::Password;
        }
        form
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Password as it should be displayed.
    pub fn password_display(&self) -> String {
        if self.show_password {
            self.password.clone()
        } else {
            "•".repeat(self.password.chars().count())
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn phone_error(&self) -> Option<&'static str> {
        self.phone_error
    }

    pub fn password_error(&self) -> Option<&'static str> {
        self.password_error
    }

    /// Replace the phone, keeping only digits and at most 9 of them.
    pub fn set_phone(&mut self, input: &str) {
        if self.loading {
            return;
        }
        self.phone = input
            .chars()
            .filter(char::is_ascii_digit)
            .take(LOCAL_NUMBER_LEN)
            .collect();
        self.phone_error = None;
    }

    pub fn set_password(&mut self, input: &str) {
        if self.loading {
            return;
        }
        self.password = input.to_string();
        self.password_error = None;
    }

    /// Type one character into the focused field.
    pub fn push_char(&mut self, c: char) {
        match self.focus {
            LoginField::Phone => {
                let mut phone = self.phone.clone();
                phone.push(c);
                self.set_phone(&phone);
            }
            LoginField::Password => {
                let mut password = self.password.clone();
                password.push(c);
                self.set_password(&password);
            }
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            LoginField::Phone => {
                let mut phone = self.phone.clone();
                phone.pop();
                self.set_phone(&phone);
            }
            LoginField::Password => {
                let mut password = self.password.clone();
                password.pop();
                self.set_password(&password);
            }
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Phone => LoginField::Password,
            LoginField::Password => LoginField::Phone,
        };
    }

    pub fn toggle_password_visibility(&mut self) {
        self.show_password = !self.show_password;
    }

    /// Check both fields, recording the inline error of each one that fails.
    pub fn validate(&mut self) -> bool {
        self.phone_error = (self.phone.len() != LOCAL_NUMBER_LEN).then_some(PHONE_REQUIRED);
        self.password_error = self.password.trim().is_empty().then_some(PASSWORD_REQUIRED);
        self.phone_error.is_none() && self.password_error.is_none()
    }

    /// Validate and enter the loading state.
    ///
    /// `Err(None)` means a submission is already running and this one is
    /// dropped; `Err(Some(notice))` means validation failed.
    pub fn begin_submit(&mut self) -> Result<SignInRequest, Option<Notice>> {
        if self.loading {
            debug!("Sign-in already in flight");
            return Err(None);
        }
        if !self.validate() {
            return Err(Some(Notice::error(
                "Campos inválidos",
                "Revisa tu número y contraseña.",
            )));
        }

        self.loading = true;
        Ok(SignInRequest {
            phone: self.phone.clone(),
            email: synthetic_identifier(&self.phone),
            password: self.password.clone(),
        })
    }

    /// Leave the loading state and describe the outcome.
    pub fn finish_submit(&mut self, result: &Result<AuthUser, AuthError>) -> Notice {
        self.loading = false;
        match result {
            Ok(user) => {
                info!(uid = %user.uid, "Signed in from login form");
                self.password.clear();
                Notice::success("¡Bienvenido!", "Has iniciado sesión correctamente")
            }
            Err(e) => {
                warn!(code = e.code.as_str(), "Sign-in failed");
                Notice::error("No pudimos iniciar sesión", auth_error_message(e.code))
            }
        }
    }

    /// Run a whole submission against `auth`.
    pub async fn submit(&mut self, auth: &dyn AuthService) -> Option<Notice> {
        match self.begin_submit() {
            Err(notice) => notice,
            Ok(request) => {
                let result = auth.sign_in(&request.email, &request.password).await;
                Some(self.finish_submit(&result))
            }
        }
    }
}

/// User-facing message for an auth failure.
pub fn auth_error_message(code: AuthErrorCode) -> &'static str {
    match code {
        AuthErrorCode::InvalidCredential
        | AuthErrorCode::WrongPassword
        | AuthErrorCode::UserNotFound => "Número o contraseña incorrectos",
        AuthErrorCode::UserDisabled => "Tu acceso ha sido deshabilitado",
        AuthErrorCode::TooManyRequests => "Demasiados intentos. Inténtalo más tarde.",
        AuthErrorCode::NetworkRequestFailed => "Problema de conexión. Verifica tu internet.",
        AuthErrorCode::InvalidEmail => "Formato de correo inválido",
        AuthErrorCode::Other => "Ocurrió un error. Inténtalo de nuevo.",
    }
}

/// After a credential mismatch, log whether the number is in the directory.
///
/// Returns `Some(found)` when the lookup ran. The result is for the log only
/// and never changes what the user is told.
pub async fn diagnose_failed_sign_in(
    store: &dyn DocumentStore,
    phone: &str,
    code: AuthErrorCode,
) -> Option<bool> {
    if !matches!(code, AuthErrorCode::InvalidCredential | AuthErrorCode::UserNotFound) {
        return None;
    }

    match store.get_document(CONTACTS_COLLECTION, phone).await {
        Ok(doc) => {
            let found = doc.is_some();
            info!(phone, found, "Directory lookup after failed sign-in");
            Some(found)
        }
        Err(e) => {
            debug!(phone, error = %e, "Directory lookup after failed sign-in failed");
            None
        }
    }
}
