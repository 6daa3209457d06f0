//! Front-end independent screen state.
//!
//! Each screen holds what the user sees and edits, and turns backend
//! results into `Notice`s. Rendering is left to the front end.

pub mod dashboard;
pub mod directory;
pub mod login;
pub mod notice;

pub use dashboard::Dashboard;
pub use directory::{
    CongressListScreen, ContactListScreen, DirectoryScreen, DirectorySection,
};
pub use login::{auth_error_message, diagnose_failed_sign_in, LoginField, LoginForm, SignInRequest};
pub use notice::{Notice, NoticeKind};

/// Title and body of the sign-out failure notice.
pub fn sign_out_failed() -> Notice {
    Notice::error("Error", "No se pudo cerrar la sesión")
}
