//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, login screen and overlays
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling
//! - `tabs`: per-section content (directory lists, account)

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
