pub mod dashboard;
pub mod directory;
