//! Utility functions for phone numbers, searching and string formatting.

pub mod format;
pub mod phone;
pub mod search;

// Re-export commonly used functions at module level
pub use format::{contains_ignore_case, join_name_parts, truncate_string};
pub use phone::{is_local_number, normalize_phone, LOCAL_NUMBER_LEN};
pub use search::{filter_records, Searchable};
