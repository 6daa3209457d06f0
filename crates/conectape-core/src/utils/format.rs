/// Join the non-empty name parts with single spaces.
pub fn join_name_parts<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive substring test. `needle` is expected to be lowercase already.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(needle)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_name_parts_skips_empty() {
        let name = join_name_parts([Some("Ana"), None, Some(" "), Some("López")]);
        assert_eq!(name, "Ana López");
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Ana LOPEZ", "lopez"));
        assert!(contains_ignore_case("anything", ""));
        assert!(!contains_ignore_case("Carlos", "ana"));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Señorita Núñez", 8), "Señor...");
    }
}
