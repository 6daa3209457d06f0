use super::format::contains_ignore_case;

/// A record that can be matched against a free-text query.
pub trait Searchable {
    /// Concatenation of the fields the query is matched against.
    fn search_text(&self) -> String;
}

impl<T: Searchable, E> Searchable for Result<T, E> {
    fn search_text(&self) -> String {
        match self {
            Ok(record) => record.search_text(),
            Err(_) => String::new(),
        }
    }
}

/// Keep the records whose search text contains `query`, ignoring case.
///
/// Order is preserved and an empty query returns every record. There is no
/// tokenization or ranking: this is plain substring containment.
pub fn filter_records<'a, T: Searchable>(query: &str, records: &'a [T]) -> Vec<&'a T> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|r| contains_ignore_case(&r.search_text(), &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Named(&'static str);

    impl Searchable for Named {
        fn search_text(&self) -> String {
            self.0.to_string()
        }
    }

    fn sample() -> Vec<Named> {
        vec![
            Named("Ana Lopez 987654321"),
            Named("Carlos Ruiz 912345678"),
            Named("Mariana Díaz 900000001"),
        ]
    }

    #[test]
    fn test_filter_matches_name_case_insensitive() {
        let records = vec![Named("Ana Lopez"), Named("Carlos")];
        let result = filter_records("ana", &records);
        assert_eq!(result, vec![&Named("Ana Lopez")]);

        let result = filter_records("ANA", &records);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_filter_empty_query_is_identity() {
        let records = sample();
        let result = filter_records("", &records);
        assert_eq!(result.len(), records.len());
        assert!(result.iter().zip(records.iter()).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = sample();
        for query in ["ana", "9", "ruiz", "zzz", "DÍAZ"] {
            let once: Vec<&Named> = filter_records(query, &records);
            let owned: Vec<Named> = once.iter().map(|n| Named(n.0)).collect();
            let twice = filter_records(query, &owned);
            assert_eq!(
                once.iter().map(|n| n.0).collect::<Vec<_>>(),
                twice.iter().map(|n| n.0).collect::<Vec<_>>(),
                "{query}"
            );
        }
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = sample();
        let result = filter_records("ana", &records);
        assert_eq!(result[0].0, "Ana Lopez 987654321");
        assert_eq!(result[1].0, "Mariana Díaz 900000001");
    }

    #[test]
    fn test_filter_by_phone_digits() {
        let records = sample();
        let result = filter_records("9123", &records);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "Carlos Ruiz 912345678");
    }

    #[test]
    fn test_failed_entries_only_match_empty_query() {
        let records: Vec<Result<Named, String>> = vec![Ok(Named("Ana")), Err("bad".into())];
        assert_eq!(filter_records("", &records).len(), 2);
        assert_eq!(filter_records("a", &records).len(), 1);
    }
}
