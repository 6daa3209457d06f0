/// Number of digits in a local mobile number.
pub const LOCAL_NUMBER_LEN: usize = 9;

/// Reduce a stored phone value to its local form.
///
/// Every non-digit character is dropped and the trailing nine digits are kept,
/// so `+51 987-654-321`, `51987654321` and `987 654 321` all compare equal.
/// Inputs with fewer digits come back shorter; absent input yields an empty string.
pub fn normalize_phone(raw: Option<&str>) -> String {
    let digits: Vec<char> = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    let start = digits.len().saturating_sub(LOCAL_NUMBER_LEN);
    digits[start..].iter().collect()
}

/// Whether a normalized number is complete enough to dial.
pub fn is_local_number(normalized: &str) -> bool {
    normalized.len() == LOCAL_NUMBER_LEN && normalized.chars().all(|c| c.is_ascii_digit())
}
