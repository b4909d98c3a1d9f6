//! Canonical forms of free-text fields. Deduplication and the city facet list both
//! compare through these functions and nothing else.

/// Dedup key for an employer name: trim, upper-case, drop everything that is not
/// alphanumeric or whitespace, collapse whitespace runs to a single space.
pub fn normalize_employer_key(name: &str) -> String {
    let stripped: String = name
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case the way most spreadsheet tooling does: a letter is upper-cased when the
/// preceding character is not a letter, lower-cased otherwise ("o'neill" -> "O'Neill").
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

/// Normalized city part of a "City, State" pair.
pub fn normalize_city(city: &str) -> String {
    title_case(city.trim())
}

/// Normalized state part of a "City, State" pair.
pub fn normalize_state(state: &str) -> String {
    state.trim().to_uppercase()
}

/// `"City, ST"` with the city title-cased and the state upper-cased.
pub fn normalize_city_state(city: &str, state: &str) -> String {
    format!("{}, {}", normalize_city(city), normalize_state(state))
}

/// True iff the value is non-empty and made only of decimal digits (a ZIP code
/// misfiled as a city).
pub fn is_zip_like(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
