use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static REG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]{1,2})([0-9A-Z]{1,4})").unwrap());

/// Normalizes a scraped registration string: US registrations (leading `N`)
/// are left alone, existing hyphens are preserved, otherwise a `CC-NNNN`
/// split is inferred; unrecognized input is returned unchanged so a human
/// can fix it later.
pub fn format_registration(input: Option<&str>) -> Option<String> {
    let input = input?;
    if input.starts_with('N') {
        return Some(input.to_string());
    }

    let no_spaces = WHITESPACE.replace_all(input, "").into_owned();
    if no_spaces.contains('-') {
        return Some(no_spaces);
    }

    match REG_PATTERN.captures(&no_spaces) {
        Some(caps) => Some(format!("{}-{}", &caps[1], &caps[2])),
        None => Some(input.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn us_registration_is_untouched() {
        assert_eq!(format_registration(Some("N12345")).as_deref(), Some("N12345"));
    }

    #[test]
    fn already_hyphenated_is_untouched_besides_whitespace() {
        assert_eq!(format_registration(Some("D-1234")).as_deref(), Some("D-1234"));
    }

    #[test]
    fn splits_prefix_and_suffix() {
        assert_eq!(format_registration(Some("D1234")).as_deref(), Some("D-1234"));
        assert_eq!(format_registration(Some("OK1234")).as_deref(), Some("OK-1234"));
    }

    #[test]
    fn unrecognized_pattern_passes_through() {
        assert_eq!(format_registration(Some("1234")).as_deref(), Some("1234"));
    }

    #[test]
    fn none_stays_none() {
        assert_eq!(format_registration(None), None);
    }
}
