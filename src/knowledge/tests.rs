use super::*;

#[test]
fn preview_truncates_to_char_limit() {
    let short = "short text";
    assert_eq!(truncate_preview(short), short);

    let long = "a".repeat(CONTENT_PREVIEW_CHARS + 500);
    let preview = truncate_preview(&long);
    assert_eq!(preview.chars().count(), CONTENT_PREVIEW_CHARS);
}

#[test]
fn preview_respects_char_boundaries() {
    let long = "語".repeat(CONTENT_PREVIEW_CHARS + 10);
    let preview = truncate_preview(&long);
    assert_eq!(preview.chars().count(), CONTENT_PREVIEW_CHARS);
    assert!(long.starts_with(&preview));
}

#[test]
fn category_names_are_validated() {
    assert!(validate_category("general").is_ok());
    assert!(validate_category("employment-law").is_ok());

    assert!(validate_category("").is_err());
    assert!(validate_category("a/b").is_err());
    assert!(validate_category("a\\b").is_err());
    assert!(validate_category("..").is_err());
}
