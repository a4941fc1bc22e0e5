use once_cell::sync::Lazy;
use regex::Regex;

// Non-greedy and line-bound: a tag split across lines is left in place.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<.*?>").expect("Invalid tag pattern defined in code"));

/// Best-effort markup removal for AniList descriptions. Not a parser: nested
/// or malformed markup may survive partially.
pub fn clean_description(input: Option<&str>) -> String {
    match input {
        Some(raw) if !raw.is_empty() => TAG_PATTERN.replace_all(raw, "").trim().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_trims() {
        assert_eq!(
            clean_description(Some("<p>Hello <b>world</b></p>")),
            "Hello world"
        );
        assert_eq!(
            clean_description(Some("  Line one<br>\n<i>Line two</i>  ")),
            "Line one\nLine two"
        );
    }

    #[test]
    fn empty_or_absent_input_yields_empty_output() {
        assert_eq!(clean_description(Some("")), "");
        assert_eq!(clean_description(None), "");
        assert_eq!(clean_description(Some("<br><br>")), "");
    }

    #[test]
    fn leaves_text_without_closing_bracket_alone() {
        assert_eq!(clean_description(Some("a < b and c")), "a < b and c");
    }
}
