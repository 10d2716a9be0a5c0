/// Stem used when a source name sanitizes to nothing.
const FALLBACK_STEM: &str = "feed";

/// Turn a source display name into a filename stem that is safe on every
/// common filesystem.
///
/// Path separators, characters Windows forbids (`: * ? " < > |`) and control
/// characters become `_`. Surrounding whitespace and trailing dots are
/// trimmed. Everything else, including spaces, parentheses and non-ASCII
/// letters, is kept so the file still reads like the source name.
///
/// ```
/// use rss_builder::util::file_stem;
///
/// assert_eq!(file_stem("Gabriel Albiac (El Debate)"), "Gabriel Albiac (El Debate)");
/// assert_eq!(file_stem("AC/DC: News"), "AC_DC_ News");
/// assert_eq!(file_stem(".."), "feed");
/// ```
pub fn file_stem(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_builtin_names_unchanged() {
        assert_eq!(file_stem("Kir Shatrov"), "Kir Shatrov");
        assert_eq!(
            file_stem("Rory Sutherland (Spectator.co.uk)"),
            "Rory Sutherland (Spectator.co.uk)"
        );
    }

    #[test]
    fn test_separators_replaced() {
        assert_eq!(file_stem("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(file_stem("a\\b"), "a_b");
    }

    #[test]
    fn test_windows_reserved_chars_replaced() {
        assert_eq!(file_stem("what? <really> \"yes\" | no*"), "what_ _really_ _yes_ _ no_");
    }

    #[test]
    fn test_trailing_dots_and_whitespace_trimmed() {
        assert_eq!(file_stem("  Blog...  "), "Blog");
        assert_eq!(file_stem("Blog . "), "Blog");
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(file_stem(""), "feed");
        assert_eq!(file_stem("   "), "feed");
        assert_eq!(file_stem("."), "feed");
    }

    #[test]
    fn test_control_chars_replaced() {
        assert_eq!(file_stem("a\nb\tc"), "a_b_c");
    }

    proptest! {
        #[test]
        fn prop_stem_is_a_single_safe_component(name in ".*") {
            let stem = file_stem(&name);
            prop_assert!(!stem.is_empty());
            prop_assert!(!stem.contains('/'));
            prop_assert!(!stem.contains('\\'));
            prop_assert!(!stem.chars().any(char::is_control));
            prop_assert!(stem != "." && stem != "..");
            prop_assert!(!stem.ends_with('.'));
        }
    }
}
