use std::borrow::Cow;

/// Returns true for characters that XML 1.0 forbids in text content.
///
/// Tab, newline and carriage return are the only C0 controls allowed. DEL is
/// technically legal XML but never meaningful in a feed, so it goes too, as do
/// the two noncharacters U+FFFE and U+FFFF.
fn is_forbidden(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}')
        || c == '\u{fffe}'
        || c == '\u{ffff}'
}

/// Strip control characters and ANSI escape sequences from scraped text.
///
/// Scraped pages occasionally carry stray control bytes (copy-pasted terminal
/// output, broken CMS exports). Any of them would make the generated document
/// ill-formed, so they are removed before text reaches a feed.
///
/// Strips:
/// - C0 controls except tab, newline and carriage return, plus DEL
/// - ANSI CSI sequences: `\x1b[` ... (final byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL or ST `\x1b\\`)
/// - Bare ESC
/// - U+FFFE and U+FFFF
///
/// Returns `Cow::Borrowed` when nothing needs stripping (the common case).
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c == '\u{1b}' || is_forbidden(c)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            if !is_forbidden(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\u{7}' {
                        break;
                    }
                    if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

/// Normalize a scraped text node: strip control characters and trim.
pub fn clean_text(s: &str) -> String {
    strip_control_chars(s).trim().to_string()
}
