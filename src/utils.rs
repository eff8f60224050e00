//! Shared utility functions used across modules.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::constants::SPINNER_CHARS;

/// Truncate a string to `max_width` terminal columns, appending "…" if
/// truncated. Wide characters count as two columns.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

/// Left-align `s` in a field of exactly `width` columns.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let cut = truncate_str(s, width);
    let fill = width.saturating_sub(cut.width());
    format!("{cut}{}", " ".repeat(fill))
}

/// Get the spinner character for the current tick.
pub fn spinner_char(tick: u64) -> &'static str {
    SPINNER_CHARS[(tick % SPINNER_CHARS.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_are_untouched() {
        assert_eq!(truncate_str("work", 10), "work");
        assert_eq!(truncate_str("work", 4), "work");
    }

    #[test]
    fn long_strings_get_ellipsis() {
        assert_eq!(truncate_str("marketing-eu-01", 8), "marketi…");
        assert_eq!(truncate_str("abc", 0), "");
        assert_eq!(truncate_str("abc", 1), "…");
    }

    #[test]
    fn wide_characters_count_double() {
        // Each ideograph takes two columns; only one fits before the ellipsis.
        assert_eq!(truncate_str("日本語", 4), "日…");
        assert!(truncate_str("日本語", 4).width() <= 4);
    }

    #[test]
    fn padding_fills_exact_width() {
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        assert_eq!(pad_to_width("abcdef", 4).width(), 4);
        assert_eq!(pad_to_width("日本", 5).width(), 5);
    }

    #[test]
    fn spinner_wraps() {
        assert_eq!(spinner_char(0), SPINNER_CHARS[0]);
        assert_eq!(spinner_char(SPINNER_CHARS.len() as u64), SPINNER_CHARS[0]);
        assert_eq!(spinner_char(1), SPINNER_CHARS[1]);
    }
}
