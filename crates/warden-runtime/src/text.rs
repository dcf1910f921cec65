//! Text helpers shared by outbound message producers.

use std::time::Duration;

/// Truncate `text` to at most `max_chars` characters, appending `marker` when cut.
///
/// Counts characters, not bytes, so multi-byte text is never split inside a
/// code point. The marker is appended after the kept prefix.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + marker.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(marker);
            out
        }
    }
}

/// The last `max_chars` characters of `text`.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    text.char_indices()
        .nth(count - max_chars)
        .map_or(text, |(byte_idx, _)| &text[byte_idx..])
}

/// Compact duration: `2h 5m` above an hour, `4m 12s` below.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate_chars("hello", 10, "..."), "hello");
        assert_eq!(truncate_chars("hello", 5, "..."), "hello");
    }

    #[test]
    fn test_long_text_truncated_with_marker() {
        assert_eq!(truncate_chars("abcdefgh", 4, "..."), "abcd...");
    }

    #[test]
    fn test_multibyte_boundary() {
        let text = "привет мир";
        assert_eq!(truncate_chars(text, 6, "…"), "привет…");
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("abc", 10), "abc");
        assert_eq!(tail_chars("жжжx", 2), "жx");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(252)), "4m 12s");
        assert_eq!(format_duration(Duration::from_secs(7_500)), "2h 5m");
        assert_eq!(format_duration(Duration::ZERO), "0m 0s");
    }
}
