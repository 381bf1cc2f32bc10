//! Telegram MarkdownV2 escaping.

/// Characters that must be escaped anywhere in MarkdownV2 text.
const SPECIAL_CHARS: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escapes every MarkdownV2 special character so `text` is shown literally.
///
/// User supplied text (event names, descriptions, display names) goes
/// through here before being embedded in a formatted reply.
///
/// # Example
/// ```
/// use secret_santa_bot::utils::markdown::escape_markdown;
///
/// let escaped = escape_markdown("Office party (2024)!");
/// assert_eq!(escaped, "Office party \\(2024\\)\\!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Bold span around already escaped text.
pub fn bold(escaped: &str) -> String {
    format!("*{escaped}*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_basic_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("_italic_"), "\\_italic\\_");
        assert_eq!(escape_markdown("`code`"), "\\`code\\`");
    }

    #[test]
    fn test_escape_brackets_and_parentheses() {
        assert_eq!(escape_markdown("[link](url)"), "\\[link\\]\\(url\\)");
        assert_eq!(escape_markdown("{code}"), "\\{code\\}");
    }

    #[test]
    fn test_escape_backslash_first_class() {
        assert_eq!(escape_markdown("a\\b"), "a\\\\b");
        assert_eq!(escape_markdown("\\*"), "\\\\\\*");
    }

    #[test]
    fn test_escape_empty_and_plain_text() {
        assert_eq!(escape_markdown(""), "");
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(escape_markdown("Ёлка 🎄"), "Ёлка 🎄");
    }

    #[test]
    fn test_escape_event_text() {
        let input = "Secret Santa #3: budget 20-30 EUR. Have fun!";
        let expected = "Secret Santa \\#3: budget 20\\-30 EUR\\. Have fun\\!";
        assert_eq!(escape_markdown(input), expected);
        assert_eq!(bold(&escape_markdown("a.b")), "*a\\.b*");
    }
}
