//! Telegram MarkdownV2 helpers.
//!
//! Every piece of user or feed supplied text must go through
//! [`escape_markdown`] before being embedded in a MarkdownV2 message.

const SPECIAL_CHARS: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escapes every MarkdownV2 special character so the text renders literally.
///
/// # Example
/// ```
/// use feedbot::utils::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("v1.2 (beta)!"), "v1\\.2 \\(beta\\)\\!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Bold text, escaped.
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown(text))
}

/// Inline code, escaped for use inside backticks.
pub fn code(text: &str) -> String {
    format!("`{}`", text.replace('\\', "\\\\").replace('`', "\\`"))
}
