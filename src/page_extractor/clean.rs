//! Text normalization applied to every extracted page

/// Control characters that carry no text: the C0 range and DEL, minus anything
/// that is whitespace (tab, newline, CR, VT, FF), which instead separates words
fn is_stripped_control(c: char) -> bool {
    (c <= '\u{1f}' || c == '\u{7f}') && !c.is_whitespace()
}

/// Normalize extracted text
///
/// Drops non-printable control characters, collapses every whitespace run
/// (newlines and tabs included) to a single space and trims both ends.
/// `clean_text(clean_text(s)) == clean_text(s)` for every input.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        let word: String = word.chars().filter(|c| !is_stripped_control(*c)).collect();
        if word.is_empty() {
            continue;
        }
        if !cleaned.is_empty() {
            cleaned.push(' ');
        }
        cleaned.push_str(&word);
    }
    cleaned
}

/// Number of non-empty whitespace-delimited tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
