//! Heuristic token estimation for conversation turns.

/// Estimate how many language-model tokens `text` will consume.
///
/// This is an approximation, not a tokenizer-exact count. Single-byte code
/// points (Latin scripts, digits, punctuation) weigh 1 and pack roughly four
/// to a token. Everything else (CJK, Cyrillic, Arabic, emoji, ...) weighs 4,
/// i.e. about one token per character. The weighted sum is divided by four,
/// rounding up, so empty input yields 0.
pub fn estimate_tokens(text: &str) -> usize {
    let weight: usize = text
        .chars()
        .map(|c| if c.is_ascii() { 1 } else { 4 })
        .sum();
    weight.div_ceil(4)
}
