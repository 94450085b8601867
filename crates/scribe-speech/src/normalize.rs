//! Normalization helpers used only for agreement and deduplication
//! comparisons. Display text always preserves the decoder's original casing
//! and punctuation; only these comparison keys are normalized.

/// Lower-cases, trims, and strips trailing ASCII punctuation, for use as a
/// comparison key.
pub fn normalize_word(word: &str) -> String {
    let trimmed = word.trim();
    let trimmed = trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation());
    trimmed.to_lowercase()
}

/// Splits `text` on whitespace into display words (original casing/punct
/// preserved).
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Normalizes every word in `text` for comparison purposes.
pub fn normalized_words(text: &str) -> Vec<String> {
    split_words(text).into_iter().map(normalize_word).collect()
}

/// Length of the longest common prefix of two normalized-word sequences.
pub fn longest_common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Whether `word`'s normalized form ends in sentence-terminating
/// punctuation (`.`, `!`, `?`), checked against the raw (non-normalized)
/// text since normalization strips trailing punctuation.
pub fn ends_sentence(raw_word: &str) -> bool {
    matches!(raw_word.trim_end().chars().last(), Some('.' | '!' | '?'))
}

/// Whether `word` consists solely of ASCII punctuation characters.
pub fn is_punctuation_only(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_punctuation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_trims_and_strips_trailing_punct() {
        assert_eq!(normalize_word(" Hello, "), "hello");
        assert_eq!(normalize_word("World."), "world");
        assert_eq!(normalize_word("WAIT!"), "wait");
    }

    #[test]
    fn prefix_length_stops_at_first_mismatch() {
        let a = vec!["hello".to_string(), "world".to_string(), "this".to_string()];
        let b = vec!["hello".to_string(), "world".to_string(), "was".to_string()];
        assert_eq!(longest_common_prefix_len(&a, &b), 2);
    }

    #[test]
    fn ends_sentence_detects_terminators() {
        assert!(ends_sentence("world."));
        assert!(ends_sentence("really?"));
        assert!(!ends_sentence("world"));
    }

    #[test]
    fn punctuation_only_detection() {
        assert!(is_punctuation_only(","));
        assert!(is_punctuation_only("..."));
        assert!(!is_punctuation_only("a,"));
    }
}
