//! Optional finalization post-processing (§4.7 step 4): strips a configured
//! list of filler words from the authoritative final text.

/// Removes every whole-word, case-insensitive match of any word in
/// `filler_words` from `text`, then collapses any whitespace runs the
/// removal left behind.
///
/// Matching is done per whitespace-separated token, comparing against the
/// token's alphanumeric characters only, so trailing punctuation attached to
/// a filler word ("um,") doesn't stop it from matching, while a filler word
/// occurring only as a substring of a longer word ("an" inside "analysis")
/// never does.
pub fn strip_filler_words(text: &str, filler_words: &[String]) -> String {
    let fillers: Vec<String> = filler_words
        .iter()
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect();
    if fillers.is_empty() {
        return text.to_string();
    }

    text.split_whitespace()
        .filter(|token| {
            let normalized: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            !fillers.contains(&normalized)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_configured_words_case_insensitively() {
        let fillers = vec!["um".to_string(), "like".to_string()];
        let out = strip_filler_words("Um, I was, like, going to the store", &fillers);
        assert_eq!(out, "I was, going to the store");
    }

    #[test]
    fn collapses_whitespace_left_by_removed_words() {
        let fillers = vec!["uh".to_string()];
        let out = strip_filler_words("hello   uh   world", &fillers);
        assert_eq!(out, "hello world");
    }

    #[test]
    fn does_not_match_inside_other_words() {
        let fillers = vec!["an".to_string()];
        let out = strip_filler_words("I have an analysis", &fillers);
        assert_eq!(out, "I have analysis");
    }

    #[test]
    fn empty_filler_list_is_a_no_op() {
        assert_eq!(strip_filler_words("hello world", &[]), "hello world");
    }
}
