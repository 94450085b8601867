use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::normalize::{ends_sentence, is_punctuation_only, longest_common_prefix_len, normalize_word, split_words};
use crate::{DecodeResult, Token};

/// How long a non-additive speculative change is damped before being
/// accepted anyway, to reduce UI flicker.
const SPECULATIVE_HOLD: Duration = Duration::from_millis(500);

/// Jitter tolerance on `committed_end_abs_ms`: tokens ending at or before
/// this many milliseconds past the horizon are treated as already committed.
const JITTER_TOLERANCE_MS: i64 = 30;

/// How many recently committed normalized token texts are kept for
/// text-based overlap suppression.
const RECENT_COMMITTED_CAPACITY: usize = 80;

/// Minimum non-consecutive repeated-phrase length removed while streaming.
const STREAMING_MIN_REPEAT_LEN: usize = 7;

/// Minimum non-consecutive repeated-phrase length removed at finalization —
/// more aggressive than streaming, since flicker damping no longer matters
/// once the session is over.
const FINALIZE_MIN_REPEAT_LEN: usize = 3;

/// Coarse state-machine phase, tracked for observability only; no code path
/// branches on it directly, since behavior is fully determined by the field
/// values (the stabilizer stays a deterministic transformer of its inputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    SpeculativeOnly,
    Growing,
    Finalized,
}

/// A snapshot of stabilizer state, returned by [`TranscriptStabilizer::update`]
/// and [`TranscriptStabilizer::finalize_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptState {
    pub raw_committed: String,
    pub raw_speculative: String,
    pub committed_word_count: usize,
    pub committed_end_abs_ms: i64,
}

/// LocalAgreement-2 transcript stabilizer.
///
/// Deterministic, side-effect-free transformer of `(state, decode_result,
/// params) -> state'`, aside from `log` tracing and reading the wall clock
/// for the speculative flicker damper.
#[derive(Debug, Clone)]
pub struct TranscriptStabilizer {
    raw_committed: String,
    raw_speculative: String,
    previous_decode_raw_words: Vec<String>,
    previous_decode_normalized_words: Vec<String>,
    committed_word_count: usize,
    committed_end_abs_ms: i64,
    recent_committed_normalized: VecDeque<String>,
    last_speculative_instant: Option<Instant>,
    phase: Phase,
}

impl Default for TranscriptStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStabilizer {
    pub fn new() -> Self {
        Self {
            raw_committed: String::new(),
            raw_speculative: String::new(),
            previous_decode_raw_words: Vec::new(),
            previous_decode_normalized_words: Vec::new(),
            committed_word_count: 0,
            // Sentinel: nothing has been committed yet, so the
            // jitter-tolerance skip in `update` is gated on
            // `committed_word_count > 0` rather than this value.
            committed_end_abs_ms: i64::MIN / 2,
            recent_committed_normalized: VecDeque::new(),
            last_speculative_instant: None,
            phase: Phase::Empty,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current committed text, for prompt building and the trim policy.
    /// Does not mutate state.
    pub fn committed_text(&self) -> &str {
        &self.raw_committed
    }

    /// Authoritative replacement of committed text from a successful
    /// full-audio finalization decode (§4.7 step 3), which is trusted over
    /// the streaming LA-2 result.
    pub fn finalize_with_authoritative_text(&mut self, text: String) -> TranscriptState {
        self.raw_committed = collapse_whitespace(text.trim());
        self.raw_speculative.clear();
        self.committed_word_count = split_words(&self.raw_committed).len();
        self.phase = Phase::Finalized;
        self.snapshot()
    }

    fn snapshot(&self) -> TranscriptState {
        TranscriptState {
            raw_committed: self.raw_committed.clone(),
            raw_speculative: self.raw_speculative.clone(),
            committed_word_count: self.committed_word_count,
            committed_end_abs_ms: self.committed_end_abs_ms,
        }
    }

    /// Resolves one new decode against the previous decode via
    /// LocalAgreement-2, updating committed/speculative text.
    pub fn update(
        &mut self,
        decode_result: DecodeResult,
        window_end_abs_ms: i64,
        commit_margin_ms: i64,
        min_token_probability: f32,
    ) -> TranscriptState {
        let filtered: Vec<Token> = decode_result
            .tokens
            .into_iter()
            .filter(|t| t.probability == 0.0 || t.probability >= min_token_probability)
            .collect();

        let tokens = trim_hallucination_loop(filtered);

        let words: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
        let normalized: Vec<String> = tokens.iter().map(|t| normalize_word(&t.text)).collect();

        let agreement_len =
            longest_common_prefix_len(&self.previous_decode_normalized_words, &normalized);
        let candidate_len = agreement_len.saturating_sub(1).min(tokens.len());

        let horizon = window_end_abs_ms - commit_margin_ms;
        let mut commit_len = 0usize;
        for token in tokens.iter().take(candidate_len) {
            if token.abs_end_ms <= horizon {
                commit_len += 1;
            } else {
                break;
            }
        }

        let mut start_index = 0usize;
        if self.committed_word_count > 0 {
            while start_index < commit_len
                && tokens[start_index].abs_end_ms <= self.committed_end_abs_ms + JITTER_TOLERANCE_MS
            {
                start_index += 1;
            }
        }

        let candidate_normalized = &normalized[start_index..commit_len];
        let suffix_overlap =
            longest_suffix_prefix_overlap(&self.recent_committed_normalized, candidate_normalized);
        let append_start = start_index + suffix_overlap;

        let previous_committed = self.raw_committed.clone();
        let previous_committed_end = self.committed_end_abs_ms;
        let previous_word_count = self.committed_word_count;

        let mut committed_grew = false;
        if append_start < commit_len {
            self.append_committed(&words[append_start..commit_len], &normalized[append_start..commit_len]);
            self.committed_end_abs_ms = self
                .committed_end_abs_ms
                .max(tokens[commit_len - 1].abs_end_ms);
            self.raw_committed = rebuild_after_dedup(&self.raw_committed, STREAMING_MIN_REPEAT_LEN);

            let new_word_count = split_words(&self.raw_committed).len();
            if new_word_count < previous_word_count {
                log::warn!(
                    "stabilizer self-heal: committed word count would have shrunk ({previous_word_count} -> {new_word_count}); keeping previous committed text"
                );
                self.raw_committed = previous_committed;
                self.committed_word_count = previous_word_count;
                self.committed_end_abs_ms = previous_committed_end;
            } else {
                self.committed_word_count = new_word_count;
                committed_grew = new_word_count > previous_word_count;
            }
        }

        let speculative_start = commit_len.min(words.len());
        let speculative_candidate = build_concatenated_text(&words[speculative_start..]);
        self.update_speculative(speculative_candidate, committed_grew);

        self.previous_decode_raw_words = words;
        self.previous_decode_normalized_words = normalized;

        self.phase = match (self.committed_word_count, self.phase) {
            (0, _) if self.raw_speculative.is_empty() => Phase::Empty,
            (0, _) => Phase::SpeculativeOnly,
            (_, Phase::Finalized) => Phase::Finalized,
            _ => Phase::Growing,
        };

        self.snapshot()
    }

    /// Appends `words` (original casing/punctuation) to `raw_committed`,
    /// inserting a separating space only when the decoder's own leading-space
    /// convention didn't already provide one, and records their normalized
    /// forms for future overlap suppression.
    fn append_committed(&mut self, words: &[String], normalized: &[String]) {
        if words.is_empty() {
            return;
        }
        let mut new_text = build_concatenated_text(words);
        if self.raw_committed.is_empty() {
            new_text = new_text.trim_start().to_string();
        } else if !new_text.starts_with(char::is_whitespace) {
            self.raw_committed.push(' ');
        }
        self.raw_committed.push_str(&new_text);

        for word in normalized {
            if self.recent_committed_normalized.len() >= RECENT_COMMITTED_CAPACITY {
                self.recent_committed_normalized.pop_front();
            }
            self.recent_committed_normalized.push_back(word.clone());
        }
    }

    fn update_speculative(&mut self, candidate: String, committed_grew: bool) {
        let now = Instant::now();
        let additive = is_additive_change(&self.raw_speculative, &candidate);
        let hold_expired = match self.last_speculative_instant {
            Some(t) => now.duration_since(t) >= SPECULATIVE_HOLD,
            None => true,
        };

        let accept = committed_grew || self.raw_speculative.is_empty() || additive || hold_expired;

        if accept {
            self.raw_speculative = candidate;
            self.last_speculative_instant = Some(now);
        }
    }

    /// Appends remaining speculative text to committed, runs the aggressive
    /// (minLen=3) dedup pass, strips a trailing incomplete-word fragment, and
    /// normalizes whitespace.
    pub fn finalize_all(&mut self) -> TranscriptState {
        if !self.raw_speculative.is_empty() {
            let spec = std::mem::take(&mut self.raw_speculative);
            if self.raw_committed.is_empty() {
                self.raw_committed = spec.trim_start().to_string();
            } else {
                if !spec.starts_with(char::is_whitespace) {
                    self.raw_committed.push(' ');
                }
                self.raw_committed.push_str(&spec);
            }
        }

        self.raw_committed = rebuild_after_dedup(&self.raw_committed, FINALIZE_MIN_REPEAT_LEN);
        self.raw_committed = strip_trailing_incomplete_fragment(&self.raw_committed);
        self.raw_committed = collapse_whitespace(&self.raw_committed);
        self.committed_word_count = split_words(&self.raw_committed).len();
        self.phase = Phase::Finalized;
        self.snapshot()
    }

    /// Called when the scheduler trims the accumulator at a sentence
    /// boundary: starts a fresh LA-2 window without disturbing committed
    /// state.
    pub fn notify_trimmed(&mut self) {
        self.previous_decode_raw_words.clear();
        self.previous_decode_normalized_words.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Finds a phrase of length `n >= 3` in `tokens` that repeats immediately
/// back-to-back (normalized, case-insensitive) and truncates everything
/// after the first occurrence. Returns the (possibly truncated) input.
fn trim_hallucination_loop(tokens: Vec<Token>) -> Vec<Token> {
    let normalized: Vec<String> = tokens.iter().map(|t| normalize_word(&t.text)).collect();
    let len = normalized.len();
    if len < 6 {
        return tokens;
    }

    for n in 3..=(len / 2) {
        for start in 0..=(len - 2 * n) {
            if normalized[start..start + n] == normalized[start + n..start + 2 * n] {
                let mut truncated = tokens;
                truncated.truncate(start + n);
                return truncated;
            }
        }
    }
    tokens
}

/// Finds the largest `k` such that the last `k` elements of `recent` equal
/// the first `k` elements of `new_words` — the overlap to skip so a
/// decoder's jittery retokenization doesn't double-commit text.
fn longest_suffix_prefix_overlap(recent: &VecDeque<String>, new_words: &[String]) -> usize {
    let max_k = recent.len().min(new_words.len());
    for k in (1..=max_k).rev() {
        let recent_tail = recent.iter().skip(recent.len() - k);
        if recent_tail.eq(new_words[..k].iter()) {
            return k;
        }
    }
    0
}

/// Concatenates token texts as-is, preserving the decoder's leading-space
/// convention (no extra separators inserted).
fn build_concatenated_text(words: &[String]) -> String {
    words.concat()
}

fn is_additive_change(old: &str, new: &str) -> bool {
    let old_trimmed = old.trim();
    let new_trimmed = new.trim();
    old_trimmed.is_empty() || new_trimmed.contains(old_trimmed) || old_trimmed.contains(new_trimmed)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops the final whitespace-separated token if it carries no
/// sentence-terminating punctuation, on the heuristic that it is a fragment
/// cut off mid-word by the end of the recording.
fn strip_trailing_incomplete_fragment(text: &str) -> String {
    let words = split_words(text);
    match words.split_last() {
        Some((last, rest)) if !ends_sentence(last) => rest.join(" "),
        _ => text.trim().to_string(),
    }
}

/// Runs the three dedup passes (non-consecutive repeats of `min_len`+,
/// consecutive duplicates of length 1-4, and punctuation-then-recent-word
/// artifacts) over `text` and rejoins with single spaces.
fn rebuild_after_dedup(text: &str, min_len: usize) -> String {
    let words: Vec<String> = split_words(text).into_iter().map(str::to_string).collect();
    let words = remove_non_consecutive_repeats(&words, min_len);
    let words = remove_consecutive_duplicates(&words);
    let words = remove_punctuation_then_recent_word(&words);
    words.join(" ")
}

fn remove_non_consecutive_repeats(words: &[String], min_len: usize) -> Vec<String> {
    if words.len() < min_len * 2 {
        return words.to_vec();
    }
    let normalized: Vec<String> = words.iter().map(|w| normalize_word(w)).collect();
    let mut result = Vec::with_capacity(words.len());
    let mut result_normalized: Vec<String> = Vec::with_capacity(words.len());

    let mut i = 0;
    while i < words.len() {
        if i + min_len <= words.len() && result_normalized.len() >= min_len {
            let window = &normalized[i..i + min_len];
            let found = result_normalized.windows(min_len).any(|w| w == window);
            if found {
                i += min_len;
                continue;
            }
        }
        result.push(words[i].clone());
        result_normalized.push(normalized[i].clone());
        i += 1;
    }
    result
}

fn remove_consecutive_duplicates(words: &[String]) -> Vec<String> {
    let mut out = words.to_vec();
    for _ in 0..3 {
        for len in 1..=4 {
            out = remove_consecutive_duplicates_of_len(&out, len);
        }
    }
    out
}

fn remove_consecutive_duplicates_of_len(words: &[String], len: usize) -> Vec<String> {
    if words.len() < 2 * len {
        return words.to_vec();
    }
    let normalized: Vec<String> = words.iter().map(|w| normalize_word(w)).collect();
    let mut result = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if i + 2 * len <= words.len() && normalized[i..i + len] == normalized[i + len..i + 2 * len] {
            result.extend_from_slice(&words[i..i + len]);
            i += 2 * len;
        } else {
            result.push(words[i].clone());
            i += 1;
        }
    }
    result
}

fn remove_punctuation_then_recent_word(words: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if is_punctuation_only(&words[i]) && i + 1 < words.len() {
            let next_norm = normalize_word(&words[i + 1]);
            let lookback_start = result.len().saturating_sub(3);
            let recently_seen = !next_norm.is_empty()
                && result[lookback_start..]
                    .iter()
                    .any(|w| normalize_word(w) == next_norm);
            if recently_seen {
                i += 2;
                continue;
            }
        }
        result.push(words[i].clone());
        i += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, start: i64, end: i64, prob: f32) -> Token {
        Token {
            text: format!(" {text}"),
            abs_start_ms: start,
            abs_end_ms: end,
            probability: prob,
        }
    }

    #[test]
    fn s1_first_decode_is_speculative_only() {
        let mut stabilizer = TranscriptStabilizer::new();
        let tokens = vec![token("Hello", 0, 200, 0.9), token("world", 200, 500, 0.9)];
        let state = stabilizer.update(DecodeResult::new(tokens, 0), 1000, 300, 0.10);
        assert_eq!(state.raw_committed, "");
        assert_eq!(state.raw_speculative.trim(), "Hello world");
    }

    #[test]
    fn s2_two_decode_la2_commit() {
        let mut stabilizer = TranscriptStabilizer::new();
        let decode_a = vec![
            token("Hello", 0, 200, 0.9),
            token("world", 200, 500, 0.9),
            token("this", 500, 800, 0.9),
            token("is", 800, 1000, 0.9),
        ];
        stabilizer.update(DecodeResult::new(decode_a, 0), 1000, 300, 0.10);

        let decode_b = vec![
            token("Hello", 0, 200, 0.9),
            token("world", 200, 500, 0.9),
            token("this", 500, 800, 0.9),
            token("was", 800, 1000, 0.9),
        ];
        let state = stabilizer.update(DecodeResult::new(decode_b, 0), 1000, 300, 0.10);

        assert!(state.raw_committed.contains("Hello"));
        assert!(state.raw_committed.contains("world"));
        assert!(state.raw_speculative.contains("this") || state.raw_speculative.contains("was"));
    }

    #[test]
    fn s3_hallucination_loop_trim() {
        let mut stabilizer = TranscriptStabilizer::new();
        let make_decode = || {
            vec![
                token("apple", 0, 100, 0.9),
                token("banana", 100, 200, 0.9),
                token("cherry", 200, 300, 0.9),
                token("apple", 300, 400, 0.9),
                token("banana", 400, 500, 0.9),
                token("cherry", 500, 600, 0.9),
            ]
        };

        stabilizer.update(DecodeResult::new(make_decode(), 0), 1000, 100, 0.10);
        let state = stabilizer.update(DecodeResult::new(make_decode(), 0), 1000, 100, 0.10);

        let combined = format!("{} {}", state.raw_committed, state.raw_speculative);
        let apple_count = combined
            .split_whitespace()
            .filter(|w| normalize_word(w) == "apple")
            .count();
        assert_eq!(apple_count, 1);
    }

    #[test]
    fn s4_low_probability_tokens_are_filtered() {
        let mut stabilizer = TranscriptStabilizer::new();
        let make_decode = || {
            vec![
                token("one", 0, 100, 0.9),
                token("two", 100, 200, 0.9),
                token("three", 200, 300, 0.9),
                token("four", 300, 400, 0.9),
                token("garbage", 400, 500, 0.05),
            ]
        };
        stabilizer.update(DecodeResult::new(make_decode(), 0), 1000, 100, 0.10);
        let state = stabilizer.update(DecodeResult::new(make_decode(), 0), 1000, 100, 0.10);

        let combined = format!("{} {}", state.raw_committed, state.raw_speculative);
        assert!(!combined.to_lowercase().contains("garbage"));
        assert!(combined.to_lowercase().contains("one"));
    }

    #[test]
    fn committed_word_count_never_decreases_across_updates() {
        let mut stabilizer = TranscriptStabilizer::new();
        let mut previous_count = 0;
        for i in 0..5 {
            let base = (i * 4) as i64 * 100;
            let tokens = vec![
                token("alpha", base, base + 100, 0.9),
                token("beta", base + 100, base + 200, 0.9),
                token("gamma", base + 200, base + 300, 0.9),
                token("delta", base + 300, base + 400, 0.9),
            ];
            let state = stabilizer.update(DecodeResult::new(tokens, base), base + 1000, 100, 0.10);
            assert!(state.committed_word_count >= previous_count);
            previous_count = state.committed_word_count;
        }
    }

    #[test]
    fn reset_returns_to_empty_state() {
        let mut stabilizer = TranscriptStabilizer::new();
        stabilizer.update(
            DecodeResult::new(vec![token("hi", 0, 100, 0.9)], 0),
            1000,
            100,
            0.10,
        );
        stabilizer.reset();
        let state = stabilizer.snapshot();
        assert_eq!(state, TranscriptState::default());
        assert_eq!(stabilizer.phase(), Phase::Empty);
    }

    #[test]
    fn notify_trimmed_preserves_committed_but_clears_previous_decode() {
        let mut stabilizer = TranscriptStabilizer::new();
        let decode = vec![
            token("Hello", 0, 200, 0.9),
            token("world", 200, 500, 0.9),
            token("there", 500, 800, 0.9),
        ];
        stabilizer.update(DecodeResult::new(decode.clone(), 0), 1000, 100, 0.10);
        stabilizer.update(DecodeResult::new(decode, 0), 1000, 100, 0.10);
        let before = stabilizer.snapshot();
        stabilizer.notify_trimmed();
        let after = stabilizer.snapshot();
        assert_eq!(before, after);
        assert!(stabilizer.previous_decode_normalized_words.is_empty());
    }

    #[test]
    fn no_consecutive_duplicate_phrase_survives_update() {
        let mut stabilizer = TranscriptStabilizer::new();
        let decode = vec![
            token("I", 0, 100, 0.9),
            token("think", 100, 200, 0.9),
            token("we", 200, 300, 0.9),
            token("think", 200, 300, 0.9),
            token("we", 300, 400, 0.9),
            token("should", 400, 500, 0.9),
            token("go", 500, 600, 0.9),
        ];
        stabilizer.update(DecodeResult::new(decode.clone(), 0), 1000, 50, 0.10);
        let state = stabilizer.update(DecodeResult::new(decode, 0), 1000, 50, 0.10);

        let words: Vec<String> = split_words(&state.raw_committed)
            .into_iter()
            .map(normalize_word)
            .collect();
        for window in words.windows(4) {
            if window.len() == 4 {
                assert_ne!(&window[0..2], &window[2..4]);
            }
        }
    }

    #[test]
    fn dot_hallucination_sanitization_is_decoder_side_not_stabilizer_side() {
        // Sanitization of dot-runs happens in `decoder::sanitize_dot_runs`,
        // applied before tokens ever reach the stabilizer.
        assert_eq!(crate::decoder::sanitize_dot_runs("um.."), "um");
    }

    #[test]
    fn finalize_all_strips_incomplete_trailing_fragment() {
        let mut stabilizer = TranscriptStabilizer::new();
        stabilizer.raw_speculative = "hello there incomple".to_string();
        let state = stabilizer.finalize_all();
        assert_eq!(state.raw_committed, "hello there");
    }

    #[test]
    fn finalize_all_keeps_properly_terminated_text() {
        let mut stabilizer = TranscriptStabilizer::new();
        stabilizer.raw_speculative = "hello there.".to_string();
        let state = stabilizer.finalize_all();
        assert_eq!(state.raw_committed, "hello there.");
    }
}
