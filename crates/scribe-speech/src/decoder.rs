use scribe_bridge::error::CoreError;

use crate::{DecodeResult, Token};

/// Minimum audio duration, in milliseconds, required for a window decode.
pub const MIN_WINDOW_DECODE_MS: u32 = 1000;

/// Cap on tokens requested per window decode, to bound worst-case decode
/// time and prevent hallucination runaway.
pub const MAX_WINDOW_TOKENS: u32 = 50;

/// Boundary trait around the external ASR library.
///
/// `decode_window` is greedy, single-segment, token-probability-enabled, and
/// bounded by [`MAX_WINDOW_TOKENS`] — speed matters. `decode_full` is a
/// one-shot, unbounded decode of the complete recording used only at
/// finalization, with temperature fallback enabled.
pub trait Decoder {
    /// Loads a model from `path` for the given language. Must run a warm-up
    /// decode (§4.3) before returning, so the first real decode doesn't pay
    /// allocator thrash.
    fn load_model(&mut self, path: &str, language: &str) -> Result<(), CoreError>;

    /// Releases the loaded model, if any.
    fn unload_model(&mut self);

    /// Decodes one sliding window of audio. `window_start_abs_ms` is added to
    /// every token's relative time to produce absolute time. `prompt`, if
    /// given, seeds the decoder with recent committed context.
    fn decode_window(
        &mut self,
        frames: &[f32],
        window_start_abs_ms: i64,
        prompt: Option<&str>,
    ) -> Result<DecodeResult, CoreError>;

    /// One-shot decode of the complete recording. May internally tile the
    /// audio into chunks as the backend requires.
    fn decode_full(&mut self, frames: &[f32]) -> Result<String, CoreError>;
}

/// Strips runs of 2+ consecutive ASCII dots from decoder output — a known
/// silence-hallucination artifact of the underlying model.
pub fn sanitize_dot_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '.' {
            let mut run_len = 1;
            while chars.peek() == Some(&'.') {
                chars.next();
                run_len += 1;
            }
            if run_len < 2 {
                out.push('.');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// A deterministic fake [`Decoder`] used to unit-test the stabilizer and
/// scheduler without a real Whisper model or audio backend. Replays a
/// pre-scripted sequence of [`DecodeResult`]s for `decode_window`, in order.
#[derive(Debug, Default)]
pub struct ScriptedDecoder {
    window_script: std::collections::VecDeque<DecodeResult>,
    full_script: std::collections::VecDeque<String>,
    pub loaded: bool,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_window_result(&mut self, tokens: Vec<Token>, window_start_abs_ms: i64) {
        self.window_script
            .push_back(DecodeResult::new(tokens, window_start_abs_ms));
    }

    pub fn push_full_result(&mut self, text: impl Into<String>) {
        self.full_script.push_back(text.into());
    }
}

impl Decoder for ScriptedDecoder {
    fn load_model(&mut self, _path: &str, _language: &str) -> Result<(), CoreError> {
        self.loaded = true;
        Ok(())
    }

    fn unload_model(&mut self) {
        self.loaded = false;
    }

    fn decode_window(
        &mut self,
        _frames: &[f32],
        _window_start_abs_ms: i64,
        _prompt: Option<&str>,
    ) -> Result<DecodeResult, CoreError> {
        self.window_script
            .pop_front()
            .ok_or_else(|| CoreError::Decode("scripted decoder exhausted".to_string()))
    }

    fn decode_full(&mut self, _frames: &[f32]) -> Result<String, CoreError> {
        Ok(self.full_script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_runs_of_two_or_more_dots() {
        assert_eq!(sanitize_dot_runs("hello.. world"), "hello world");
        assert_eq!(sanitize_dot_runs("hello... world"), "hello world");
        assert_eq!(sanitize_dot_runs("a.b"), "a.b");
        assert_eq!(sanitize_dot_runs("wait."), "wait.");
        assert_eq!(sanitize_dot_runs("...."), "");
    }

    #[test]
    fn preserves_non_ascii_codepoints() {
        assert_eq!(sanitize_dot_runs("café.. naïve"), "café naïve");
        assert_eq!(sanitize_dot_runs("“quoted”... text"), "“quoted” text");
    }

    #[test]
    fn scripted_decoder_replays_in_order() {
        let mut decoder = ScriptedDecoder::new();
        decoder.push_window_result(vec![], 0);
        decoder.push_window_result(vec![], 1000);

        let a = decoder.decode_window(&[], 0, None).unwrap();
        let b = decoder.decode_window(&[], 0, None).unwrap();
        assert_eq!(a.window_start_abs_ms, 0);
        assert_eq!(b.window_start_abs_ms, 1000);
        assert!(decoder.decode_window(&[], 0, None).is_err());
    }
}
