use scribe_bridge::error::CoreError;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use crate::decoder::{Decoder, MAX_WINDOW_TOKENS, sanitize_dot_runs};
use crate::{DecodeResult, Token};

/// `whisper-rs`-backed implementation of [`Decoder`].
///
/// Window decodes use greedy sampling, single-segment mode, token-level
/// probabilities, and a bounded token count — speed matters and this is
/// called on every scheduler tick. Full decodes enable temperature fallback
/// and disable the single-segment bound; they run once, at finalization.
pub struct WhisperDecoder {
    context: Option<WhisperContext>,
    state: Option<WhisperState>,
    warm_max_samples: usize,
}

impl WhisperDecoder {
    /// `warm_max_samples` should be sized to the maximum expected
    /// accumulated window, so the warm-up decode pre-allocates decoder graph
    /// buffers for the worst case.
    pub fn new(warm_max_samples: usize) -> Self {
        Self {
            context: None,
            state: None,
            warm_max_samples,
        }
    }

    fn state_mut(&mut self) -> Result<&mut WhisperState, CoreError> {
        self.state
            .as_mut()
            .ok_or_else(|| CoreError::Model("no model loaded".to_string()))
    }

    fn window_params(prompt: Option<&str>) -> FullParams<'static, 'static> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_single_segment(true);
        params.set_token_timestamps(true);
        params.set_max_tokens(MAX_WINDOW_TOKENS as i32);
        params.set_temperature(0.0);
        params.set_n_threads(num_cpus::get_physical() as i32);
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        if let Some(prompt) = prompt {
            params.set_initial_prompt(prompt);
        }
        params
    }

    fn full_params() -> FullParams<'static, 'static> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_single_segment(false);
        params.set_token_timestamps(true);
        params.set_temperature(0.0);
        params.set_temperature_inc(0.2);
        params.set_n_threads(num_cpus::get_physical() as i32);
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params
    }

    /// Extracts every token across every segment of the most recent `full`
    /// call, rebasing relative centisecond timestamps to absolute
    /// milliseconds and sanitizing dot-run hallucinations.
    fn extract_tokens(
        state: &WhisperState,
        window_start_abs_ms: i64,
    ) -> Result<Vec<Token>, CoreError> {
        let segment_count = state
            .full_n_segments()
            .map_err(|e| CoreError::Decode(format!("segment count: {e}")))?;

        let mut tokens = Vec::new();
        for segment_index in 0..segment_count {
            let token_count = state
                .full_n_tokens(segment_index)
                .map_err(|e| CoreError::Decode(format!("token count: {e}")))?;

            if token_count == 0 {
                let text = state
                    .full_get_segment_text(segment_index)
                    .map_err(|e| CoreError::Decode(format!("segment text: {e}")))?;
                let text = sanitize_dot_runs(&text);
                if text.trim().is_empty() {
                    continue;
                }
                let t0 = state
                    .full_get_segment_t0(segment_index)
                    .map_err(|e| CoreError::Decode(format!("segment t0: {e}")))?;
                let t1 = state
                    .full_get_segment_t1(segment_index)
                    .map_err(|e| CoreError::Decode(format!("segment t1: {e}")))?;
                tokens.push(Token {
                    text,
                    abs_start_ms: window_start_abs_ms + t0 * 10,
                    abs_end_ms: window_start_abs_ms + t1 * 10,
                    probability: 1.0,
                });
                continue;
            }

            for token_index in 0..token_count {
                let data = state
                    .full_get_token_data(segment_index, token_index)
                    .map_err(|e| CoreError::Decode(format!("token data: {e}")))?;
                let text = state
                    .full_get_token_text(segment_index, token_index)
                    .map_err(|e| CoreError::Decode(format!("token text: {e}")))?;
                let text = sanitize_dot_runs(&text);
                if text.trim().is_empty() || text.starts_with('[') {
                    continue;
                }
                tokens.push(Token {
                    text,
                    abs_start_ms: window_start_abs_ms + data.t0 * 10,
                    abs_end_ms: window_start_abs_ms + data.t1 * 10,
                    probability: data.p,
                });
            }
        }

        // Tokens within one decode must be non-decreasing by abs_end_ms.
        tokens.sort_by_key(|t| t.abs_end_ms);
        Ok(tokens)
    }
}

impl Decoder for WhisperDecoder {
    fn load_model(&mut self, path: &str, language: &str) -> Result<(), CoreError> {
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| CoreError::Model(format!("failed to load model at {path}: {e}")))?;
        let mut state = context
            .create_state()
            .map_err(|e| CoreError::Model(format!("failed to create decode state: {e}")))?;

        // Warm-up: one decode of a zero-filled buffer sized to the maximum
        // expected accumulated window, so later decodes don't trigger
        // allocator thrash.
        let warmup_audio = vec![0.0f32; self.warm_max_samples];
        let mut warmup_params = Self::window_params(None);
        warmup_params.set_language(Some(language));
        let _ = state.full(warmup_params, &warmup_audio);

        self.context = Some(context);
        self.state = Some(state);
        Ok(())
    }

    fn unload_model(&mut self) {
        self.state = None;
        self.context = None;
    }

    fn decode_window(
        &mut self,
        frames: &[f32],
        window_start_abs_ms: i64,
        prompt: Option<&str>,
    ) -> Result<DecodeResult, CoreError> {
        let params = Self::window_params(prompt);
        let state = self.state_mut()?;
        state
            .full(params, frames)
            .map_err(|e| CoreError::Decode(format!("window decode failed: {e}")))?;
        let tokens = Self::extract_tokens(state, window_start_abs_ms)?;
        Ok(DecodeResult::new(tokens, window_start_abs_ms))
    }

    fn decode_full(&mut self, frames: &[f32]) -> Result<String, CoreError> {
        let params = Self::full_params();
        let state = self.state_mut()?;
        state
            .full(params, frames)
            .map_err(|e| CoreError::Decode(format!("full decode failed: {e}")))?;

        let segment_count = state
            .full_n_segments()
            .map_err(|e| CoreError::Decode(format!("segment count: {e}")))?;
        let mut text = String::new();
        for segment_index in 0..segment_count {
            let segment_text = state
                .full_get_segment_text(segment_index)
                .map_err(|e| CoreError::Decode(format!("segment text: {e}")))?;
            text.push_str(&sanitize_dot_runs(&segment_text));
        }
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_decoder_has_no_state_until_loaded() {
        let mut decoder = WhisperDecoder::new(16_000 * 8);
        assert!(decoder.state_mut().is_err());
        decoder.unload_model();
    }
}
