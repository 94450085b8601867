use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tunable knobs for the streaming transcription core.
///
/// Every field has a default and a valid range (see the configuration table
/// in the specification); values outside the documented range are clamped by
/// [`PipelineConfig::sanitized`] rather than rejected, so a stale persisted
/// config never prevents a recording from starting. The core reads a
/// snapshot of this struct once, at `start_recording`; model download and
/// settings-UI concerns live entirely outside the core.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// PCM sample rate. Fixed at 16 kHz; the capture layer resamples to this
    /// before audio reaches the ring buffer.
    pub sample_rate: u32,
    /// Scheduler tick period, in milliseconds. Range 150-500.
    pub tick_ms: u64,
    /// Ring buffer capacity, in milliseconds of audio. Range 4000-12000.
    pub window_ms: u32,
    /// Offset from `window_end_ms` defining the commit horizon. Range 400-1200.
    pub commit_margin_ms: i64,
    /// Continuous silence duration required to suppress a decode. Range 500-2000.
    pub silence_ms: i64,
    /// Accumulator duration, in milliseconds, above which a trim is attempted.
    /// Must be at least `window_ms`.
    pub max_buffer_ms: u32,
    /// Maximum length of the decoder prompt built from committed text.
    pub max_prompt_chars: usize,
    /// Per-token probability cutoff below which a token is dropped. Range 0.0-1.0.
    pub min_token_probability: f32,
    /// RMS energy threshold below which audio is considered silent.
    pub energy_threshold: f32,
    /// Soft cap on session length, in minutes; `on_max_duration_reached` is
    /// emitted once this is exceeded. Range 1-60.
    pub max_session_minutes: u32,
    /// Selected audio input device, persisted across runs.
    pub selected_device_id: Option<String>,
    /// Path to the loaded ASR model. Downloading/managing the model file
    /// itself is an external collaborator's concern.
    pub active_model_path: Option<PathBuf>,
    /// Language passed to the decoder at model load time.
    pub language: String,
    /// Optional, case-insensitive word list stripped from the final
    /// transcript at finalization. Empty by default (no-op).
    pub filler_words: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            tick_ms: 250,
            window_ms: 8_000,
            commit_margin_ms: 700,
            silence_ms: 900,
            max_buffer_ms: 12_000,
            max_prompt_chars: 1_200,
            min_token_probability: 0.10,
            energy_threshold: 0.01,
            max_session_minutes: 30,
            selected_device_id: None,
            active_model_path: None,
            language: "en".to_string(),
            filler_words: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Hard cap on session length, in minutes, regardless of configuration.
    pub const HARD_CAP_MINUTES: u32 = 60;

    /// Clamp every field to the range documented on the struct, leaving
    /// fields that have no declared range untouched.
    pub fn sanitized(mut self) -> Self {
        self.tick_ms = self.tick_ms.clamp(150, 500);
        self.window_ms = self.window_ms.clamp(4_000, 12_000);
        self.commit_margin_ms = self.commit_margin_ms.clamp(400, 1_200);
        self.silence_ms = self.silence_ms.clamp(500, 2_000);
        self.max_buffer_ms = self.max_buffer_ms.max(self.window_ms);
        self.min_token_probability = self.min_token_probability.clamp(0.0, 1.0);
        self.max_session_minutes = self.max_session_minutes.clamp(1, Self::HARD_CAP_MINUTES);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_already_sanitized() {
        let config = PipelineConfig::default();
        assert_eq!(config.clone().sanitized(), config);
    }

    #[test]
    fn sanitized_clamps_out_of_range_fields() {
        let config = PipelineConfig {
            tick_ms: 10,
            window_ms: 1,
            commit_margin_ms: 10_000,
            silence_ms: 1,
            max_buffer_ms: 100,
            max_session_minutes: 1_000,
            ..PipelineConfig::default()
        }
        .sanitized();

        assert_eq!(config.tick_ms, 150);
        assert_eq!(config.window_ms, 4_000);
        assert_eq!(config.commit_margin_ms, 1_200);
        assert_eq!(config.silence_ms, 500);
        assert!(config.max_buffer_ms >= config.window_ms);
        assert_eq!(config.max_session_minutes, PipelineConfig::HARD_CAP_MINUTES);
    }
}
