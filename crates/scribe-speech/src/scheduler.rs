use std::collections::VecDeque;

use scribe_audio::ring_buffer::AudioRingBuffer;
use scribe_audio::silence::SilenceDetector;
use scribe_bridge::CoreEvent;
use scribe_bridge::error::CoreError;

use crate::accumulator::Accumulator;
use crate::decoder::MIN_WINDOW_DECODE_MS;
use crate::normalize::ends_sentence;
use crate::stabilizer::{TranscriptStabilizer, TranscriptState};
use crate::{DecodeResult, milliseconds_to_samples};

/// How many recent per-tick RMS values are retained for the waveform level
/// display.
const RMS_HISTORY_CAPACITY: usize = 30;

/// A window decode ready to be dispatched to a [`crate::decoder::Decoder`].
/// The caller owns submission: on a real runtime this is handed to
/// `spawn_blocking`; in tests, directly to a `ScriptedDecoder`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeRequest {
    pub accumulated_pcm: Vec<f32>,
    pub accumulated_start_abs_ms: i64,
    pub accumulated_end_abs_ms: i64,
    pub prompt: Option<String>,
}

/// Tuning parameters a [`Scheduler`] is constructed with, mirroring the
/// relevant subset of `PipelineConfig`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub sample_rate: u32,
    pub window_ms: u32,
    pub commit_margin_ms: i64,
    pub silence_ms: i64,
    pub max_buffer_ms: u32,
    pub max_prompt_chars: usize,
    pub min_token_probability: f32,
    pub energy_threshold: f32,
}

/// Ties silence detection, backpressure, prompt building, and the
/// accumulate-and-trim policy together into the streaming tick loop's pure
/// decision logic. Owns no timer and performs no I/O; a runtime layer drives
/// `tick`/`complete_decode` from a periodic timer and a decode worker.
pub struct Scheduler {
    ring: AudioRingBuffer,
    accumulator: Accumulator,
    silence: SilenceDetector,
    stabilizer: TranscriptStabilizer,
    rms_history: VecDeque<f32>,
    in_flight: bool,
    needs_redecode: bool,
    commit_margin_ms: i64,
    max_buffer_ms: u32,
    max_prompt_chars: usize,
    min_token_probability: f32,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            ring: AudioRingBuffer::with_window_ms(config.window_ms, config.sample_rate),
            accumulator: Accumulator::new(config.sample_rate),
            silence: SilenceDetector::new(config.energy_threshold, config.silence_ms),
            stabilizer: TranscriptStabilizer::new(),
            rms_history: VecDeque::with_capacity(RMS_HISTORY_CAPACITY),
            in_flight: false,
            needs_redecode: false,
            commit_margin_ms: config.commit_margin_ms,
            max_buffer_ms: config.max_buffer_ms,
            max_prompt_chars: config.max_prompt_chars,
            min_token_probability: config.min_token_probability,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn needs_redecode(&self) -> bool {
        self.needs_redecode
    }

    /// Appends newly captured audio. Called from the scheduler context once
    /// per tick with whatever the audio callback handed off, alongside (not
    /// instead of) the real-time ring append.
    pub fn push_audio(&mut self, samples: &[f32]) {
        self.ring.append(samples);
        self.accumulator.push(samples);
    }

    /// Runs one tick of the scheduling loop (§4.5). Always returns the
    /// waveform-level event (if any audio is available); returns
    /// `Some(request)` only when a window decode should be submitted.
    pub fn tick(&mut self) -> (Vec<CoreEvent>, Option<DecodeRequest>) {
        let mut events = Vec::new();

        let window = self.ring.get_window();
        if window.pcm.is_empty() {
            return (events, None);
        }

        let is_silent = self.silence.update(&window.pcm, window.window_end_abs_ms);
        let rms = self.silence.last_rms();
        if self.rms_history.len() >= RMS_HISTORY_CAPACITY {
            self.rms_history.pop_front();
        }
        self.rms_history.push_back(rms);
        events.push(CoreEvent::AudioLevel(rms));

        if is_silent {
            return (events, None);
        }

        if self.accumulator.accumulated_duration_ms() < MIN_WINDOW_DECODE_MS as u64 {
            return (events, None);
        }

        if self.in_flight {
            self.needs_redecode = true;
            return (events, None);
        }

        self.in_flight = true;
        let request = DecodeRequest {
            accumulated_pcm: self.accumulator.accumulated_window().to_vec(),
            accumulated_start_abs_ms: self.accumulator.accumulated_start_abs_ms(),
            accumulated_end_abs_ms: self.accumulator.accumulated_end_abs_ms(),
            prompt: self.build_prompt(),
        };
        (events, Some(request))
    }

    /// Applies a completed window decode (§4.5 step 7). Clears the in-flight
    /// flag; if a tick was skipped for backpressure while this decode was
    /// running, immediately re-runs the tick and returns any resulting
    /// request alongside this decode's events.
    pub fn complete_decode(
        &mut self,
        result: Result<DecodeResult, CoreError>,
        window_end_abs_ms: i64,
    ) -> (Vec<CoreEvent>, Option<DecodeRequest>) {
        self.in_flight = false;
        let mut events = Vec::new();

        match result {
            Ok(decode_result) => {
                let state = self.stabilizer.update(
                    decode_result,
                    window_end_abs_ms,
                    self.commit_margin_ms,
                    self.min_token_probability,
                );
                events.push(CoreEvent::CommittedTextChanged(state.raw_committed));
                events.push(CoreEvent::SpeculativeTextChanged(state.raw_speculative));
                self.run_trim_policy();
            }
            Err(error) => {
                log::warn!("window decode failed: {error}");
            }
        }

        let follow_up = self.redecode_if_needed();
        (events, follow_up)
    }

    /// A decode exceeded the wall-clock stall limit (§4.5): drop its result
    /// without touching the stabilizer, but still clear backpressure.
    pub fn on_decode_stalled(&mut self) -> Option<DecodeRequest> {
        log::warn!("window decode stalled past wall-clock limit; dropping result");
        self.in_flight = false;
        self.redecode_if_needed()
    }

    fn redecode_if_needed(&mut self) -> Option<DecodeRequest> {
        if !self.needs_redecode {
            return None;
        }
        self.needs_redecode = false;
        let (_, request) = self.tick();
        request
    }

    /// Discards in-flight state and resets everything to a fresh recording.
    pub fn cancel(&mut self) {
        self.in_flight = false;
        self.needs_redecode = false;
        self.ring.reset();
        self.accumulator.reset();
        self.stabilizer.reset();
        self.silence.reset();
        self.rms_history.clear();
    }

    /// All audio recorded this session, for the finalization re-decode.
    pub fn full_audio(&self) -> &[f32] {
        self.accumulator.full_audio()
    }

    /// Resolves the finalization path's step 3: an authoritative non-empty
    /// full-decode result replaces committed text; otherwise falls back to
    /// `stabilizer.finalize_all()`.
    pub fn finalize(&mut self, full_decode_text: Option<String>) -> TranscriptState {
        match full_decode_text {
            Some(text) if !text.trim().is_empty() => {
                self.stabilizer.finalize_with_authoritative_text(text)
            }
            _ => self.stabilizer.finalize_all(),
        }
    }

    /// §4.5.1: `raw_committed` truncated from the right to `max_prompt_chars`,
    /// preferring a sentence boundary, then a word boundary, inside the
    /// truncated suffix.
    fn build_prompt(&self) -> Option<String> {
        let committed = self.stabilizer.committed_text();
        if committed.is_empty() {
            return None;
        }

        let char_count = committed.chars().count();
        if char_count <= self.max_prompt_chars {
            return Some(committed.to_string());
        }

        let skip = char_count - self.max_prompt_chars;
        let suffix: String = committed.chars().skip(skip).collect();

        if let Some(idx) = suffix.find(". ") {
            return Some(suffix[idx + 2..].to_string());
        }
        if let Some(idx) = suffix.find(' ') {
            return Some(suffix[idx + 1..].to_string());
        }
        Some(suffix)
    }

    /// §4.6: bounds accumulator growth by trimming at (or near) a sentence
    /// boundary once the accumulated window outgrows `max_buffer_ms`.
    fn run_trim_policy(&mut self) {
        if self.accumulator.accumulated_duration_ms() <= self.max_buffer_ms as u64 {
            return;
        }

        let committed = self.stabilizer.committed_text().to_string();
        let words: Vec<&str> = committed.split_whitespace().collect();
        if words.is_empty() {
            return;
        }

        let half = words.len().div_ceil(2);
        let boundary_index = words[..half].iter().position(|w| ends_sentence(w));
        let trim_word_index = boundary_index.unwrap_or_else(|| {
            ((words.len() as f64 * 0.4).floor() as usize).min(words.len() - 1)
        });

        let fraction = (trim_word_index + 1) as f64 / words.len() as f64;
        let total_samples = self.accumulator.total_samples_recorded();
        let trim_offset = self.accumulator.trim_offset();
        let new_offset =
            trim_offset + (fraction * (total_samples - trim_offset) as f64).round() as usize;

        self.accumulator.advance_trim_offset(new_offset);
        self.stabilizer.notify_trimmed();
    }
}

/// Converts `window_ms` (a [`SchedulerConfig`] field) to a sample count at
/// `sample_rate`, for callers sizing warm-up buffers.
pub fn window_samples(window_ms: u32, sample_rate: u32) -> usize {
    milliseconds_to_samples(window_ms, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Token;
    use crate::decoder::{Decoder, ScriptedDecoder};

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            sample_rate: 1000,
            window_ms: 8000,
            commit_margin_ms: 100,
            silence_ms: 500,
            max_buffer_ms: 12_000,
            max_prompt_chars: 1200,
            min_token_probability: 0.10,
            energy_threshold: 0.01,
        }
    }

    fn loud_samples(n: usize) -> Vec<f32> {
        vec![1.0; n]
    }

    #[test]
    fn silence_suppresses_decode_submission() {
        let mut scheduler = Scheduler::new(config());
        scheduler.push_audio(&vec![0.0; 2000]);
        let (events, request) = scheduler.tick();
        assert!(request.is_none());
        assert!(matches!(events.last(), Some(CoreEvent::AudioLevel(_))));
    }

    #[test]
    fn short_accumulation_does_not_submit() {
        let mut scheduler = Scheduler::new(config());
        scheduler.push_audio(&loud_samples(500));
        let (_, request) = scheduler.tick();
        assert!(request.is_none());
    }

    #[test]
    fn s6_backpressure_allows_only_one_in_flight_decode() {
        let mut scheduler = Scheduler::new(config());
        scheduler.push_audio(&loud_samples(1200));

        let (_, first) = scheduler.tick();
        assert!(first.is_some());
        assert!(scheduler.in_flight());

        let (_, second) = scheduler.tick();
        assert!(second.is_none());
        assert!(scheduler.needs_redecode());

        let (_, follow_up) = scheduler.complete_decode(
            Ok(DecodeResult::new(vec![], 0)),
            scheduler.full_audio().len() as i64,
        );
        assert!(follow_up.is_some());
        assert!(!scheduler.needs_redecode());
    }

    #[test]
    fn stalled_decode_is_dropped_without_updating_stabilizer() {
        let mut scheduler = Scheduler::new(config());
        scheduler.push_audio(&loud_samples(1200));
        scheduler.tick();
        assert!(scheduler.in_flight());
        let follow_up = scheduler.on_decode_stalled();
        assert!(!scheduler.in_flight());
        assert!(follow_up.is_none());
    }

    #[test]
    fn s5_trim_at_sentence_boundary_keeps_context() {
        let mut scheduler = Scheduler::new(config());
        scheduler.push_audio(&loud_samples(13_000));

        let long_committed = format!(
            "{} {}",
            "word ".repeat(20).trim(),
            "ends. more words after the boundary continue on"
        );
        // Seed committed text directly through a scripted decode agreement
        // rather than poking private state: two identical decodes commit
        // everything except the last held-back word.
        let mut decoder = ScriptedDecoder::new();
        let tokens: Vec<Token> = long_committed
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| Token {
                text: format!(" {w}"),
                abs_start_ms: i as i64 * 100,
                abs_end_ms: i as i64 * 100 + 100,
                probability: 0.9,
            })
            .collect();
        decoder.push_window_result(tokens.clone(), 0);
        decoder.push_window_result(tokens, 0);

        for _ in 0..2 {
            let (_, request) = scheduler.tick();
            if let Some(request) = request {
                let result = decoder
                    .decode_window(&request.accumulated_pcm, request.accumulated_start_abs_ms, None)
                    .map(|r| DecodeResult::new(r.tokens, request.accumulated_start_abs_ms));
                scheduler.complete_decode(result, request.accumulated_end_abs_ms);
            }
        }

        let trim_offset_before = scheduler.accumulator.trim_offset();
        scheduler.run_trim_policy();
        assert!(scheduler.accumulator.trim_offset() >= trim_offset_before);
    }
}
