/// RMS-gated silence detector with continuous-duration hysteresis.
///
/// Tracks how long the input has stayed below `energy_threshold`; reports
/// "silent" only once that continuous run reaches `silence_duration_ms`.
/// A single loud batch resets the run immediately.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    energy_threshold: f32,
    silence_duration_ms: i64,
    silence_start_abs_ms: Option<i64>,
    last_rms: f32,
}

impl SilenceDetector {
    pub fn new(energy_threshold: f32, silence_duration_ms: i64) -> Self {
        Self {
            energy_threshold,
            silence_duration_ms,
            silence_start_abs_ms: None,
            last_rms: 0.0,
        }
    }

    pub fn last_rms(&self) -> f32 {
        self.last_rms
    }

    /// Feeds a batch of samples ending at `current_abs_ms`. Returns `true`
    /// once the *continuous* run of sub-threshold RMS batches has lasted at
    /// least `silence_duration_ms`. The threshold check is strictly
    /// less-than: RMS exactly at the threshold is not silent.
    pub fn update(&mut self, samples: &[f32], current_abs_ms: i64) -> bool {
        if samples.is_empty() {
            return false;
        }

        let rms = rms_of(samples);

        if rms >= self.energy_threshold {
            self.silence_start_abs_ms = None;
            self.last_rms = rms;
            return false;
        }

        self.last_rms = rms;
        match self.silence_start_abs_ms {
            None => {
                self.silence_start_abs_ms = Some(current_abs_ms);
                false
            }
            Some(start) => (current_abs_ms - start) >= self.silence_duration_ms,
        }
    }

    pub fn reset(&mut self) {
        self.silence_start_abs_ms = None;
        self.last_rms = 0.0;
    }
}

/// Root-mean-square of a sample batch. Returns 0.0 for an empty slice.
pub fn rms_of(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_of_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    ((sum_of_squares / samples.len() as f64).sqrt()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud(n: usize) -> Vec<f32> {
        vec![1.0; n]
    }

    fn quiet(n: usize) -> Vec<f32> {
        vec![0.0; n]
    }

    #[test]
    fn empty_batch_returns_false() {
        let mut detector = SilenceDetector::new(0.01, 900);
        assert!(!detector.update(&[], 0));
    }

    #[test]
    fn loud_audio_clears_silence_run() {
        let mut detector = SilenceDetector::new(0.01, 900);
        assert!(!detector.update(&quiet(10), 0));
        assert!(!detector.update(&loud(10), 100));
        assert_eq!(detector.update(&quiet(10), 200), false);
    }

    #[test]
    fn exactly_at_threshold_is_not_silent() {
        let mut detector = SilenceDetector::new(0.5, 500);
        let samples = vec![0.5f32; 10];
        assert!(!detector.update(&samples, 0));
    }

    #[test]
    fn continuous_quiet_run_trips_after_duration() {
        let mut detector = SilenceDetector::new(0.01, 900);
        assert!(!detector.update(&quiet(10), 0));
        assert!(!detector.update(&quiet(10), 500));
        assert!(detector.update(&quiet(10), 900));
    }

    #[test]
    fn reset_clears_state() {
        let mut detector = SilenceDetector::new(0.01, 900);
        detector.update(&quiet(10), 0);
        detector.reset();
        assert!(!detector.update(&quiet(10), 900));
    }
}
