/// Unbounded-but-trimmed buffer of all audio since the last trim (or since
/// recording started, if never trimmed).
///
/// Distinct from [`crate::decoder`]'s window decodes: the accumulator holds
/// every sample recorded since `trim_offset`, not just the last *window_ms*.
/// The scheduler hands `accumulated_window` to each window decode so the
/// decoder keeps enough context across ticks; [`Accumulator::trim`] bounds
/// its growth per the accumulate-and-trim policy (§4.6) while
/// `full_audio` is kept for the one-shot finalization re-decode.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    samples: Vec<f32>,
    trim_offset: usize,
    sample_rate: u32,
}

impl Accumulator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            trim_offset: 0,
            sample_rate,
        }
    }

    /// Appends newly captured samples. Called from the scheduler context
    /// (not the real-time audio callback) once per tick, alongside
    /// `AudioRingBuffer::append`.
    pub fn push(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Every sample recorded this session, ignoring `trim_offset`. Used only
    /// by the finalization path's full re-decode.
    pub fn full_audio(&self) -> &[f32] {
        &self.samples
    }

    /// Samples from `trim_offset` to the end — what window decodes see.
    pub fn accumulated_window(&self) -> &[f32] {
        &self.samples[self.trim_offset.min(self.samples.len())..]
    }

    pub fn accumulated_duration_ms(&self) -> u64 {
        (self.accumulated_window().len() as u64 * 1000) / self.sample_rate.max(1) as u64
    }

    pub fn total_samples_recorded(&self) -> usize {
        self.samples.len()
    }

    pub fn trim_offset(&self) -> usize {
        self.trim_offset
    }

    /// Absolute recording time, in milliseconds, of `accumulated_window`'s
    /// first sample. Recording start is always abs_ms 0.
    pub fn accumulated_start_abs_ms(&self) -> i64 {
        (self.trim_offset.min(self.samples.len()) as i64 * 1000) / self.sample_rate.max(1) as i64
    }

    /// Absolute recording time, in milliseconds, of the most recently pushed
    /// sample.
    pub fn accumulated_end_abs_ms(&self) -> i64 {
        (self.samples.len() as i64 * 1000) / self.sample_rate.max(1) as i64
    }

    /// Advances `trim_offset` to `new_offset`, bounding the growth of
    /// `accumulated_window` while `full_audio` is left untouched. The
    /// caller (scheduler) is responsible for computing `new_offset` from the
    /// trim policy (§4.6) and for calling `stabilizer.notify_trimmed()`.
    pub fn advance_trim_offset(&mut self, new_offset: usize) {
        self.trim_offset = new_offset.clamp(self.trim_offset, self.samples.len());
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.trim_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulated_window_reflects_trim_offset() {
        let mut acc = Accumulator::new(1000);
        acc.push(&[1.0, 2.0, 3.0, 4.0]);
        acc.advance_trim_offset(2);
        assert_eq!(acc.accumulated_window(), &[3.0, 4.0]);
        assert_eq!(acc.full_audio(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn duration_tracks_accumulated_window_only() {
        let mut acc = Accumulator::new(1000);
        acc.push(&[0.0; 10]);
        acc.advance_trim_offset(4);
        assert_eq!(acc.accumulated_duration_ms(), 6);
    }

    #[test]
    fn trim_offset_never_moves_backward() {
        let mut acc = Accumulator::new(1000);
        acc.push(&[0.0; 10]);
        acc.advance_trim_offset(5);
        acc.advance_trim_offset(2);
        assert_eq!(acc.trim_offset(), 5);
    }

    #[test]
    fn abs_ms_accessors_track_sample_rate() {
        let mut acc = Accumulator::new(1000);
        acc.push(&[0.0; 500]);
        acc.advance_trim_offset(250);
        assert_eq!(acc.accumulated_start_abs_ms(), 250);
        assert_eq!(acc.accumulated_end_abs_ms(), 500);
    }

    #[test]
    fn reset_clears_everything() {
        let mut acc = Accumulator::new(1000);
        acc.push(&[1.0, 2.0, 3.0]);
        acc.advance_trim_offset(1);
        acc.reset();
        assert_eq!(acc.total_samples_recorded(), 0);
        assert_eq!(acc.trim_offset(), 0);
    }
}
