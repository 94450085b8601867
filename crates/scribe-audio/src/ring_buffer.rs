use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// A snapshot of the ring buffer's currently visible window.
#[derive(Debug, Clone, PartialEq)]
pub struct RingWindow {
    /// Samples in chronological order, oldest first.
    pub pcm: Vec<f32>,
    /// Absolute time, in milliseconds, of the first sample in `pcm`.
    pub window_start_abs_ms: i64,
    /// Absolute time, in milliseconds, one sample past the last sample.
    pub window_end_abs_ms: i64,
}

/// Fixed-capacity circular store for mono `f32` PCM, addressed by absolute
/// sample index rather than buffer offset.
///
/// Written by a single audio-callback thread via [`AudioRingBuffer::append`]
/// and read by the scheduler tick via [`AudioRingBuffer::get_window`]. The
/// backing storage is guarded by a plain mutex (short critical section);
/// `write_head`/`total_written` are atomics so a reader can always observe a
/// monotonic, never-decreasing `total_written` even mid-write. The contract
/// is "last *capacity* samples at this instant" — a read racing a concurrent
/// overwrite at the tail of the window is tolerated, not prevented.
pub struct AudioRingBuffer {
    storage: Mutex<Vec<f32>>,
    capacity: usize,
    sample_rate: u32,
    write_head: AtomicI64,
    total_written: AtomicI64,
}

impl AudioRingBuffer {
    /// Creates a ring buffer with room for `capacity` samples at `sample_rate`.
    pub fn new(capacity: usize, sample_rate: u32) -> Self {
        Self {
            storage: Mutex::new(vec![0.0; capacity.max(1)]),
            capacity: capacity.max(1),
            sample_rate,
            write_head: AtomicI64::new(0),
            total_written: AtomicI64::new(0),
        }
    }

    /// Creates a ring buffer sized to hold `window_ms` milliseconds of audio.
    pub fn with_window_ms(window_ms: u32, sample_rate: u32) -> Self {
        let capacity = (sample_rate as u64 * window_ms as u64 / 1000) as usize;
        Self::new(capacity, sample_rate)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_written(&self) -> i64 {
        self.total_written.load(Ordering::Acquire)
    }

    /// Copies `samples` into the ring at the current write head, wrapping as
    /// needed, then advances `write_head` and `total_written`.
    pub fn append(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let mut storage = self.storage.lock().expect("ring buffer mutex poisoned");
        let capacity = self.capacity;

        // Samples larger than capacity: only the tail matters.
        let samples = if samples.len() > capacity {
            &samples[samples.len() - capacity..]
        } else {
            samples
        };

        let head = self.write_head.load(Ordering::Acquire) as usize;
        let n = samples.len();
        if head + n > capacity {
            let first_chunk = capacity - head;
            storage[head..capacity].copy_from_slice(&samples[..first_chunk]);
            storage[..n - first_chunk].copy_from_slice(&samples[first_chunk..]);
        } else {
            storage[head..head + n].copy_from_slice(samples);
        }
        drop(storage);

        let new_head = (head + n) % capacity;
        self.write_head.store(new_head as i64, Ordering::Release);
        self.total_written
            .fetch_add(n as i64, Ordering::AcqRel);
    }

    /// Returns the last `min(total_written, capacity)` samples, in
    /// chronological order, as a copy.
    pub fn get_window(&self) -> RingWindow {
        let total_written = self.total_written.load(Ordering::Acquire);
        let capacity = self.capacity as i64;
        let visible = total_written.min(capacity) as usize;

        let mut pcm = vec![0.0f32; visible];
        if visible > 0 {
            let storage = self.storage.lock().expect("ring buffer mutex poisoned");
            let head = self.write_head.load(Ordering::Acquire) as usize;
            // The oldest visible sample sits `visible` slots behind `head`.
            let start = (head + self.capacity - visible) % self.capacity;
            if start + visible > self.capacity {
                let first_chunk = self.capacity - start;
                pcm[..first_chunk].copy_from_slice(&storage[start..self.capacity]);
                pcm[first_chunk..].copy_from_slice(&storage[..visible - first_chunk]);
            } else {
                pcm.copy_from_slice(&storage[start..start + visible]);
            }
        }

        RingWindow {
            pcm,
            window_start_abs_ms: self.window_start_abs_ms(),
            window_end_abs_ms: self.sample_index_to_abs_ms(total_written),
        }
    }

    pub fn window_start_abs_ms(&self) -> i64 {
        let total_written = self.total_written.load(Ordering::Acquire);
        let capacity = self.capacity as i64;
        self.sample_index_to_abs_ms((total_written - capacity).max(0))
    }

    pub fn sample_index_to_abs_ms(&self, index: i64) -> i64 {
        index * 1000 / self.sample_rate as i64
    }

    pub fn abs_ms_to_sample_index(&self, ms: i64) -> i64 {
        ms * self.sample_rate as i64 / 1000
    }

    /// Zeroes both counters. Storage is left as-is; stale bytes beyond the
    /// new (empty) window are never visible to `get_window`.
    pub fn reset(&self) {
        self.write_head.store(0, Ordering::Release);
        self.total_written.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_contains_last_capacity_samples_in_order() {
        let ring = AudioRingBuffer::new(4, 1000);
        ring.append(&[1.0, 2.0, 3.0]);
        ring.append(&[4.0, 5.0]);

        let window = ring.get_window();
        assert_eq!(window.pcm, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ring.total_written(), 5);
    }

    #[test]
    fn window_shorter_than_capacity_starts_at_zero() {
        let ring = AudioRingBuffer::new(10, 1000);
        ring.append(&[1.0, 2.0, 3.0]);
        let window = ring.get_window();
        assert_eq!(window.pcm, vec![1.0, 2.0, 3.0]);
        assert_eq!(window.window_start_abs_ms, 0);
    }

    #[test]
    fn total_written_never_wraps_or_decreases() {
        let ring = AudioRingBuffer::new(4, 1000);
        for _ in 0..10 {
            ring.append(&[0.0; 3]);
        }
        assert_eq!(ring.total_written(), 30);
    }

    #[test]
    fn ms_conversions_are_linear() {
        let ring = AudioRingBuffer::new(16_000, 16_000);
        assert_eq!(ring.sample_index_to_abs_ms(16_000), 1000);
        assert_eq!(ring.abs_ms_to_sample_index(1000), 16_000);
    }

    #[test]
    fn reset_zeroes_counters() {
        let ring = AudioRingBuffer::new(4, 1000);
        ring.append(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        ring.reset();
        assert_eq!(ring.total_written(), 0);
        assert!(ring.get_window().pcm.is_empty());
    }

    #[test]
    fn append_longer_than_capacity_keeps_tail_only() {
        let ring = AudioRingBuffer::new(3, 1000);
        ring.append(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ring.get_window().pcm, vec![3.0, 4.0, 5.0]);
    }
}
