//! Circular sample history with absolute-position reads.

/// Ring buffer over a mono sample stream, addressed by absolute position.
///
/// Every sample ever pushed has a stable absolute index (the first sample is
/// index 0). The buffer retains the most recent `capacity` samples; reads
/// outside the retained window return silence. Absolute addressing lets a
/// pitch shifter place analysis grains on the input timeline without either
/// side tracking wraparound.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    data: Vec<f32>,
    write_pos: usize,
    total: u64,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            write_pos: 0,
            total: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total samples pushed since construction or the last [`clear`](Self::clear).
    ///
    /// Equivalently, the absolute index one past the newest sample.
    #[inline]
    pub fn total_samples(&self) -> u64 {
        self.total
    }

    /// Append a block to the history, overwriting the oldest samples on wrap.
    pub fn push(&mut self, block: &[f32]) {
        for &sample in block {
            self.data[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.data.len();
        }
        self.total += block.len() as u64;
    }

    /// Read the sample at absolute position `index`.
    ///
    /// Returns 0.0 for positions not yet written or already overwritten.
    #[inline]
    pub fn get(&self, index: u64) -> f32 {
        if index >= self.total {
            return 0.0;
        }
        let oldest = self.total.saturating_sub(self.data.len() as u64);
        if index < oldest {
            return 0.0;
        }
        self.data[(index % self.data.len() as u64) as usize]
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first.
    ///
    /// Positions from before the first push are filled with silence, so an
    /// analysis window is valid (if quiet) from the very first block.
    pub fn latest(&self, out: &mut [f32]) {
        let n = out.len() as u64;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = match self.total.checked_sub(n - i as u64) {
                Some(index) => self.get(index),
                None => 0.0,
            };
        }
    }

    /// Zero the history and restart absolute positions from 0.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.write_pos = 0;
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_reads_return_pushed_samples() {
        let mut history = HistoryBuffer::new(8);
        history.push(&[1.0, 2.0, 3.0]);

        assert_eq!(history.total_samples(), 3);
        assert_eq!(history.get(0), 1.0);
        assert_eq!(history.get(1), 2.0);
        assert_eq!(history.get(2), 3.0);
    }

    #[test]
    fn unwritten_positions_are_silent() {
        let mut history = HistoryBuffer::new(8);
        history.push(&[1.0, 2.0]);

        assert_eq!(history.get(2), 0.0, "future positions must read as silence");
        assert_eq!(history.get(100), 0.0);
    }

    #[test]
    fn overwritten_positions_are_silent() {
        let mut history = HistoryBuffer::new(4);
        history.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        // Positions 0 and 1 have been overwritten by 5.0 and 6.0
        assert_eq!(history.get(0), 0.0);
        assert_eq!(history.get(1), 0.0);
        assert_eq!(history.get(2), 3.0);
        assert_eq!(history.get(5), 6.0);
    }

    #[test]
    fn wraparound_preserves_recent_window() {
        let mut history = HistoryBuffer::new(4);
        for block in 0..10 {
            let base = (block * 3) as f32;
            history.push(&[base, base + 1.0, base + 2.0]);
        }

        let total = history.total_samples();
        assert_eq!(total, 30);
        for index in total - 4..total {
            assert_eq!(history.get(index), index as f32, "position {} misread", index);
        }
    }

    #[test]
    fn latest_copies_the_tail_oldest_first() {
        let mut history = HistoryBuffer::new(16);
        history.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut window = [0.0f32; 3];
        history.latest(&mut window);

        assert_eq!(window, [3.0, 4.0, 5.0]);
    }

    #[test]
    fn latest_zero_pads_before_first_samples() {
        let mut history = HistoryBuffer::new(16);
        history.push(&[7.0, 8.0]);

        let mut window = [-1.0f32; 5];
        history.latest(&mut window);

        assert_eq!(window, [0.0, 0.0, 0.0, 7.0, 8.0]);
    }

    #[test]
    fn clear_restarts_positions() {
        let mut history = HistoryBuffer::new(8);
        history.push(&[1.0, 2.0, 3.0]);
        history.clear();

        assert_eq!(history.total_samples(), 0);
        assert_eq!(history.get(0), 0.0);

        history.push(&[9.0]);
        assert_eq!(history.get(0), 9.0);
    }

    #[test]
    fn push_larger_than_capacity_keeps_the_tail() {
        let mut history = HistoryBuffer::new(4);
        let block: Vec<f32> = (0..10).map(|i| i as f32).collect();
        history.push(&block);

        assert_eq!(history.total_samples(), 10);
        for index in 6..10u64 {
            assert_eq!(history.get(index), index as f32);
        }
        assert_eq!(history.get(5), 0.0);
    }
}
