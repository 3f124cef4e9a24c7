//! Channel buffer: the rolling window shared by acquisition and display
//!
//! [`ChannelBuffer`] holds the `depth` most recent samples of `dimension` channels.
//! It always contains exactly `depth` rows, zero-initialised, and behaves as a
//! fixed-capacity FIFO: every append discards the oldest row.
//!
//! Rows are stored in a circular array with a head index, so appends cost
//! O(dimension) instead of shifting the whole window. Reads always come out
//! oldest first.
//!
//! [`SharedChannelBuffer`] owns the one mutex protecting the buffer. Both the
//! acquisition thread (append) and the consumer (snapshot) go through it, and
//! neither holds the guard for longer than an in-memory copy.

use crate::error::{Result, ScopeError};
use crate::types::SampleVector;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Fixed-depth, fixed-dimension rolling window of samples
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    /// Row-major storage, `depth * dimension` values
    data: Vec<f64>,
    depth: usize,
    dimension: usize,
    /// Index of the oldest row; the next append overwrites it
    head: usize,
    /// Successful appends since creation
    generation: u64,
}

impl ChannelBuffer {
    /// Create a zero-filled buffer
    pub fn new(depth: usize, dimension: usize) -> Result<Self> {
        if depth == 0 || dimension == 0 {
            return Err(ScopeError::Config(format!(
                "Buffer shape must be non-zero (depth {}, dimension {})",
                depth, dimension
            )));
        }

        Ok(Self {
            data: vec![0.0; depth * dimension],
            depth,
            dimension,
            head: 0,
            generation: 0,
        })
    }

    /// Number of rows kept
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of channels per row
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append a sample as the newest row, discarding the oldest one.
    ///
    /// The sample must have exactly `dimension` values.
    pub fn append(&mut self, sample: &[f64]) -> Result<()> {
        if sample.len() != self.dimension {
            return Err(ScopeError::Parse(crate::error::ParseError::ArityMismatch {
                expected: self.dimension,
                found: sample.len(),
            }));
        }

        let start = self.head * self.dimension;
        self.data[start..start + self.dimension].copy_from_slice(sample);
        self.head = (self.head + 1) % self.depth;
        self.generation += 1;
        Ok(())
    }

    /// Number of successful appends since creation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Copy one channel's window, oldest first
    pub fn column(&self, channel: usize) -> Result<Vec<f64>> {
        self.check_channel(channel)?;
        Ok(self
            .row_order()
            .map(|row| self.data[row * self.dimension + channel])
            .collect())
    }

    /// Copy every channel's window, oldest first
    pub fn columns(&self) -> Vec<Vec<f64>> {
        let mut columns = vec![Vec::with_capacity(self.depth); self.dimension];
        for row in self.row_order() {
            let start = row * self.dimension;
            for (column, value) in columns.iter_mut().zip(&self.data[start..start + self.dimension]) {
                column.push(*value);
            }
        }
        columns
    }

    /// Copy every row, oldest first
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.row_order()
            .map(|row| {
                let start = row * self.dimension;
                self.data[start..start + self.dimension].to_vec()
            })
            .collect()
    }

    /// The most recently appended row
    pub fn latest(&self) -> &[f64] {
        let row = (self.head + self.depth - 1) % self.depth;
        let start = row * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn row_order(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.depth).map(move |i| (self.head + i) % self.depth)
    }

    fn check_channel(&self, channel: usize) -> Result<()> {
        if channel >= self.dimension {
            return Err(ScopeError::ChannelOutOfRange {
                channel,
                dimension: self.dimension,
            });
        }
        Ok(())
    }
}

/// Channel copies taken together with the generation they reflect
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub generation: u64,
    pub traces: Vec<Vec<f64>>,
}

/// Thread-safe handle to a [`ChannelBuffer`]
///
/// Cloning the handle shares the same buffer.
#[derive(Debug, Clone)]
pub struct SharedChannelBuffer {
    inner: Arc<Mutex<ChannelBuffer>>,
    depth: usize,
    dimension: usize,
}

impl SharedChannelBuffer {
    /// Create a zero-filled shared buffer
    pub fn new(depth: usize, dimension: usize) -> Result<Self> {
        let buffer = ChannelBuffer::new(depth, dimension)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(buffer)),
            depth,
            dimension,
        })
    }

    /// Number of rows kept
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of channels per row
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of samples appended since creation.
    ///
    /// A consumer can compare generations between frames to tell whether
    /// acquisition is still feeding the buffer.
    pub fn generation(&self) -> u64 {
        self.lock().generation()
    }

    // A panic while holding the guard can only happen outside the copy/write
    // itself, so the data is still consistent and the poison flag is ignored.
    fn lock(&self) -> MutexGuard<'_, ChannelBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a sample under the lock
    pub fn append(&self, sample: &SampleVector) -> Result<()> {
        self.lock().append(sample.values())
    }

    /// Copy one channel's window, oldest first
    pub fn snapshot(&self, channel: usize) -> Result<Vec<f64>> {
        self.lock().column(channel)
    }

    /// Copy several channels under a single lock acquisition.
    ///
    /// All returned columns come from the same buffer state.
    pub fn snapshot_channels(&self, channels: &[usize]) -> Result<Vec<Vec<f64>>> {
        let buffer = self.lock();
        channels.iter().map(|&ch| buffer.column(ch)).collect()
    }

    /// Like [`snapshot_channels`](Self::snapshot_channels), also reporting the
    /// generation of the copied state
    pub fn snapshot_with_generation(&self, channels: &[usize]) -> Result<ChannelSnapshot> {
        let buffer = self.lock();
        let traces = channels
            .iter()
            .map(|&ch| buffer.column(ch))
            .collect::<Result<Vec<_>>>()?;
        Ok(ChannelSnapshot {
            generation: buffer.generation(),
            traces,
        })
    }

    /// Copy every channel under a single lock acquisition
    pub fn snapshot_all(&self) -> Vec<Vec<f64>> {
        self.lock().columns()
    }

    /// Copy every row, oldest first
    pub fn snapshot_rows(&self) -> Vec<Vec<f64>> {
        self.lock().rows()
    }

    /// Copy the most recent row
    pub fn latest(&self) -> Vec<f64> {
        self.lock().latest().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(values: &[f64]) -> SampleVector {
        SampleVector::new(values.to_vec())
    }

    #[test]
    fn test_initial_state_is_zeroed() {
        let buffer = ChannelBuffer::new(4, 3).unwrap();
        for ch in 0..3 {
            assert_eq!(buffer.column(ch).unwrap(), vec![0.0; 4]);
        }
        assert_eq!(buffer.rows().len(), 4);
    }

    #[test]
    fn test_three_appends_fill_depth_three() {
        let shared = SharedChannelBuffer::new(3, 2).unwrap();
        shared.append(&sample(&[1.0, 2.0])).unwrap();
        shared.append(&sample(&[3.0, 4.0])).unwrap();
        shared.append(&sample(&[5.0, 6.0])).unwrap();

        assert_eq!(shared.snapshot(0).unwrap(), vec![1.0, 3.0, 5.0]);
        assert_eq!(shared.snapshot(1).unwrap(), vec![2.0, 4.0, 6.0]);
        assert_eq!(shared.generation(), 3);
    }

    #[test]
    fn test_partial_fill_is_zero_padded_at_front() {
        let mut buffer = ChannelBuffer::new(4, 1).unwrap();
        buffer.append(&[7.0]).unwrap();
        buffer.append(&[8.0]).unwrap();
        assert_eq!(buffer.column(0).unwrap(), vec![0.0, 0.0, 7.0, 8.0]);
        assert_eq!(buffer.latest(), &[8.0]);
    }

    #[test]
    fn test_wraparound_discards_oldest() {
        let mut buffer = ChannelBuffer::new(2, 1).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buffer.append(&[v]).unwrap();
        }
        assert_eq!(buffer.column(0).unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_wrong_width_sample_leaves_buffer_untouched() {
        let shared = SharedChannelBuffer::new(2, 2).unwrap();
        shared.append(&sample(&[1.0, 2.0])).unwrap();
        assert!(shared.append(&sample(&[9.0])).is_err());
        assert_eq!(shared.snapshot_rows(), vec![vec![0.0, 0.0], vec![1.0, 2.0]]);
        assert_eq!(shared.generation(), 1);
    }

    #[test]
    fn test_channel_out_of_range() {
        let shared = SharedChannelBuffer::new(2, 2).unwrap();
        assert!(matches!(
            shared.snapshot(2),
            Err(ScopeError::ChannelOutOfRange {
                channel: 2,
                dimension: 2
            })
        ));
        assert!(shared.snapshot_channels(&[0, 5]).is_err());
    }

    #[test]
    fn test_snapshot_channels_subset() {
        let shared = SharedChannelBuffer::new(2, 3).unwrap();
        shared.append(&sample(&[1.0, 2.0, 3.0])).unwrap();
        let cols = shared.snapshot_channels(&[2, 0]).unwrap();
        assert_eq!(cols, vec![vec![0.0, 3.0], vec![0.0, 1.0]]);
        assert_eq!(
            shared.snapshot_all(),
            vec![vec![0.0, 1.0], vec![0.0, 2.0], vec![0.0, 3.0]]
        );
        assert_eq!(shared.latest(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_failed_append_keeps_generation() {
        let mut buffer = ChannelBuffer::new(2, 2).unwrap();
        buffer.append(&[1.0, 2.0]).unwrap();
        assert!(buffer.append(&[1.0]).is_err());
        assert_eq!(buffer.generation(), 1);
    }

    #[test]
    fn test_generation_matches_copied_state() {
        // Channel 0 carries the append count, so each copy must agree with its generation
        let shared = SharedChannelBuffer::new(4, 2).unwrap();
        let writer = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for i in 1..=5_000 {
                    shared.append(&SampleVector::new(vec![i as f64, 0.0])).unwrap();
                }
            })
        };

        for _ in 0..2_000 {
            let snapshot = shared.snapshot_with_generation(&[0]).unwrap();
            let newest = *snapshot.traces[0].last().unwrap();
            assert_eq!(newest as u64, snapshot.generation);
        }

        writer.join().unwrap();
        let snapshot = shared.snapshot_with_generation(&[0, 1]).unwrap();
        assert_eq!(snapshot.generation, 5_000);
        assert_eq!(snapshot.traces[1], vec![0.0; 4]);
    }

    #[test]
    fn test_zero_shape_rejected() {
        assert!(ChannelBuffer::new(0, 1).is_err());
        assert!(ChannelBuffer::new(1, 0).is_err());
    }

    #[test]
    fn test_concurrent_appends_never_tear_rows() {
        // Every row written has all channels equal; a torn row would mix values.
        let shared = SharedChannelBuffer::new(64, 8).unwrap();
        let writer = {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for i in 0..5_000 {
                    shared.append(&SampleVector::new(vec![i as f64; 8])).unwrap();
                }
            })
        };

        for _ in 0..500 {
            for row in shared.snapshot_rows() {
                assert!(row.iter().all(|v| *v == row[0]), "torn row: {:?}", row);
            }
        }

        writer.join().unwrap();
        assert_eq!(shared.generation(), 5_000);
        assert_eq!(shared.latest(), vec![4_999.0; 8]);
    }

    proptest! {
        #[test]
        fn test_fifo_keeps_last_depth_samples(
            depth in 1usize..32,
            values in prop::collection::vec(-1000.0f64..1000.0, 0..100)
        ) {
            let mut buffer = ChannelBuffer::new(depth, 1).unwrap();
            for v in &values {
                buffer.append(&[*v]).unwrap();
            }

            let column = buffer.column(0).unwrap();
            prop_assert_eq!(column.len(), depth);

            let mut expected = vec![0.0; depth.saturating_sub(values.len())];
            let keep = values.len().min(depth);
            expected.extend_from_slice(&values[values.len() - keep..]);
            prop_assert_eq!(column, expected);
        }

        #[test]
        fn test_row_count_is_always_depth(
            depth in 1usize..16,
            dimension in 1usize..6,
            appends in 0usize..50
        ) {
            let mut buffer = ChannelBuffer::new(depth, dimension).unwrap();
            for i in 0..appends {
                buffer.append(&vec![i as f64; dimension]).unwrap();
            }
            let rows = buffer.rows();
            prop_assert_eq!(rows.len(), depth);
            prop_assert!(rows.iter().all(|r| r.len() == dimension));
        }
    }
}
