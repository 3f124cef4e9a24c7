//! Consumer side of the scope
//!
//! [`ScopeView`] is what a renderer holds. Each frame it calls
//! [`ScopeView::refresh`], which copies the visible channels out of the shared
//! buffer under one short lock, unless hold mode is on, in which case the last
//! frame is kept as is. Drawing then works on the copy, with the lock released.
//!
//! - [`ScopeView`] - snapshot reader with hold mode and frame rate tracking
//! - [`console`] - text renderer used by the `scope-rs` binary

pub mod console;

pub use console::ConsoleRenderer;

use crate::buffer::SharedChannelBuffer;
use crate::config::{ScopeConfig, ScopeSettings};
use crate::error::{Result, ScopeError};
use std::collections::VecDeque;
use std::time::Instant;

/// Frames used for the frame rate estimate
const FPS_WINDOW: usize = 60;

/// One copy of the visible channels
#[derive(Debug, Clone)]
pub struct Frame {
    /// One window per visible channel, oldest sample first
    pub traces: Vec<Vec<f64>>,
    /// Buffer generation when the copy was taken
    pub generation: u64,
    /// When the copy was taken
    pub taken_at: Instant,
}

/// Last, min and max of one channel's window
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    pub label: String,
    pub last: f64,
    pub min: f64,
    pub max: f64,
}

/// Rolling frame rate estimate
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: VecDeque<Instant>,
}

impl FpsCounter {
    /// Record a frame at `now`
    pub fn tick(&mut self, now: Instant) {
        self.frames.push_back(now);
        if self.frames.len() > FPS_WINDOW {
            self.frames.pop_front();
        }
    }

    /// Frames per second over the recent window
    pub fn fps(&self) -> f64 {
        match (self.frames.front(), self.frames.back()) {
            (Some(first), Some(last)) if self.frames.len() > 1 => {
                let secs = last.duration_since(*first).as_secs_f64();
                if secs > 0.0 {
                    (self.frames.len() - 1) as f64 / secs
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

/// Snapshot reader for one renderer
pub struct ScopeView {
    buffer: SharedChannelBuffer,
    labels: Vec<String>,
    settings: ScopeSettings,
    /// Channels shown, by buffer index
    visible: Vec<usize>,
    hold: bool,
    frame: Frame,
    previous_generation: Option<u64>,
    fps: FpsCounter,
}

impl ScopeView {
    /// Create a view of `buffer` showing every channel
    pub fn new(buffer: SharedChannelBuffer, labels: Vec<String>, settings: ScopeSettings) -> Self {
        let visible: Vec<usize> = (0..buffer.dimension()).collect();
        let frame = Frame {
            traces: vec![vec![0.0; buffer.depth()]; visible.len()],
            generation: 0,
            taken_at: Instant::now(),
        };
        Self {
            buffer,
            labels,
            settings,
            visible,
            hold: false,
            frame,
            previous_generation: None,
            fps: FpsCounter::default(),
        }
    }

    /// View configured from a scope config
    pub fn from_config(buffer: SharedChannelBuffer, config: &ScopeConfig) -> Self {
        Self::new(buffer, config.channel_labels(), config.scope.clone())
    }

    /// Display settings
    pub fn settings(&self) -> &ScopeSettings {
        &self.settings
    }

    /// Take a new snapshot unless on hold, and count the frame
    pub fn refresh(&mut self) -> Result<&Frame> {
        if !self.hold {
            let snapshot = self.buffer.snapshot_with_generation(&self.visible)?;
            self.previous_generation = Some(self.frame.generation);
            self.frame = Frame {
                traces: snapshot.traces,
                generation: snapshot.generation,
                taken_at: Instant::now(),
            };
        }
        self.fps.tick(Instant::now());
        Ok(&self.frame)
    }

    /// Current frame without taking a new snapshot
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Toggle hold mode; returns the new state
    pub fn toggle_hold(&mut self) -> bool {
        self.hold = !self.hold;
        tracing::debug!("Hold {}", if self.hold { "on" } else { "off" });
        self.hold
    }

    /// Set hold mode
    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    /// Whether the displayed frame is frozen
    pub fn is_held(&self) -> bool {
        self.hold
    }

    /// Choose which channels are shown, in display order
    pub fn set_visible_channels(&mut self, channels: &[usize]) -> Result<()> {
        let dimension = self.buffer.dimension();
        if let Some(&channel) = channels.iter().find(|&&ch| ch >= dimension) {
            return Err(ScopeError::ChannelOutOfRange { channel, dimension });
        }
        self.visible = channels.to_vec();
        self.frame.traces = vec![vec![0.0; self.buffer.depth()]; self.visible.len()];
        Ok(())
    }

    /// Channels shown, by buffer index
    pub fn visible_channels(&self) -> &[usize] {
        &self.visible
    }

    /// True if the last two snapshots saw the same buffer generation
    pub fn is_stale(&self) -> bool {
        self.previous_generation == Some(self.frame.generation)
    }

    /// Measured frames per second
    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    /// Label of the `i`-th visible trace
    pub fn label(&self, trace: usize) -> &str {
        self.visible
            .get(trace)
            .and_then(|&ch| self.labels.get(ch))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Last/min/max for every visible trace in the current frame
    pub fn summaries(&self) -> Vec<ChannelSummary> {
        self.frame
            .traces
            .iter()
            .enumerate()
            .map(|(i, values)| ChannelSummary {
                label: self.label(i).to_string(),
                last: values.last().copied().unwrap_or(0.0),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
            .collect()
    }

    /// Pixel coordinates of the `i`-th visible trace, for a line renderer
    pub fn polyline(&self, trace: usize) -> Vec<(f32, f32)> {
        self.frame
            .traces
            .get(trace)
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .map(|(x, &y)| self.settings.project(x, y))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleVector;
    use std::time::Duration;

    fn view(depth: usize, dimension: usize) -> (ScopeView, SharedChannelBuffer) {
        let buffer = SharedChannelBuffer::new(depth, dimension).unwrap();
        let labels = (0..dimension).map(|i| format!("ch{} (V)", i)).collect();
        let view = ScopeView::new(buffer.clone(), labels, ScopeSettings::default());
        (view, buffer)
    }

    #[test]
    fn test_refresh_copies_buffer() {
        let (mut view, buffer) = view(3, 2);
        buffer.append(&SampleVector::new(vec![1.0, 2.0])).unwrap();
        let frame = view.refresh().unwrap();
        assert_eq!(frame.traces, vec![vec![0.0, 0.0, 1.0], vec![0.0, 0.0, 2.0]]);
        assert_eq!(frame.generation, 1);
    }

    #[test]
    fn test_hold_keeps_last_frame() {
        let (mut view, buffer) = view(2, 1);
        buffer.append(&SampleVector::new(vec![1.0])).unwrap();
        view.refresh().unwrap();

        assert!(view.toggle_hold());
        buffer.append(&SampleVector::new(vec![2.0])).unwrap();
        assert_eq!(view.refresh().unwrap().traces[0], vec![0.0, 1.0]);

        assert!(!view.toggle_hold());
        assert_eq!(view.refresh().unwrap().traces[0], vec![1.0, 2.0]);
    }

    #[test]
    fn test_visible_subset_and_labels() {
        let (mut view, buffer) = view(1, 3);
        buffer
            .append(&SampleVector::new(vec![1.0, 2.0, 3.0]))
            .unwrap();
        view.set_visible_channels(&[2, 0]).unwrap();
        view.refresh().unwrap();

        let summaries = view.summaries();
        assert_eq!(summaries[0].label, "ch2 (V)");
        assert_eq!(summaries[0].last, 3.0);
        assert_eq!(summaries[1].label, "ch0 (V)");
        assert!(view.set_visible_channels(&[3]).is_err());
    }

    #[test]
    fn test_staleness() {
        let (mut view, buffer) = view(2, 1);
        buffer.append(&SampleVector::new(vec![1.0])).unwrap();
        view.refresh().unwrap();
        assert!(!view.is_stale());
        view.refresh().unwrap();
        assert!(view.is_stale());
    }

    #[test]
    fn test_frame_generation_matches_traces_under_load() {
        let (mut view, buffer) = view(2, 1);
        let writer = {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for i in 1..=5_000 {
                    buffer.append(&SampleVector::new(vec![i as f64])).unwrap();
                }
            })
        };

        for _ in 0..2_000 {
            let frame = view.refresh().unwrap();
            assert_eq!(frame.traces[0][1] as u64, frame.generation);
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_summary_min_max() {
        let (mut view, buffer) = view(3, 1);
        for v in [4.0, -2.0, 1.0] {
            buffer.append(&SampleVector::new(vec![v])).unwrap();
        }
        view.refresh().unwrap();
        let summary = &view.summaries()[0];
        assert_eq!((summary.last, summary.min, summary.max), (1.0, -2.0, 4.0));
    }

    #[test]
    fn test_polyline_has_one_point_per_sample() {
        let (mut view, _buffer) = view(5, 1);
        view.refresh().unwrap();
        assert_eq!(view.polyline(0).len(), 5);
        assert!(view.polyline(1).is_empty());
    }

    #[test]
    fn test_fps_counter() {
        let mut fps = FpsCounter::default();
        assert_eq!(fps.fps(), 0.0);
        let start = Instant::now();
        for i in 0..11 {
            fps.tick(start + Duration::from_millis(100 * i));
        }
        assert!((fps.fps() - 10.0).abs() < 1e-6);
    }
}
