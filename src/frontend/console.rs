//! Text rendering of scope frames
//!
//! Renders one line per visible channel: its label, last/min/max, and a
//! sparkline of the window scaled to the configured Y range.

use super::ScopeView;
use std::io::Write;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renders [`ScopeView`] frames as text
#[derive(Debug, Clone)]
pub struct ConsoleRenderer {
    /// Sparkline width in characters
    pub spark_width: usize,
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self { spark_width: 48 }
    }
}

impl ConsoleRenderer {
    /// Create a renderer with the given sparkline width
    pub fn new(spark_width: usize) -> Self {
        Self {
            spark_width: spark_width.max(1),
        }
    }

    /// Sparkline of `values`, downsampled to `spark_width`, clamped to `y_min..y_max`
    pub fn sparkline(&self, values: &[f64], y_min: f64, y_max: f64) -> String {
        if values.is_empty() {
            return String::new();
        }
        let span = (y_max - y_min).abs().max(f64::EPSILON);
        let width = self.spark_width.min(values.len());
        let top = (SPARK_LEVELS.len() - 1) as f64;

        (0..width)
            .map(|i| {
                // Last column always shows the newest sample
                let idx = if width == 1 {
                    values.len() - 1
                } else {
                    i * (values.len() - 1) / (width - 1)
                };
                let v = values[idx];
                let level = if v.is_nan() {
                    0.0
                } else {
                    ((v - y_min) / span * top).clamp(0.0, top)
                };
                SPARK_LEVELS[level.round() as usize]
            })
            .collect()
    }

    /// Write the view's current frame
    pub fn render<W: Write>(&self, view: &ScopeView, out: &mut W) -> std::io::Result<()> {
        let frame = view.frame();
        let settings = view.settings();

        writeln!(
            out,
            "{:>5.1} fps | samples {}{}{}",
            view.fps(),
            frame.generation,
            if view.is_held() { " | HOLD" } else { "" },
            if view.is_stale() && !view.is_held() {
                " | no new data"
            } else {
                ""
            },
        )?;

        for (i, summary) in view.summaries().iter().enumerate() {
            let spark = self.sparkline(&frame.traces[i], settings.y_min, settings.y_max);
            writeln!(
                out,
                "{:<20} last {:>10.3}  min {:>10.3}  max {:>10.3}  {}",
                summary.label, summary.last, summary.min, summary.max, spark
            )?;
        }
        Ok(())
    }
}
