//! Display settings handed to the consumer
//!
//! These settings don't affect acquisition except for `x_depth`, which is the
//! buffer depth. The rest are hints for whatever renders the snapshots: the
//! plot area size and the fixed Y range.
//!
//! # Axis model
//!
//! - **X**: sample index within the window, `0..x_depth`
//! - **Y**: fixed range `y_min..y_max`, no autoscaling
//! - **Grid**: [`GRID_DIVISIONS`] divisions on both axes, each labelled

use serde::{Deserialize, Serialize};

/// Number of grid divisions on each axis
pub const GRID_DIVISIONS: usize = 10;

/// Default buffer depth in samples
pub const DEFAULT_X_DEPTH: usize = 1000;

/// Scope display settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSettings {
    /// Samples kept per channel (the buffer depth)
    #[serde(default = "default_x_depth")]
    pub x_depth: usize,

    /// Plot width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Plot height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Value at the bottom of the plot
    #[serde(default = "default_y_min")]
    pub y_min: f64,

    /// Value at the top of the plot
    #[serde(default = "default_y_max")]
    pub y_max: f64,
}

fn default_x_depth() -> usize {
    DEFAULT_X_DEPTH
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    600
}

fn default_y_min() -> f64 {
    -10.0
}

fn default_y_max() -> f64 {
    10.0
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            x_depth: DEFAULT_X_DEPTH,
            width: default_width(),
            height: default_height(),
            y_min: default_y_min(),
            y_max: default_y_max(),
        }
    }
}

/// Labels for the grid lines, top-to-bottom for Y and left-to-right for X
#[derive(Debug, Clone, PartialEq)]
pub struct GridLabels {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ScopeSettings {
    /// Visible Y span
    pub fn y_span(&self) -> f64 {
        (self.y_max - self.y_min).abs()
    }

    /// Map a sample (window index, value) to pixel coordinates.
    ///
    /// Y grows downwards; values outside `y_min..y_max` land outside the plot.
    pub fn project(&self, index: usize, value: f64) -> (f32, f32) {
        let x_scale = (self.width as f64 + 1.0) / self.x_depth.max(1) as f64;
        let y_scale = self.height as f64 / self.y_span();
        let x = index as f64 * x_scale;
        let y = self.height as f64 - (value - self.y_min) * y_scale;
        (x as f32, y as f32)
    }

    /// Grid labels for [`GRID_DIVISIONS`] divisions
    pub fn grid_labels(&self) -> GridLabels {
        let n = GRID_DIVISIONS as f64;
        let x_max = self.x_depth as f64;
        GridLabels {
            x: (0..GRID_DIVISIONS)
                .map(|i| x_max * i as f64 / n)
                .collect(),
            y: (0..GRID_DIVISIONS)
                .map(|i| self.y_max - self.y_span() * i as f64 / n)
                .collect(),
        }
    }

    /// Validation errors, empty if the settings are usable
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.x_depth == 0 {
            problems.push("scope.x_depth must be at least 1".to_string());
        }
        if self.width == 0 || self.height == 0 {
            problems.push("scope.width and scope.height must be non-zero".to_string());
        }
        // Also rejects NaN bounds
        if self.y_min.partial_cmp(&self.y_max) != Some(std::cmp::Ordering::Less) {
            problems.push(format!(
                "scope.y_min ({}) must be below scope.y_max ({})",
                self.y_min, self.y_max
            ));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ScopeSettings::default().problems().is_empty());
    }

    #[test]
    fn test_project_corners() {
        let settings = ScopeSettings {
            x_depth: 100,
            width: 99,
            height: 200,
            y_min: 0.0,
            y_max: 10.0,
        };
        assert_eq!(settings.project(0, 0.0), (0.0, 200.0));
        assert_eq!(settings.project(50, 10.0), (50.0, 0.0));
        assert_eq!(settings.project(0, 5.0).1, 100.0);
    }

    #[test]
    fn test_grid_labels() {
        let settings = ScopeSettings {
            x_depth: 1000,
            y_min: -5.0,
            y_max: 5.0,
            ..Default::default()
        };
        let labels = settings.grid_labels();
        assert_eq!(labels.x.len(), GRID_DIVISIONS);
        assert_eq!(labels.x[1], 100.0);
        assert_eq!(labels.y[0], 5.0);
        assert_eq!(labels.y[5], 0.0);
    }

    #[test]
    fn test_inverted_range_reported() {
        let settings = ScopeSettings {
            y_min: 1.0,
            y_max: 1.0,
            ..Default::default()
        };
        assert_eq!(settings.problems().len(), 1);
    }
}
