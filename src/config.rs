//! Chart configuration.
//!
//! A chart is described by a `runview.toml` file (or assembled from command
//! line flags, see [`crate::cli`]): titles, optional axis limits and an
//! ordered list of series. Each series is either one required file or a
//! batch of runs that may also be averaged.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::parse_color;
use crate::data::batch::{BatchSpec, INDEX_PLACEHOLDER};

/// File name written by `--init-config`.
pub const DEFAULT_CONFIG_FILE: &str = "runview.toml";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("nothing to plot: the chart has no series")]
    NoSeries,

    #[error("{axis} limits must satisfy min < max (got {min}..{max})")]
    BadLimits { axis: &'static str, min: f64, max: f64 },

    #[error("{series}: needs exactly one of `path` or `batch`")]
    Source { series: String },

    #[error("{series}: smoothing window must be at least 1")]
    ZeroWindow { series: String },

    #[error("{series}: pattern '{pattern}' has no '{{}}' placeholder for the run index")]
    NoPlaceholder { series: String, pattern: String },

    #[error("{series}: run range {first}..={last} is empty")]
    EmptyRange { series: String, first: u32, last: u32 },

    #[error("{series}: unknown color '{color}'")]
    UnknownColor { series: String, color: String },
}

// ---------------------------------------------------------------------------
// ChartConfig
// ---------------------------------------------------------------------------

/// Root configuration: one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_x_label")]
    pub x_label: String,

    #[serde(default = "default_y_label")]
    pub y_label: String,

    /// Initial x range `[min, max]`.
    #[serde(default)]
    pub x_limits: Option<[f64; 2]>,

    /// Initial y range `[min, max]`.
    #[serde(default)]
    pub y_limits: Option<[f64; 2]>,

    #[serde(default)]
    pub series: Vec<SeriesConfig>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            x_label: default_x_label(),
            y_label: default_y_label(),
            x_limits: None,
            y_limits: None,
            series: Vec::new(),
        }
    }
}

fn default_title() -> String {
    "Number of Unoccupied Buildings Over Time".to_string()
}

fn default_x_label() -> String {
    "Time (Years)".to_string()
}

fn default_y_label() -> String {
    "Number of Unoccupied Buildings".to_string()
}

// ---------------------------------------------------------------------------
// SeriesConfig
// ---------------------------------------------------------------------------

/// One entry of `[[series]]`.
///
/// For a batch, `label`/`color`/`width`/`dashed` style the member runs (the
/// label is shown once in the legend) and `[series.average]` adds the mean
/// line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    #[serde(default)]
    pub label: Option<String>,

    /// Single required file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Batch of runs; missing members are skipped.
    #[serde(default)]
    pub batch: Option<BatchSpec>,

    /// Matplotlib-style name (`b`, `purple`) or `#rrggbb`. Palette if absent.
    #[serde(default)]
    pub color: Option<String>,

    #[serde(default = "default_width")]
    pub width: f32,

    #[serde(default)]
    pub dashed: bool,

    /// Moving-average window applied before display.
    #[serde(default)]
    pub smooth: Option<usize>,

    #[serde(default)]
    pub average: Option<AverageConfig>,
}

/// Styling of a batch's mean line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageConfig {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default = "default_average_width")]
    pub width: f32,

    #[serde(default)]
    pub dashed: bool,
}

impl Default for AverageConfig {
    fn default() -> Self {
        Self {
            label: None,
            color: None,
            width: default_average_width(),
            dashed: false,
        }
    }
}

fn default_width() -> f32 {
    1.5
}

fn default_average_width() -> f32 {
    2.0
}

/// Where a series' data comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesSource<'a> {
    File(&'a Path),
    Batch(&'a BatchSpec),
}

impl SeriesConfig {
    /// A single-file series.
    pub fn file(path: impl Into<PathBuf>, label: Option<String>) -> Self {
        Self {
            label,
            path: Some(path.into()),
            batch: None,
            color: None,
            width: default_width(),
            dashed: false,
            smooth: None,
            average: None,
        }
    }

    /// A batch series with an average line.
    pub fn batch(spec: BatchSpec) -> Self {
        Self {
            label: None,
            path: None,
            batch: Some(spec),
            color: None,
            width: 0.5,
            dashed: false,
            smooth: None,
            average: Some(AverageConfig::default()),
        }
    }

    pub fn source(&self) -> Option<SeriesSource<'_>> {
        match (&self.path, &self.batch) {
            (Some(p), None) => Some(SeriesSource::File(p)),
            (None, Some(b)) => Some(SeriesSource::Batch(b)),
            _ => None,
        }
    }

    /// Name used in error messages.
    pub fn describe(&self, position: usize) -> String {
        match &self.label {
            Some(label) => format!("series #{} ({label})", position + 1),
            None => format!("series #{}", position + 1),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl ChartConfig {
    /// Load and validate a chart file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ChartConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Check everything that can be checked without touching the data files.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.series.is_empty() {
            return Err(ConfigError::NoSeries);
        }
        check_limits("x", self.x_limits)?;
        check_limits("y", self.y_limits)?;

        for (i, s) in self.series.iter().enumerate() {
            let name = || s.describe(i);

            match s.source() {
                None => return Err(ConfigError::Source { series: name() }),
                Some(SeriesSource::Batch(b)) => {
                    if !b.pattern.contains(INDEX_PLACEHOLDER) {
                        return Err(ConfigError::NoPlaceholder {
                            series: name(),
                            pattern: b.pattern.clone(),
                        });
                    }
                    if b.first > b.last {
                        return Err(ConfigError::EmptyRange {
                            series: name(),
                            first: b.first,
                            last: b.last,
                        });
                    }
                }
                Some(SeriesSource::File(_)) => {}
            }

            if s.smooth == Some(0) {
                return Err(ConfigError::ZeroWindow { series: name() });
            }

            let colors = s
                .color
                .iter()
                .chain(s.average.iter().flat_map(|a| a.color.iter()));
            for color in colors {
                if parse_color(color).is_none() {
                    return Err(ConfigError::UnknownColor {
                        series: name(),
                        color: color.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Commented example chart written by `--init-config`.
    pub fn default_toml() -> String {
        r##"# runview chart configuration
#
# Paths are resolved relative to the current directory.

title = "Number of Unoccupied Buildings Over Time"
x_label = "Time (Years)"
y_label = "Number of Unoccupied Buildings"

# Initial zoom; remove to fit all data.
x_limits = [30.0, 70.0]
y_limits = [700.0, 2500.0]

# A batch of runs: base_dir/pattern with {} replaced by first..=last.
# Missing runs are reported and skipped; with primary = true the first
# run is required.
[[series]]
label = "Data from all 100 runs"
color = "g"
width = 0.2

[series.batch]
base_dir = "model-runs/status-quo/output"
pattern = "df_model_{}_scInt_ne0.5.csv"
first = 1
last = 100
primary = true

[series.average]
label = "Average (status-quo)"
color = "blue"
width = 2.0

# A single file; a missing file is fatal.
[[series]]
label = "Previous Data"
path = "model-runs/previous/df_model_1_scInt_ne0.5_RLModel.csv"
color = "y"
width = 1.0
# smooth = 10
"##
        .to_string()
    }
}

fn check_limits(axis: &'static str, limits: Option<[f64; 2]>) -> Result<(), ConfigError> {
    match limits {
        Some([min, max]) if !(min < max) => Err(ConfigError::BadLimits { axis, min, max }),
        _ => Ok(()),
    }
}
