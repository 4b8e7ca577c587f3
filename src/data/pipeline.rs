use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eframe::egui::Color32;

use super::batch::{load_batch, load_required};
use super::loader::LoadError;
use super::model::{AggregateSeries, Run};
use super::series::{aggregate, smooth_aggregate, smooth_run};
use crate::color::ColorCycle;
use crate::config::{ChartConfig, SeriesConfig, SeriesSource};

// ---------------------------------------------------------------------------
// Chart – everything the renderer needs
// ---------------------------------------------------------------------------

/// One polyline on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    /// Legend entry; empty lines are left out of the legend.
    pub name: String,
    /// Index into [`Chart::groups`] the line belongs to.
    pub group: usize,
    pub points: Vec<[f64; 2]>,
    pub color: Color32,
    pub width: f32,
    pub dashed: bool,
}

/// Load report for one batch series.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub group: usize,
    pub base_dir: PathBuf,
    pub requested: usize,
    pub loaded: usize,
    pub missing: Vec<PathBuf>,
    /// Points in the average line, when one was drawn.
    pub average_len: Option<usize>,
}

/// A fully loaded chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_limits: Option<[f64; 2]>,
    pub y_limits: Option<[f64; 2]>,
    /// Display name per configured series (plus interactive overlays).
    pub groups: Vec<String>,
    pub lines: Vec<ChartLine>,
    pub batches: Vec<BatchSummary>,
}

impl Chart {
    fn empty(config: &ChartConfig) -> Self {
        Chart {
            title: config.title.clone(),
            x_label: config.x_label.clone(),
            y_label: config.y_label.clone(),
            x_limits: config.x_limits,
            y_limits: config.y_limits,
            groups: Vec::new(),
            lines: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Load a single file and add it as its own group. Used for files opened
    /// from the viewer; nothing is added when loading fails.
    pub fn add_overlay(&mut self, path: &Path, color: Color32) -> Result<(), LoadError> {
        let run = load_required(path)?;
        let group = self.groups.len();
        let name = run.display_name();
        self.groups.push(name.clone());
        self.lines.push(ChartLine {
            name,
            group,
            points: run_points(&run),
            color,
            width: 1.5,
            dashed: false,
        });
        Ok(())
    }

    /// Total number of runs whose files were absent.
    pub fn missing_count(&self) -> usize {
        self.batches.iter().map(|b| b.missing.len()).sum()
    }

    /// Starting view as `([x_min, y_min], [x_max, y_max])`, or `None` when no
    /// axis is limited and the plot may fit itself. An axis without limits is
    /// fitted to the finite points of the visible lines.
    pub fn initial_bounds(
        &self,
        visible: impl Fn(usize) -> bool,
    ) -> Option<([f64; 2], [f64; 2])> {
        if self.x_limits.is_none() && self.y_limits.is_none() {
            return None;
        }

        let points = || {
            self.lines
                .iter()
                .filter(|l| visible(l.group))
                .flat_map(|l| l.points.iter())
        };
        let [x_min, x_max] = self
            .x_limits
            .unwrap_or_else(|| fitted_range(points().map(|p| p[0])));
        let [y_min, y_max] = self
            .y_limits
            .unwrap_or_else(|| fitted_range(points().map(|p| p[1])));

        Some(([x_min, y_min], [x_max, y_max]))
    }
}

/// Fraction of the data span added on each side of a fitted axis.
const FIT_MARGIN: f64 = 0.05;

/// `[min, max]` of the finite values plus a margin; `[0, 1]` without data.
fn fitted_range(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return [0.0, 1.0];
    }
    let pad = if max > min {
        (max - min) * FIT_MARGIN
    } else {
        0.5
    };
    [min - pad, max + pad]
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Load every series of `config`, in order.
///
/// Single files are required: a missing one is an error. Batch members that
/// are missing are skipped and listed in the batch's [`BatchSummary`].
pub fn build_chart(config: &ChartConfig) -> Result<Chart> {
    config.validate()?;

    let mut chart = Chart::empty(config);
    let mut colors = ColorCycle::new(auto_color_count(config));

    for (position, series) in config.series.iter().enumerate() {
        let name = series.describe(position);
        match series.source().context("series has no source")? {
            SeriesSource::File(path) => {
                let run = load_required(path).with_context(|| format!("{name}: required file"))?;
                add_file_series(&mut chart, series, run, &mut colors);
            }
            SeriesSource::Batch(spec) => {
                let runs = load_batch(spec).with_context(|| format!("{name}: loading batch"))?;
                let average = match &series.average {
                    Some(_) => Some(
                        aggregate(&runs).with_context(|| format!("{name}: averaging runs"))?,
                    ),
                    None => None,
                };

                let group = chart.groups.len();
                chart.groups.push(
                    series
                        .label
                        .clone()
                        .unwrap_or_else(|| spec.base_dir.display().to_string()),
                );

                let member_color = colors.pick(series.color.as_deref());
                for (k, run) in runs.runs.iter().enumerate() {
                    let run = smoothed(run, series.smooth);
                    chart.lines.push(ChartLine {
                        // Only the first member carries the legend entry.
                        name: match k {
                            0 => series.label.clone().unwrap_or_default(),
                            _ => String::new(),
                        },
                        group,
                        points: run_points(&run),
                        color: member_color,
                        width: series.width,
                        dashed: series.dashed,
                    });
                }

                if let (Some(style), Some(agg)) = (&series.average, &average) {
                    let agg = match series.smooth {
                        Some(w) => smooth_aggregate(agg, w),
                        None => agg.clone(),
                    };
                    chart.lines.push(ChartLine {
                        name: style
                            .label
                            .clone()
                            .unwrap_or_else(|| format!("Average ({} runs)", agg.n_runs)),
                        group,
                        points: aggregate_points(&agg),
                        color: colors.pick(style.color.as_deref()),
                        width: style.width,
                        dashed: style.dashed,
                    });
                }

                chart.batches.push(BatchSummary {
                    group,
                    base_dir: spec.base_dir.clone(),
                    requested: spec.indices().count(),
                    loaded: runs.len(),
                    missing: runs.missing,
                    average_len: average.map(|a| a.len()),
                });
            }
        }
    }

    Ok(chart)
}

fn add_file_series(chart: &mut Chart, series: &SeriesConfig, run: Run, colors: &mut ColorCycle) {
    let run = smoothed(&run, series.smooth);
    let group = chart.groups.len();
    let name = series.label.clone().unwrap_or_else(|| run.display_name());
    chart.groups.push(name.clone());
    chart.lines.push(ChartLine {
        name,
        group,
        points: run_points(&run),
        color: colors.pick(series.color.as_deref()),
        width: series.width,
        dashed: series.dashed,
    });
}

/// Lines that may need a palette colour: one per series, one more per average.
fn auto_color_count(config: &ChartConfig) -> usize {
    config
        .series
        .iter()
        .map(|s| 1 + usize::from(s.average.is_some()))
        .sum()
}

fn smoothed(run: &Run, window: Option<usize>) -> Run {
    match window {
        Some(w) => smooth_run(run, w),
        None => run.clone(),
    }
}

fn run_points(run: &Run) -> Vec<[f64; 2]> {
    run.time
        .iter()
        .zip(&run.unoccupied)
        .map(|(&t, &v)| [t, v])
        .collect()
}

fn aggregate_points(series: &AggregateSeries) -> Vec<[f64; 2]> {
    series
        .time
        .iter()
        .zip(&series.mean)
        .map(|(&t, &v)| [t, v])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AverageConfig;
    use crate::data::batch::BatchSpec;

    fn write_csv(path: &Path, values: &[f64]) {
        let mut body = String::from("time,n_unoccupied\n");
        for (t, v) in values.iter().enumerate() {
            body.push_str(&format!("{t},{v}\n"));
        }
        std::fs::write(path, body).unwrap();
    }

    fn batch_series(dir: &Path, last: u32) -> SeriesConfig {
        SeriesConfig {
            label: Some("all runs".into()),
            color: Some("g".into()),
            average: Some(AverageConfig {
                label: Some("Average".into()),
                color: Some("blue".into()),
                ..AverageConfig::default()
            }),
            ..SeriesConfig::batch(BatchSpec {
                base_dir: dir.to_path_buf(),
                pattern: "run_{}.csv".into(),
                first: 1,
                last,
                primary: false,
            })
        }
    }

    #[test]
    fn batch_with_average_and_reference() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(&dir.path().join("run_1.csv"), &[10.0, 20.0]);
        write_csv(&dir.path().join("run_2.csv"), &[20.0, 30.0]);
        write_csv(&dir.path().join("run_4.csv"), &[30.0, 40.0]);
        let reference = dir.path().join("reference.csv");
        write_csv(&reference, &[5.0, 5.0]);

        let config = ChartConfig {
            x_limits: Some([0.0, 1.0]),
            series: vec![
                batch_series(dir.path(), 4),
                SeriesConfig::file(&reference, None),
            ],
            ..ChartConfig::default()
        };
        let chart = build_chart(&config).unwrap();

        assert_eq!(chart.groups, vec!["all runs".to_string(), "reference".to_string()]);
        // 3 members + average + reference
        assert_eq!(chart.lines.len(), 5);
        let named: Vec<&str> = chart
            .lines
            .iter()
            .map(|l| l.name.as_str())
            .filter(|n| !n.is_empty())
            .collect();
        assert_eq!(named, vec!["all runs", "Average", "reference"]);

        let average = &chart.lines[3];
        assert_eq!(average.points, vec![[0.0, 20.0], [1.0, 30.0]]);
        assert_eq!(average.group, 0);

        assert_eq!(chart.batches.len(), 1);
        let summary = &chart.batches[0];
        assert_eq!(summary.requested, 4);
        assert_eq!(summary.loaded, 3);
        assert_eq!(summary.missing, vec![dir.path().join("run_3.csv")]);
        assert_eq!(summary.average_len, Some(2));
        assert_eq!(chart.missing_count(), 1);
        assert_eq!(chart.x_limits, Some([0.0, 1.0]));
    }

    #[test]
    fn missing_required_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChartConfig {
            series: vec![SeriesConfig::file(dir.path().join("absent.csv"), None)],
            ..ChartConfig::default()
        };
        let err = build_chart(&config).unwrap_err();
        let load = err.downcast_ref::<LoadError>().unwrap();
        assert!(load.is_not_found());
    }

    #[test]
    fn ragged_batch_cannot_be_averaged() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(&dir.path().join("run_1.csv"), &[1.0, 2.0]);
        write_csv(&dir.path().join("run_2.csv"), &[1.0]);
        let config = ChartConfig {
            series: vec![batch_series(dir.path(), 2)],
            ..ChartConfig::default()
        };
        let msg = format!("{:#}", build_chart(&config).unwrap_err());
        assert!(msg.contains("averaging runs"), "{msg}");
    }

    #[test]
    fn smoothing_applies_to_members_and_average() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(&dir.path().join("run_1.csv"), &[1.0, 3.0, 5.0]);
        write_csv(&dir.path().join("run_2.csv"), &[3.0, 5.0, 7.0]);
        let mut series = batch_series(dir.path(), 2);
        series.smooth = Some(2);
        let chart = build_chart(&ChartConfig {
            series: vec![series],
            ..ChartConfig::default()
        })
        .unwrap();

        assert_eq!(chart.lines[0].points, vec![[1.0, 2.0], [2.0, 4.0]]);
        assert_eq!(chart.lines[2].points, vec![[1.0, 3.0], [2.0, 5.0]]);
    }

    fn line(group: usize, points: Vec<[f64; 2]>) -> ChartLine {
        ChartLine {
            name: String::new(),
            group,
            points,
            color: Color32::RED,
            width: 1.0,
            dashed: false,
        }
    }

    fn chart_with(lines: Vec<ChartLine>) -> Chart {
        Chart {
            lines,
            ..Chart::empty(&ChartConfig::default())
        }
    }

    #[test]
    fn no_limits_leaves_bounds_to_the_plot() {
        let chart = chart_with(vec![line(0, vec![[0.0, 1.0]])]);
        assert_eq!(chart.initial_bounds(|_| true), None);
    }

    #[test]
    fn both_limits_are_used_as_given() {
        let mut chart = chart_with(vec![line(0, vec![[0.0, 1.0]])]);
        chart.x_limits = Some([30.0, 70.0]);
        chart.y_limits = Some([700.0, 2500.0]);
        assert_eq!(
            chart.initial_bounds(|_| true),
            Some(([30.0, 700.0], [70.0, 2500.0]))
        );
    }

    #[test]
    fn unlimited_axis_is_fitted_to_visible_data() {
        let mut chart = chart_with(vec![
            line(0, vec![[0.0, 100.0], [1.0, f64::NAN], [2.0, 300.0]]),
            line(1, vec![[0.0, -5000.0]]),
        ]);
        chart.x_limits = Some([30.0, 70.0]);

        let (min, max) = chart.initial_bounds(|g| g == 0).unwrap();
        assert_eq!(min, [30.0, 90.0]);
        assert_eq!(max, [70.0, 310.0]);

        chart.x_limits = None;
        chart.y_limits = Some([0.0, 10.0]);
        let (min, max) = chart.initial_bounds(|_| true).unwrap();
        assert_eq!(min, [-0.1, 0.0]);
        assert_eq!(max, [2.1, 10.0]);
    }

    #[test]
    fn fitted_axis_without_data_falls_back() {
        let mut chart = chart_with(vec![line(0, vec![[5.0, 5.0]])]);
        chart.y_limits = Some([0.0, 10.0]);
        assert_eq!(
            chart.initial_bounds(|_| false),
            Some(([0.0, 0.0], [1.0, 10.0]))
        );
        assert_eq!(
            chart.initial_bounds(|_| true),
            Some(([4.5, 0.0], [5.5, 10.0]))
        );
    }

    #[test]
    fn overlay_adds_a_group() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        write_csv(&a, &[1.0]);
        write_csv(&b, &[2.0]);
        let mut chart = build_chart(&ChartConfig {
            series: vec![SeriesConfig::file(&a, Some("A".into()))],
            ..ChartConfig::default()
        })
        .unwrap();

        chart.add_overlay(&b, Color32::RED).unwrap();
        assert_eq!(chart.groups, vec!["A".to_string(), "b".to_string()]);
        assert_eq!(chart.lines[1].group, 1);

        assert!(chart
            .add_overlay(&dir.path().join("c.csv"), Color32::RED)
            .unwrap_err()
            .is_not_found());
        assert_eq!(chart.groups.len(), 2);
    }
}
