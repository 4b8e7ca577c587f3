//! Command-line interface argument parsing.
//!
//! The flags either point at a chart file (`--config`) or describe a chart
//! directly: files to compare, one batch of runs to average, and a
//! reference run to overlay.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::config::{ChartConfig, SeriesConfig};
use crate::data::batch::BatchSpec;

/// runview - compare and average simulation runs
///
/// Plots the `n_unoccupied` column of simulation output files against
/// `time`. Missing batch members are reported and skipped; any other
/// missing file is an error.
///
/// Examples:
///   runview status-quo.csv status-quo-2.csv --smooth
///   runview --base-dir out --pattern 'df_model_{}_scInt_ne0.5.csv' --runs 1..=100
///   runview --config runview.toml --check
///   runview --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run files to compare (each one is required)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Chart configuration file (TOML)
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["files", "base_dir"])]
    pub config: Option<PathBuf>,

    /// Directory holding a batch of run files
    #[arg(long, value_name = "DIR", requires = "pattern")]
    pub base_dir: Option<PathBuf>,

    /// Batch file name pattern; `{}` is replaced by the run index
    #[arg(long, value_name = "PATTERN", requires = "base_dir")]
    pub pattern: Option<String>,

    /// Batch run indices: `1..=100`, `1..101`, `1-100` or `7`
    #[arg(long, value_name = "RANGE", default_value = "1..=100", value_parser = parse_run_range)]
    pub runs: (u32, u32),

    /// Treat a missing first batch run as fatal
    #[arg(long, requires = "base_dir")]
    pub primary: bool,

    /// Reference run drawn on top of everything else (required)
    #[arg(long, value_name = "FILE")]
    pub reference: Option<PathBuf>,

    /// Moving-average window for every series given on the command line
    #[arg(
        long,
        value_name = "N",
        num_args = 0..=1,
        default_missing_value = "10",
        value_parser = parse_window
    )]
    pub smooth: Option<usize>,

    /// Chart title
    #[arg(long)]
    pub title: Option<String>,

    /// Initial x range, e.g. `30,70`
    #[arg(long, value_name = "MIN,MAX", value_parser = parse_limits, allow_hyphen_values = true)]
    pub xlim: Option<[f64; 2]>,

    /// Initial y range, e.g. `700,2500`
    #[arg(long, value_name = "MIN,MAX", value_parser = parse_limits, allow_hyphen_values = true)]
    pub ylim: Option<[f64; 2]>,

    /// Load and average, log a summary, and exit without opening a window
    #[arg(long)]
    pub check: bool,

    /// Write a default runview.toml and exit
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter; `RUST_LOG` still wins.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Error
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }

    /// The chart to show: the `--config` file with flag overrides, or one
    /// assembled from the flags alone.
    pub fn chart_config(&self) -> Result<ChartConfig> {
        let mut config = match &self.config {
            Some(path) => ChartConfig::load(path)?,
            None => self.config_from_flags()?,
        };

        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if self.xlim.is_some() {
            config.x_limits = self.xlim;
        }
        if self.ylim.is_some() {
            config.y_limits = self.ylim;
        }
        if let Some(path) = &self.reference {
            config.series.push(self.flag_series(SeriesConfig {
                color: Some("y".to_string()),
                ..SeriesConfig::file(path, Some("Reference".to_string()))
            }));
        }

        config.validate()?;
        Ok(config)
    }

    fn config_from_flags(&self) -> Result<ChartConfig> {
        let mut series: Vec<SeriesConfig> = self
            .files
            .iter()
            .map(|path| self.flag_series(SeriesConfig::file(path, None)))
            .collect();

        if let (Some(base_dir), Some(pattern)) = (&self.base_dir, &self.pattern) {
            let (first, last) = self.runs;
            let spec = BatchSpec {
                base_dir: base_dir.clone(),
                pattern: pattern.clone(),
                first,
                last,
                primary: self.primary,
            };
            let count = spec.indices().count();
            series.push(self.flag_series(SeriesConfig {
                label: Some(format!("Data from all {count} runs")),
                width: 0.3,
                ..SeriesConfig::batch(spec)
            }));
        }

        if series.is_empty() && self.reference.is_none() {
            bail!("nothing to plot: pass run files, --base-dir/--pattern, or --config");
        }

        Ok(ChartConfig {
            series,
            ..ChartConfig::default()
        })
    }

    fn flag_series(&self, series: SeriesConfig) -> SeriesConfig {
        SeriesConfig {
            smooth: self.smooth.or(series.smooth),
            ..series
        }
    }
}

/// Parse `A..=B`, `A..B`, `A-B` or `N` into an inclusive `(first, last)`.
pub fn parse_run_range(s: &str) -> Result<(u32, u32), String> {
    let num = |t: &str| {
        t.trim()
            .parse::<u32>()
            .map_err(|_| format!("'{t}' is not a run index"))
    };

    let (first, last) = if let Some((a, b)) = s.split_once("..=") {
        (num(a)?, num(b)?)
    } else if let Some((a, b)) = s.split_once("..") {
        let end = num(b)?;
        if end == 0 {
            return Err(format!("'{s}' is an empty range"));
        }
        (num(a)?, end - 1)
    } else if let Some((a, b)) = s.split_once('-') {
        (num(a)?, num(b)?)
    } else {
        let n = num(s)?;
        (n, n)
    };

    if first > last {
        return Err(format!("'{s}' is an empty range"));
    }
    Ok((first, last))
}

/// Parse a moving-average window (at least 1).
pub fn parse_window(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("window must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{s}' is not a window size")),
    }
}

/// Parse `MIN,MAX` axis limits.
pub fn parse_limits(s: &str) -> Result<[f64; 2], String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX but got '{s}'"))?;
    let num = |t: &str| {
        t.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{t}' is not a number"))
    };
    let (min, max) = (num(a)?, num(b)?);
    if !(min < max) {
        return Err(format!("limits must satisfy MIN < MAX (got {min},{max})"));
    }
    Ok([min, max])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeriesSource;
    use crate::data::series::DEFAULT_SMOOTH_WINDOW;
    use clap::CommandFactory;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("runview").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_run_ranges() {
        assert_eq!(parse_run_range("1..=100"), Ok((1, 100)));
        assert_eq!(parse_run_range("1..101"), Ok((1, 100)));
        assert_eq!(parse_run_range("5-9"), Ok((5, 9)));
        assert_eq!(parse_run_range("7"), Ok((7, 7)));
        assert!(parse_run_range("9..=5").is_err());
        assert!(parse_run_range("3..3").is_err());
        assert!(parse_run_range("0..0").is_err());
        assert!(parse_run_range("a..=b").is_err());
    }

    #[test]
    fn test_limits() {
        assert_eq!(parse_limits("30,70"), Ok([30.0, 70.0]));
        assert_eq!(parse_limits("-5, 2.5"), Ok([-5.0, 2.5]));
        assert!(parse_limits("70,30").is_err());
        assert!(parse_limits("70").is_err());
    }

    #[test]
    fn test_bare_smooth_uses_default_window() {
        let a = args(&["a.csv", "--smooth"]);
        assert_eq!(a.smooth, Some(DEFAULT_SMOOTH_WINDOW));
        let a = args(&["a.csv", "--smooth", "3"]);
        assert_eq!(a.smooth, Some(3));
        assert!(Args::try_parse_from(["runview", "a.csv", "--smooth", "0"]).is_err());
    }

    #[test]
    fn test_files_become_required_series() {
        let a = args(&["a.csv", "b.csv", "--smooth", "4", "--xlim", "30,70"]);
        let config = a.chart_config().unwrap();
        assert_eq!(config.series.len(), 2);
        assert_eq!(config.x_limits, Some([30.0, 70.0]));
        assert!(config.series.iter().all(|s| s.smooth == Some(4)));
        assert_eq!(
            config.series[1].source(),
            Some(SeriesSource::File(std::path::Path::new("b.csv")))
        );
    }

    #[test]
    fn test_batch_flags() {
        let a = args(&[
            "--base-dir",
            "out",
            "--pattern",
            "df_model_{}_scInt_ne0.5.csv",
            "--runs",
            "1..=100",
            "--primary",
            "--reference",
            "prev.csv",
        ]);
        let config = a.chart_config().unwrap();
        assert_eq!(config.series.len(), 2);

        let batch = config.series[0].batch.as_ref().unwrap();
        assert_eq!((batch.first, batch.last), (1, 100));
        assert!(batch.primary);
        assert!(config.series[0].average.is_some());
        assert_eq!(config.series[0].label.as_deref(), Some("Data from all 100 runs"));
        assert_eq!(config.series[1].label.as_deref(), Some("Reference"));
    }

    #[test]
    fn test_pattern_requires_base_dir() {
        assert!(Args::try_parse_from(["runview", "--pattern", "run_{}.csv"]).is_err());
    }

    #[test]
    fn test_nothing_to_plot() {
        let err = args(&[]).chart_config().unwrap_err();
        assert!(err.to_string().contains("nothing to plot"));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(args(&["-q"]).log_level(), log::LevelFilter::Error);
        assert_eq!(args(&["-v"]).log_level(), log::LevelFilter::Debug);
        assert!(Args::try_parse_from(["runview", "-q", "-v"]).is_err());
    }
}
