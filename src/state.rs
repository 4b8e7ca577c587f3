use std::collections::BTreeSet;
use std::path::Path;

use crate::color::ColorCycle;
use crate::config::ChartConfig;
use crate::data::pipeline::{build_chart, Chart};

/// Automatic colours available to files opened from the viewer.
const OVERLAY_COLORS: usize = 8;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Configuration the chart was built from (used by Reload).
    pub config: ChartConfig,

    /// Loaded chart.
    pub chart: Chart,

    /// Groups the user switched off.
    pub hidden: BTreeSet<usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether the configured axis limits were pushed to the plot since the
    /// chart last changed. Cleared by Reload and Open.
    pub bounds_applied: bool,

    overlay_colors: ColorCycle,
}

impl AppState {
    pub fn new(config: ChartConfig, chart: Chart) -> Self {
        Self {
            config,
            chart,
            hidden: BTreeSet::new(),
            status_message: None,
            bounds_applied: false,
            overlay_colors: ColorCycle::new(OVERLAY_COLORS),
        }
    }

    pub fn is_visible(&self, group: usize) -> bool {
        !self.hidden.contains(&group)
    }

    /// Show or hide every line of a group.
    pub fn set_visible(&mut self, group: usize, visible: bool) {
        if visible {
            self.hidden.remove(&group);
        } else {
            self.hidden.insert(group);
        }
    }

    /// Re-read every file of the configuration. On failure the previous
    /// chart stays on screen and the error is reported in the status line.
    pub fn reload(&mut self) {
        match build_chart(&self.config) {
            Ok(chart) => {
                log::info!("Reloaded {} lines", chart.lines.len());
                self.chart = chart;
                self.hidden.clear();
                self.status_message = None;
                self.bounds_applied = false;
            }
            Err(e) => {
                log::error!("Reload failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Add one file on top of the chart.
    pub fn open_overlay(&mut self, path: &Path) {
        let color = self.overlay_colors.pick(None);
        match self.chart.add_overlay(path, color) {
            Ok(()) => {
                log::info!("Added overlay {}", path.display());
                self.status_message = None;
                self.bounds_applied = false;
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeriesConfig;

    fn state_with_file(dir: &Path) -> AppState {
        let path = dir.join("a.csv");
        std::fs::write(&path, "time,n_unoccupied\n0,1\n1,2\n").unwrap();
        let config = ChartConfig {
            series: vec![SeriesConfig::file(path, None)],
            ..ChartConfig::default()
        };
        let chart = build_chart(&config).unwrap();
        AppState::new(config, chart)
    }

    #[test]
    fn visibility_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with_file(dir.path());
        assert!(state.is_visible(0));
        state.set_visible(0, false);
        assert!(!state.is_visible(0));
        state.set_visible(0, true);
        assert!(state.is_visible(0));
    }

    #[test]
    fn chart_changes_reset_applied_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with_file(dir.path());
        assert!(!state.bounds_applied);

        state.bounds_applied = true;
        state.reload();
        assert!(!state.bounds_applied);

        let extra = dir.path().join("b.csv");
        std::fs::write(&extra, "time,n_unoccupied\n0,5\n").unwrap();
        state.bounds_applied = true;
        state.open_overlay(&extra);
        assert!(!state.bounds_applied);

        state.bounds_applied = true;
        state.open_overlay(&dir.path().join("missing.csv"));
        assert!(state.bounds_applied);
    }

    #[test]
    fn failed_overlay_sets_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with_file(dir.path());
        state.open_overlay(&dir.path().join("missing.csv"));
        assert!(state.status_message.as_deref().unwrap().contains("file not found"));
        assert_eq!(state.chart.groups.len(), 1);
    }

    #[test]
    fn reload_picks_up_changes_and_keeps_chart_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with_file(dir.path());
        state.set_visible(0, false);

        std::fs::write(dir.path().join("a.csv"), "time,n_unoccupied\n0,5\n").unwrap();
        state.reload();
        assert_eq!(state.chart.lines[0].points, vec![[0.0, 5.0]]);
        assert!(state.is_visible(0));

        std::fs::remove_file(dir.path().join("a.csv")).unwrap();
        state.reload();
        assert!(state.status_message.is_some());
        assert_eq!(state.chart.lines[0].points, vec![[0.0, 5.0]]);
    }
}
