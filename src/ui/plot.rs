use eframe::egui::Ui;
use egui_plot::{Legend, Line, LineStyle, Plot, PlotBounds, PlotPoints};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Run plot (central panel)
// ---------------------------------------------------------------------------

/// Render the chart title and the plot in the central panel.
///
/// Configured axis limits are applied once after each chart change; the user
/// is free to pan and zoom away from them afterwards.
pub fn run_plot(ui: &mut Ui, state: &mut AppState) {
    let chart = &state.chart;
    let initial = if state.bounds_applied {
        None
    } else {
        chart.initial_bounds(|group| state.is_visible(group))
    };

    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(&chart.title);
    });

    let plot = Plot::new("run_plot")
        .legend(Legend::default())
        .x_axis_label(chart.x_label.as_str())
        .y_axis_label(chart.y_label.as_str())
        .show_grid(true)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    plot.show(ui, |plot_ui| {
        if let Some((min, max)) = initial {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
        }

        for line in chart.lines.iter().filter(|l| state.is_visible(l.group)) {
            let points: PlotPoints = line.points.iter().copied().collect();

            let mut item = Line::new(points)
                .name(&line.name)
                .color(line.color)
                .width(line.width);
            if line.dashed {
                item = item.style(LineStyle::dashed_loose());
            }

            plot_ui.line(item);
        }
    });

    state.bounds_applied = true;
}
