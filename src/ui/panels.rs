use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::pipeline::BatchSummary;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – series toggles and batch reports
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Series");
    ui.separator();

    let groups = state.chart.groups.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (group, name) in groups.iter().enumerate() {
                let swatch = state
                    .chart
                    .lines
                    .iter()
                    .find(|l| l.group == group)
                    .map(|l| l.color)
                    .unwrap_or(Color32::GRAY);

                let mut visible = state.is_visible(group);
                if ui
                    .checkbox(&mut visible, RichText::new(name).color(swatch))
                    .changed()
                {
                    state.set_visible(group, visible);
                }
            }

            if state.chart.batches.is_empty() {
                return;
            }

            ui.add_space(8.0);
            ui.heading("Batches");
            ui.separator();

            for (i, batch) in state.chart.batches.iter().enumerate() {
                let name = groups
                    .get(batch.group)
                    .map(String::as_str)
                    .unwrap_or("batch");
                ui.push_id(i, |ui: &mut Ui| batch_report(ui, name, batch));
            }
        });
}

fn batch_report(ui: &mut Ui, name: &str, batch: &BatchSummary) {
    ui.strong(name);
    ui.label(RichText::new(batch.base_dir.display().to_string()).small());

    let rows = [
        ("Requested", batch.requested.to_string()),
        ("Loaded", batch.loaded.to_string()),
        ("Missing", batch.missing.len().to_string()),
        (
            "Average points",
            batch
                .average_len
                .map(|n| n.to_string())
                .unwrap_or_else(|| "–".to_string()),
        ),
    ];

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto())
        .column(Column::remainder())
        .body(|mut body| {
            for (key, value) in &rows {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.label(*key);
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(value);
                    });
                });
            }
        });

    if !batch.missing.is_empty() {
        egui::CollapsingHeader::new(format!("Missing files ({})", batch.missing.len()))
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                for path in &batch.missing {
                    ui.label(RichText::new(path.display().to_string()).color(Color32::YELLOW));
                }
            });
    }
    ui.add_space(6.0);
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!(
            "{} series, {} lines",
            state.chart.groups.len(),
            state.chart.lines.len()
        ));

        let missing = state.chart.missing_count();
        if missing > 0 {
            ui.separator();
            ui.label(RichText::new(format!("{missing} runs missing")).color(Color32::YELLOW));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open run output")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.open_overlay(&path);
    }
}
