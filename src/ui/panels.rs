use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, Role};

/// Exceedances listed under the selected subtype.
const LISTED_EXCEEDANCES: usize = 50;

// ---------------------------------------------------------------------------
// Left side panel – subtypes and exceedances
// ---------------------------------------------------------------------------

/// Render the left subtype panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Subtypes");
    ui.separator();

    let subtypes = state.plottable_subtypes();
    if subtypes.is_empty() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for subtype in &subtypes {
                let count = state.exceedance_count(subtype);
                let mut text = RichText::new(format!("{subtype}  ({count})"));
                if let Some(colors) = &state.colors {
                    text = text.color(colors.color_for(subtype));
                }
                if count > 0 {
                    text = text.strong();
                }

                let selected = state.selected.as_ref() == Some(subtype);
                if ui.selectable_label(selected, text).clicked() {
                    state.selected = Some(subtype.clone());
                }
            }

            ui.separator();
            ui.checkbox(&mut state.show_exceedances, "Show exceedances");
            ui.separator();

            // ---- Exceedance list for the selected subtype ----
            let (Some(subtype), Some(report), Some(test)) =
                (&state.selected, &state.report, &state.test)
            else {
                return;
            };
            let Some(found) = report.get(&test.submodel, subtype) else {
                ui.label(RichText::new("Within tolerance").color(Color32::GREEN));
                return;
            };

            egui::CollapsingHeader::new(
                RichText::new(format!("{} exceedances", found.exceedances.len())).strong(),
            )
            .id_salt("exceedances")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                for e in found.exceedances.iter().take(LISTED_EXCEEDANCES) {
                    ui.label(format!(
                        "{} @ t={}: {:+.3e}",
                        e.identifier, e.time, e.relative_error
                    ));
                }
                if found.exceedances.len() > LISTED_EXCEEDANCES {
                    ui.label(format!(
                        "... and {} more",
                        found.exceedances.len() - LISTED_EXCEEDANCES
                    ));
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open canonical…").clicked() {
                open_file_dialog(state, Role::Canonical);
                ui.close_menu();
            }
            if ui.button("Open test…").clicked() {
                open_file_dialog(state, Role::Test);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label("Submodel");
        ui.add(egui::TextEdit::singleline(&mut state.submodel).desired_width(80.0));

        ui.separator();

        ui.label("Tolerance");
        let tolerance = egui::DragValue::new(&mut state.tolerance)
            .speed(1e-4)
            .range(0.0..=f64::MAX);
        if ui.add(tolerance).changed() {
            state.recompare();
        }

        ui.separator();

        if let Some(report) = &state.report {
            let (verdict, color) = if report.passed() {
                ("PASS", Color32::GREEN)
            } else {
                ("FAIL", Color32::RED)
            };
            ui.label(RichText::new(verdict).color(color).strong());
            ui.label(format!("{} exceedances", report.total_exceedances()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState, role: Role) {
    let title = match role {
        Role::Canonical => "Open canonical save file",
        Role::Test => "Open test save file",
    };
    let file = rfd::FileDialog::new()
        .set_title(title)
        .add_filter("Supported files", &["parquet", "pq", "json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.load(role, &path);
    }
}
