use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, LineStyle, MarkerShape, Plot, Points};

use crate::state::{AppState, Role};

// ---------------------------------------------------------------------------
// Mean plot (central panel)
// ---------------------------------------------------------------------------

/// Mean of the selected subtype over all items, canonical vs test.
pub fn mean_plot(ui: &mut Ui, state: &AppState) {
    let Some(subtype) = &state.selected else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open canonical and test save files  (File → Open…)");
        });
        return;
    };

    let color = state
        .colors
        .as_ref()
        .map(|c| c.color_for(subtype))
        .unwrap_or(Color32::LIGHT_BLUE);
    let units = state.units(subtype).unwrap_or("");

    Plot::new("mean_plot")
        .legend(Legend::default())
        .x_axis_label("Time [s]")
        .y_axis_label(format!("{subtype} [{units}]"))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let canon = state.mean_series(Role::Canonical, subtype);
            if !canon.is_empty() {
                plot_ui.line(
                    Line::new(canon)
                        .name(format!("Canonical mean {subtype} of {}", state.submodel))
                        .color(color)
                        .width(1.5),
                );
            }

            let test = state.mean_series(Role::Test, subtype);
            if !test.is_empty() {
                plot_ui.line(
                    Line::new(test)
                        .name(format!("Test mean {subtype} of {}", state.submodel))
                        .color(color)
                        .style(LineStyle::dashed_loose())
                        .width(1.5),
                );
            }

            if state.show_exceedances {
                let points = state.exceedance_points(subtype);
                if !points.is_empty() {
                    plot_ui.points(
                        Points::new(points)
                            .name("Exceedances")
                            .shape(MarkerShape::Cross)
                            .color(Color32::RED)
                            .radius(3.0),
                    );
                }
            }
        });
}
