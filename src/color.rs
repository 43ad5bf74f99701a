use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::DataSubtype;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: subtype → Color32
// ---------------------------------------------------------------------------

/// Assigns each loaded subtype a distinct colour; canonical and test lines
/// of a subtype share it.
#[derive(Debug, Clone)]
pub struct SubtypeColors {
    mapping: BTreeMap<DataSubtype, Color32>,
    default_color: Color32,
}

impl SubtypeColors {
    pub fn new<'a>(subtypes: impl IntoIterator<Item = &'a DataSubtype>) -> Self {
        let subtypes: Vec<&DataSubtype> = subtypes.into_iter().collect();
        let palette = generate_palette(subtypes.len());
        let mapping = subtypes
            .into_iter()
            .cloned()
            .zip(palette)
            .collect();

        SubtypeColors {
            mapping,
            default_color: Color32::LIGHT_BLUE,
        }
    }

    pub fn color_for(&self, subtype: &DataSubtype) -> Color32 {
        self.mapping
            .get(subtype)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let palette = generate_palette(4);
        assert_eq!(palette.len(), 4);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_subtypes_get_default() {
        let tl = DataSubtype::new("TL");
        let colors = SubtypeColors::new([&tl]);
        assert_ne!(colors.color_for(&tl), Color32::LIGHT_BLUE);
        assert_eq!(colors.color_for(&DataSubtype::new("PL")), Color32::LIGHT_BLUE);
    }
}
