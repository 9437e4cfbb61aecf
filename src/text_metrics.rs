use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

// Average advance of a sans-serif glyph, relative to the font size.
const FALLBACK_ADVANCE: f32 = 0.56;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` in pixels. Uses installed fonts when one matches
/// `font_family`, otherwise a per-character estimate.
pub fn text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    let measured = TEXT_MEASURER
        .lock()
        .ok()
        .and_then(|mut measurer| measurer.measure(text, font_size, font_family));
    measured.unwrap_or_else(|| estimate_width(text, font_size))
}

pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars().filter(|c| *c != '\n').count() as f32 * font_size * FALLBACK_ADVANCE
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FaceMetrics>>,
}

/// Horizontal advances pulled out of a font once, so the font data can be dropped.
struct FaceMetrics {
    units_per_em: f32,
    advances: HashMap<char, u16>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.faces.contains_key(&key) {
            let metrics = self.load_face(font_family);
            if metrics.is_none() {
                tracing::debug!(family = font_family, "no installed font, estimating text width");
            }
            self.faces.insert(key.clone(), metrics);
        }
        let metrics = self.faces.get(&key)?.as_ref()?;
        let scale = font_size / metrics.units_per_em;
        let width = text
            .chars()
            .filter(|c| *c != '\n')
            .map(|c| match metrics.advances.get(&c) {
                Some(advance) if *advance > 0 => *advance as f32 * scale,
                _ => font_size * FALLBACK_ADVANCE,
            })
            .sum::<f32>();
        Some(width.max(0.0))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FaceMetrics> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" => Family::SansSerif,
                "monospace" => Family::Monospace,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                let face = Face::parse(data, index).ok()?;
                let mut advances = HashMap::new();
                for c in (' '..='~').chain("·…–—".chars()) {
                    if let Some(glyph) = face.glyph_index(c) {
                        advances.insert(c, face.glyph_hor_advance(glyph).unwrap_or(0));
                    }
                }
                Some(FaceMetrics {
                    units_per_em: face.units_per_em().max(1) as f32,
                    advances,
                })
            })
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(text_width("", 12.0, "sans-serif"), 0.0);
        assert_eq!(text_width("abc", 0.0, "sans-serif"), 0.0);
    }

    #[test]
    fn estimate_scales_with_length_and_size() {
        assert_eq!(estimate_width("abcd", 10.0), 4.0 * 10.0 * FALLBACK_ADVANCE);
        assert!(estimate_width("abcdefgh", 12.0) > estimate_width("abcd", 12.0));
    }

    #[test]
    fn measured_width_grows_with_text() {
        let short = text_width("Error", 12.0, "Roboto, sans-serif");
        let long = text_width("Component/System component", 12.0, "Roboto, sans-serif");
        assert!(short > 0.0);
        assert!(long > short);
    }
}
