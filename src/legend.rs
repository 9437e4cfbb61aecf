use crate::text_metrics::text_width;
use crate::theme::Theme;
use serde::Serialize;

pub const LEGEND_POPPER_ID: &str = "legend-popper";
pub const LEGEND_BUTTON_LABEL: &str = "Legend";
pub const LEGEND_PLACEMENT: &str = "top-end";
pub const LEGEND_FADE_MS: u32 = 350;

const PADDING: f32 = 16.0;
const ROW_HEIGHT: f32 = 28.0;
const GLYPH_SIZE: f32 = 20.0;
const TEXT_GAP: f32 = 5.0;
const ENTRY_GAP: f32 = 20.0;

/// Open/closed state of the legend popover and the element it hangs off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendState {
    pub anchor: Option<String>,
    pub open: bool,
}

impl LegendState {
    pub fn toggle(&mut self, anchor: impl Into<String>) {
        self.anchor = Some(anchor.into());
        self.open = !self.open;
    }

    pub fn popper_id(&self) -> Option<&'static str> {
        self.open.then_some(LEGEND_POPPER_ID)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendGlyph {
    Node,
    Dependency,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub glyph: LegendGlyph,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
    /// Row the entry is drawn on; entries sharing a row sit side by side.
    pub row: usize,
}

pub struct Legend;

impl Legend {
    pub fn entries() -> Vec<LegendEntry> {
        vec![
            LegendEntry {
                glyph: LegendGlyph::Node,
                label: "Component/System component",
                help: Some("(Radius proportional to the request duration)"),
                row: 0,
            },
            LegendEntry {
                glyph: LegendGlyph::Dependency,
                label: "Dependency",
                help: None,
                row: 1,
            },
            LegendEntry {
                glyph: LegendGlyph::Error,
                label: "Error",
                help: None,
                row: 1,
            },
        ]
    }

    pub fn render_svg(theme: &Theme) -> String {
        let entries = Self::entries();
        let rows = entries.iter().map(|entry| entry.row).max().map_or(0, |row| row + 1);

        // Lay each row out left to right and keep the widest.
        let mut placed = Vec::with_capacity(entries.len());
        let mut width: f32 = 0.0;
        for row in 0..rows {
            let mut x = PADDING;
            for entry in entries.iter().filter(|e| e.row == row) {
                if x > PADDING {
                    x += ENTRY_GAP;
                }
                let glyph_x = x;
                x += GLYPH_SIZE + TEXT_GAP;
                let label_x = x;
                x += text_width(entry.label, theme.font_size, &theme.font_family);
                let mut help_x = None;
                if let Some(help) = entry.help {
                    x += TEXT_GAP;
                    help_x = Some(x);
                    x += text_width(help, theme.help_font_size, &theme.font_family);
                }
                placed.push((entry, glyph_x, label_x, help_x));
            }
            width = width.max(x + PADDING);
        }
        let height = PADDING * 2.0 + rows as f32 * ROW_HEIGHT;

        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">"
        ));
        svg.push_str(&format!(
            "<rect x=\"0.5\" y=\"0.5\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\"/>",
            width - 1.0,
            height - 1.0,
            theme.legend_background,
            theme.legend_border
        ));
        for (entry, glyph_x, label_x, help_x) in placed {
            let mid_y = PADDING + entry.row as f32 * ROW_HEIGHT + ROW_HEIGHT / 2.0;
            svg.push_str(&glyph_svg(entry.glyph, glyph_x, mid_y, theme));
            svg.push_str(&format!(
                "<text x=\"{label_x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                mid_y + theme.font_size * 0.35,
                escape_xml(&theme.font_family),
                theme.font_size,
                theme.text_color,
                escape_xml(entry.label)
            ));
            if let (Some(help), Some(help_x)) = (entry.help, help_x) {
                svg.push_str(&format!(
                    "<text x=\"{help_x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                    mid_y + theme.help_font_size * 0.35,
                    escape_xml(&theme.font_family),
                    theme.help_font_size,
                    theme.secondary_text_color,
                    escape_xml(help)
                ));
            }
        }
        svg.push_str("</svg>");
        svg
    }
}

fn glyph_svg(glyph: LegendGlyph, x: f32, mid_y: f32, theme: &Theme) -> String {
    let cx = x + GLYPH_SIZE / 2.0;
    match glyph {
        LegendGlyph::Node => format!(
            "<circle cx=\"{cx:.2}\" cy=\"{mid_y:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
            GLYPH_SIZE * 0.3,
            theme.action_color
        ),
        LegendGlyph::Dependency => {
            let x2 = x + GLYPH_SIZE;
            format!(
                "<path d=\"M {x:.2} {mid_y:.2} L {:.2} {mid_y:.2}\" stroke=\"{color}\" stroke-width=\"2\" fill=\"none\"/><path d=\"M {:.2} {:.2} L {x2:.2} {mid_y:.2} L {:.2} {:.2} z\" fill=\"{color}\"/>",
                x2 - 4.0,
                x2 - 6.0,
                mid_y - 4.0,
                x2 - 6.0,
                mid_y + 4.0,
                color = theme.action_color
            )
        }
        LegendGlyph::Error => format!(
            "<circle cx=\"{cx:.2}\" cy=\"{mid_y:.2}\" r=\"{:.2}\" fill=\"{}\"/><path d=\"M {cx:.2} {:.2} L {cx:.2} {:.2} M {cx:.2} {:.2} L {cx:.2} {:.2}\" stroke=\"#ffffff\" stroke-width=\"2\"/>",
            GLYPH_SIZE * 0.42,
            theme.error_color,
            mid_y - 4.5,
            mid_y + 1.0,
            mid_y + 3.0,
            mid_y + 5.0
        ),
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
