use crate::theme::Theme;
use std::collections::HashMap;
use std::sync::Mutex;

const GOLDEN_ANGLE: f32 = 137.507_77;

/// Hands out a stable color per key (cell name, component type, ...).
///
/// Shared between the graph builder and the per-node view callback, so
/// assignment goes through a lock rather than `&mut self`.
#[derive(Debug)]
pub struct ColorGenerator {
    state: Mutex<ColorState>,
}

#[derive(Debug, Clone)]
struct ColorState {
    assigned: HashMap<String, String>,
    palette: Vec<String>,
    next_palette: usize,
    generated: usize,
}

impl ColorGenerator {
    pub const SYSTEM: &'static str = "System";
    pub const ERROR: &'static str = "Error";
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn new(theme: &Theme) -> Self {
        let mut assigned = HashMap::new();
        assigned.insert(Self::SYSTEM.to_string(), theme.system_color.clone());
        assigned.insert(Self::ERROR.to_string(), theme.error_color.clone());
        assigned.insert(Self::UNKNOWN.to_string(), theme.unknown_color.clone());
        Self {
            state: Mutex::new(ColorState {
                assigned,
                palette: theme.palette.clone(),
                next_palette: 0,
                generated: 0,
            }),
        }
    }

    pub fn get_color(&self, key: &str) -> String {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(color) = state.assigned.get(key) {
            return color.clone();
        }
        let color = state.next_color();
        state.assigned.insert(key.to_string(), color.clone());
        color
    }

    /// Assigns colors to `keys` in order, skipping keys that already have one.
    pub fn add_keys<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.get_color(key.as_ref());
        }
    }

    pub fn shade_color(color: &str, percent: f32) -> String {
        shade_color(color, percent)
    }
}

impl Default for ColorGenerator {
    fn default() -> Self {
        Self::new(&Theme::default())
    }
}

impl Clone for ColorGenerator {
    fn clone(&self) -> Self {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Self {
            state: Mutex::new(state.clone()),
        }
    }
}

impl ColorState {
    fn next_color(&mut self) -> String {
        if let Some(color) = self.palette.get(self.next_palette) {
            self.next_palette += 1;
            return color.clone();
        }
        let hue = (self.generated as f32 * GOLDEN_ANGLE) % 360.0;
        self.generated += 1;
        hsl_to_hex(hue, 0.55, 0.5)
    }
}

/// Moves each channel toward white (`percent > 0`) or black (`percent < 0`)
/// by `|percent|`. Unparseable colors come back unchanged.
pub fn shade_color(color: &str, percent: f32) -> String {
    let Some((r, g, b)) = parse_hex(color) else {
        return color.to_string();
    };
    let target = if percent < 0.0 { 0.0 } else { 255.0 };
    let p = percent.abs().min(1.0);
    // Rounds half up.
    let shade = |c: u8| -> u8 {
        let c = c as f32;
        (((target - c) * p + 0.5).floor() + c).clamp(0.0, 255.0) as u8
    };
    format!("#{:02x}{:02x}{:02x}", shade(r), shade(g), shade(b))
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

fn hsl_to_hex(hue: f32, saturation: f32, lightness: f32) -> String {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}
