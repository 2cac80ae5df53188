use crate::types::VenueRecord;
use plotters::style::RGBColor;
use std::collections::HashMap;
use tracing::warn;

// Plotly's default qualitative sequence.
const QUALITATIVE: [RGBColor; 10] = [
    RGBColor(0x63, 0x6e, 0xfa),
    RGBColor(0xef, 0x55, 0x3b),
    RGBColor(0x00, 0xcc, 0x96),
    RGBColor(0xab, 0x63, 0xfa),
    RGBColor(0xff, 0xa1, 0x5a),
    RGBColor(0x19, 0xd3, 0xf3),
    RGBColor(0xff, 0x66, 0x92),
    RGBColor(0xb6, 0xe8, 0x80),
    RGBColor(0xff, 0x97, 0xff),
    RGBColor(0xfe, 0xcb, 0x52),
];

// ColorBrewer "Blues", light to dark.
const BLUES: [RGBColor; 9] = [
    RGBColor(247, 251, 255),
    RGBColor(222, 235, 247),
    RGBColor(198, 219, 239),
    RGBColor(158, 202, 225),
    RGBColor(107, 174, 214),
    RGBColor(66, 146, 198),
    RGBColor(33, 113, 181),
    RGBColor(8, 81, 156),
    RGBColor(8, 48, 107),
];

/// Stable category -> color assignment for the map.
#[derive(Debug, Clone)]
pub struct Palette {
    entries: Vec<(String, RGBColor)>,
}

impl Palette {
    /// Known categories come first, then any category only the venues use.
    pub fn new(categories: &[String], venues: &[VenueRecord], overrides: &HashMap<String, String>) -> Self {
        let mut names: Vec<&str> = categories.iter().map(String::as_str).collect();
        for venue in venues {
            if !names.contains(&venue.category.as_str()) {
                names.push(&venue.category);
            }
        }

        let entries = names.into_iter().enumerate()
            .map(|(i, name)| {
                let color = match overrides.get(name).map(|hex| (hex, hex_to_rgb(hex))) {
                    Some((_, Some(color))) => color,
                    Some((hex, None)) => {
                        warn!(category = name, hex = hex.as_str(), "Ignoring malformed color");
                        QUALITATIVE[i % QUALITATIVE.len()]
                    }
                    None => QUALITATIVE[i % QUALITATIVE.len()],
                };
                (name.to_string(), color)
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, RGBColor)> {
        self.entries.iter().map(|(name, color)| (name.as_str(), *color))
    }

    pub fn color(&self, category: &str) -> Option<RGBColor> {
        self.entries.iter().find(|(name, _)| name == category).map(|(_, color)| *color)
    }
}

pub fn hex_to_rgb(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(RGBColor(r, g, b))
}

/// Continuous "Blues" scale; `t` is clamped to `0..=1`.
pub(crate) fn blues(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (BLUES.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(BLUES.len() - 1);
    let frac = scaled - lower as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (BLUES[lower], BLUES[upper]);
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
