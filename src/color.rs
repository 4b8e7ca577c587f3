use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

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
// Named colours
// ---------------------------------------------------------------------------

/// Parse a colour the way chart files spell them: matplotlib single-letter
/// codes (`b g r c m y k w`), a handful of common names, or `#rrggbb`.
pub fn parse_color(name: &str) -> Option<Color32> {
    let name = name.trim().to_ascii_lowercase();
    if let Some(hex) = name.strip_prefix('#') {
        return parse_hex(hex);
    }
    let rgb = match name.as_str() {
        "b" | "blue" => (0x1f, 0x77, 0xb4),
        "g" | "green" => (0x2c, 0xa0, 0x2c),
        "r" | "red" => (0xd6, 0x27, 0x28),
        "c" | "cyan" => (0x17, 0xbe, 0xcf),
        "m" | "magenta" => (0xbf, 0x00, 0xbf),
        "y" | "yellow" => (0xbc, 0xbd, 0x22),
        "k" | "black" => (0x00, 0x00, 0x00),
        "w" | "white" => (0xff, 0xff, 0xff),
        "orange" => (0xff, 0x7f, 0x0e),
        "purple" => (0x94, 0x67, 0xbd),
        "brown" => (0x8c, 0x56, 0x4b),
        "pink" => (0xe3, 0x77, 0xc2),
        "gray" | "grey" => (0x7f, 0x7f, 0x7f),
        _ => return None,
    };
    Some(Color32::from_rgb(rgb.0, rgb.1, rgb.2))
}

fn parse_hex(hex: &str) -> Option<Color32> {
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

// ---------------------------------------------------------------------------
// Colour assignment for a chart
// ---------------------------------------------------------------------------

/// Hands out colours for chart lines: the configured one when given,
/// otherwise the next palette entry.
#[derive(Debug, Clone)]
pub struct ColorCycle {
    palette: Vec<Color32>,
    next: usize,
}

impl ColorCycle {
    /// A cycle with room for `n` distinct automatic colours.
    pub fn new(n: usize) -> Self {
        let palette = generate_palette(n.max(1));
        ColorCycle { palette, next: 0 }
    }

    /// Resolve `configured` (already validated) or take the next palette
    /// colour.
    pub fn pick(&mut self, configured: Option<&str>) -> Color32 {
        if let Some(c) = configured.and_then(parse_color) {
            return c;
        }
        let c = self.palette[self.next % self.palette.len()];
        self.next += 1;
        c
    }
}
