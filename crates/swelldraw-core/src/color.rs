//! Colour strings as stored on elements.

use peniko::Color;

/// Background colour meaning "no fill".
pub const COLOR_TRANSPARENT: &str = "transparent";

/// Whether a colour string is fully transparent (`transparent`, `#rgb0`,
/// `#rrggbb00`).
pub fn is_transparent(color: &str) -> bool {
    let short_transparent = color.len() == 5 && color.ends_with('0');
    let long_transparent = color.len() == 9 && color.ends_with("00");
    short_transparent || long_transparent || color == COLOR_TRANSPARENT
}

/// Parse a colour string (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or
/// `transparent`).
pub fn parse_color(color: &str) -> Option<Color> {
    if color == COLOR_TRANSPARENT {
        return Some(Color::from_rgba8(0, 0, 0, 0));
    }

    let hex = color.strip_prefix('#')?.trim();
    let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

    match hex.len() {
        3 => Some(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        4 => Some(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// Scale a colour's alpha by `opacity` in `[0, 1]`.
pub fn with_opacity(color: Color, opacity: f64) -> Color {
    let rgba = color.to_rgba8();
    let alpha = (rgba.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
}
