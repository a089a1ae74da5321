//! Color strings: palette variables, hex and `rgb()` parsing.

use std::collections::BTreeMap;
use std::fmt;

use eframe::egui::Color32;
use thiserror::Error;

/// Named colors referenced as `var(--name)`.
pub type Palette = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("Invalid hex color: {0}")]
    InvalidHex(String),

    #[error("Unrecognized color: {0}")]
    Unrecognized(String),
}

/// 8-bit channels plus a floating alpha; displays as `rgba(r, g, b, a)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl From<Rgba> for Color32 {
    fn from(c: Rgba) -> Self {
        let alpha = (c.a.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color32::from_rgba_unmultiplied(c.r, c.g, c.b, alpha)
    }
}

/// Converts `#abc`, `abc` or `#aabbcc` into channels with the given alpha.
pub fn hex_to_rgba(hex: &str, alpha: f32) -> Result<Rgba, ColorError> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(hex.to_string()));
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(ColorError::InvalidHex(hex.to_string())),
    };

    let channel = |i: usize| {
        u8::from_str_radix(&expanded[i..i + 2], 16)
            .map_err(|_| ColorError::InvalidHex(hex.to_string()))
    };

    Ok(Rgba {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
        a: alpha,
    })
}

/// Looks up `var(--name)` in the palette; other strings are returned as-is.
/// Unknown variables resolve to an empty string.
pub fn resolve_color(color: &str, palette: &Palette) -> String {
    let color = color.trim();
    if let Some(name) = color
        .strip_prefix("var(")
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|name| name.starts_with("--"))
    {
        return palette
            .get(name.trim())
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
    }
    color.to_string()
}

/// Parses `#hex`, `rgb(r, g, b)` and `rgba(r, g, b, a)`.
pub fn parse_color(color: &str) -> Result<Color32, ColorError> {
    let color = color.trim();
    if color.starts_with('#') {
        return hex_to_rgba(color, 1.0).map(Color32::from);
    }

    let (body, has_alpha) = if let Some(body) = color.strip_prefix("rgba(") {
        (body, true)
    } else if let Some(body) = color.strip_prefix("rgb(") {
        (body, false)
    } else {
        return Err(ColorError::Unrecognized(color.to_string()));
    };

    let parts: Vec<&str> = body
        .strip_suffix(')')
        .ok_or_else(|| ColorError::Unrecognized(color.to_string()))?
        .split(',')
        .map(str::trim)
        .collect();

    let expected = if has_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return Err(ColorError::Unrecognized(color.to_string()));
    }

    let channel = |s: &str| {
        s.parse::<f32>()
            .map(|v| v.clamp(0.0, 255.0).round() as u8)
            .map_err(|_| ColorError::Unrecognized(color.to_string()))
    };
    let alpha = if has_alpha {
        parts[3]
            .parse::<f32>()
            .map_err(|_| ColorError::Unrecognized(color.to_string()))?
    } else {
        1.0
    };

    Ok(Rgba {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a: alpha,
    }
    .into())
}

/// Start and end colors of the anchor glow gradient.
pub fn glow_stops(resolved: &str) -> (String, String) {
    if resolved.starts_with('#') {
        if let (Ok(start), Ok(end)) = (hex_to_rgba(resolved, 0.5), hex_to_rgba(resolved, 0.0)) {
            return (start.to_string(), end.to_string());
        }
    } else if resolved.starts_with("rgb(") {
        let start = resolved.replacen("rgb(", "rgba(", 1).replacen(')', ", 0.5)", 1);
        let end = resolved.replacen("rgb(", "rgba(", 1).replacen(')', ", 0)", 1);
        return (start, end);
    }
    (resolved.to_string(), resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgba_six_digits() {
        let c = hex_to_rgba("#1e90ff", 0.5).unwrap();
        assert_eq!((c.r, c.g, c.b), (30, 144, 255));
        assert_eq!(c.to_string(), "rgba(30, 144, 255, 0.5)");
    }

    #[test]
    fn test_hex_to_rgba_three_digits() {
        let c = hex_to_rgba("#abc", 1.0).unwrap();
        assert_eq!((c.r, c.g, c.b), (0xaa, 0xbb, 0xcc));

        let c = hex_to_rgba("f00", 0.0).unwrap();
        assert_eq!((c.r, c.g, c.b), (255, 0, 0));
        assert_eq!(c.to_string(), "rgba(255, 0, 0, 0)");
    }

    #[test]
    fn test_hex_to_rgba_rejects_garbage() {
        assert!(hex_to_rgba("#12345", 1.0).is_err());
        assert!(hex_to_rgba("#zzzzzz", 1.0).is_err());
    }

    #[test]
    fn test_resolve_color_variables() {
        let mut palette = Palette::new();
        palette.insert("--anchor-color".into(), "  #ff0000 ".into());

        assert_eq!(resolve_color("var(--anchor-color)", &palette), "#ff0000");
        assert_eq!(resolve_color("var(--missing)", &palette), "");
        assert_eq!(resolve_color("rgb(1, 2, 3)", &palette), "rgb(1, 2, 3)");
    }

    #[test]
    fn test_parse_color_formats() {
        assert_eq!(parse_color("#fff").unwrap(), Color32::WHITE);
        assert_eq!(
            parse_color("rgb(10, 20, 30)").unwrap(),
            Color32::from_rgb(10, 20, 30)
        );
        assert_eq!(
            parse_color("rgba(0, 0, 0, 0.5)").unwrap(),
            Color32::from_rgba_unmultiplied(0, 0, 0, 128)
        );
        assert!(parse_color("papayawhip").is_err());
        assert!(parse_color("rgb(1, 2)").is_err());
    }

    #[test]
    fn test_glow_stops() {
        let (start, end) = glow_stops("#00ff00");
        assert_eq!(start, "rgba(0, 255, 0, 0.5)");
        assert_eq!(end, "rgba(0, 255, 0, 0)");

        let (start, end) = glow_stops("rgb(1, 2, 3)");
        assert_eq!(start, "rgba(1, 2, 3, 0.5)");
        assert_eq!(end, "rgba(1, 2, 3, 0)");

        let (start, end) = glow_stops("rgba(1, 2, 3, 1)");
        assert_eq!(start, end);
    }
}
