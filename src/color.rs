//! RGBA colors as they appear in inline styles and themes

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// `#rrggbb`, ignoring alpha
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha as a 0..=1 opacity
    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Parse a CSS color value: hex (`#rgb`, `#rrggbb`, `#rrggbbaa`),
    /// `rgb()`/`rgba()`, or one of a few keywords.
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        if let Some(hex) = v.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = v.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args);
        }
        match lower.as_str() {
            "transparent" | "none" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::rgb(255, 0, 0)),
            "green" => Some(Self::rgb(0, 128, 0)),
            "blue" => Some(Self::rgb(0, 0, 255)),
            "gray" | "grey" => Some(Self::rgb(128, 128, 128)),
            _ => None,
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c == ' ')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 || parts.len() > 4 {
        return None;
    }
    let channel = |p: &str| -> Option<u8> {
        let n: f32 = p.parse().ok()?;
        Some(n.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = match parts.get(3) {
        Some(p) => {
            let n: f32 = match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse().ok()?,
            };
            (n.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };
    Some(Rgba::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.to_hex())
        } else {
            write!(
                f,
                "rgba({}, {}, {}, {:.3})",
                self.r,
                self.g,
                self.b,
                self.opacity()
            )
        }
    }
}

impl From<syntect::highlighting::Color> for Rgba {
    fn from(c: syntect::highlighting::Color) -> Self {
        Rgba::new(c.r, c.g, c.b, c.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Rgba::parse("#FF5F56"), Some(Rgba::rgb(0xff, 0x5f, 0x56)));
        assert_eq!(Rgba::parse("#fff"), Some(Rgba::WHITE));
        assert_eq!(Rgba::parse("#00000080"), Some(Rgba::new(0, 0, 0, 0x80)));
        assert_eq!(Rgba::parse("#12"), None);
        assert_eq!(Rgba::parse("#zzzzzz"), None);
    }

    #[test]
    fn parses_functional_forms() {
        assert_eq!(Rgba::parse("rgb(1, 2, 3)"), Some(Rgba::rgb(1, 2, 3)));
        assert_eq!(Rgba::parse("rgba(0,0,0,0.5)"), Some(Rgba::new(0, 0, 0, 128)));
        assert_eq!(Rgba::parse("rgb(0 0 0 / 50%)"), Some(Rgba::new(0, 0, 0, 128)));
        assert_eq!(Rgba::parse("rgb(1,2)"), None);
    }

    #[test]
    fn display_uses_hex_when_opaque() {
        assert_eq!(Rgba::rgb(0x2b, 0x30, 0x3b).to_string(), "#2b303b");
        assert_eq!(Rgba::new(0, 0, 0, 0).to_string(), "rgba(0, 0, 0, 0.000)");
    }
}
