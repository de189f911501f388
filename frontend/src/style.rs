use serde::Deserialize;

use crate::error::LauncherError;

/// RGBA color used by every draw call. Config files only carry RGB; alpha comes
/// from the matching `opacity` setting.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "RawColor")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColor {
    Rgb([u8; 3]),
    Hex(String),
}

impl TryFrom<RawColor> for Color {
    type Error = LauncherError;

    fn try_from(raw: RawColor) -> Result<Self, Self::Error> {
        match raw {
            RawColor::Rgb([r, g, b]) => Ok(Color::rgb(r, g, b)),
            RawColor::Hex(s) => parse_hex(&s),
        }
    }
}

fn parse_hex(s: &str) -> Result<Color, LauncherError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || LauncherError::InvalidValue(format!("invalid color '{}', expected #RRGGBB", s));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        color: Color,
    }

    #[test]
    fn test_color_from_array() {
        let h: Holder = toml::from_str("color = [12, 34, 56]").unwrap();
        assert_eq!(h.color, Color::rgb(12, 34, 56));
        assert_eq!(h.color.a, 255, "config colors are opaque until opacity is applied");
    }

    #[test]
    fn test_color_from_hex() {
        let h: Holder = toml::from_str("color = \"#FF8000\"").unwrap();
        assert_eq!(h.color, Color::rgb(255, 128, 0));
        let h: Holder = toml::from_str("color = \"0a0b0c\"").unwrap();
        assert_eq!(h.color, Color::rgb(10, 11, 12));
    }

    #[test]
    fn test_color_rejects_bad_hex() {
        assert!(toml::from_str::<Holder>("color = \"#12345\"").is_err());
        assert!(toml::from_str::<Holder>("color = \"#GG0000\"").is_err());
    }

    #[test]
    fn test_with_alpha() {
        let c = Color::WHITE.with_alpha(10);
        assert_eq!((c.r, c.g, c.b, c.a), (255, 255, 255, 10));
    }
}
