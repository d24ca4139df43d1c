//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const ONEDARK_YELLOW: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const ONEDARK_RED: Color = Color::Rgb(0xE0, 0x6C, 0x75);
const ONEDARK_BG: Color = Color::Rgb(0x31, 0x35, 0x3F);
const ONEDARK_DIV: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const ONEDARK_FG: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const ONEDARK_INACTIVE: Color = Color::Rgb(0x5C, 0x63, 0x70);

/// Board and UI colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Locked blocks.
    pub locked: Color,
    /// The falling piece.
    pub active: Color,
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, lines).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Key help and other secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// One Dark: yellow locked blocks, red active piece.
    pub fn onedark_default() -> Self {
        Self {
            locked: ONEDARK_YELLOW,
            active: ONEDARK_RED,
            bg: ONEDARK_BG,
            div_line: ONEDARK_DIV,
            main_fg: ONEDARK_FG,
            title: ONEDARK_YELLOW,
            inactive_fg: ONEDARK_INACTIVE,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file does not exist.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override block colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.locked = Color::Rgb(0xFF, 0xFF, 0x00);
                self.active = Color::Rgb(0xFF, 0x00, 0x00);
                self.bg = Color::Rgb(0x00, 0x00, 0x00);
            }
            crate::Palette::Colorblind => {
                // Blue/orange pair stays distinct under the common deficiencies.
                self.locked = Color::Rgb(0x00, 0x77, 0xBB);
                self.active = Color::Rgb(0xEE, 0x77, 0x33);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::onedark_default();
        Self {
            locked: get("title").or_else(|| get("cpu_mid")).unwrap_or(base.locked),
            active: get("cpu_end").or_else(|| get("temp_end")).unwrap_or(base.active),
            bg: get("meter_bg").unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}
