//! Presentation parameters for a card render

use serde::{Deserialize, Serialize};
use std::fmt;

/// Theme used when nothing else is selected
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// The two monospace font families offered for the card
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Debug, Default)]
pub enum FontChoice {
    #[default]
    #[serde(rename = "JetBrains Mono")]
    JetBrainsMono,
    #[serde(rename = "Hack")]
    Hack,
}

impl FontChoice {
    /// CSS family name of the font
    pub fn family(&self) -> &'static str {
        match self {
            FontChoice::JetBrainsMono => "JetBrains Mono",
            FontChoice::Hack => "Hack",
        }
    }

    /// File name prefix of the bundled face files (`<prefix>-Regular.ttf` etc.)
    pub fn file_prefix(&self) -> &'static str {
        match self {
            FontChoice::JetBrainsMono => "JetBrainsMono",
            FontChoice::Hack => "Hack",
        }
    }

    pub fn all() -> &'static [FontChoice] {
        &[FontChoice::JetBrainsMono, FontChoice::Hack]
    }

    /// Parse a family name as shown in a font picker
    pub fn from_family(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.family().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for FontChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.family())
    }
}

/// Everything the rendering layer needs to build one card.
///
/// A change to any field forces a fresh mount of the card, see
/// [`RenderController::update`](crate::identity::RenderController::update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PresentationParameters {
    /// Source text to highlight
    pub code: String,
    /// Language token (name or file extension, e.g. `java`, `rs`)
    pub language: String,
    /// Highlighting theme name
    pub theme: String,
    /// Monospace font family
    pub font: FontChoice,
    /// Content width of the card in pixels
    pub width: u32,
    /// Padding around the code inside the code box
    pub code_padding: u32,
}

impl Default for PresentationParameters {
    fn default() -> Self {
        Self {
            code: String::new(),
            language: "java".to_string(),
            theme: DEFAULT_THEME.to_string(),
            font: FontChoice::JetBrainsMono,
            width: 800,
            code_padding: 15,
        }
    }
}

impl PresentationParameters {
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn with_font(mut self, font: FontChoice) -> Self {
        self.font = font;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_code_padding(mut self, padding: u32) -> Self {
        self.code_padding = padding;
        self
    }
}

/// Parse a dimension typed into a text field.
///
/// Leading whitespace and an optional `+` are skipped, then the leading run of
/// digits is read. Anything that yields no digits (or a negative number) is 0.
pub fn parse_dimension(input: &str) -> u32 {
    let s = input.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u32>().unwrap_or(u32::MAX)
}
