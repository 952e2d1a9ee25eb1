//! Syntax highlighting of the card's code node

use std::path::Path;

use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::color::Rgba;
use crate::dom::{Element, Node};
use crate::{Error, Result};

/// Highlighting capability run once against every freshly mounted card.
///
/// Implementations replace the inline text of `code` with styled spans and
/// may set the code box's colors; block children (window controls) must be
/// left in place.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, code: &mut Element, language: &str, theme: &str) -> Result<()>;

    /// Names of the languages this highlighter knows, for pickers
    fn languages(&self) -> Vec<String> {
        Vec::new()
    }

    /// Names of the available themes, for pickers
    fn themes(&self) -> Vec<String> {
        Vec::new()
    }
}

pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl SyntectHighlighter {
    /// Built-in syntaxes and themes, plus any `.tmTheme` files in `themes_dir`
    pub fn new(themes_dir: Option<&Path>) -> Result<Self> {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults();
        if let Some(dir) = themes_dir {
            themes.add_from_folder(dir).map_err(|e| {
                Error::ConfigError(format!("Failed to load themes from {}: {}", dir.display(), e))
            })?;
        }
        Ok(Self { syntaxes, themes })
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &mut Element, language: &str, theme_name: &str) -> Result<()> {
        let theme = self
            .themes
            .themes
            .get(theme_name)
            .ok_or_else(|| Error::HighlightError(format!("Unknown theme: {}", theme_name)))?;
        let syntax = self
            .syntaxes
            .find_syntax_by_token(language)
            .unwrap_or_else(|| {
                log::debug!("no syntax for {:?}, highlighting as plain text", language);
                self.syntaxes.find_syntax_plain_text()
            });

        // Pull the inline text out of the code node, remembering where it sat.
        let insert_at = code
            .children
            .iter()
            .position(|c| matches!(c, Node::Text(_)))
            .unwrap_or(code.children.len());
        let mut text = String::new();
        code.children.retain(|c| match c {
            Node::Text(t) => {
                text.push_str(t);
                false
            }
            Node::Element(_) => true,
        });

        let mut h = HighlightLines::new(syntax, theme);
        let mut spans = Vec::new();
        for line in LinesWithEndings::from(text.as_str()) {
            let ranges = h
                .highlight_line(line, &self.syntaxes)
                .map_err(|e| Error::HighlightError(format!("Failed to highlight `{}`: {}", line.trim_end(), e)))?;
            for (style, piece) in ranges {
                let mut span = Element::new("span").with_text(piece);
                span.style.color = Some(Rgba::from(style.foreground));
                if style.font_style.contains(FontStyle::BOLD) {
                    span.style.bold = Some(true);
                }
                if style.font_style.contains(FontStyle::ITALIC) {
                    span.style.italic = Some(true);
                }
                spans.push(Node::Element(span));
            }
        }
        code.children.splice(insert_at..insert_at, spans);

        if let Some(bg) = theme.settings.background {
            code.style.background = Some(bg.into());
        }
        if let Some(fg) = theme.settings.foreground {
            code.style.color = Some(fg.into());
        }
        code.add_class("hljs");
        Ok(())
    }

    fn languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .syntaxes
            .syntaxes()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        names.sort_by_key(|n| n.to_lowercase());
        names.dedup();
        names
    }

    fn themes(&self) -> Vec<String> {
        self.themes.themes.keys().cloned().collect()
    }
}
