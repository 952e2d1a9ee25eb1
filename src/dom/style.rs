//! Inline style declarations of card elements
//!
//! The card markup carries all of its presentation in `style=""` attributes,
//! so this is the whole of the cascade: declarations are applied in order and
//! later ones win. Inherited properties (`color`, `font-*`) are left as
//! `None` here and resolved during layout.

use crate::color::Rgba;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn uniform(v: f32) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub display: Option<Display>,
    pub padding: Edges,
    /// Fixed content width
    pub width: Option<f32>,
    pub border_radius: f32,
    pub background: Option<Rgba>,
    pub color: Option<Rgba>,
    pub font_family: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub overflow_hidden: bool,
    /// `filter: drop-shadow(...)` was declared
    pub drop_shadow: bool,
}

impl Style {
    pub fn parse(declarations: &str) -> Self {
        let mut style = Style::default();
        style.apply(declarations);
        style
    }

    /// Apply a `;`-separated declaration list on top of this style.
    /// Unknown properties and unparsable values are ignored.
    pub fn apply(&mut self, declarations: &str) {
        for decl in declarations.split(';') {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            match name.as_str() {
                "display" => {
                    self.display = match value {
                        "inline" | "inline-block" => Some(Display::Inline),
                        "block" | "flex" => Some(Display::Block),
                        _ => self.display,
                    }
                }
                "padding" => {
                    if let Some(edges) = parse_edges(value) {
                        self.padding = edges;
                    }
                }
                "padding-top" => set_length(&mut self.padding.top, value),
                "padding-right" => set_length(&mut self.padding.right, value),
                "padding-bottom" => set_length(&mut self.padding.bottom, value),
                "padding-left" => set_length(&mut self.padding.left, value),
                "width" | "min-width" | "max-width" => {
                    if let Some(w) = parse_length(value) {
                        self.width = Some(w);
                    }
                }
                "border-radius" => set_length(&mut self.border_radius, value),
                "background" | "background-color" => {
                    if let Some(c) = Rgba::parse(value) {
                        self.background = Some(c);
                    }
                }
                "color" => {
                    if let Some(c) = Rgba::parse(value) {
                        self.color = Some(c);
                    }
                }
                "font-family" => {
                    if !value.is_empty() {
                        self.font_family = Some(value.to_string());
                    }
                }
                "font-weight" => {
                    self.bold = Some(matches!(value, "bold" | "bolder" | "600" | "700" | "800" | "900"));
                }
                "font-style" => self.italic = Some(value == "italic" || value == "oblique"),
                "overflow" => self.overflow_hidden = value == "hidden",
                "filter" => self.drop_shadow = value.starts_with("drop-shadow"),
                _ => {}
            }
        }
    }
}

fn set_length(slot: &mut f32, value: &str) {
    if let Some(v) = parse_length(value) {
        *slot = v;
    }
}

/// Parse a pixel length (`30px`, `30`, `0`). Negative values are rejected.
pub fn parse_length(value: &str) -> Option<f32> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v).trim();
    let n: f32 = v.parse().ok()?;
    (n >= 0.0 && n.is_finite()).then_some(n)
}

/// CSS shorthand with one to four lengths
fn parse_edges(value: &str) -> Option<Edges> {
    let vals: Option<Vec<f32>> = value.split_whitespace().map(parse_length).collect();
    let vals = vals?;
    let e = match vals.as_slice() {
        [a] => Edges::uniform(*a),
        [v, h] => Edges { top: *v, right: *h, bottom: *v, left: *h },
        [t, h, b] => Edges { top: *t, right: *h, bottom: *b, left: *h },
        [t, r, b, l] => Edges { top: *t, right: *r, bottom: *b, left: *l },
        _ => return None,
    };
    Some(e)
}
