/// Block and monospace line layout for card trees
///
/// Blocks stack vertically inside their parent's content box. Text and inline
/// elements form an inline flow which is broken into lines at `\n` only
/// (`white-space: pre`); glyphs advance by a fixed per-character width.

use crate::color::Rgba;
use crate::dom::{Edges, Element, Node, Style};
use crate::dom::style::parse_length;

/// Columns per tab stop
const TAB_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        Rect::new(x, y, (r - x).max(0.0), (b - y).max(0.0))
    }
}

/// Font metrics shared by every line of a card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub font_size: f32,
    pub line_height: f32,
    /// Horizontal advance of one character, in pixels
    pub char_advance: f32,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            line_height: 21.0,
            char_advance: 8.4,
        }
    }
}

/// Inherited text properties resolved while walking the tree
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: Rgba,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            font_family: "monospace".to_string(),
            bold: false,
            italic: false,
        }
    }
}

impl TextStyle {
    fn inherit(&self, style: &Style) -> TextStyle {
        TextStyle {
            color: style.color.unwrap_or(self.color),
            font_family: style
                .font_family
                .clone()
                .unwrap_or_else(|| self.font_family.clone()),
            bold: style.bold.unwrap_or(self.bold),
            italic: style.italic.unwrap_or(self.italic),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub text: String,
    pub color: Rgba,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineBox {
    pub rect: Rect,
    pub baseline: f32,
    pub font_family: String,
    pub font_size: f32,
    pub runs: Vec<TextRun>,
}

impl LineBox {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Replaced content (inline SVG) positioned in the flow
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicBox {
    pub rect: Rect,
    pub element: Element,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Block(LayoutBox),
    Line(LineBox),
    Graphic(GraphicBox),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub tag: String,
    pub class: Option<String>,
    /// Border box (there are no borders, so also the padding box)
    pub rect: Rect,
    pub padding: Edges,
    pub style: Style,
    pub children: Vec<LayoutItem>,
}

impl LayoutBox {
    pub fn content_width(&self) -> f32 {
        (self.rect.width - self.padding.horizontal()).max(0.0)
    }

    pub fn clips(&self) -> bool {
        self.style.overflow_hidden
    }

    /// All lines in document order
    pub fn lines(&self) -> Vec<&LineBox> {
        let mut out = Vec::new();
        self.collect_lines(&mut out);
        out
    }

    fn collect_lines<'a>(&'a self, out: &mut Vec<&'a LineBox>) {
        for item in &self.children {
            match item {
                LayoutItem::Line(l) => out.push(l),
                LayoutItem::Block(b) => b.collect_lines(out),
                LayoutItem::Graphic(_) => {}
            }
        }
    }

    /// Plain text of all lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines()
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lay out a card rooted at `root`, placing its border box at the origin.
///
/// A root without a fixed width is sized to its widest line.
pub fn layout_tree(root: &Element, metrics: TextMetrics) -> LayoutBox {
    let avail = match root.style.width {
        Some(_) => 0.0,
        None => intrinsic_width(root, metrics),
    };
    layout_block(root, 0.0, 0.0, avail, &TextStyle::default(), metrics)
}

fn layout_block(
    el: &Element,
    x: f32,
    y: f32,
    avail_width: f32,
    inherited: &TextStyle,
    metrics: TextMetrics,
) -> LayoutBox {
    let pad = el.style.padding;
    let border_width = el
        .style
        .width
        .map(|w| w + pad.horizontal())
        .unwrap_or(avail_width);
    let content_x = x + pad.left;
    let content_y = y + pad.top;
    let content_w = (border_width - pad.horizontal()).max(0.0);
    let text_style = inherited.inherit(&el.style);

    let mut cursor = content_y;
    let mut items = Vec::new();
    let mut flow: Vec<(String, TextStyle)> = Vec::new();

    for child in &el.children {
        match child {
            Node::Text(t) => flow.push((t.clone(), text_style.clone())),
            Node::Element(e) if e.is_graphic() => {
                cursor = flush_flow(&mut flow, content_x, cursor, content_w, metrics, &mut items);
                let (w, h) = graphic_size(e);
                items.push(LayoutItem::Graphic(GraphicBox {
                    rect: Rect::new(content_x, cursor, w, h),
                    element: e.clone(),
                }));
                cursor += h;
            }
            Node::Element(e) if e.is_inline() => collect_inline(e, &text_style, &mut flow),
            Node::Element(e) => {
                cursor = flush_flow(&mut flow, content_x, cursor, content_w, metrics, &mut items);
                let b = layout_block(e, content_x, cursor, content_w, &text_style, metrics);
                cursor += b.rect.height;
                items.push(LayoutItem::Block(b));
            }
        }
    }
    cursor = flush_flow(&mut flow, content_x, cursor, content_w, metrics, &mut items);

    LayoutBox {
        tag: el.tag.clone(),
        class: el.attr("class").map(str::to_string),
        rect: Rect::new(x, y, border_width, (cursor - content_y) + pad.vertical()),
        padding: pad,
        style: el.style.clone(),
        children: items,
    }
}

fn collect_inline(el: &Element, inherited: &TextStyle, flow: &mut Vec<(String, TextStyle)>) {
    let style = inherited.inherit(&el.style);
    for child in &el.children {
        match child {
            Node::Text(t) => flow.push((t.clone(), style.clone())),
            Node::Element(e) => collect_inline(e, &style, flow),
        }
    }
}

/// Turn pending inline content into line boxes; returns the new cursor
fn flush_flow(
    flow: &mut Vec<(String, TextStyle)>,
    x: f32,
    mut y: f32,
    width: f32,
    metrics: TextMetrics,
    items: &mut Vec<LayoutItem>,
) -> f32 {
    if flow.is_empty() {
        return y;
    }
    let family = flow[0].1.font_family.clone();
    let mut lines: Vec<Vec<(String, TextStyle, usize)>> = vec![Vec::new()];
    let mut column = 0usize;

    for (text, style) in flow.drain(..) {
        let mut pending = String::new();
        let mut start = column;
        for ch in text.chars() {
            match ch {
                '\n' => {
                    if !pending.is_empty() {
                        if let Some(line) = lines.last_mut() {
                            line.push((std::mem::take(&mut pending), style.clone(), start));
                        }
                    }
                    lines.push(Vec::new());
                    column = 0;
                    start = 0;
                }
                '\r' => {}
                '\t' => {
                    let spaces = TAB_SIZE - column % TAB_SIZE;
                    pending.extend(std::iter::repeat(' ').take(spaces));
                    column += spaces;
                }
                c => {
                    pending.push(c);
                    column += 1;
                }
            }
        }
        if !pending.is_empty() {
            if let Some(line) = lines.last_mut() {
                line.push((pending, style, start));
            }
        }
    }

    // A trailing newline does not open another line box
    if lines.len() > 1 && lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    for segments in lines {
        let rect = Rect::new(x, y, width, metrics.line_height);
        let baseline = y + (metrics.line_height + metrics.font_size * 0.7) / 2.0;
        let runs = segments
            .into_iter()
            .map(|(text, style, col)| TextRun {
                x: x + col as f32 * metrics.char_advance,
                text,
                color: style.color,
                bold: style.bold,
                italic: style.italic,
            })
            .collect();
        items.push(LayoutItem::Line(LineBox {
            rect,
            baseline,
            font_family: family.clone(),
            font_size: metrics.font_size,
            runs,
        }));
        y += metrics.line_height;
    }
    y
}

fn graphic_size(el: &Element) -> (f32, f32) {
    let w = el.attr("width").and_then(parse_length).unwrap_or(0.0);
    let h = el.attr("height").and_then(parse_length).unwrap_or(0.0);
    (w, h)
}

// Width of the widest line plus horizontal padding, for roots without a width.
fn intrinsic_width(el: &Element, metrics: TextMetrics) -> f32 {
    let longest = el
        .text_content()
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    longest as f32 * metrics.char_advance + el.style.padding.horizontal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PresentationParameters;
    use crate::rendering::template::build_card;

    fn span(text: &str, color: Rgba) -> Node {
        let mut s = Element::new("span").with_text(text);
        s.style.color = Some(color);
        Node::Element(s)
    }

    #[test]
    fn card_width_includes_outer_padding() {
        let params = PresentationParameters::default()
            .with_width(800)
            .with_code_padding(15)
            .with_code("a very long line ".repeat(100));
        let root = build_card(&params).unwrap();
        let layout = layout_tree(&root, TextMetrics::default());
        assert_eq!(layout.rect.width, 860.0);
        assert_eq!(layout.content_width(), 800.0);
    }

    #[test]
    fn card_height_follows_line_count() {
        let m = TextMetrics::default();
        let one = layout_tree(&build_card(&PresentationParameters::default().with_code("a")).unwrap(), m);
        let three = layout_tree(
            &build_card(&PresentationParameters::default().with_code("a\nb\nc\n")).unwrap(),
            m,
        );
        assert_eq!(three.rect.height - one.rect.height, 2.0 * m.line_height);
        // 30 + 10 + 14 + 5 + 21 + 15 + 30
        assert_eq!(one.rect.height, 125.0);
    }

    #[test]
    fn inline_runs_share_lines_and_advance_by_column() {
        let mut code = Element::new("code");
        code.children.push(span("ab", Rgba::rgb(1, 0, 0)));
        code.children.push(span("c\nd", Rgba::rgb(0, 1, 0)));
        code.style.width = Some(100.0);
        let m = TextMetrics::default();
        let layout = layout_tree(&code, m);

        let lines = layout.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].runs.len(), 2);
        assert_eq!(lines[0].runs[1].x, 2.0 * m.char_advance);
        assert_eq!(lines[0].runs[1].color, Rgba::rgb(0, 1, 0));
        assert_eq!(lines[1].text(), "d");
        assert_eq!(layout.text(), "abc\nd");
    }

    #[test]
    fn tabs_expand_to_stops() {
        let code = Element::new("code").with_text("a\tb");
        let layout = layout_tree(&code, TextMetrics::default());
        assert_eq!(layout.lines()[0].text(), "a       b");
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersect(&b), Rect::new(5.0, 5.0, 5.0, 5.0));
        let c = Rect::new(20.0, 20.0, 1.0, 1.0);
        assert_eq!(a.intersect(&c).width, 0.0);
    }
}
