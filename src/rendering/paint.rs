/// Display list for the raster path

use crate::color::Rgba;
use crate::rendering::layout::{LayoutBox, LayoutItem, Rect};
use crate::svg::{fmt_num, SvgElement, SVG_NS};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// Box background, optionally with rounded corners
    FillRect {
        rect: Rect,
        radius: f32,
        rgba: Rgba,
    },
    /// Standalone SVG markup drawn at `rect`
    Graphic { rect: Rect, markup: String },
    Text {
        x: f32,
        baseline: f32,
        text: String,
        rgba: Rgba,
        bold: bool,
        italic: bool,
        family: String,
        size: f32,
        clip: Option<Rect>,
    },
}

/// Flatten a layout tree into paint order (backgrounds before content).
///
/// Text is clipped to the nearest ancestor with `overflow: hidden`.
pub fn build_display_list(root: &LayoutBox) -> Vec<PaintCommand> {
    let mut out = Vec::new();
    paint_box(root, None, &mut out);
    out
}

fn paint_box(b: &LayoutBox, clip: Option<Rect>, out: &mut Vec<PaintCommand>) {
    if let Some(bg) = b.style.background.filter(|c| !c.is_transparent()) {
        out.push(PaintCommand::FillRect {
            rect: b.rect,
            radius: b.style.border_radius,
            rgba: bg,
        });
    }

    let clip = if b.clips() {
        Some(match clip {
            Some(outer) => outer.intersect(&b.rect),
            None => b.rect,
        })
    } else {
        clip
    };

    for item in &b.children {
        match item {
            LayoutItem::Block(child) => paint_box(child, clip, out),
            LayoutItem::Line(line) => {
                for run in &line.runs {
                    if run.text.trim().is_empty() {
                        continue;
                    }
                    out.push(PaintCommand::Text {
                        x: run.x,
                        baseline: line.baseline,
                        text: run.text.clone(),
                        rgba: run.color,
                        bold: run.bold,
                        italic: run.italic,
                        family: line.font_family.clone(),
                        size: line.font_size,
                        clip,
                    });
                }
            }
            LayoutItem::Graphic(g) => {
                let mut svg = SvgElement::from_dom(&g.element);
                svg.set_attr("xmlns", SVG_NS);
                svg.set_attr("width", fmt_num(g.rect.width));
                svg.set_attr("height", fmt_num(g.rect.height));
                out.push(PaintCommand::Graphic {
                    rect: g.rect,
                    markup: svg.to_string(),
                });
            }
        }
    }
}
