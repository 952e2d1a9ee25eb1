//! Layout tree to SVG document
//!
//! Every layout box becomes a `<g>` carrying its tag and class, backgrounds
//! become rounded `<rect>`s, and each line box becomes one `<text>` element
//! with a `<tspan>` per styled run. The document opens with a `<style>`
//! element that references the card's font family; post-processing swaps its
//! content for the embedded font faces.

use crate::rendering::layout::{LayoutBox, LayoutItem, LineBox, Rect};
use crate::svg::{fmt_num, SvgDocument, SvgElement};

/// Serialize a laid-out card. The document is sized to the root's border box.
pub fn element_to_svg(root: &LayoutBox) -> SvgDocument {
    let mut doc = SvgDocument::new(root.rect.width, root.rect.height);
    let family = root
        .lines()
        .first()
        .map(|l| primary_family(&l.font_family))
        .unwrap_or_else(|| "monospace".to_string());
    doc.root.append(SvgElement::new("style").text(base_stylesheet(&family)));

    let mut clips = 0usize;
    doc.root.append(serialize_box(root, &mut clips));
    doc
}

fn base_stylesheet(family: &str) -> String {
    format!(
        "@font-face {{ font-family: \"{0}\"; src: local(\"{0}\"); }}\ntext {{ white-space: pre; }}",
        family
    )
}

/// First family of a CSS `font-family` list, unquoted
fn primary_family(list: &str) -> String {
    list.split(',')
        .next()
        .unwrap_or(list)
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

fn serialize_box(b: &LayoutBox, clips: &mut usize) -> SvgElement {
    let mut g = SvgElement::new("g").attr("data-tag", &b.tag);
    if let Some(class) = &b.class {
        g.set_attr("class", class.as_str());
    }
    if b.style.drop_shadow {
        g.set_attr("filter", "url(#shadow)");
    }

    if let Some(bg) = b.style.background.filter(|c| !c.is_transparent()) {
        g.append(rect_element(&b.rect, b.style.border_radius).attr("fill", bg));
    }

    // Clipping boxes keep their content in a nested group
    let mut content = if b.clips() {
        *clips += 1;
        let id = format!("clip-{}", clips);
        g.append(
            SvgElement::new("clipPath")
                .attr("id", &id)
                .child(rect_element(&b.rect, b.style.border_radius)),
        );
        Some(SvgElement::new("g").attr("clip-path", format!("url(#{})", id)))
    } else {
        None
    };

    for item in &b.children {
        let child = match item {
            LayoutItem::Block(child) => serialize_box(child, clips),
            LayoutItem::Line(line) => match line_element(line) {
                Some(t) => t,
                None => continue,
            },
            LayoutItem::Graphic(graphic) => {
                let mut svg = SvgElement::from_dom(&graphic.element);
                svg.set_attr("x", fmt_num(graphic.rect.x));
                svg.set_attr("y", fmt_num(graphic.rect.y));
                svg.set_attr("width", fmt_num(graphic.rect.width));
                svg.set_attr("height", fmt_num(graphic.rect.height));
                svg
            }
        };
        match content.as_mut() {
            Some(inner) => inner.append(child),
            None => g.append(child),
        }
    }

    if let Some(inner) = content {
        g.append(inner);
    }
    g
}

fn rect_element(rect: &Rect, radius: f32) -> SvgElement {
    let mut el = SvgElement::new("rect")
        .attr("x", fmt_num(rect.x))
        .attr("y", fmt_num(rect.y))
        .attr("width", fmt_num(rect.width))
        .attr("height", fmt_num(rect.height));
    if radius > 0.0 {
        el.set_attr("rx", fmt_num(radius));
    }
    el
}

fn line_element(line: &LineBox) -> Option<SvgElement> {
    if line.runs.is_empty() {
        return None;
    }
    let mut text = SvgElement::new("text")
        .attr("xml:space", "preserve")
        .attr("y", fmt_num(line.baseline))
        .attr("font-family", &line.font_family)
        .attr("font-size", fmt_num(line.font_size));
    for run in &line.runs {
        let mut span = SvgElement::new("tspan")
            .attr("x", fmt_num(run.x))
            .attr("fill", run.color.to_hex());
        if run.color.a < 255 {
            span.set_attr("fill-opacity", fmt_num(run.color.opacity()));
        }
        if run.bold {
            span.set_attr("font-weight", "bold");
        }
        if run.italic {
            span.set_attr("font-style", "italic");
        }
        text.append(span.text(run.text.clone()));
    }
    Some(text)
}
