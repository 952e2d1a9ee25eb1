/// Rasterizer for card subtrees
///
/// Backgrounds are filled directly with tiny-skia. Inline graphics and the
/// text layer are rendered through resvg so glyphs come from the same font
/// database as the bundled font files.

use std::sync::Arc;

use resvg::tiny_skia::{self, FillRule, Paint, PathBuilder, Pixmap, Transform};
use resvg::usvg;

use crate::color::Rgba;
use crate::fonts::FontLibrary;
use crate::rendering::layout::{layout_tree, Rect, TextMetrics};
use crate::rendering::paint::{build_display_list, PaintCommand};
use crate::rendering::VisualSubtree;
use crate::svg::{fmt_num, SvgElement, SVG_NS};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Backdrop color; `None` leaves the surface transparent
    pub background: Option<Rgba>,
    /// Device pixels per CSS pixel
    pub scale: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            background: None,
            scale: 1.0,
        }
    }
}

/// An off-screen RGBA bitmap
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Alpha of the pixel at (x, y), `None` when out of bounds
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixmap.pixel(x, y).map(|p| p.alpha())
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| Error::RenderError(format!("PNG encoding failed: {}", e)))
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Rasterization capability handed to raster capture
pub struct Rasterizer {
    fonts: Arc<FontLibrary>,
    metrics: TextMetrics,
}

impl Rasterizer {
    pub fn new(fonts: Arc<FontLibrary>, metrics: TextMetrics) -> Self {
        Self { fonts, metrics }
    }

    /// Lay out and paint `subtree` on a blocking worker
    pub async fn rasterize(
        &self,
        subtree: Arc<VisualSubtree>,
        options: RasterOptions,
    ) -> Result<Surface> {
        let fonts = self.fonts.clone();
        let metrics = self.metrics;
        tokio::task::spawn_blocking(move || {
            let layout = layout_tree(&subtree.root, metrics);
            let list = build_display_list(&layout);
            paint_surface(
                &list,
                layout.rect.width,
                layout.rect.height,
                &options,
                fonts.database(),
            )
        })
        .await?
    }
}

/// Paint a display list onto a new surface of `width` x `height` CSS pixels
pub fn paint_surface(
    list: &[PaintCommand],
    width: f32,
    height: f32,
    options: &RasterOptions,
    fontdb: Arc<usvg::fontdb::Database>,
) -> Result<Surface> {
    let scale = if options.scale.is_finite() && options.scale > 0.0 {
        options.scale
    } else {
        1.0
    };
    let w = ((width * scale).ceil() as u32).max(1);
    let h = ((height * scale).ceil() as u32).max(1);
    let mut pixmap = Pixmap::new(w, h)
        .ok_or_else(|| Error::RenderError(format!("Cannot allocate {}x{} surface", w, h)))?;

    if let Some(bg) = options.background {
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
    }

    let transform = Transform::from_scale(scale, scale);
    let mut texts = Vec::new();
    for cmd in list {
        match cmd {
            PaintCommand::FillRect { rect, radius, rgba } => {
                fill_rect(&mut pixmap, rect, *radius, *rgba, transform)
            }
            PaintCommand::Graphic { rect, markup } => render_markup(
                &mut pixmap,
                markup,
                transform.pre_translate(rect.x, rect.y),
                &fontdb,
            )?,
            PaintCommand::Text { .. } => texts.push(cmd),
        }
    }

    if !texts.is_empty() {
        let layer = text_layer(&texts, width, height);
        render_markup(&mut pixmap, &layer.to_string(), transform, &fontdb)?;
    }

    log::debug!("painted {} commands onto {}x{} surface", list.len(), w, h);
    Ok(Surface { pixmap })
}

fn fill_rect(pixmap: &mut Pixmap, rect: &Rect, radius: f32, rgba: Rgba, transform: Transform) {
    let Some(path) = rounded_rect_path(rect, radius) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba.r, rgba.g, rgba.b, rgba.a);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
}

fn rounded_rect_path(rect: &Rect, radius: f32) -> Option<tiny_skia::Path> {
    let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    if r == 0.0 {
        let r = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)?;
        return Some(PathBuilder::from_rect(r));
    }
    let (x, y, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.quad_to(right, y, right, y + r);
    pb.line_to(right, bottom - r);
    pb.quad_to(right, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.quad_to(x, bottom, x, bottom - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

fn render_markup(
    pixmap: &mut Pixmap,
    markup: &str,
    transform: Transform,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb = fontdb.clone();
    let tree = usvg::Tree::from_str(markup, &opt)
        .map_err(|e| Error::RenderError(format!("Invalid SVG fragment: {}", e)))?;
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(())
}

/// One SVG holding every text command, clipped per command
fn text_layer(texts: &[&PaintCommand], width: f32, height: f32) -> SvgElement {
    let mut root = SvgElement::new("svg")
        .attr("xmlns", SVG_NS)
        .attr("width", fmt_num(width))
        .attr("height", fmt_num(height))
        .attr("viewBox", format!("0 0 {} {}", fmt_num(width), fmt_num(height)));
    let mut defs = SvgElement::new("defs");
    let mut clips: Vec<Rect> = Vec::new();
    let mut body = Vec::new();

    for cmd in texts {
        let PaintCommand::Text { x, baseline, text, rgba, bold, italic, family, size, clip } = cmd else {
            continue;
        };
        let mut el = SvgElement::new("text")
            .attr("x", fmt_num(*x))
            .attr("y", fmt_num(*baseline))
            .attr("font-family", family)
            .attr("font-size", fmt_num(*size))
            .attr("fill", rgba.to_hex())
            .attr("xml:space", "preserve");
        if rgba.a < 255 {
            el.set_attr("fill-opacity", fmt_num(rgba.opacity()));
        }
        if *bold {
            el.set_attr("font-weight", "bold");
        }
        if *italic {
            el.set_attr("font-style", "italic");
        }
        if let Some(c) = clip {
            let idx = match clips.iter().position(|r| r == c) {
                Some(i) => i,
                None => {
                    clips.push(*c);
                    defs.append(
                        SvgElement::new("clipPath")
                            .attr("id", format!("clip-{}", clips.len() - 1))
                            .child(
                                SvgElement::new("rect")
                                    .attr("x", fmt_num(c.x))
                                    .attr("y", fmt_num(c.y))
                                    .attr("width", fmt_num(c.width))
                                    .attr("height", fmt_num(c.height)),
                            ),
                    );
                    clips.len() - 1
                }
            };
            el.set_attr("clip-path", format!("url(#clip-{})", idx));
        }
        body.push(el.text(text.clone()));
    }

    if !clips.is_empty() {
        root.append(defs);
    }
    for el in body {
        root.append(el);
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_db() -> Arc<usvg::fontdb::Database> {
        Arc::new(usvg::fontdb::Database::new())
    }

    #[test]
    fn transparent_by_default_and_filled_inside_rect() {
        let list = vec![PaintCommand::FillRect {
            rect: Rect::new(10.0, 10.0, 20.0, 20.0),
            radius: 5.0,
            rgba: Rgba::rgb(255, 0, 0),
        }];
        let s = paint_surface(&list, 40.0, 40.0, &RasterOptions::default(), empty_db()).unwrap();
        assert_eq!((s.width(), s.height()), (40, 40));
        assert_eq!(s.alpha_at(1, 1), Some(0));
        assert_eq!(s.alpha_at(20, 20), Some(255));
        // rounded corner leaves the very corner pixel empty
        assert_eq!(s.alpha_at(10, 10), Some(0));
        assert_eq!(s.alpha_at(45, 45), None);
    }

    #[test]
    fn background_option_fills_surface() {
        let opts = RasterOptions {
            background: Some(Rgba::WHITE),
            scale: 1.0,
        };
        let s = paint_surface(&[], 8.0, 8.0, &opts, empty_db()).unwrap();
        assert_eq!(s.alpha_at(0, 0), Some(255));
    }

    #[test]
    fn scale_multiplies_dimensions() {
        let opts = RasterOptions {
            background: None,
            scale: 2.0,
        };
        let s = paint_surface(&[], 10.5, 4.0, &opts, empty_db()).unwrap();
        assert_eq!((s.width(), s.height()), (21, 8));
    }

    #[test]
    fn graphics_render_through_svg() {
        let list = vec![PaintCommand::Graphic {
            rect: Rect::new(2.0, 2.0, 10.0, 10.0),
            markup: r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><circle cx="5" cy="5" r="5" fill="#27C93F"/></svg>"##.to_string(),
        }];
        let s = paint_surface(&list, 20.0, 20.0, &RasterOptions::default(), empty_db()).unwrap();
        assert_eq!(s.alpha_at(7, 7), Some(255));
        assert_eq!(s.alpha_at(18, 18), Some(0));
    }

    #[test]
    fn text_layer_shares_clip_paths() {
        let clip = Some(Rect::new(0.0, 0.0, 50.0, 20.0));
        let a = PaintCommand::Text {
            x: 0.0,
            baseline: 10.0,
            text: "a".into(),
            rgba: Rgba::BLACK,
            bold: true,
            italic: false,
            family: "monospace".into(),
            size: 14.0,
            clip,
        };
        let b = PaintCommand::Text {
            x: 8.4,
            baseline: 10.0,
            text: "b".into(),
            rgba: Rgba::BLACK,
            bold: false,
            italic: false,
            family: "monospace".into(),
            size: 14.0,
            clip,
        };
        let layer = text_layer(&[&a, &b], 50.0, 20.0);
        assert_eq!(layer.count("clipPath"), 1);
        assert_eq!(layer.count("text"), 2);
        let xml = layer.to_string();
        assert!(xml.contains("font-weight=\"bold\""));
        assert!(xml.contains("xml:space=\"preserve\""));
    }

    #[test]
    fn png_encoding_has_signature() {
        let s = paint_surface(&[], 4.0, 4.0, &RasterOptions::default(), empty_db()).unwrap();
        let png = s.encode_png().unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    }
}
