//! Post-capture augmentation of SVG documents
//!
//! Pure transforms over [`SvgDocument`]: no I/O, no serialization.

use crate::fonts::FontFace;
use crate::svg::{SvgDocument, SvgElement, SvgNode};

pub const SHADOW_FILTER_ID: &str = "shadow";

/// Replace the content of the document's `<style>` element with the font's
/// face definitions, creating the element if the document has none.
pub fn embed_font(doc: &mut SvgDocument, face: &FontFace) {
    match doc.root.find_first_mut("style") {
        Some(style) => style.set_text(face.css.to_string()),
        None => doc
            .root
            .children
            .insert(0, SvgNode::Element(SvgElement::new("style").text(face.css.to_string()))),
    }
}

/// Append `<defs><filter id="shadow">` unless the document already has it
pub fn append_shadow_filter(doc: &mut SvgDocument) {
    if has_shadow_filter(doc) {
        return;
    }
    let filter = SvgElement::new("filter").attr("id", SHADOW_FILTER_ID).child(
        SvgElement::new("feDropShadow")
            .attr("dx", "0.2")
            .attr("dy", "0.4")
            .attr("stdDeviation", "0.2"),
    );
    doc.root.append(SvgElement::new("defs").child(filter));
}

fn has_shadow_filter(doc: &SvgDocument) -> bool {
    let mut found = false;
    doc.root.walk(&mut |e| {
        if e.name == "filter" && e.get_attr("id") == Some(SHADOW_FILTER_ID) {
            found = true;
        }
    });
    found
}

/// Font-face substitution followed by the shadow filter
pub fn finalize(mut doc: SvgDocument, face: &FontFace) -> SvgDocument {
    embed_font(&mut doc, face);
    append_shadow_filter(&mut doc);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FontChoice;

    fn face(css: &str) -> FontFace {
        FontFace {
            font: FontChoice::Hack,
            css: css.into(),
            embedded_faces: 1,
        }
    }

    #[test]
    fn style_content_is_replaced() {
        let mut doc = SvgDocument::new(1.0, 1.0);
        doc.root.append(SvgElement::new("style").text("old"));
        embed_font(&mut doc, &face("@font-face { font-family: \"Hack\"; }"));
        assert_eq!(doc.root.count("style"), 1);
        assert_eq!(
            doc.root.find_first("style").unwrap().text_content(),
            "@font-face { font-family: \"Hack\"; }"
        );
    }

    #[test]
    fn missing_style_is_created_first() {
        let mut doc = SvgDocument::new(1.0, 1.0);
        doc.root.append(SvgElement::new("g"));
        embed_font(&mut doc, &face("x"));
        assert!(matches!(&doc.root.children[0], SvgNode::Element(e) if e.name == "style"));
    }

    #[test]
    fn finalize_is_idempotent() {
        let doc = SvgDocument::new(1.0, 1.0);
        let once = finalize(doc, &face("x"));
        let twice = finalize(once.clone(), &face("x"));
        assert_eq!(once, twice);
        assert_eq!(twice.root.count("defs"), 1);
        assert_eq!(twice.root.count("feDropShadow"), 1);
        assert!(twice
            .to_xml()
            .ends_with(r#"<defs><filter id="shadow"><feDropShadow dx="0.2" dy="0.4" stdDeviation="0.2"/></filter></defs></svg>"#));
    }
}
