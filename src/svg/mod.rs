//! SVG document model and the vector capture pipeline stages
//!
//! - [`serialize`]: layout tree to SVG document
//! - [`inline`]: embed external resources
//! - [`postprocess`]: font-face substitution and the drop-shadow filter

pub mod inline;
pub mod postprocess;
pub mod serialize;

use crate::dom::{Element, Node};
use std::fmt;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

#[derive(Debug, Clone, PartialEq)]
pub enum SvgNode {
    Element(SvgElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<SvgNode>,
}

impl SvgElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn attr(mut self, name: &str, value: impl ToString) -> Self {
        self.set_attr(name, value.to_string());
        self
    }

    pub fn child(mut self, child: SvgElement) -> Self {
        self.children.push(SvgNode::Element(child));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(SvgNode::Text(text.into()));
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn append(&mut self, child: SvgElement) {
        self.children.push(SvgNode::Element(child));
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![SvgNode::Text(text.into())];
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            match c {
                SvgNode::Text(t) => out.push_str(t),
                SvgNode::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }

    /// First descendant-or-self element with the given name (pre-order)
    pub fn find_first(&self, name: &str) -> Option<&SvgElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| match c {
            SvgNode::Element(e) => e.find_first(name),
            SvgNode::Text(_) => None,
        })
    }

    pub fn find_first_mut(&mut self, name: &str) -> Option<&mut SvgElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| match c {
            SvgNode::Element(e) => e.find_first_mut(name),
            SvgNode::Text(_) => None,
        })
    }

    /// Visit every descendant-or-self element
    pub fn walk(&self, f: &mut impl FnMut(&SvgElement)) {
        f(self);
        for c in &self.children {
            if let SvgNode::Element(e) = c {
                e.walk(f);
            }
        }
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut SvgElement)) {
        f(self);
        for c in &mut self.children {
            if let SvgNode::Element(e) = c {
                e.walk_mut(f);
            }
        }
    }

    /// Number of descendant-or-self elements with the given name
    pub fn count(&self, name: &str) -> usize {
        let mut n = 0;
        self.walk(&mut |e| {
            if e.name == name {
                n += 1;
            }
        });
        n
    }

    /// Copy a DOM element subtree (used for inline SVG graphics)
    pub fn from_dom(el: &Element) -> Self {
        let mut out = SvgElement::new(el.tag.clone());
        out.attrs = el.attrs.clone();
        for c in &el.children {
            match c {
                Node::Element(e) => out.append(SvgElement::from_dom(e)),
                Node::Text(t) => out.children.push(SvgNode::Text(t.clone())),
            }
        }
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_into(v, true, out);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for c in &self.children {
            match c {
                SvgNode::Element(e) => e.write_to(out),
                SvgNode::Text(t) => escape_into(t, false, out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl fmt::Display for SvgElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out);
        f.write_str(&out)
    }
}

/// A standalone SVG document: an `<svg>` root element
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub root: SvgElement,
}

impl SvgDocument {
    pub fn new(width: f32, height: f32) -> Self {
        let root = SvgElement::new("svg")
            .attr("xmlns", SVG_NS)
            .attr("xmlns:xlink", XLINK_NS)
            .attr("width", fmt_num(width))
            .attr("height", fmt_num(height))
            .attr("viewBox", format!("0 0 {} {}", fmt_num(width), fmt_num(height)));
        Self { root }
    }

    /// Serialize to XML text
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.root.write_to(&mut out);
        out
    }
}

impl fmt::Display for SvgDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

// Characters XML 1.0 cannot carry (C0 controls other than tab, LF and CR,
// U+FFFE, U+FFFF) are written as U+FFFD; whitespace in attributes is escaped
// so parsers do not normalize it away.
fn escape_into(s: &str, attr: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            '\t' if attr => out.push_str("&#9;"),
            '\n' if attr => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' | '\n' => out.push(c),
            c if is_xml_char(c) => out.push(c),
            _ => out.push(char::REPLACEMENT_CHARACTER),
        }
    }
}

fn is_xml_char(c: char) -> bool {
    !(c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}')
}

/// Format a coordinate without a trailing `.0` and with at most 3 decimals
pub fn fmt_num(v: f32) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{:.3}", rounded);
        s.trim_end_matches('0').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_nested_elements_with_escaping() {
        let doc = SvgElement::new("g")
            .attr("data-x", "a\"b")
            .child(SvgElement::new("text").text("x < y && z"))
            .child(SvgElement::new("rect").attr("width", 3));
        assert_eq!(
            doc.to_string(),
            r#"<g data-x="a&quot;b"><text>x &lt; y &amp;&amp; z</text><rect width="3"/></g>"#
        );
    }

    #[test]
    fn document_root_carries_namespace_and_viewbox() {
        let doc = SvgDocument::new(860.0, 125.5);
        let xml = doc.to_xml();
        assert!(xml.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(xml.contains("viewBox=\"0 0 860 125.5\""));
    }

    #[test]
    fn find_and_count() {
        let mut root = SvgElement::new("svg")
            .child(SvgElement::new("g").child(SvgElement::new("text").text("a")))
            .child(SvgElement::new("text").text("b"));
        assert_eq!(root.count("text"), 2);
        assert_eq!(root.find_first("text").map(|t| t.text_content()), Some("a".to_string()));
        root.find_first_mut("g").unwrap().set_text("replaced");
        assert_eq!(root.count("text"), 1);
    }

    #[test]
    fn characters_outside_xml_are_replaced() {
        let el = SvgElement::new("text")
            .attr("data-x", "a\u{1}\tb")
            .text("int a;\u{0C}\nint\u{0} b;\r\u{FFFF}");
        assert_eq!(
            el.to_string(),
            "<text data-x=\"a\u{FFFD}&#9;b\">int a;\u{FFFD}\nint\u{FFFD} b;&#13;\u{FFFD}</text>"
        );
    }

    #[test]
    fn escaped_output_parses_as_svg() {
        let mut doc = SvgDocument::new(10.0, 10.0);
        doc.root.append(SvgElement::new("text").text("x\u{1}y\u{0C}z"));
        assert!(resvg::usvg::Tree::from_str(&doc.to_xml(), &resvg::usvg::Options::default()).is_ok());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_num(30.0), "30");
        assert_eq!(fmt_num(8.4), "8.4");
        assert_eq!(fmt_num(1.0 / 3.0), "0.333");
        assert_eq!(fmt_num(-2.5), "-2.5");
    }
}
