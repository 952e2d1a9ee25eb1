//! DOM-like element tree backing a rendered card

pub mod style;

pub use style::{Display, Edges, Style};

use scraper::{ElementRef, Node as HtmlNode};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lower-case local name (`div`, `code`, `svg`, ...)
    pub tag: String,
    /// Attributes other than `style`, in document order
    pub attrs: Vec<(String, String)>,
    pub style: Style,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            style: Style::default(),
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
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

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    /// Elements laid out in the inline flow of their parent
    pub fn is_inline(&self) -> bool {
        match self.style.display {
            Some(Display::Inline) => true,
            Some(Display::Block) => false,
            None => matches!(self.tag.as_str(), "span" | "b" | "i" | "em" | "strong"),
        }
    }

    /// Inline SVG graphics are treated as opaque replaced content
    pub fn is_graphic(&self) -> bool {
        self.tag == "svg"
    }

    /// First descendant-or-self element with the given tag (pre-order)
    pub fn find_first(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter().find_map(|c| match c {
            Node::Element(e) => e.find_first(tag),
            Node::Text(_) => None,
        })
    }

    pub fn find_first_mut(&mut self, tag: &str) -> Option<&mut Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| match c {
            Node::Element(e) => e.find_first_mut(tag),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of all descendants, like `textContent`
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Build an element tree from parsed markup.
    ///
    /// `style` attributes are parsed into [`Style`] except inside inline SVG,
    /// where attributes are kept verbatim. Whitespace-only text nodes are
    /// dropped.
    pub fn from_html(el: ElementRef<'_>) -> Self {
        Self::convert(el, false)
    }

    fn convert(el: ElementRef<'_>, in_graphic: bool) -> Self {
        let value = el.value();
        let tag = value.name().to_ascii_lowercase();
        let in_graphic = in_graphic || tag == "svg";

        let mut out = Element::new(tag);
        for (name, v) in value.attrs() {
            if name == "style" && !in_graphic {
                out.style = Style::parse(v);
            } else {
                out.attrs.push((name.to_string(), v.to_string()));
            }
        }

        for child in el.children() {
            match child.value() {
                HtmlNode::Text(t) => {
                    let text = t.text.to_string();
                    if !text.trim().is_empty() {
                        out.children.push(Node::Text(text));
                    }
                }
                HtmlNode::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        out.children
                            .push(Node::Element(Self::convert(child_el, in_graphic)));
                    }
                }
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn converts_markup_with_styles_and_graphics() {
        let html = Html::parse_fragment(
            r#"<div class="a" style="padding: 4px"><span style="color: #fff">hi</span>
               <svg width="10" height="10"><circle cx="5" cy="5" r="5" style="fill:red"/></svg></div>"#,
        );
        let sel = Selector::parse("div.a").unwrap();
        let root = Element::from_html(html.select(&sel).next().unwrap());

        assert_eq!(root.tag, "div");
        assert_eq!(root.style.padding, Edges::uniform(4.0));
        assert!(root.has_class("a"));
        assert_eq!(root.children.len(), 2);

        let span = root.find_first("span").unwrap();
        assert!(span.is_inline());
        assert_eq!(span.text_content(), "hi");

        let circle = root.find_first("circle").unwrap();
        assert_eq!(circle.attr("style"), Some("fill:red"));
        assert_eq!(circle.attr("r"), Some("5"));
    }

    #[test]
    fn class_and_attr_helpers() {
        let mut e = Element::new("code");
        e.add_class("java");
        e.add_class("hljs");
        e.add_class("java");
        assert_eq!(e.attr("class"), Some("java hljs"));
        e.set_attr("class", "x");
        assert_eq!(e.attrs.len(), 1);
        assert!(!e.is_inline());
    }
}
