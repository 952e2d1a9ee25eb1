//! Card markup: the rendering layer's description of an editor card
//!
//! The card is written as markup with inline styles, parsed with `scraper`
//! and converted into a [`dom::Element`](crate::dom::Element) tree. The code
//! text itself is inserted after parsing so it never goes through the HTML
//! tokenizer.

use crate::dom::{Element, Node};
use crate::params::PresentationParameters;
use crate::{Error, Result};
use scraper::{Html, Selector};

/// Padding around the card on each side, in pixels
pub const OUTER_PADDING: u32 = 30;
/// Top padding of the code box, independent of the configured code padding
pub const CODE_PADDING_TOP: u32 = 10;
/// Rendered in place of code that is empty or whitespace only
pub const PLACEHOLDER: &str = "No Code";

const WINDOW_CONTROLS: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="54" height="14" viewBox="0 0 54 14"><g fill="none" fill-rule="evenodd" transform="translate(1 1)"><circle cx="6" cy="6" r="6" fill="#FF5F56" stroke="#E0443E" stroke-width=".5"/><circle cx="26" cy="6" r="6" fill="#FFBD2E" stroke="#DEA123" stroke-width=".5"/><circle cx="46" cy="6" r="6" fill="#27C93F" stroke="#1AAB29" stroke-width=".5"/></g></svg>"##;

/// Markup of the card for the given parameters, without the code text
pub fn card_markup(params: &PresentationParameters) -> String {
    format!(
        concat!(
            r#"<div class="snap" style="padding: {outer}px; width: {width}px">"#,
            r#"<div class="card" style="border-radius: 5px; filter: drop-shadow(0.2px 0.4px 0.2px rgba(0, 0, 0, 0.5))">"#,
            r#"<pre style="display: block">"#,
            r#"<code class="{lang}" style="display: block; border-radius: 5px; padding: {pad}px; padding-top: {pad_top}px; font-family: '{family}', monospace; overflow: hidden">"#,
            r#"<div class="window-controls" style="padding-bottom: 5px">{controls}</div>"#,
            r#"</code></pre></div></div>"#,
        ),
        outer = OUTER_PADDING,
        width = params.width,
        lang = language_class(&params.language),
        pad = params.code_padding,
        pad_top = CODE_PADDING_TOP,
        family = params.font.family(),
        controls = WINDOW_CONTROLS,
    )
}

/// Text shown in the code box
pub fn display_text(code: &str) -> &str {
    if code.trim().is_empty() {
        PLACEHOLDER
    } else {
        code
    }
}

/// Build a fresh, unhighlighted card tree
pub fn build_card(params: &PresentationParameters) -> Result<Element> {
    let markup = card_markup(params);
    let html = Html::parse_fragment(&markup);
    let selector = Selector::parse("div.snap")
        .map_err(|e| Error::RenderError(format!("Invalid card selector: {:?}", e)))?;
    let snap = html
        .select(&selector)
        .next()
        .ok_or_else(|| Error::RenderError("Card markup has no root element".into()))?;

    let mut root = Element::from_html(snap);
    let code = root
        .find_first_mut("code")
        .ok_or_else(|| Error::RenderError("Card markup has no code element".into()))?;
    code.children
        .push(Node::Text(display_text(&params.code).to_string()));
    Ok(root)
}

// Keep the class attribute to a plain token.
fn language_class(language: &str) -> String {
    language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FontChoice;

    #[test]
    fn builds_card_structure() {
        let params = PresentationParameters::default().with_code("int x = 1;");
        let root = build_card(&params).unwrap();

        assert_eq!(root.tag, "div");
        assert!(root.has_class("snap"));
        assert_eq!(root.style.width, Some(800.0));
        assert_eq!(root.style.padding.left, 30.0);

        let card = root.find_first("pre").unwrap();
        assert_eq!(card.tag, "pre");

        let code = root.find_first("code").unwrap();
        assert!(code.has_class("java"));
        assert_eq!(code.style.padding.top, 10.0);
        assert_eq!(code.style.padding.left, 15.0);
        assert!(code.style.overflow_hidden);
        assert_eq!(
            code.style.font_family.as_deref(),
            Some("'JetBrains Mono', monospace")
        );
        assert_eq!(code.text_content(), "int x = 1;");
        assert_eq!(root.find_first("circle").and_then(|c| c.attr("fill")), Some("#FF5F56"));
    }

    #[test]
    fn whitespace_code_shows_placeholder() {
        let params = PresentationParameters::default().with_code("  \n\t ");
        let root = build_card(&params).unwrap();
        assert_eq!(root.find_first("code").unwrap().text_content(), PLACEHOLDER);
    }

    #[test]
    fn markup_like_code_is_kept_verbatim() {
        let params = PresentationParameters::default()
            .with_code("<div>not markup</div>")
            .with_font(FontChoice::Hack);
        let root = build_card(&params).unwrap();
        let code = root.find_first("code").unwrap();
        assert_eq!(code.text_content(), "<div>not markup</div>");
        assert!(code.style.font_family.as_deref().unwrap().contains("Hack"));
    }

    #[test]
    fn language_class_strips_markup() {
        assert_eq!(language_class("c++"), "c++");
        assert_eq!(language_class("x\" onclick=\"y"), "xonclicky");
    }
}
