//! Resource inlining for SVG documents
//!
//! Rewrites every external reference in a document into a `data:` URL so the
//! result renders without network or filesystem access:
//!
//! - `href` / `xlink:href` of `<image>` elements
//! - `url(...)` values inside `style` attributes and `<style>` elements
//! - `@import` rules, replaced by the imported stylesheet text
//!
//! Fragment references (`#id`) and existing `data:` URLs are left alone.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::try_join_all;

use crate::fetch::{Resource, ResourceFetcher};
use crate::svg::{SvgDocument, SvgElement, SvgNode};
use crate::Result;

const HREF_ATTRS: &[&str] = &["href", "xlink:href"];

pub struct ResourceInliner {
    fetcher: Arc<dyn ResourceFetcher>,
}

impl ResourceInliner {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { fetcher }
    }

    /// Inline every external reference in `doc`; returns how many distinct
    /// resources were fetched. Any failed fetch fails the whole document.
    pub async fn inline_resources(&self, doc: &mut SvgDocument) -> Result<usize> {
        let mut refs = BTreeSet::new();
        let mut imports = BTreeSet::new();
        collect_references(&doc.root, &mut refs, &mut imports);

        if refs.is_empty() && imports.is_empty() {
            return Ok(0);
        }

        // Imported stylesheets may reference further resources
        let import_list: Vec<String> = imports.into_iter().collect();
        let sheets = try_join_all(import_list.iter().map(|r| self.fetcher.fetch(r))).await?;
        let mut import_text = HashMap::new();
        for (reference, sheet) in import_list.iter().zip(sheets) {
            let css = sheet.text();
            refs.extend(css_urls(&css).into_iter().filter(|u| is_external(u)));
            import_text.insert(reference.clone(), css);
        }

        let ref_list: Vec<String> = refs.into_iter().collect();
        let fetched: Vec<Resource> =
            try_join_all(ref_list.iter().map(|r| self.fetcher.fetch(r))).await?;
        let data_urls: HashMap<String, String> = ref_list
            .iter()
            .cloned()
            .zip(fetched.iter().map(Resource::to_data_url))
            .collect();

        rewrite(&mut doc.root, &import_text, &data_urls);

        let total = import_text.len() + data_urls.len();
        log::debug!("inlined {} external resources", total);
        Ok(total)
    }
}

fn is_external(reference: &str) -> bool {
    let r = reference.trim();
    !r.is_empty() && !r.starts_with('#') && !r.starts_with("data:")
}

fn collect_references(el: &SvgElement, refs: &mut BTreeSet<String>, imports: &mut BTreeSet<String>) {
    el.walk(&mut |e| {
        if e.name == "image" {
            for attr in HREF_ATTRS {
                if let Some(href) = e.get_attr(attr).filter(|h| is_external(h)) {
                    refs.insert(href.trim().to_string());
                }
            }
        }
        if let Some(style) = e.get_attr("style") {
            refs.extend(css_urls(style).into_iter().filter(|u| is_external(u)));
        }
        if e.name == "style" {
            let css = e.text_content();
            imports.extend(css_imports(&css).into_iter().filter(|u| is_external(u)));
            refs.extend(
                css_urls(&strip_imports(&css))
                    .into_iter()
                    .filter(|u| is_external(u)),
            );
        }
    });
}

fn rewrite(el: &mut SvgElement, imports: &HashMap<String, String>, urls: &HashMap<String, String>) {
    el.walk_mut(&mut |e| {
        if e.name == "image" {
            for attr in HREF_ATTRS {
                if let Some(data) = e.get_attr(attr).and_then(|h| urls.get(h.trim())).cloned() {
                    e.set_attr(attr, data);
                }
            }
        }
        if let Some(style) = e.get_attr("style").map(str::to_string) {
            e.set_attr("style", replace_css_urls(&style, urls));
        }
        if e.name == "style" {
            let css = e.text_content();
            let expanded = expand_imports(&css, imports, true);
            e.children = vec![SvgNode::Text(replace_css_urls(&expanded, urls))];
        }
    });
}

/// Every `url(...)` target in a CSS fragment, unquoted
pub(crate) fn css_urls(css: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = css;
    while let Some(start) = rest.find("url(") {
        let after = &rest[start + 4..];
        let Some(end) = after.find(')') else { break };
        out.push(unquote(&after[..end]).to_string());
        rest = &after[end + 1..];
    }
    out
}

fn replace_css_urls(css: &str, urls: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("url(") {
        let after = &rest[start + 4..];
        let Some(end) = after.find(')') else { break };
        out.push_str(&rest[..start]);
        let target = unquote(&after[..end]);
        match urls.get(target) {
            Some(data) => {
                out.push_str("url(");
                out.push_str(data);
                out.push(')');
            }
            None => out.push_str(&rest[start..start + 4 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Targets of `@import "x";` and `@import url(x);` rules
fn css_imports(css: &str) -> Vec<String> {
    import_rules(css).into_iter().map(|(_, target)| target).collect()
}

fn strip_imports(css: &str) -> String {
    expand_imports(css, &HashMap::new(), false)
}

// Replace each @import rule with the imported text. Rules without fetched
// text are kept or dropped according to `keep_unknown`.
fn expand_imports(css: &str, imports: &HashMap<String, String>, keep_unknown: bool) -> String {
    let mut out = String::with_capacity(css.len());
    let mut last = 0;
    for ((start, end), target) in import_rules(css) {
        out.push_str(&css[last..start]);
        match imports.get(&target) {
            Some(text) => out.push_str(text),
            None if keep_unknown => out.push_str(&css[start..end]),
            None => {}
        }
        last = end;
    }
    out.push_str(&css[last..]);
    out
}

/// (byte range of the rule including `;`, target)
fn import_rules(css: &str) -> Vec<((usize, usize), String)> {
    let mut out = Vec::new();
    let mut offset = 0;
    while let Some(pos) = css[offset..].find("@import") {
        let start = offset + pos;
        let body_start = start + "@import".len();
        let end = css[body_start..]
            .find(';')
            .map(|i| body_start + i + 1)
            .unwrap_or(css.len());
        let body = css[body_start..end].trim_end_matches(';').trim();
        let target = match body.strip_prefix("url(") {
            Some(inner) => unquote(inner.split(')').next().unwrap_or("")),
            None => {
                // a quoted string, optionally followed by media queries
                let q = body.chars().next().filter(|c| *c == '"' || *c == '\'');
                match q {
                    Some(q) => body[1..].split(q).next().unwrap_or(""),
                    None => body.split_whitespace().next().unwrap_or(""),
                }
            }
        };
        out.push(((start, end), target.to_string()));
        offset = end;
    }
    out
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'')
}
