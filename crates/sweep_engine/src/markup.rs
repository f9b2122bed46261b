//! Markup walker: pulls URL-bearing attributes and inline script/style text
//! out of HTML.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use sweep_core::Source;
use url::Url;

use crate::Observation;

const DEFAULT_MAX_OBSERVATIONS: usize = 20_000;

/// Attributes whose values are handed to the normalizer as URLs.
pub const URL_ATTRIBUTES: [&str; 4] = ["href", "src", "action", "data-url"];

/// Elements whose `src` the browser requests while loading the page.
const REQUESTING_SRC_TAGS: [&str; 7] = ["script", "img", "iframe", "source", "video", "audio", "embed"];

pub struct MarkupWalker {
    max_observations: usize,
}

impl MarkupWalker {
    pub fn new() -> Self {
        Self::with_max_observations(DEFAULT_MAX_OBSERVATIONS)
    }

    pub fn with_max_observations(max_observations: usize) -> Self {
        Self { max_observations }
    }

    /// A loaded page: attributes tagged `HTML`, script text `JavaScript`,
    /// style text `CSS`.
    pub fn walk_document(&self, html: &str) -> Vec<Observation> {
        let document = Html::parse_document(html);
        let mut ctx = WalkContext::new(Source::Html, self.max_observations);
        visit_node(document.tree.root(), &mut ctx);
        ctx.observations
    }

    /// Markup inserted after load: attributes tagged `Dynamic`. Inline
    /// scripts and styles are still tagged by kind.
    pub fn walk_fragment(&self, html: &str) -> Vec<Observation> {
        let fragment = Html::parse_fragment(html);
        let mut ctx = WalkContext::new(Source::Dynamic, self.max_observations);
        visit_node(fragment.tree.root(), &mut ctx);
        ctx.observations
    }

    /// Absolute URLs the browser would request while loading `html`: `src` of
    /// media and script elements and `href` of `<link>`.
    pub fn subresource_urls(&self, html: &str, base: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut urls = Vec::new();
        for node in document.tree.root().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            let tag = element.value().name();
            let reference = if REQUESTING_SRC_TAGS.contains(&tag) {
                element.value().attr("src")
            } else if tag == "link" {
                element.value().attr("href")
            } else {
                None
            };
            if let Some(url) = reference.and_then(|raw| resolve_url(raw, base)) {
                let url = String::from(url);
                if !urls.contains(&url) && urls.len() < self.max_observations {
                    urls.push(url);
                }
            }
        }
        urls
    }
}

impl Default for MarkupWalker {
    fn default() -> Self {
        Self::new()
    }
}

fn visit_node(node: NodeRef<'_, Node>, ctx: &mut WalkContext) {
    match node.value() {
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit_element(element, ctx);
            }
        }
        _ => {
            for child in node.children() {
                visit_node(child, ctx);
            }
        }
    }
}

fn visit_element(element: ElementRef<'_>, ctx: &mut WalkContext) {
    collect_attributes(element, ctx);
    match element.value().name() {
        "script" => ctx.add_text(element, Source::JavaScript),
        "style" => ctx.add_text(element, Source::Css),
        _ => {
            for child in element.children() {
                visit_node(child, ctx);
            }
        }
    }
}

fn collect_attributes(element: ElementRef<'_>, ctx: &mut WalkContext) {
    let source = ctx.attribute_source;
    for name in URL_ATTRIBUTES {
        if let Some(value) = element.value().attr(name) {
            let value = value.trim();
            if !value.is_empty() {
                ctx.push(Observation::url(value, source));
            }
        }
    }
}

fn resolve_url(reference: &str, base: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("data:") {
        return None;
    }
    base.join(trimmed).ok()
}

struct WalkContext {
    observations: Vec<Observation>,
    attribute_source: Source,
    max_observations: usize,
}

impl WalkContext {
    fn new(attribute_source: Source, max_observations: usize) -> Self {
        Self {
            observations: Vec::new(),
            attribute_source,
            max_observations,
        }
    }

    fn add_text(&mut self, element: ElementRef<'_>, source: Source) {
        let text: String = element.text().collect();
        if !text.trim().is_empty() {
            self.push(Observation::text(text, source));
        }
    }

    fn push(&mut self, observation: Observation) {
        if self.observations.len() < self.max_observations {
            self.observations.push(observation);
        }
    }
}
