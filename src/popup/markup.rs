//! Popup markup: parsing the caller's content and emitting the popup's
//! element tree as HTML.
//!
//! The class names below are the attachment surface for external
//! stylesheets and must not change.

use url::Url;

use super::images::{ImageFit, ImageState};
use super::{CssLength, Popup};

pub const POPUP_CLASS: &str = "draggable-popup-window";
pub const AUTO_SIZE_CLASS: &str = "auto-size";
pub const FIXED_SIZE_CLASS: &str = "fixed-size";
pub const HEADER_CLASS: &str = "popup-header";
pub const CLOSE_CLASS: &str = "close-btn";
pub const CONTENT_CLASS: &str = "popup-content";
pub const FOOTER_CLASS: &str = "popup-footer";
pub const DONT_SHOW_TODAY_CLASS: &str = "dont-show-today";
pub const DONT_SHOW_TODAY_LABEL: &str = "오늘 하루 그만보기";

// ─── Content parsing ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    Text(String),
    Break,
    Image { src: String, alt: Option<String> },
}

/// Block-level view of the content: paragraphs of text and images, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Paragraph(&'a str),
    /// `index` counts images only, matching the popup's image list.
    Image { index: usize, src: &'a str, alt: Option<&'a str> },
}

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table", "blockquote",
];

/// Parse content markup into text runs, line breaks and images. Unknown
/// tags are dropped and their text kept.
pub fn parse_content(markup: &str) -> Vec<ContentNode> {
    let mut nodes = Vec::new();
    let mut text = String::new();
    let mut rest = markup;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            text.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let tag = &after[..close];
        rest = &after[close + 1..];

        let closing = tag.starts_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        if name == "img" && !closing {
            flush_text(&mut text, &mut nodes);
            let attrs = attributes(tag);
            let find = |key: &str| {
                attrs
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
            };
            nodes.push(ContentNode::Image {
                src: find("src").unwrap_or_default(),
                alt: find("alt").filter(|a| !a.is_empty()),
            });
        } else if name == "br" || (closing && BLOCK_TAGS.contains(&name.as_str())) {
            flush_text(&mut text, &mut nodes);
            nodes.push(ContentNode::Break);
        }
    }
    text.push_str(rest);
    flush_text(&mut text, &mut nodes);
    nodes
}

fn flush_text(text: &mut String, nodes: &mut Vec<ContentNode>) {
    let collapsed = decode_entities(&text.split_whitespace().collect::<Vec<_>>().join(" "));
    if !collapsed.is_empty() {
        nodes.push(ContentNode::Text(collapsed));
    }
    text.clear();
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Attributes of a tag body such as `img src="a.png" alt='x' width=3`.
fn attributes(tag: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = tag.trim_start_matches(|c: char| !c.is_whitespace());
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let mut value = String::new();
        if let Some(after) = rest.strip_prefix('=') {
            let after = after.trim_start();
            match after.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let inner = &after[1..];
                    let end = inner.find(q).unwrap_or(inner.len());
                    value = inner[..end].to_string();
                    rest = inner.get(end + 1..).unwrap_or("");
                }
                _ => {
                    let end = after.find(char::is_whitespace).unwrap_or(after.len());
                    value = after[..end].to_string();
                    rest = &after[end..];
                }
            }
        }
        if name.is_empty() {
            break;
        }
        attrs.push((name, decode_entities(&value)));
    }
    attrs
}

/// Group content nodes into paragraphs and images.
pub fn blocks(nodes: &[ContentNode]) -> Vec<Block<'_>> {
    let mut out = Vec::new();
    let mut image_index = 0;
    for node in nodes {
        match node {
            ContentNode::Text(t) => out.push(Block::Paragraph(t.as_str())),
            ContentNode::Break => {}
            ContentNode::Image { src, alt } => {
                out.push(Block::Image {
                    index: image_index,
                    src: src.as_str(),
                    alt: alt.as_deref(),
                });
                image_index += 1;
            }
        }
    }
    out
}

// ─── Element tree ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub classes: Vec<&'static str>,
    pub attrs: Vec<(&'static str, String)>,
    pub style: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

const VOID_TAGS: &[&str] = &["br", "img", "input", "link"];

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            classes: Vec::new(),
            attrs: Vec::new(),
            style: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn style(mut self, prop: &'static str, value: impl Into<String>) -> Self {
        self.style.push((prop, value.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        if !self.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", self.classes.join(" ")));
        }
        for (name, value) in &self.attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape(value)));
        }
        if !self.style.is_empty() {
            let css: Vec<String> = self.style.iter().map(|(p, v)| format!("{p}:{v};")).collect();
            out.push_str(&format!(" style=\"{}\"", escape(&css.join(""))));
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag) {
            return;
        }
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_html(out),
                Node::Text(t) => out.push_str(&escape(t)),
            }
        }
        out.push_str(&format!("</{}>", self.tag));
    }
}

#[cfg(test)]
impl Element {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(&class)
    }

    /// Depth-first search for the first descendant (or self) with `class`.
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children.iter().find_map(|c| match c {
            Node::Element(e) => e.find_class(class),
            Node::Text(_) => None,
        })
    }

    pub fn style_value(&self, prop: &str) -> Option<&str> {
        self.style
            .iter()
            .rev()
            .find(|(p, _)| *p == prop)
            .map(|(_, v)| v.as_str())
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn px(v: f64) -> String {
    format!("{v}px")
}

fn css_length(len: CssLength) -> String {
    match len {
        CssLength::Auto => "auto".into(),
        CssLength::Px(v) => px(v),
    }
}

// ─── Popup template ─────────────────────────────────────────────────────────

fn image_element(src: &str, alt: Option<&str>, state: Option<&ImageState>) -> Element {
    let mut img = Element::new("img").attr("src", src);
    if let Some(alt) = alt {
        img = img.attr("alt", alt);
    }
    match state {
        Some(ImageState::Loaded {
            fit: ImageFit::FillContent { width, max_height },
            ..
        }) => {
            let img = match max_height {
                Some(h) => img.style("max-height", px(*h)),
                None => img,
            };
            img.style("max-width", "100%")
                .style("width", px(*width))
                .style("height", "auto")
        }
        Some(ImageState::Loaded {
            fit:
                ImageFit::Bounded {
                    max_width,
                    max_height,
                },
            ..
        }) => img
            .style("max-width", px(*max_width))
            .style("max-height", px(*max_height))
            .style("width", "auto")
            .style("height", "auto"),
        _ => img,
    }
}

fn content_element(popup: &Popup) -> Element {
    // Re-emitted from the parsed content so images carry their current sizing.
    let mut content = Element::new("div").class(CONTENT_CLASS);
    let mut image_index = 0;
    for node in popup.content() {
        content = match node {
            ContentNode::Text(t) => content.text(t.clone()),
            ContentNode::Break => content.child(Element::new("br")),
            ContentNode::Image { src, alt } => {
                let state = popup.images().get(image_index);
                image_index += 1;
                content.child(image_element(src, alt.as_deref(), state))
            }
        };
    }
    content
}

/// The popup's element tree with inline styles mirroring its live state.
pub fn popup_element(popup: &Popup) -> Element {
    let config = popup.config();
    let style = popup.style();
    let size_class = if config.auto_size {
        AUTO_SIZE_CLASS
    } else {
        FIXED_SIZE_CLASS
    };

    let mut root = Element::new("div")
        .class(POPUP_CLASS)
        .class(size_class)
        .attr("data-top", config.top.to_string())
        .attr("data-left", config.left.to_string())
        .style("position", "fixed")
        .style("display", "flex")
        .style(
            "visibility",
            if style.visible { "visible" } else { "hidden" },
        )
        .style("opacity", if style.visible { "1" } else { "0" })
        .style("width", css_length(style.width))
        .style("height", css_length(style.height))
        .style("z-index", style.z_index.to_string());
    if let Some(left) = style.left {
        root = root.style("left", px(left));
    }
    if let Some(top) = style.top {
        root = root.style("top", px(top));
    }

    let header = Element::new("div")
        .class(HEADER_CLASS)
        .child(Element::new("span").text(config.title.clone()))
        .child(
            Element::new("span")
                .class(CLOSE_CLASS)
                .child(Element::new("i").class("fa").class("fa-times")),
        );

    let mut checkbox = Element::new("input")
        .class(DONT_SHOW_TODAY_CLASS)
        .attr("type", "checkbox");
    if popup.dont_show_today() {
        checkbox = checkbox.attr("checked", "checked");
    }
    let footer = Element::new("div")
        .class(FOOTER_CLASS)
        .style(
            "display",
            if config.show_today_option { "flex" } else { "none" },
        )
        .child(
            Element::new("label")
                .child(checkbox)
                .text(format!(" {DONT_SHOW_TODAY_LABEL}")),
        );

    root.child(header).child(content_element(popup)).child(footer)
}

pub fn stylesheet_link(url: &Url) -> Element {
    Element::new("link")
        .attr("rel", "stylesheet")
        .attr("href", url.as_str())
}

/// A standalone HTML page holding the given stylesheet links and popups.
pub fn page_html<'a>(links: &[Url], popups: impl IntoIterator<Item = &'a Popup>) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    for link in links {
        out.push_str(&stylesheet_link(link).to_html());
        out.push('\n');
    }
    out.push_str("</head>\n<body>\n");
    for popup in popups {
        out.push_str(&popup_element(popup).to_html());
        out.push('\n');
    }
    out.push_str("</body>\n</html>\n");
    out
}
