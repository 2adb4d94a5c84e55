//! Entity escaping and safe rendering of message text.
//!
//! Two transforms, both pure: [`escape`] runs once at write time and is the
//! system's sole XSS defense; [`render`] decodes the stored form and
//! restructures it into discrete display nodes. Nothing here ever parses
//! message text as markup.

use std::sync::OnceLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

/// Escape the characters that carry meaning in HTML: `& < > " '`.
///
/// The ampersand goes first so already-produced entities are not re-escaped
/// into a double-encoded form.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Decode entities produced by [`escape`] back to literal characters.
///
/// For display only — the result is emitted as node values, never re-inserted
/// as markup. Also accepts the zero-padded `&#039;` apostrophe some encoders
/// write. `&amp;` decodes last so `&amp;lt;` round-trips to the literal
/// string `&lt;`.
pub fn decode(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// A display-safe piece of rendered message content.
///
/// Consumers map these to their output medium: the terminal client prints
/// them, a DOM front end would create text nodes, anchors (opening in a new
/// context with no back-reference), and iframes.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text.
    Text(String),
    /// A hyperlink carrying the URL as both label and target.
    Link(String),
    /// An embedded video player pointed at a fixed, safely built embed URL.
    Embed { src: String },
}

/// Privacy-preserving embed host; the identifier is the only variable part.
const EMBED_BASE: &str = "https://www.youtube-nocookie.com/embed/";

/// RFC 3986 unreserved characters stay literal, everything else is encoded.
const EMBED_ID_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn video_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?v=|embed/|v/)|youtu\.be/)([A-Za-z0-9_-]{6,})",
        )
        .unwrap()
    })
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

/// Extract a video identifier from known watch/short/embed URL shapes.
pub fn extract_video_id(text: &str) -> Option<&str> {
    video_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Restructure stored (escaped) message text into display nodes.
///
/// If the text contains a recognizable video link, the literal text with all
/// `http(s)://` substrings stripped comes first (when non-empty), followed by
/// one [`Node::Embed`] built from the fixed embed template. Otherwise the
/// text splits on whitespace-delimited URLs into alternating [`Node::Text`]
/// and [`Node::Link`] nodes.
pub fn render(escaped: &str) -> Vec<Node> {
    let raw = decode(escaped);
    if let Some(id) = extract_video_id(&raw) {
        let src = format!("{}{}", EMBED_BASE, utf8_percent_encode(id, EMBED_ID_SET));
        let stripped = url_re().replace_all(&raw, "").trim().to_string();
        let mut nodes = Vec::new();
        if !stripped.is_empty() {
            nodes.push(Node::Text(stripped));
        }
        nodes.push(Node::Embed { src });
        return nodes;
    }
    linkify(&raw)
}

/// Split literal text on `http(s)://` substrings into text and link nodes.
fn linkify(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut last = 0;
    for m in url_re().find_iter(text) {
        if m.start() > last {
            nodes.push(Node::Text(text[last..m.start()].to_string()));
        }
        nodes.push(Node::Link(m.as_str().to_string()));
        last = m.end();
    }
    if last < text.len() || nodes.is_empty() {
        nodes.push(Node::Text(text[last..].to_string()));
    }
    nodes
}
