//! Post body processing: URL rewriting, shortcode removal, sanitization,
//! and excerpt derivation
//!
//! Sanitization always runs last so nothing earlier in the chain can
//! reintroduce markup the sanitizer would have dropped.

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, Node};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Elements allowed through sanitization, with their allowed attributes
const ALLOWED_ELEMENTS: &[(&str, &[&str])] = &[
    ("p", &[]),
    ("br", &[]),
    ("h1", &[]),
    ("h2", &[]),
    ("h3", &[]),
    ("h4", &[]),
    ("h5", &[]),
    ("h6", &[]),
    ("ul", &[]),
    ("ol", &[]),
    ("li", &[]),
    ("a", &["href", "title"]),
    ("img", &["src", "alt", "width", "height"]),
    ("strong", &[]),
    ("em", &[]),
    ("b", &[]),
    ("i", &[]),
    ("u", &[]),
    ("blockquote", &[]),
    ("pre", &[]),
    ("code", &[]),
    ("figure", &[]),
    ("figcaption", &[]),
    ("table", &[]),
    ("thead", &[]),
    ("tbody", &[]),
    ("tr", &[]),
    ("th", &[]),
    ("td", &[]),
];

/// Elements whose entire subtree is dropped rather than unwrapped
const DROPPED_SUBTREES: &[&str] = &["script", "style", "iframe", "form", "noscript"];

/// Void elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &["br", "img"];

fn shortcode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // [gallery ids="1,2"], [/caption], [embed]...[/embed]
        Regex::new(r"\[/?[a-zA-Z][a-zA-Z0-9_-]*(?:\s[^\]]*)?\]").unwrap()
    })
}

/// Rewrite a post body for local hosting.
///
/// Image URLs present in `image_map` are replaced with their migrated
/// counterparts, WordPress shortcodes are stripped, and the result is
/// sanitized to the element allow-list.
pub fn rewrite_html(html: &str, image_map: &HashMap<String, String>) -> String {
    let mut body = html.to_string();
    for (old_url, new_url) in image_map {
        body = body.replace(old_url.as_str(), new_url.as_str());
    }
    let body = shortcode_pattern().replace_all(&body, "");
    sanitize(&body)
}

/// Reduce markup to the allow-list, unwrapping unknown elements and dropping
/// script-like subtrees entirely
pub fn sanitize(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    for child in fragment.tree.root().children() {
        serialize_node(child, &mut out);
    }
    out
}

fn serialize_node(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&escape_text(text.as_ref())),
        Node::Element(element) => {
            let name = element.name();
            if DROPPED_SUBTREES.contains(&name) {
                return;
            }
            match ALLOWED_ELEMENTS.iter().find(|(tag, _)| *tag == name) {
                Some((tag, allowed_attrs)) => {
                    out.push('<');
                    out.push_str(tag);
                    for (attr_name, attr_value) in element.attrs() {
                        if allowed_attrs.contains(&attr_name) {
                            out.push(' ');
                            out.push_str(attr_name);
                            out.push_str("=\"");
                            out.push_str(&escape_attr(attr_value));
                            out.push('"');
                        }
                    }
                    out.push('>');
                    if VOID_ELEMENTS.contains(tag) {
                        return;
                    }
                    for child in node.children() {
                        serialize_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                // Unknown element: keep its children, drop the wrapper
                None => {
                    for child in node.children() {
                        serialize_node(child, out);
                    }
                }
            }
        }
        _ => {}
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Elements that end a run of text; inline markup joins without a break
const BLOCK_BREAKS: &[&str] = &[
    "p", "br", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "div", "blockquote",
    "figure", "figcaption", "table", "tr", "th", "td", "pre",
];

/// Text content of a fragment with entities decoded and whitespace collapsed
pub fn strip_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    for child in fragment.tree.root().children() {
        collect_text(child, &mut text);
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text.as_ref()),
        Node::Element(element) => {
            for child in node.children() {
                collect_text(child, out);
            }
            if BLOCK_BREAKS.contains(&element.name()) {
                out.push(' ');
            }
        }
        _ => {}
    }
}

/// Plain-text excerpt of at most `max_chars` characters.
///
/// Tags are stripped and whitespace collapsed; truncation happens on a
/// character boundary with a trailing ellipsis.
pub fn derive_excerpt(html: &str, max_chars: usize) -> String {
    let collapsed = strip_tags(html);
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let truncated: String = collapsed.chars().take(max_chars).collect();
    // Cut back to the last word break when there is one
    let trimmed = match truncated.rfind(' ') {
        Some(pos) => &truncated[..pos],
        None => truncated.as_str(),
    };
    format!("{}…", trimmed.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_subtrees_are_dropped_entirely() {
        let html = "<p>Before</p><script>alert('x')</script><p>After</p>";
        let clean = sanitize(html);
        assert_eq!(clean, "<p>Before</p><p>After</p>");
    }

    #[test]
    fn unknown_wrappers_are_unwrapped() {
        let html = "<div class=\"wp-block\"><p>Kept</p></div>";
        assert_eq!(sanitize(html), "<p>Kept</p>");
    }

    #[test]
    fn disallowed_attributes_are_stripped() {
        let html = "<a href=\"/blog/post\" onclick=\"steal()\">link</a>";
        assert_eq!(sanitize(html), "<a href=\"/blog/post\">link</a>");
    }

    #[test]
    fn shortcodes_are_removed_before_sanitizing() {
        let html = "<p>[caption id=\"a1\"]A photo[/caption] and [gallery ids=\"1,2\"]</p>";
        let clean = rewrite_html(html, &HashMap::new());
        assert_eq!(clean, "<p>A photo and </p>");
    }

    #[test]
    fn mapped_image_urls_are_rewritten() {
        let mut map = HashMap::new();
        map.insert(
            "https://old.example.com/wp-content/a.jpg".to_string(),
            "https://cdn.example.com/blog/a.jpg".to_string(),
        );
        let html = "<img src=\"https://old.example.com/wp-content/a.jpg\" alt=\"x\">";
        let clean = rewrite_html(html, &map);
        assert!(clean.contains("https://cdn.example.com/blog/a.jpg"));
        assert!(!clean.contains("old.example.com"));
    }

    #[test]
    fn unmapped_image_urls_are_left_alone() {
        let html = "<img src=\"https://old.example.com/wp-content/b.jpg\" alt=\"x\">";
        let clean = rewrite_html(html, &HashMap::new());
        assert!(clean.contains("https://old.example.com/wp-content/b.jpg"));
    }

    #[test]
    fn excerpt_strips_tags_and_collapses_whitespace() {
        let html = "<p>Chronic   pain\naffects <strong>millions</strong>.</p>";
        assert_eq!(derive_excerpt(html, 200), "Chronic pain affects millions.");
    }

    #[test]
    fn inline_markup_joins_without_a_break_but_blocks_separate() {
        assert_eq!(
            strip_tags("<p>See <em>this</em>, then <a href=\"/x\">that</a>.</p>"),
            "See this, then that."
        );
        assert_eq!(strip_tags("<p>One</p><p>Two</p>"), "One Two");
        assert_eq!(strip_tags("First line<br>second line"), "First line second line");
    }

    #[test]
    fn excerpt_truncates_on_word_break_with_ellipsis() {
        let html = "<p>one two three four five six</p>";
        let excerpt = derive_excerpt(html, 13);
        assert_eq!(excerpt, "one two…");
    }

    #[test]
    fn excerpt_handles_multibyte_text() {
        let html = "<p>Médecine de la douleur et réadaptation fonctionnelle</p>";
        let excerpt = derive_excerpt(html, 20);
        assert!(excerpt.ends_with('…'));
        assert!(excerpt.chars().count() <= 21);
    }
}
