//! Structured text rendering.
//!
//! Spans are rendered segment by segment: every span start/end is a
//! boundary, and for each segment the covering spans are kept open in
//! `(start, longest first)` order. A span that crosses the end of an
//! enclosing one is closed and reopened on the other side, so overlapping
//! spans always produce well-nested HTML.
use std::cmp::Reverse;
use std::collections::BTreeSet;

use model::{LinkType, RawLink, RawRichTextBlock, RawSpan};
use serde_json::Value;
use tracing::warn;

use crate::capabilities::{HtmlElement, HtmlSerializer, LinkResolver};

/// Decode the blocks of a structured text value, keeping each raw block
/// alongside its typed view. `None` if the value isn't a list of blocks.
pub fn parse_blocks(value: &Value) -> Option<Vec<(RawRichTextBlock, &Value)>> {
    value
        .as_array()?
        .iter()
        .map(|raw| {
            serde_json::from_value::<RawRichTextBlock>(raw.clone())
                .ok()
                .map(|block| (block, raw))
        })
        .collect()
}

/// Plain-text rendering: non-empty block texts joined by `separator`.
pub fn as_text(blocks: &[(RawRichTextBlock, &Value)], separator: &str) -> String {
    blocks
        .iter()
        .map(|(block, _)| block.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// HTML renderer bound to one set of collaborators.
pub struct RichTextRenderer<'a> {
    pub links: &'a dyn LinkResolver,
    pub serializer: Option<&'a dyn HtmlSerializer>,
}

struct Frame<'s> {
    span: Option<&'s RawSpan>,
    html: String,
    text: String,
}

impl RichTextRenderer<'_> {
    pub fn as_html(&self, blocks: &[(RawRichTextBlock, &Value)]) -> String {
        let mut out = String::new();
        let mut i = 0;
        while i < blocks.len() {
            let block_type = blocks[i].0.block_type.as_str();
            let Some((group_type, tag)) = list_group(block_type) else {
                out.push_str(&self.block(&blocks[i].0, blocks[i].1));
                i += 1;
                continue;
            };
            let mut items = String::new();
            let mut text = Vec::new();
            while i < blocks.len() && blocks[i].0.block_type == block_type {
                items.push_str(&self.block(&blocks[i].0, blocks[i].1));
                text.push(blocks[i].0.text.as_str());
                i += 1;
            }
            let text = text.join(" ");
            let element = HtmlElement {
                element_type: group_type,
                data: None,
                text: &text,
                children: &items,
            };
            out.push_str(&self.element(&element, || format!("<{tag}>{items}</{tag}>")));
        }
        out
    }

    fn element(&self, element: &HtmlElement<'_>, default: impl FnOnce() -> String) -> String {
        self.serializer
            .and_then(|serializer| serializer.serialize(element, self.links))
            .unwrap_or_else(default)
    }

    fn block(&self, block: &RawRichTextBlock, raw: &Value) -> String {
        let children = self.spans(&block.text, &block.spans);
        let element = HtmlElement {
            element_type: &block.block_type,
            data: Some(raw),
            text: &block.text,
            children: &children,
        };
        self.element(&element, || self.default_block(block, &children))
    }

    fn default_block(&self, block: &RawRichTextBlock, children: &str) -> String {
        let class = block
            .label
            .as_deref()
            .map(|label| format!(" class=\"{}\"", escape_attr(label)))
            .unwrap_or_default();
        let tag = match block.block_type.as_str() {
            "paragraph" => "p",
            "preformatted" => "pre",
            "list-item" | "o-list-item" => "li",
            "image" => return self.image_block(block),
            "embed" => return embed_block(block),
            other => match heading_level(other) {
                Some(level) => return format!("<h{level}{class}>{children}</h{level}>"),
                None => {
                    warn!(block_type = other, "unknown rich text block type");
                    return children.to_string();
                }
            },
        };
        format!("<{tag}{class}>{children}</{tag}>")
    }

    fn image_block(&self, block: &RawRichTextBlock) -> String {
        let src = escape_attr(block.url.as_deref().unwrap_or_default());
        let alt = escape_attr(block.alt.as_deref().unwrap_or_default());
        let copyright = block
            .copyright
            .as_deref()
            .map(|c| format!(" copyright=\"{}\"", escape_attr(c)))
            .unwrap_or_default();
        let img = format!("<img src=\"{src}\" alt=\"{alt}\"{copyright} />");
        let inner = match block.link_to.as_ref().and_then(|link| self.link_href(link)) {
            Some((href, target)) => format!(
                "<a href=\"{}\"{}>{img}</a>",
                escape_attr(&href),
                target_attrs(target.as_deref())
            ),
            None => img,
        };
        format!("<p class=\"block-img\">{inner}</p>")
    }

    /// Resolved href and target of a link value.
    fn link_href(&self, value: &Value) -> Option<(String, Option<String>)> {
        let link = RawLink::from_value(value)?;
        let href = match link.link_type {
            LinkType::Document => {
                if link.is_broken {
                    return None;
                }
                self.links.resolve(&link.link_target()?)?
            }
            LinkType::Web | LinkType::Media => link.url.clone()?,
            LinkType::Any => return None,
        };
        Some((href, link.target))
    }

    /// Span offsets count UTF-16 code units, as the CMS API emits them.
    fn spans(&self, text: &str, spans: &[RawSpan]) -> String {
        let offsets = utf16_byte_offsets(text);
        let len = offsets.len() - 1;
        let mut valid: Vec<&RawSpan> = spans
            .iter()
            .filter(|s| s.start < s.end && s.start < len)
            .collect();
        if valid.is_empty() {
            return escape_text(text);
        }
        valid.sort_by_key(|s| (s.start, Reverse(s.end.min(len))));

        let mut boundaries = BTreeSet::from([0, len]);
        for span in &valid {
            boundaries.insert(span.start);
            boundaries.insert(span.end.min(len));
        }
        let boundaries: Vec<usize> = boundaries.into_iter().collect();

        let mut stack = vec![Frame {
            span: None,
            html: String::new(),
            text: String::new(),
        }];
        for window in boundaries.windows(2) {
            let (from, to) = (window[0], window[1]);
            let active: Vec<&RawSpan> = valid
                .iter()
                .copied()
                .filter(|s| s.start <= from && s.end.min(len) >= to)
                .collect();

            let common = stack[1..]
                .iter()
                .zip(&active)
                .take_while(|(frame, span)| {
                    frame.span.is_some_and(|open| std::ptr::eq(open, **span))
                })
                .count();
            while stack.len() - 1 > common {
                self.close(&mut stack);
            }
            for span in &active[common..] {
                stack.push(Frame {
                    span: Some(*span),
                    html: String::new(),
                    text: String::new(),
                });
            }

            let segment = &text[offsets[from]..offsets[to]];
            for frame in stack.iter_mut() {
                frame.text.push_str(segment);
            }
            if let Some(top) = stack.last_mut() {
                top.html.push_str(&escape_text(segment));
            }
        }
        while stack.len() > 1 {
            self.close(&mut stack);
        }
        stack.pop().map(|root| root.html).unwrap_or_default()
    }

    fn close(&self, stack: &mut Vec<Frame<'_>>) {
        let Some(frame) = stack.pop() else { return };
        let Some(span) = frame.span else { return };
        let element = HtmlElement {
            element_type: &span.span_type,
            data: span.data.as_ref(),
            text: &frame.text,
            children: &frame.html,
        };
        let rendered = self.element(&element, || self.default_span(span, &frame.html));
        if let Some(parent) = stack.last_mut() {
            parent.html.push_str(&rendered);
        }
    }

    fn default_span(&self, span: &RawSpan, children: &str) -> String {
        match span.span_type.as_str() {
            "strong" => format!("<strong>{children}</strong>"),
            "em" => format!("<em>{children}</em>"),
            "hyperlink" => match span.data.as_ref().and_then(|data| self.link_href(data)) {
                Some((href, target)) => format!(
                    "<a href=\"{}\"{}>{children}</a>",
                    escape_attr(&href),
                    target_attrs(target.as_deref())
                ),
                None => children.to_string(),
            },
            "label" => {
                let label = span
                    .data
                    .as_ref()
                    .and_then(|d| d.get("label"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                format!("<span class=\"{}\">{children}</span>", escape_attr(label))
            }
            _ => children.to_string(),
        }
    }
}

fn list_group(block_type: &str) -> Option<(&'static str, &'static str)> {
    match block_type {
        "list-item" => Some(("group-list-item", "ul")),
        "o-list-item" => Some(("group-o-list-item", "ol")),
        _ => None,
    }
}

fn heading_level(block_type: &str) -> Option<u8> {
    block_type
        .strip_prefix("heading")?
        .parse::<u8>()
        .ok()
        .filter(|level| (1..=6).contains(level))
}

fn embed_block(block: &RawRichTextBlock) -> String {
    let oembed = block.oembed.as_ref();
    let field = |key: &str| {
        oembed
            .and_then(|o| o.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    };
    format!(
        "<div data-oembed=\"{}\" data-oembed-type=\"{}\" data-oembed-provider=\"{}\">{}</div>",
        escape_attr(field("embed_url")),
        escape_attr(field("type")),
        escape_attr(field("provider_name")),
        field("html"),
    )
}

fn target_attrs(target: Option<&str>) -> String {
    match target {
        Some(target) => format!(" target=\"{}\" rel=\"noopener\"", escape_attr(target)),
        None => String::new(),
    }
}

pub(crate) fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Byte offset of every UTF-16 code unit in `text`, plus `text.len()` at the
/// end. The low half of a surrogate pair maps to the start of its character.
fn utf16_byte_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(text.len() + 1);
    for (byte, ch) in text.char_indices() {
        offsets.extend(std::iter::repeat(byte).take(ch.len_utf16()));
    }
    offsets.push(text.len());
    offsets
}

fn escape_text(input: &str) -> String {
    escape_attr(input).replace('\n', "<br />")
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::LinkTarget;
    use serde_json::json;

    fn route(target: &LinkTarget) -> Option<String> {
        Some(format!("/{}", target.uid.as_deref().unwrap_or(&target.id)))
    }

    fn render(value: Value) -> String {
        let blocks = parse_blocks(&value).expect("blocks");
        RichTextRenderer {
            links: &route,
            serializer: None,
        }
        .as_html(&blocks)
    }

    #[test]
    fn headings_paragraphs_and_escaping() {
        let html = render(json!([
            {"type": "heading2", "text": "Tom & Jerry", "spans": []},
            {"type": "paragraph", "text": "a<b\nc", "spans": []}
        ]));
        assert_eq!(html, "<h2>Tom &amp; Jerry</h2><p>a&lt;b<br />c</p>");
    }

    #[test]
    fn consecutive_list_items_are_grouped() {
        let html = render(json!([
            {"type": "list-item", "text": "one", "spans": []},
            {"type": "list-item", "text": "two", "spans": []},
            {"type": "o-list-item", "text": "first", "spans": []},
            {"type": "paragraph", "text": "end", "spans": []}
        ]));
        assert_eq!(
            html,
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>end</p>"
        );
    }

    #[test]
    fn overlapping_spans_are_split_into_nested_tags() {
        let html = render(json!([{
            "type": "paragraph",
            "text": "abcdefgh",
            "spans": [
                {"start": 0, "end": 5, "type": "strong"},
                {"start": 3, "end": 8, "type": "em"}
            ]
        }]));
        assert_eq!(
            html,
            "<p><strong>abc<em>de</em></strong><em>fgh</em></p>"
        );
    }

    #[test]
    fn hyperlinks_use_the_link_resolver() {
        let html = render(json!([{
            "type": "paragraph",
            "text": "go home now",
            "spans": [
                {"start": 3, "end": 7, "type": "hyperlink",
                 "data": {"link_type": "Document", "id": "X1", "uid": "home", "type": "page"}},
                {"start": 8, "end": 11, "type": "hyperlink",
                 "data": {"link_type": "Web", "url": "https://example.com", "target": "_blank"}}
            ]
        }]));
        assert_eq!(
            html,
            "<p>go <a href=\"/home\">home</a> <a href=\"https://example.com\" target=\"_blank\" rel=\"noopener\">now</a></p>"
        );
    }

    #[test]
    fn span_offsets_count_utf16_units() {
        let html = render(json!([{
            "type": "paragraph",
            "text": "héllo",
            "spans": [{"start": 1, "end": 2, "type": "em"}]
        }]));
        assert_eq!(html, "<p>h<em>é</em>llo</p>");

        let html = render(json!([{
            "type": "paragraph",
            "text": "😀 bold",
            "spans": [{"start": 3, "end": 7, "type": "strong"}]
        }]));
        assert_eq!(html, "<p>😀 <strong>bold</strong></p>");
    }

    #[test]
    fn spans_around_astral_characters() {
        let html = render(json!([{
            "type": "paragraph",
            "text": "a😀b🎉c",
            "spans": [
                {"start": 1, "end": 3, "type": "em"},
                {"start": 4, "end": 99, "type": "strong"}
            ]
        }]));
        assert_eq!(html, "<p>a<em>😀</em>b<strong>🎉c</strong></p>");

        let html = render(json!([{
            "type": "paragraph",
            "text": "😀x",
            "spans": [{"start": 1, "end": 3, "type": "em"}]
        }]));
        assert_eq!(html, "<p><em>😀x</em></p>");
    }

    struct TitleClass;

    impl HtmlSerializer for TitleClass {
        fn serialize(&self, element: &HtmlElement<'_>, _: &dyn LinkResolver) -> Option<String> {
            (element.element_type == "heading1")
                .then(|| format!("<h1 class=\"title\">{}</h1>", element.children))
        }
    }

    #[test]
    fn serializer_overrides_and_falls_back() {
        let value = json!([
            {"type": "heading1", "text": "Title", "spans": []},
            {"type": "paragraph", "text": "Body", "spans": []}
        ]);
        let blocks = parse_blocks(&value).unwrap();
        let serializer = TitleClass;
        let html = RichTextRenderer {
            links: &route,
            serializer: Some(&serializer),
        }
        .as_html(&blocks);
        assert_eq!(html, "<h1 class=\"title\">Title</h1><p>Body</p>");
    }

    #[test]
    fn text_skips_empty_blocks() {
        let value = json!([
            {"type": "paragraph", "text": "one", "spans": []},
            {"type": "image", "url": "https://images.example/a.png", "spans": []},
            {"type": "paragraph", "text": "two", "spans": []}
        ]);
        let blocks = parse_blocks(&value).unwrap();
        assert_eq!(as_text(&blocks, " "), "one two");
    }

    #[test]
    fn malformed_blocks_are_rejected() {
        assert!(parse_blocks(&json!("just text")).is_none());
        assert!(parse_blocks(&json!([{"text": "no type"}])).is_none());
    }
}
