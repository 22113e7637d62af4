//! Portable text to HTML.
//!
//! Rendering is pure and order-preserving: nodes are emitted in document
//! order, consecutive list items are grouped into lists, and inline marks are
//! nested through [`tree::build_marks_tree`]. Every fragment passes through a
//! sanitizer before leaving this module, so hostile link schemes from the CMS
//! never reach a page.

mod rules;
mod tree;

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use tracing::debug;

use crate::domain::portable_text::{Block, Node, PortableText};

pub use rules::{EMBED_IMAGE_HEIGHT, EMBED_IMAGE_WIDTH, RenderRules, SiteRules};

use tree::{Inline, ListItem, ListTree, build_lists, build_marks_tree};

/// Renders portable text documents with a given rule table.
pub struct PortableTextRenderer {
    sanitizer: AmmoniaBuilder<'static>,
}

impl Default for PortableTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PortableTextRenderer {
    pub fn new() -> Self {
        Self {
            sanitizer: build_sanitizer(),
        }
    }

    pub fn render(&self, document: &PortableText, rules: &dyn RenderRules) -> String {
        let html = render_nodes(document.nodes(), rules);
        self.sanitizer.clean(&html).to_string()
    }
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.tags(HashSet::from([
        "a",
        "blockquote",
        "em",
        "h1",
        "h2",
        "h3",
        "img",
        "li",
        "ol",
        "p",
        "strong",
        "ul",
    ]));
    builder.link_rel(None);
    builder.add_tag_attributes("a", &["rel"]);
    builder.add_tag_attributes("img", &["loading"]);
    builder
}

fn render_nodes(nodes: &[Node], rules: &dyn RenderRules) -> String {
    let mut out = String::new();
    let mut index = 0;

    while index < nodes.len() {
        match &nodes[index] {
            Node::Block(block) => match block.list_item {
                Some(_) => {
                    let items = collect_list_run(&nodes[index..]);
                    index += items.len();
                    for list in build_lists(&items) {
                        render_list(&list, rules, &mut out);
                    }
                    continue;
                }
                None => rules.block(block.style, &render_inline(block, rules), &mut out),
            },
            Node::Image(image) => rules.image(image, &mut out),
            Node::Unsupported { kind } => {
                debug!(node_type = %kind, "Skipping unsupported rich-text node");
            }
        }
        index += 1;
    }

    out
}

fn collect_list_run(nodes: &[Node]) -> Vec<ListItem<'_>> {
    nodes
        .iter()
        .map_while(|node| match node {
            Node::Block(block) => block.list_item.map(|kind| ListItem {
                block,
                kind,
                level: block.level,
            }),
            _ => None,
        })
        .collect()
}

fn render_list(list: &ListTree<'_>, rules: &dyn RenderRules, out: &mut String) {
    let mut items = String::new();
    for entry in &list.entries {
        let mut content = entry
            .block
            .map(|block| render_inline(block, rules))
            .unwrap_or_default();
        for sublist in &entry.sublists {
            render_list(sublist, rules, &mut content);
        }
        rules.list_item(list.kind, &content, &mut items);
    }
    rules.list(list.kind, &items, out);
}

fn render_inline(block: &Block, rules: &dyn RenderRules) -> String {
    let mut out = String::new();
    render_inline_nodes(&build_marks_tree(&block.children), block, rules, &mut out);
    out
}

fn render_inline_nodes(nodes: &[Inline<'_>], block: &Block, rules: &dyn RenderRules, out: &mut String) {
    for node in nodes {
        match node {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Marked { mark, children } => {
                let mut content = String::new();
                render_inline_nodes(children, block, rules, &mut content);
                rules.mark(&block.resolve_mark(mark), &content, out);
            }
        }
    }
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::image::ImageUrlBuilder;
    use crate::domain::entities::ImageRef;
    use crate::domain::portable_text::{BlockStyle, ListKind, MarkDef, Span};

    fn render(nodes: Vec<Node>) -> String {
        let rules = SiteRules::for_posts(ImageUrlBuilder::new("proj", "production"));
        PortableTextRenderer::new().render(&PortableText::new(nodes), &rules)
    }

    fn paragraph(text: &str) -> Node {
        Node::Block(Block::paragraph(vec![Span::new(text)]))
    }

    #[test]
    fn renders_block_styles_in_document_order() {
        let html = render(vec![
            Node::Block(Block::styled(BlockStyle::H2, vec![Span::new("Title")])),
            paragraph("Body"),
            Node::Block(Block::styled(BlockStyle::Blockquote, vec![Span::new("Quote")])),
        ]);
        assert_eq!(html, "<h2>Title</h2><p>Body</p><blockquote>Quote</blockquote>");
    }

    #[test]
    fn reordering_nodes_reorders_output_only() {
        let forward = render(vec![paragraph("one"), paragraph("two")]);
        let reversed = render(vec![paragraph("two"), paragraph("one")]);
        assert_eq!(forward, "<p>one</p><p>two</p>");
        assert_eq!(reversed, "<p>two</p><p>one</p>");
    }

    #[test]
    fn link_annotations_follow_rel_rules() {
        let block = Block::paragraph(vec![
            Span::new("out").with_marks(["ext"]),
            Span::new(" "),
            Span::new("in").with_marks(["int"]),
            Span::new(" "),
            Span::new("bare").with_marks(["nohref"]),
        ])
        .with_mark_defs(vec![
            MarkDef {
                key: "ext".to_string(),
                kind: "link".to_string(),
                href: Some("https://example.com".to_string()),
            },
            MarkDef {
                key: "int".to_string(),
                kind: "link".to_string(),
                href: Some("/about".to_string()),
            },
            MarkDef {
                key: "nohref".to_string(),
                kind: "link".to_string(),
                href: None,
            },
        ]);
        let html = render(vec![Node::Block(block)]);
        assert!(html.contains(r#"<a href="https://example.com" rel="noreferrer noopener">out</a>"#));
        assert!(html.contains(r#"<a href="/about">in</a>"#));
        assert!(html.ends_with(" bare</p>"));
    }

    #[test]
    fn script_links_are_stripped() {
        let block = Block::paragraph(vec![Span::new("click").with_marks(["bad"])]).with_mark_defs(
            vec![MarkDef {
                key: "bad".to_string(),
                kind: "link".to_string(),
                href: Some("javascript:alert(1)".to_string()),
            }],
        );
        let html = render(vec![Node::Block(block)]);
        assert!(!html.contains("javascript:"));
        assert!(html.contains("click"));
    }

    #[test]
    fn text_is_escaped() {
        let html = render(vec![paragraph("<script>alert('x')</script> & more")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
    }

    #[test]
    fn groups_consecutive_list_items() {
        let html = render(vec![
            Node::Block(Block::list_item(ListKind::Bullet, 1, vec![Span::new("a")])),
            Node::Block(Block::list_item(ListKind::Bullet, 2, vec![Span::new("a.1")])),
            Node::Block(Block::list_item(ListKind::Bullet, 1, vec![Span::new("b")])),
            paragraph("after"),
            Node::Block(Block::list_item(ListKind::Number, 1, vec![Span::new("one")])),
        ]);
        assert_eq!(
            html,
            "<ul><li>a<ul><li>a.1</li></ul></li><li>b</li></ul><p>after</p><ol><li>one</li></ol>"
        );
    }

    #[test]
    fn images_and_unsupported_nodes() {
        let html = render(vec![
            Node::Image(ImageRef::default()),
            Node::Unsupported {
                kind: "code".to_string(),
            },
            paragraph("kept"),
            Node::Image(ImageRef::new("image-abc-100x50-png").with_alt("Mycelium")),
        ]);
        assert!(html.starts_with("<p>kept</p><img "));
        assert!(html.contains(r#"alt="Mycelium""#));
        assert!(html.contains("https://cdn.sanity.io/images/proj/production/abc-100x50.png"));
    }

    #[test]
    fn malformed_nodes_do_not_abort_siblings() {
        let document = PortableText::from_value(&json!([
            { "_type": "block", "children": "not a list" },
            42,
            { "_type": "block", "children": [{ "_type": "span", "text": "survivor", "marks": ["strong"] }] }
        ]));
        let rules = SiteRules::for_tutorials(ImageUrlBuilder::new("proj", "production"));
        let html = PortableTextRenderer::new().render(&document, &rules);
        assert_eq!(html, "<p></p><p><strong>survivor</strong></p>");
    }

    #[test]
    fn nested_marks_render_inside_their_block() {
        let html = render(vec![Node::Block(Block::paragraph(vec![
            Span::new("bold ").with_marks(["strong"]),
            Span::new("both").with_marks(["strong", "em"]),
            Span::new(" plain"),
        ]))]);
        assert_eq!(html, "<p><strong>bold <em>both</em></strong> plain</p>");
    }
}
