//! Portable rich text node model.
//!
//! Documents arrive as loosely typed JSON arrays. Each node is decoded on its
//! own so a single malformed entry degrades to [`Node::Unsupported`] (or a
//! text-only block) instead of failing the surrounding document.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::entities::ImageRef;

const MAX_LIST_LEVEL: u8 = 8;

/// An ordered sequence of rich-text nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortableText {
    nodes: Vec<Node>,
}

impl PortableText {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Decode a raw JSON array. Non-array input yields an empty document.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self {
                nodes: items.iter().map(Node::from_value).collect(),
            },
            _ => Self::default(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl<'de> Deserialize<'de> for PortableText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&raw))
    }
}

/// A top-level rich-text node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Block),
    Image(ImageRef),
    /// A node whose `_type` is not part of the model, or whose shape could not
    /// be recovered at all. Renders as nothing.
    Unsupported { kind: String },
}

impl Node {
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Node::Unsupported {
                kind: json_kind(value).to_string(),
            };
        };

        match map.get("_type").and_then(Value::as_str) {
            Some("block") => Node::Block(Block::from_map(map)),
            Some("image") => Node::Image(
                serde_json::from_value::<ImageRef>(value.clone()).unwrap_or_default(),
            ),
            Some(other) => Node::Unsupported {
                kind: other.to_string(),
            },
            None => Node::Unsupported {
                kind: "untyped".to_string(),
            },
        }
    }
}

/// Block-level style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStyle {
    #[default]
    Normal,
    H1,
    H2,
    H3,
    Blockquote,
}

impl BlockStyle {
    /// Unknown styles fall back to a normal paragraph.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "h1" => Self::H1,
            "h2" => Self::H2,
            "h3" => Self::H3,
            "blockquote" => Self::Blockquote,
            _ => Self::Normal,
        }
    }
}

/// List container kind for list-item blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    /// Unknown list types render as bulleted lists.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "number" => Self::Number,
            _ => Self::Bullet,
        }
    }
}

/// Inline mark resolved against a block's mark definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Strong,
    Em,
    Link { href: Option<String> },
    /// Decorators or annotations outside the rendering table.
    Unknown(String),
}

/// A run of text with its mark names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub marks: Vec<String>,
}

impl Span {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn with_marks<I, S>(mut self, marks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.marks = marks.into_iter().map(Into::into).collect();
        self
    }
}

/// Annotation definition referenced from span marks by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkDef {
    pub key: String,
    pub kind: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub key: Option<String>,
    pub style: BlockStyle,
    pub list_item: Option<ListKind>,
    pub level: u8,
    pub children: Vec<Span>,
    pub mark_defs: Vec<MarkDef>,
}

impl Block {
    pub fn paragraph(children: Vec<Span>) -> Self {
        Self {
            level: 1,
            children,
            ..Self::default()
        }
    }

    pub fn styled(style: BlockStyle, children: Vec<Span>) -> Self {
        Self {
            style,
            ..Self::paragraph(children)
        }
    }

    pub fn list_item(kind: ListKind, level: u8, children: Vec<Span>) -> Self {
        Self {
            list_item: Some(kind),
            level: level.clamp(1, MAX_LIST_LEVEL),
            ..Self::paragraph(children)
        }
    }

    pub fn with_mark_defs(mut self, mark_defs: Vec<MarkDef>) -> Self {
        self.mark_defs = mark_defs;
        self
    }

    /// Resolve a span mark name to a [`Mark`].
    ///
    /// Names matching a mark definition key are annotations; anything else is
    /// treated as a decorator.
    pub fn resolve_mark(&self, name: &str) -> Mark {
        if let Some(def) = self.mark_defs.iter().find(|def| def.key == name) {
            return match def.kind.as_str() {
                "link" => Mark::Link {
                    href: def.href.clone().filter(|href| !href.trim().is_empty()),
                },
                other => Mark::Unknown(other.to_string()),
            };
        }

        match name {
            "strong" => Mark::Strong,
            "em" => Mark::Em,
            other => Mark::Unknown(other.to_string()),
        }
    }

    /// Plain text of all children, in order.
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let style = map
            .get("style")
            .and_then(Value::as_str)
            .map(BlockStyle::from_tag)
            .unwrap_or_default();
        let list_item = map
            .get("listItem")
            .and_then(Value::as_str)
            .map(ListKind::from_tag);
        let level = map
            .get("level")
            .and_then(Value::as_u64)
            .map(|level| level.clamp(1, u64::from(MAX_LIST_LEVEL)) as u8)
            .unwrap_or(1);
        let children = map
            .get("children")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(span_from_value).collect())
            .unwrap_or_default();
        let mark_defs = map
            .get("markDefs")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(mark_def_from_value).collect())
            .unwrap_or_default();

        Self {
            key: string_field(map, "_key"),
            style,
            list_item,
            level,
            children,
            mark_defs,
        }
    }
}

fn span_from_value(value: &Value) -> Option<Span> {
    let map = value.as_object()?;
    match map.get("_type").and_then(Value::as_str) {
        Some("span") | None => {}
        Some(_) => return None,
    }

    let text = map.get("text").and_then(Value::as_str)?.to_string();
    let marks = map
        .get("marks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(Span { text, marks })
}

fn mark_def_from_value(value: &Value) -> Option<MarkDef> {
    let map = value.as_object()?;
    let key = string_field(map, "_key")?;
    let kind = string_field(map, "_type").unwrap_or_default();
    Some(MarkDef {
        key,
        kind,
        href: string_field(map, "href"),
    })
}

fn string_field(map: &Map<String, Value>, field: &str) -> Option<String> {
    map.get(field).and_then(Value::as_str).map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_blocks_images_and_unknown_nodes_in_order() {
        let doc: PortableText = serde_json::from_value(json!([
            {
                "_type": "block",
                "_key": "a1",
                "style": "h2",
                "markDefs": [],
                "children": [{ "_type": "span", "text": "Sterilize", "marks": [] }]
            },
            { "_type": "image", "_key": "i1", "asset": { "_ref": "image-abc-800x600-jpg" }, "alt": "Jars" },
            { "_type": "youtube", "url": "https://example.com/v" },
            "stray string"
        ]))
        .expect("decode");

        assert_eq!(doc.len(), 4);
        match &doc.nodes()[0] {
            Node::Block(block) => {
                assert_eq!(block.style, BlockStyle::H2);
                assert_eq!(block.plain_text(), "Sterilize");
            }
            other => panic!("expected block, got {other:?}"),
        }
        match &doc.nodes()[1] {
            Node::Image(image) => assert_eq!(image.asset_ref(), Some("image-abc-800x600-jpg")),
            other => panic!("expected image, got {other:?}"),
        }
        assert_eq!(
            doc.nodes()[2],
            Node::Unsupported {
                kind: "youtube".to_string()
            }
        );
        assert_eq!(
            doc.nodes()[3],
            Node::Unsupported {
                kind: "string".to_string()
            }
        );
    }

    #[test]
    fn null_or_non_array_documents_are_empty() {
        let doc: PortableText = serde_json::from_value(json!(null)).expect("null doc");
        assert!(doc.is_empty());
        let doc: PortableText = serde_json::from_value(json!({"oops": true})).expect("object doc");
        assert!(doc.is_empty());
    }

    #[test]
    fn malformed_block_fields_degrade_to_defaults() {
        let node = Node::from_value(&json!({
            "_type": "block",
            "style": 7,
            "level": "deep",
            "children": [
                { "_type": "span", "text": "kept", "marks": ["strong", 3] },
                { "_type": "span", "marks": [] },
                { "_type": "inlineWidget" }
            ],
            "markDefs": "not-an-array"
        }));

        let Node::Block(block) = node else {
            panic!("expected block");
        };
        assert_eq!(block.style, BlockStyle::Normal);
        assert_eq!(block.level, 1);
        assert_eq!(
            block.children,
            vec![Span::new("kept").with_marks(["strong"])]
        );
        assert!(block.mark_defs.is_empty());
    }

    #[test]
    fn resolves_marks_against_definitions() {
        let block = Block::paragraph(vec![]).with_mark_defs(vec![
            MarkDef {
                key: "l1".to_string(),
                kind: "link".to_string(),
                href: Some("https://example.com".to_string()),
            },
            MarkDef {
                key: "l2".to_string(),
                kind: "link".to_string(),
                href: Some("   ".to_string()),
            },
            MarkDef {
                key: "c1".to_string(),
                kind: "comment".to_string(),
                href: None,
            },
        ]);

        assert_eq!(
            block.resolve_mark("l1"),
            Mark::Link {
                href: Some("https://example.com".to_string())
            }
        );
        assert_eq!(block.resolve_mark("l2"), Mark::Link { href: None });
        assert_eq!(block.resolve_mark("c1"), Mark::Unknown("comment".to_string()));
        assert_eq!(block.resolve_mark("strong"), Mark::Strong);
        assert_eq!(block.resolve_mark("em"), Mark::Em);
        assert_eq!(
            block.resolve_mark("underline"),
            Mark::Unknown("underline".to_string())
        );
    }

    #[test]
    fn list_levels_are_clamped() {
        let node = Node::from_value(&json!({
            "_type": "block",
            "listItem": "number",
            "level": 40,
            "children": [{ "_type": "span", "text": "deep" }]
        }));
        let Node::Block(block) = node else {
            panic!("expected block");
        };
        assert_eq!(block.list_item, Some(ListKind::Number));
        assert_eq!(block.level, MAX_LIST_LEVEL);
    }
}
