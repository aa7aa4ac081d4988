//! Typed model of remote blocks and rich text.
//!
//! Rich text mirrors the Notion wire shape so it can be serialized directly.
//! Blocks are converted to and from wire JSON by the HTTP client, since the
//! wire shape nests each block's payload under a key named after its type.

use serde::{Deserialize, Serialize};

/// Maximum characters in one rich-text item.
pub const RICH_TEXT_LIMIT: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationContent {
    pub expression: String,
}

/// Payload of a rich-text item, tagged by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextContent {
    Text { text: TextContent },
    Equation { equation: EquationContent },
    /// Mentions and future item types; only `plain_text` is kept.
    #[serde(other)]
    Other,
}

fn default_color() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextAnnotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for RichTextAnnotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(flatten)]
    pub content: RichTextContent,
    #[serde(default)]
    pub annotations: RichTextAnnotations,
    /// Read-only rendering supplied by the remote.
    #[serde(default, skip_serializing)]
    pub plain_text: String,
}

impl RichText {
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            plain_text: content.clone(),
            content: RichTextContent::Text {
                text: TextContent {
                    content,
                    link: None,
                },
            },
            annotations: RichTextAnnotations::default(),
        }
    }

    pub fn equation(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        Self {
            plain_text: expression.clone(),
            content: RichTextContent::Equation {
                equation: EquationContent { expression },
            },
            annotations: RichTextAnnotations::default(),
        }
    }

    /// The item's text, falling back to the remote rendering for item
    /// types without a modeled payload.
    pub fn content_text(&self) -> &str {
        match &self.content {
            RichTextContent::Text { text } => &text.content,
            RichTextContent::Equation { equation } => &equation.expression,
            RichTextContent::Other => &self.plain_text,
        }
    }

    pub fn link_url(&self) -> Option<&str> {
        match &self.content {
            RichTextContent::Text { text } => text.link.as_ref().map(|l| l.url.as_str()),
            _ => None,
        }
    }
}

/// Concatenated text of a rich-text sequence.
pub fn rich_text_plain(items: &[RichText]) -> String {
    items.iter().map(RichText::content_text).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteBlockKind {
    Paragraph { rich_text: Vec<RichText> },
    /// Level 1..=3. Toggle headings carry their content as children.
    Heading {
        level: u8,
        rich_text: Vec<RichText>,
        is_toggleable: bool,
    },
    BulletedListItem { rich_text: Vec<RichText> },
    NumberedListItem { rich_text: Vec<RichText> },
    ToDo { rich_text: Vec<RichText>, checked: bool },
    Code { rich_text: Vec<RichText>, language: String },
    Quote { rich_text: Vec<RichText> },
    Callout {
        rich_text: Vec<RichText>,
        emoji: Option<String>,
    },
    Equation { expression: String },
    Divider,
    Image { url: String, caption: Vec<RichText> },
    Table {
        table_width: usize,
        has_column_header: bool,
    },
    TableRow { cells: Vec<Vec<RichText>> },
    ChildPage { title: String },
    ChildDatabase { title: String },
    /// Any block type outside the modeled set.
    Unsupported { type_name: String, text: String },
}

impl RemoteBlockKind {
    /// Wire name of the block type.
    pub fn type_name(&self) -> &str {
        match self {
            RemoteBlockKind::Paragraph { .. } => "paragraph",
            RemoteBlockKind::Heading { level: 1, .. } => "heading_1",
            RemoteBlockKind::Heading { level: 2, .. } => "heading_2",
            RemoteBlockKind::Heading { .. } => "heading_3",
            RemoteBlockKind::BulletedListItem { .. } => "bulleted_list_item",
            RemoteBlockKind::NumberedListItem { .. } => "numbered_list_item",
            RemoteBlockKind::ToDo { .. } => "to_do",
            RemoteBlockKind::Code { .. } => "code",
            RemoteBlockKind::Quote { .. } => "quote",
            RemoteBlockKind::Callout { .. } => "callout",
            RemoteBlockKind::Equation { .. } => "equation",
            RemoteBlockKind::Divider => "divider",
            RemoteBlockKind::Image { .. } => "image",
            RemoteBlockKind::Table { .. } => "table",
            RemoteBlockKind::TableRow { .. } => "table_row",
            RemoteBlockKind::ChildPage { .. } => "child_page",
            RemoteBlockKind::ChildDatabase { .. } => "child_database",
            RemoteBlockKind::Unsupported { type_name, .. } => type_name,
        }
    }

    /// True for blocks that stand for a separate page or database.
    pub fn is_child_page_like(&self) -> bool {
        matches!(
            self,
            RemoteBlockKind::ChildPage { .. } | RemoteBlockKind::ChildDatabase { .. }
        )
    }
}

/// A block as sent to or listed from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlock {
    /// Assigned by the remote; `None` for blocks not yet created.
    pub id: Option<String>,
    pub kind: RemoteBlockKind,
    pub children: Vec<RemoteBlock>,
    /// Reported by the remote listing before children are fetched.
    pub has_children: bool,
}

impl RemoteBlock {
    pub fn new(kind: RemoteBlockKind) -> Self {
        Self {
            id: None,
            kind,
            children: Vec::new(),
            has_children: false,
        }
    }

    pub fn with_children(mut self, children: Vec<RemoteBlock>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }

    /// Number of blocks in this subtree, including this one.
    pub fn tree_size(&self) -> usize {
        1 + self.children.iter().map(RemoteBlock::tree_size).sum::<usize>()
    }
}
