//! Document model shared by the parser, the renderer and the mapper.

use serde::{Deserialize, Serialize};

/// Annotation set carried by an inline span.
///
/// Annotations are a set: the order in which markers were written in the
/// source has no meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.strikethrough || self.code)
    }

    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn with_strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    pub fn with_code(mut self) -> Self {
        self.code = true;
        self
    }
}

/// A run of text with uniform formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSpan {
    pub text: String,
    pub annotations: Annotations,
    /// Link target when the span is the text of a `[text](url)` link.
    pub link: Option<String>,
    /// True for inline math (`$...$`); the text is the raw expression.
    pub math: bool,
}

impl InlineSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: Annotations::default(),
            link: None,
            math: false,
        }
    }

    pub fn styled(text: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            annotations,
            ..Self::plain(text)
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link: Some(url.into()),
            ..Self::plain(text)
        }
    }

    pub fn math(expression: impl Into<String>) -> Self {
        Self {
            math: true,
            ..Self::plain(expression)
        }
    }

    /// True when two spans can be merged into one without changing meaning.
    pub fn same_format(&self, other: &InlineSpan) -> bool {
        self.annotations == other.annotations
            && self.link == other.link
            && !self.math
            && !other.math
    }
}

/// Concatenates the text of a span sequence.
pub fn plain_text(spans: &[InlineSpan]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// Block variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph,
    /// Heading level, always within 1..=3.
    Heading { level: u8 },
    BulletItem,
    NumberedItem,
    TodoItem { checked: bool },
    CodeBlock { language: String },
    Quote,
    /// Rows of cells; the first row is the header.
    Table { rows: Vec<Vec<Vec<InlineSpan>>> },
    Divider,
    Image { alt: String, url: String },
    Callout { emoji: String },
    /// The expression is held in the node's spans as plain text.
    Equation { display: bool },
    /// Reference to a child page stored in the sibling file `file`.
    ChildPageRef { title: String, file: String },
}

impl BlockKind {
    /// Short name used in warnings and logs.
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading { .. } => "heading",
            BlockKind::BulletItem => "bullet item",
            BlockKind::NumberedItem => "numbered item",
            BlockKind::TodoItem { .. } => "to-do item",
            BlockKind::CodeBlock { .. } => "code block",
            BlockKind::Quote => "quote",
            BlockKind::Table { .. } => "table",
            BlockKind::Divider => "divider",
            BlockKind::Image { .. } => "image",
            BlockKind::Callout { .. } => "callout",
            BlockKind::Equation { .. } => "equation",
            BlockKind::ChildPageRef { .. } => "child page",
        }
    }

    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            BlockKind::BulletItem | BlockKind::NumberedItem | BlockKind::TodoItem { .. }
        )
    }

    /// True when children are written as an indented region after the
    /// block. List items, quotes and callouts carry them in their own syntax.
    pub fn nests_by_indent(&self) -> bool {
        !self.is_list_item() && !matches!(self, BlockKind::Quote | BlockKind::Callout { .. })
    }
}

/// A structural unit of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockNode {
    pub kind: BlockKind,
    pub spans: Vec<InlineSpan>,
    pub children: Vec<BlockNode>,
}

impl BlockNode {
    pub fn new(kind: BlockKind, spans: Vec<InlineSpan>) -> Self {
        Self {
            kind,
            spans,
            children: Vec::new(),
        }
    }

    pub fn paragraph(spans: Vec<InlineSpan>) -> Self {
        Self::new(BlockKind::Paragraph, spans)
    }

    pub fn with_children(mut self, children: Vec<BlockNode>) -> Self {
        self.children = children;
        self
    }

    pub fn text(&self) -> String {
        plain_text(&self.spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_are_a_set() {
        let a = Annotations::default().with_bold().with_italic();
        let b = Annotations::default().with_italic().with_bold();
        assert_eq!(a, b);
        assert!(!a.is_plain());
        assert!(Annotations::default().is_plain());
    }

    #[test]
    fn test_same_format_ignores_math() {
        let a = InlineSpan::plain("a");
        let b = InlineSpan::plain("b");
        assert!(a.same_format(&b));
        assert!(!a.same_format(&InlineSpan::math("x")));
        assert!(!a.same_format(&InlineSpan::link("a", "https://example.com")));
    }

    #[test]
    fn test_plain_text_concatenates() {
        let spans = vec![
            InlineSpan::plain("Hello "),
            InlineSpan::styled("world", Annotations::default().with_bold()),
        ];
        assert_eq!(plain_text(&spans), "Hello world");
    }
}
