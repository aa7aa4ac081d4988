use crate::markdown::{merge_spans, Annotations, BlockKind, BlockNode, InlineSpan, DEFAULT_CALLOUT_EMOJI};
use crate::remote::{rich_text_plain, RemoteBlock, RemoteBlockKind, RichText, RichTextContent};
use crate::warning::Warning;

/// Maps a remote block and its children to a document node.
///
/// Never fails. Block types outside the modeled set become paragraphs of
/// their text. Child pages become [`BlockKind::ChildPageRef`] with an empty
/// file, which the hierarchy resolver fills in.
pub fn from_remote(block: &RemoteBlock, warnings: &mut Vec<Warning>) -> BlockNode {
    let node = match &block.kind {
        RemoteBlockKind::Paragraph { rich_text } => match rich_text.as_slice() {
            [RichText {
                content: RichTextContent::Equation { equation },
                ..
            }] => BlockNode::new(
                BlockKind::Equation { display: false },
                vec![InlineSpan::plain(equation.expression.clone())],
            ),
            _ => BlockNode::paragraph(rich_text_to_spans(rich_text)),
        },
        RemoteBlockKind::Heading {
            level, rich_text, ..
        } => BlockNode::new(
            BlockKind::Heading {
                level: (*level).clamp(1, 3),
            },
            rich_text_to_spans(rich_text),
        ),
        RemoteBlockKind::BulletedListItem { rich_text } => {
            BlockNode::new(BlockKind::BulletItem, rich_text_to_spans(rich_text))
        }
        RemoteBlockKind::NumberedListItem { rich_text } => {
            BlockNode::new(BlockKind::NumberedItem, rich_text_to_spans(rich_text))
        }
        RemoteBlockKind::ToDo { rich_text, checked } => BlockNode::new(
            BlockKind::TodoItem { checked: *checked },
            rich_text_to_spans(rich_text),
        ),
        RemoteBlockKind::Code {
            rich_text,
            language,
        } => {
            let code = rich_text_plain(rich_text);
            let language = if language == "plain text" {
                String::new()
            } else {
                language.clone()
            };
            let spans = if code.is_empty() {
                Vec::new()
            } else {
                vec![InlineSpan::plain(code)]
            };
            BlockNode::new(BlockKind::CodeBlock { language }, spans)
        }
        RemoteBlockKind::Quote { rich_text } => {
            BlockNode::new(BlockKind::Quote, rich_text_to_spans(rich_text))
        }
        RemoteBlockKind::Callout { rich_text, emoji } => BlockNode::new(
            BlockKind::Callout {
                emoji: emoji
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CALLOUT_EMOJI.to_string()),
            },
            rich_text_to_spans(rich_text),
        ),
        RemoteBlockKind::Equation { expression } => {
            let spans = if expression.is_empty() {
                Vec::new()
            } else {
                vec![InlineSpan::plain(expression.clone())]
            };
            BlockNode::new(BlockKind::Equation { display: true }, spans)
        }
        RemoteBlockKind::Divider => BlockNode::new(BlockKind::Divider, Vec::new()),
        RemoteBlockKind::Image { url, caption } => BlockNode::new(
            BlockKind::Image {
                alt: rich_text_plain(caption),
                url: url.clone(),
            },
            Vec::new(),
        ),
        RemoteBlockKind::Table { .. } => {
            let rows = block
                .children
                .iter()
                .filter_map(|row| match &row.kind {
                    RemoteBlockKind::TableRow { cells } => {
                        Some(cells.iter().map(|c| rich_text_to_spans(c)).collect())
                    }
                    _ => None,
                })
                .collect();
            return BlockNode::new(BlockKind::Table { rows }, Vec::new());
        }
        RemoteBlockKind::TableRow { cells } => {
            Warning::UnsupportedBlock {
                block_type: "table_row".to_string(),
            }
            .record(warnings);
            let text = cells
                .iter()
                .map(|c| rich_text_plain(c))
                .collect::<Vec<_>>()
                .join(" | ");
            BlockNode::paragraph(vec![InlineSpan::plain(text)])
        }
        RemoteBlockKind::ChildPage { title } => BlockNode::new(
            BlockKind::ChildPageRef {
                title: title.clone(),
                file: String::new(),
            },
            Vec::new(),
        ),
        RemoteBlockKind::ChildDatabase { title } => {
            Warning::UnsupportedBlock {
                block_type: "child_database".to_string(),
            }
            .record(warnings);
            let name = if title.is_empty() { "Untitled" } else { title };
            return BlockNode::paragraph(vec![InlineSpan::styled(
                format!("Child database: {} (not supported)", name),
                Annotations::default().with_italic(),
            )]);
        }
        RemoteBlockKind::Unsupported { type_name, text } => {
            Warning::UnsupportedBlock {
                block_type: type_name.clone(),
            }
            .record(warnings);
            let spans = if text.is_empty() {
                Vec::new()
            } else {
                vec![InlineSpan::plain(text.clone())]
            };
            BlockNode::paragraph(spans)
        }
    };

    let children = block
        .children
        .iter()
        .map(|child| from_remote(child, warnings))
        .collect();
    node.with_children(children)
}

/// Converts rich-text items to spans, rejoining items that were split.
pub fn rich_text_to_spans(items: &[RichText]) -> Vec<InlineSpan> {
    let spans = items
        .iter()
        .map(|item| InlineSpan {
            text: item.content_text().to_string(),
            annotations: Annotations {
                bold: item.annotations.bold,
                italic: item.annotations.italic,
                strikethrough: item.annotations.strikethrough,
                code: item.annotations.code,
            },
            link: item.link_url().map(str::to_string),
            math: matches!(item.content, RichTextContent::Equation { .. }),
        })
        .collect();
    merge_spans(spans)
}
