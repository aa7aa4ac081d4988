//! Block-level Markdown rendering, the inverse of the parser.

use super::inline::{escape_text, link_destination, math_span, render_inline};
use super::node::{BlockKind, BlockNode, InlineSpan};
use super::parser::{starts_block, INDENT_UNIT};

/// Renders nodes to Markdown that parses back to an equivalent tree.
pub fn render(blocks: &[BlockNode]) -> String {
    let mut out = render_sequence(blocks);
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Renders sibling blocks. List items are kept tight; everything else is
/// separated by a blank line.
fn render_sequence(blocks: &[BlockNode]) -> String {
    let mut out = String::new();
    let mut ordinal = 0usize;

    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            let both_items = block.kind.is_list_item() && blocks[i - 1].kind.is_list_item();
            out.push_str(if both_items { "\n" } else { "\n\n" });
        }
        ordinal = match block.kind {
            BlockKind::NumberedItem => ordinal + 1,
            _ => 0,
        };
        out.push_str(&render_block(block, ordinal));
    }

    out
}

/// Renders a block followed by its children, which sit indented after a
/// blank line unless the block's own syntax carries them.
fn render_block(block: &BlockNode, ordinal: usize) -> String {
    let own = render_own(block, ordinal);
    if block.children.is_empty() || !block.kind.nests_by_indent() {
        return own;
    }
    let children = render_sequence(&block.children);
    if own.is_empty() {
        // Nothing to hang the children from; keep them as siblings.
        return children;
    }
    format!("{}\n\n{}", own, indent(&children))
}

fn render_own(block: &BlockNode, ordinal: usize) -> String {
    match &block.kind {
        BlockKind::Paragraph => render_paragraph(&block.spans),
        BlockKind::Heading { level } => {
            let hashes = "#".repeat(usize::from((*level).clamp(1, 3)));
            format!("{} {}", hashes, render_inline(&block.spans))
        }
        BlockKind::BulletItem => render_item("- ", block),
        BlockKind::NumberedItem => render_item(&format!("{}. ", ordinal.max(1)), block),
        BlockKind::TodoItem { checked } => {
            render_item(if *checked { "- [x] " } else { "- [ ] " }, block)
        }
        BlockKind::CodeBlock { language } => {
            let code = block.text();
            let fence = if code.lines().any(|l| l.trim().starts_with("```")) {
                "~~~"
            } else {
                "```"
            };
            if code.is_empty() {
                format!("{fence}{language}\n{fence}")
            } else {
                format!("{fence}{language}\n{code}\n{fence}")
            }
        }
        BlockKind::Quote => render_quote(block).join("\n"),
        BlockKind::Table { rows } => render_table(rows),
        BlockKind::Divider => "---".to_string(),
        BlockKind::Image { alt, url } => {
            format!("![{}]({})", escape_text(alt), link_destination(url))
        }
        BlockKind::Callout { emoji } => {
            let mut out = format!("::: callout {}\n", emoji);
            let text = render_paragraph(&block.spans);
            if !text.is_empty() {
                out.push_str(&text);
                out.push('\n');
            }
            if !block.children.is_empty() {
                if !text.is_empty() {
                    out.push('\n');
                }
                out.push_str(&render_sequence(&block.children));
                out.push('\n');
            }
            out.push_str(":::");
            out
        }
        BlockKind::Equation { display: true } => format!("$$\n{}\n$$", block.text()),
        BlockKind::Equation { display: false } => math_span(&block.text()),
        BlockKind::ChildPageRef { title, file } => {
            format!("[{}]({})", escape_text(title), urlencoding::encode(file))
        }
    }
}

/// Renders paragraph text, escaping any line the parser would otherwise
/// read as the start of another block.
fn render_paragraph(spans: &[InlineSpan]) -> String {
    let text = render_inline(spans);
    let lines: Vec<&str> = text.lines().collect();
    (0..lines.len())
        .map(|i| {
            if starts_block(&lines, i) {
                escape_line_start(lines[i])
            } else {
                lines[i].to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let (lead, body) = line.split_at(indent);
    let digits = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let (number, rest) = body.split_at(digits);
        format!("{}{}\\{}", lead, number, rest)
    } else {
        format!("{}\\{}", lead, body)
    }
}

/// Prefixes every non-empty line with one indentation unit.
fn indent(text: &str) -> String {
    let pad = " ".repeat(INDENT_UNIT);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a list item. Nested items follow directly; any other child is
/// set off by a blank line so it does not read as continuation text.
fn render_item(marker: &str, block: &BlockNode) -> String {
    let pad = " ".repeat(INDENT_UNIT);
    let text = render_inline(&block.spans);
    let mut lines = text.lines();
    let mut out = format!("{}{}", marker, lines.next().unwrap_or_default());
    for continuation in lines {
        out.push('\n');
        out.push_str(&pad);
        out.push_str(continuation);
    }

    if let Some(first) = block.children.first() {
        out.push_str(if first.kind.is_list_item() { "\n" } else { "\n\n" });
        out.push_str(&indent(&render_sequence(&block.children)));
    }
    out
}

/// Renders a quote as `>` lines. Nested quotes add a marker; runs of other
/// children are set off from the quote's own text by a bare `>` line.
fn render_quote(block: &BlockNode) -> Vec<String> {
    let mut lines: Vec<String> = render_paragraph(&block.spans)
        .lines()
        .map(|l| format!("> {}", l))
        .collect();

    let children = &block.children;
    let mut i = 0;
    while i < children.len() {
        if children[i].kind == BlockKind::Quote {
            lines.extend(render_quote(&children[i]).into_iter().map(|l| format!(">{}", l)));
            i += 1;
            continue;
        }

        let end = (i..children.len())
            .find(|&j| children[j].kind == BlockKind::Quote)
            .unwrap_or(children.len());
        if i == 0 {
            lines.push(">".to_string());
        }
        lines.extend(render_sequence(&children[i..end]).lines().map(|l| {
            if l.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", l)
            }
        }));
        i = end;
    }

    if lines.is_empty() {
        lines.push(">".to_string());
    }
    lines
}

fn render_table(rows: &[Vec<Vec<InlineSpan>>]) -> String {
    let Some(width) = rows.first().map(Vec::len) else {
        return String::new();
    };
    let render_row = |row: &Vec<Vec<InlineSpan>>| {
        let cells: Vec<String> = (0..width)
            .map(|i| {
                row.get(i)
                    .map(|cell| render_inline(cell).replace('|', "\\|"))
                    .unwrap_or_default()
            })
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![render_row(&rows[0])];
    lines.push(format!("|{}|", vec![" --- "; width].join("|")));
    lines.extend(rows[1..].iter().map(render_row));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::node::Annotations;
    use crate::markdown::parser::parse;

    fn assert_round_trip(text: &str) {
        let blocks = parse(text);
        let rendered = render(&blocks);
        assert_eq!(parse(&rendered), blocks, "rendered:\n{rendered}");
    }

    #[test]
    fn test_render_simple_document() {
        let blocks = vec![
            BlockNode::new(BlockKind::Heading { level: 1 }, vec![InlineSpan::plain("Title")]),
            BlockNode::paragraph(vec![
                InlineSpan::plain("Some "),
                InlineSpan::styled("bold", Annotations::default().with_bold()),
                InlineSpan::plain(" text."),
            ]),
            BlockNode::new(BlockKind::Divider, Vec::new()),
        ];
        assert_eq!(render(&blocks), "# Title\n\nSome **bold** text.\n\n---\n");
    }

    #[test]
    fn test_render_numbers_ordered_lists() {
        let blocks = parse("1. a\n1. b\n1. c");
        assert_eq!(render(&blocks), "1. a\n2. b\n3. c\n");
    }

    #[test]
    fn test_round_trip_lists() {
        assert_round_trip("- a\n  - b\n    - [x] c\n  1. d\n- e\n");
        assert_round_trip("- first\n  continued\n- second\n");
    }

    #[test]
    fn test_round_trip_quotes() {
        assert_round_trip("> outer\n>> inner\n>>> deepest\n> back\n");
    }

    #[test]
    fn test_round_trip_mixed_document() {
        let text = "\
# Heading

Intro with *italic*, `code` and [a link](https://example.com).

```rust
fn main() {}
```

| a | b |
| --- | --- |
| 1 | x \\| y |

::: callout 📌
Remember **this**

- item
:::

$$
\\sum_i x_i
$$

$y = 2$

![img](https://example.com/a.png)

[Child](Child.md)
";
        assert_round_trip(text);
    }

    #[test]
    fn test_round_trip_quote_with_block_children() {
        assert_round_trip("> quote\n>\n> - item\n> - other\n");
        assert_round_trip(">\n> only children\n>\n> 1. one\n");

        let blocks = parse("> quote\n>\n> - item\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "quote");
        assert_eq!(blocks[0].children.len(), 1);
        assert_eq!(blocks[0].children[0].kind, BlockKind::BulletItem);
    }

    #[test]
    fn test_quote_children_survive_render() {
        let quote = BlockNode::new(BlockKind::Quote, vec![InlineSpan::plain("quote")])
            .with_children(vec![
                BlockNode::new(BlockKind::BulletItem, vec![InlineSpan::plain("item")]),
                BlockNode::paragraph(vec![InlineSpan::plain("after")]),
                BlockNode::new(BlockKind::Quote, vec![InlineSpan::plain("nested")]),
            ]);
        let rendered = render(&[quote.clone()]);
        assert_eq!(rendered, "> quote\n>\n> - item\n>\n> after\n>> nested\n");
        assert_eq!(parse(&rendered), vec![quote]);

        let untitled = BlockNode::new(BlockKind::Quote, Vec::new())
            .with_children(vec![BlockNode::paragraph(vec![InlineSpan::plain("body")])]);
        assert_eq!(parse(&render(&[untitled.clone()])), vec![untitled]);
    }

    #[test]
    fn test_list_item_block_children_survive_render() {
        let item = BlockNode::new(BlockKind::BulletItem, vec![InlineSpan::plain("a")])
            .with_children(vec![
                BlockNode::new(BlockKind::BulletItem, vec![InlineSpan::plain("b")]),
                BlockNode::paragraph(vec![InlineSpan::plain("after b")]),
                BlockNode::new(
                    BlockKind::CodeBlock {
                        language: "sh".to_string(),
                    },
                    vec![InlineSpan::plain("echo hi")],
                ),
            ]);
        let next = BlockNode::new(BlockKind::BulletItem, vec![InlineSpan::plain("c")]);
        let blocks = vec![item, next];
        let rendered = render(&blocks);
        assert_eq!(
            rendered,
            "- a\n  - b\n\n  after b\n\n  ```sh\n  echo hi\n  ```\n- c\n"
        );
        assert_eq!(parse(&rendered), blocks);

        assert_round_trip("1. one\n\n   para under one\n2. two\n");
    }

    #[test]
    fn test_nested_blocks_indent_under_their_parent() {
        let blocks = vec![
            BlockNode::paragraph(vec![InlineSpan::plain("Toggle")]).with_children(vec![
                BlockNode::paragraph(vec![InlineSpan::plain("hidden")]),
                BlockNode::new(BlockKind::BulletItem, vec![InlineSpan::plain("point")]),
            ]),
            BlockNode::new(BlockKind::Heading { level: 2 }, vec![InlineSpan::plain("Section")])
                .with_children(vec![BlockNode::paragraph(vec![InlineSpan::plain("folded")])
                    .with_children(vec![BlockNode::paragraph(vec![InlineSpan::plain("deeper")])])]),
            BlockNode::paragraph(vec![InlineSpan::plain("after")]),
        ];
        let rendered = render(&blocks);
        assert_eq!(
            rendered,
            "Toggle\n\n  hidden\n\n  - point\n\n## Section\n\n  folded\n\n    deeper\n\nafter\n"
        );
        assert_eq!(parse(&rendered), blocks);
    }

    #[test]
    fn test_children_of_empty_paragraph_become_siblings() {
        let blocks = vec![BlockNode::paragraph(Vec::new())
            .with_children(vec![BlockNode::paragraph(vec![InlineSpan::plain("kept")])])];
        assert_eq!(render(&blocks), "kept\n");
    }

    #[test]
    fn test_awkward_inline_content_round_trips() {
        let blocks = vec![
            BlockNode::paragraph(vec![
                InlineSpan::styled("a`b", Annotations::default().with_code()),
                InlineSpan::plain(" and "),
                InlineSpan::math("p $ q"),
                InlineSpan::plain(" see "),
                InlineSpan::link("docs", "https://example.com/a b)"),
            ]),
            BlockNode::new(BlockKind::Equation { display: false }, vec![InlineSpan::plain(" x ")]),
            BlockNode::new(
                BlockKind::Image {
                    alt: "pic".to_string(),
                    url: "https://example.com/my pic.png".to_string(),
                },
                Vec::new(),
            ),
        ];
        let rendered = render(&blocks);
        assert_eq!(parse(&rendered), blocks, "rendered:\n{rendered}");
    }

    #[test]
    fn test_paragraph_lines_that_look_like_blocks_are_escaped() {
        let blocks = vec![BlockNode::paragraph(vec![InlineSpan::plain(
            "# not a heading\n1. not a list\n- nor this",
        )])];
        let rendered = render(&blocks);
        assert_eq!(parse(&rendered), blocks, "rendered:\n{rendered}");
    }

    #[test]
    fn test_child_page_file_with_spaces() {
        let blocks = vec![BlockNode::new(
            BlockKind::ChildPageRef {
                title: "My Page".to_string(),
                file: "My Page.md".to_string(),
            },
            Vec::new(),
        )];
        assert_eq!(render(&blocks), "[My Page](My%20Page.md)\n");
        assert_eq!(parse(&render(&blocks)), blocks);
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "");
    }
}
