use crate::markdown::{BlockKind, BlockNode, InlineSpan};
use crate::remote::{
    Link, RemoteBlock, RemoteBlockKind, RichText, RichTextContent, TextContent, RICH_TEXT_LIMIT,
};
use crate::warning::Warning;

use super::ChildPageRequest;

/// Result of mapping one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    Block(RemoteBlock),
    /// The node refers to a separate page rather than page content.
    ChildPage(ChildPageRequest),
}

/// Maps a node and its children to a remote block.
///
/// Child page references nested below `node` are removed from the block
/// tree and reported through `child_pages`.
pub fn to_remote(
    node: &BlockNode,
    child_pages: &mut Vec<ChildPageRequest>,
    warnings: &mut Vec<Warning>,
) -> Mapped {
    let mut rich_text = || spans_to_rich_text(&node.spans, warnings);

    let kind = match &node.kind {
        BlockKind::ChildPageRef { title, file } => {
            return Mapped::ChildPage(ChildPageRequest {
                title: title.clone(),
                file: file.clone(),
            });
        }
        BlockKind::Paragraph => RemoteBlockKind::Paragraph {
            rich_text: rich_text(),
        },
        BlockKind::Heading { level } => RemoteBlockKind::Heading {
            level: (*level).clamp(1, 3),
            rich_text: rich_text(),
            is_toggleable: !node.children.is_empty(),
        },
        BlockKind::BulletItem => RemoteBlockKind::BulletedListItem {
            rich_text: rich_text(),
        },
        BlockKind::NumberedItem => RemoteBlockKind::NumberedListItem {
            rich_text: rich_text(),
        },
        BlockKind::TodoItem { checked } => RemoteBlockKind::ToDo {
            rich_text: rich_text(),
            checked: *checked,
        },
        BlockKind::CodeBlock { language } => RemoteBlockKind::Code {
            rich_text: rich_text(),
            language: normalize_language(language, warnings),
        },
        BlockKind::Quote => RemoteBlockKind::Quote {
            rich_text: rich_text(),
        },
        BlockKind::Callout { emoji } => RemoteBlockKind::Callout {
            rich_text: rich_text(),
            emoji: Some(emoji.clone()),
        },
        BlockKind::Equation { display: true } => RemoteBlockKind::Equation {
            expression: node.text(),
        },
        BlockKind::Equation { display: false } => RemoteBlockKind::Paragraph {
            rich_text: vec![RichText::equation(node.text())],
        },
        BlockKind::Divider => RemoteBlockKind::Divider,
        BlockKind::Image { alt, url } => RemoteBlockKind::Image {
            url: url.clone(),
            caption: if alt.is_empty() {
                Vec::new()
            } else {
                vec![RichText::text(alt.clone())]
            },
        },
        BlockKind::Table { rows } => {
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            let rows = rows
                .iter()
                .map(|row| {
                    let mut cells: Vec<Vec<RichText>> = row
                        .iter()
                        .map(|cell| spans_to_rich_text(cell, warnings))
                        .collect();
                    cells.resize(width, Vec::new());
                    RemoteBlock::new(RemoteBlockKind::TableRow { cells })
                })
                .collect();
            return Mapped::Block(
                RemoteBlock::new(RemoteBlockKind::Table {
                    table_width: width,
                    has_column_header: true,
                })
                .with_children(rows),
            );
        }
    };

    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        match to_remote(child, child_pages, warnings) {
            Mapped::Block(block) => children.push(block),
            Mapped::ChildPage(request) => child_pages.push(request),
        }
    }

    Mapped::Block(RemoteBlock::new(kind).with_children(children))
}

/// Converts spans to rich-text items, splitting items longer than the
/// per-item limit.
pub fn spans_to_rich_text(spans: &[InlineSpan], warnings: &mut Vec<Warning>) -> Vec<RichText> {
    let mut items = Vec::with_capacity(spans.len());

    for span in spans {
        let chars: Vec<char> = span.text.chars().collect();
        if chars.len() > RICH_TEXT_LIMIT && !span.math {
            Warning::MappingOverflow {
                detail: format!(
                    "text of {} characters split into items of at most {}",
                    chars.len(),
                    RICH_TEXT_LIMIT
                ),
            }
            .record(warnings);
        }

        let pieces: Vec<String> = if span.math {
            vec![span.text.clone()]
        } else {
            chars
                .chunks(RICH_TEXT_LIMIT)
                .map(|c| c.iter().collect())
                .collect()
        };

        for piece in pieces {
            let mut item = if span.math {
                RichText::equation(piece)
            } else {
                RichText {
                    plain_text: piece.clone(),
                    content: RichTextContent::Text {
                        text: TextContent {
                            content: piece,
                            link: span.link.clone().map(|url| Link { url }),
                        },
                    },
                    annotations: Default::default(),
                }
            };
            item.annotations.bold = span.annotations.bold;
            item.annotations.italic = span.annotations.italic;
            item.annotations.strikethrough = span.annotations.strikethrough;
            item.annotations.code = span.annotations.code;
            items.push(item);
        }
    }

    items
}

/// Languages the remote accepts for code blocks.
const LANGUAGES: &[&str] = &[
    "abap", "arduino", "bash", "basic", "c", "clojure", "coffeescript", "c++", "c#", "css",
    "dart", "diff", "docker", "elixir", "elm", "erlang", "flow", "fortran", "f#", "gherkin",
    "glsl", "go", "graphql", "groovy", "haskell", "html", "java", "javascript", "json", "julia",
    "kotlin", "latex", "less", "lisp", "livescript", "lua", "makefile", "markdown", "markup",
    "matlab", "mermaid", "nix", "objective-c", "ocaml", "pascal", "perl", "php", "plain text",
    "powershell", "prolog", "protobuf", "python", "r", "reason", "ruby", "rust", "sass",
    "scala", "scheme", "scss", "shell", "sql", "swift", "typescript", "vb.net", "verilog",
    "vhdl", "visual basic", "webassembly", "xml", "yaml", "java/c/c++/c#",
];

const ALIASES: &[(&str, &str)] = &[
    ("", "plain text"),
    ("text", "plain text"),
    ("txt", "plain text"),
    ("plaintext", "plain text"),
    ("rs", "rust"),
    ("py", "python"),
    ("python3", "python"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("sh", "shell"),
    ("zsh", "shell"),
    ("console", "shell"),
    ("yml", "yaml"),
    ("cpp", "c++"),
    ("cc", "c++"),
    ("cs", "c#"),
    ("csharp", "c#"),
    ("fsharp", "f#"),
    ("md", "markdown"),
    ("dockerfile", "docker"),
    ("golang", "go"),
    ("rb", "ruby"),
    ("kt", "kotlin"),
    ("objc", "objective-c"),
    ("ps1", "powershell"),
    ("pwsh", "powershell"),
    ("tex", "latex"),
    ("make", "makefile"),
    ("hs", "haskell"),
    ("ex", "elixir"),
    ("exs", "elixir"),
    ("proto", "protobuf"),
    ("wasm", "webassembly"),
];

/// Maps a Markdown fence language to one the remote accepts.
pub fn normalize_language(language: &str, warnings: &mut Vec<Warning>) -> String {
    let lower = language.trim().to_lowercase();
    if LANGUAGES.contains(&lower.as_str()) {
        return lower;
    }
    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return canonical.to_string();
    }
    Warning::UnknownCodeLanguage {
        language: language.to_string(),
    }
    .record(warnings);
    "plain text".to_string()
}
