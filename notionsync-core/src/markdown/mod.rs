//! Markdown document model, parser and renderer.

mod front_matter;
mod inline;
mod node;
mod parser;
mod render;

pub use front_matter::{split_front_matter, FrontMatter};
pub use inline::{merge_spans, parse_inline, render_inline};
pub use node::{plain_text, Annotations, BlockKind, BlockNode, InlineSpan};
pub use parser::{parse, parse_document, ParsedDocument, INDENT_UNIT};
pub use render::render;

pub(crate) use parser::DEFAULT_CALLOUT_EMOJI;

use crate::warning::Warning;

/// A local page file after front matter extraction and parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Title from front matter, overriding the filename-derived title.
    pub title: Option<String>,
    pub blocks: Vec<BlockNode>,
    pub warnings: Vec<Warning>,
}

impl ParsedPage {
    /// Child page references in document order, including nested ones.
    pub fn child_refs(&self) -> Vec<(&str, &str)> {
        fn walk<'b>(blocks: &'b [BlockNode], out: &mut Vec<(&'b str, &'b str)>) {
            for block in blocks {
                if let BlockKind::ChildPageRef { title, file } = &block.kind {
                    out.push((title.as_str(), file.as_str()));
                }
                walk(&block.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.blocks, &mut out);
        out
    }
}

/// Parses a page file: strips front matter, then parses the body.
pub fn parse_page(text: &str) -> ParsedPage {
    let (front_matter, body) = split_front_matter(text);
    let doc = parse_document(body);
    ParsedPage {
        title: front_matter.and_then(|fm| fm.title().map(str::to_string)),
        blocks: doc.blocks,
        warnings: doc.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_with_front_matter() {
        let page = parse_page("---\ntitle: Launch Plan\n---\n\nSee [Details](Details.md)\n\n[Details](Details.md)\n");
        assert_eq!(page.title.as_deref(), Some("Launch Plan"));
        assert_eq!(page.child_refs(), vec![("Details", "Details.md")]);
    }
}
