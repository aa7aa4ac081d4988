//! Block-level Markdown parsing.

use super::inline::{parse_inline, whole_line_link};
use super::node::{BlockKind, BlockNode, InlineSpan};
use crate::warning::Warning;

/// Columns per list nesting level. A tab counts as one full level.
pub const INDENT_UNIT: usize = 2;

/// Nodes produced from one document plus any degradation warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub blocks: Vec<BlockNode>,
    pub warnings: Vec<Warning>,
}

/// Parses a document into block nodes, discarding warnings.
pub fn parse(text: &str) -> Vec<BlockNode> {
    parse_document(text).blocks
}

/// Parses a document into block nodes. Never fails: malformed constructs are
/// kept as paragraph text and reported as warnings.
pub fn parse_document(text: &str) -> ParsedDocument {
    let lines: Vec<&str> = text.lines().collect();
    let mut warnings = Vec::new();
    let blocks = BlockParser::new(&lines, 0, &mut warnings).parse_blocks();
    ParsedDocument { blocks, warnings }
}

struct BlockParser<'a, 'w> {
    lines: &'a [&'a str],
    pos: usize,
    /// Line number of `lines[0]` in the whole document, zero based.
    offset: usize,
    warnings: &'w mut Vec<Warning>,
}

impl<'a, 'w> BlockParser<'a, 'w> {
    fn new(lines: &'a [&'a str], offset: usize, warnings: &'w mut Vec<Warning>) -> Self {
        Self {
            lines,
            pos: 0,
            offset,
            warnings,
        }
    }

    fn parse_blocks(&mut self) -> Vec<BlockNode> {
        let mut blocks = Vec::new();

        while self.pos < self.lines.len() {
            if self.lines[self.pos].trim().is_empty() {
                self.pos += 1;
                continue;
            }

            if let Some(block) = self.fenced_code() {
                blocks.push(block);
            } else if let Some(block) = self.callout() {
                blocks.push(block);
            } else if let Some(block) = self.display_math() {
                blocks.push(block);
            } else if let Some(block) = self.heading() {
                blocks.push(block);
            } else if let Some(block) = self.rule() {
                blocks.push(block);
            } else if let Some(block) = self.quote() {
                blocks.push(block);
            } else if let Some(items) = self.list() {
                blocks.extend(items);
            } else if let Some(block) = self.table() {
                blocks.push(block);
            } else if let Some(block) = self.single_line_block() {
                blocks.push(block);
            } else {
                blocks.push(self.paragraph());
            }

            if blocks.last().is_some_and(|b| b.kind.nests_by_indent()) {
                if let Some((start, _)) = self
                    .next_after_blank()
                    .filter(|&(_, columns)| columns >= INDENT_UNIT)
                {
                    let children = self.indented_blocks(start, INDENT_UNIT);
                    if let Some(last) = blocks.last_mut() {
                        last.children.extend(children);
                    }
                }
            }
        }

        blocks
    }

    /// Index and indentation of the next non-blank line, when the current
    /// line is blank.
    fn next_after_blank(&self) -> Option<(usize, usize)> {
        if !self.lines.get(self.pos)?.trim().is_empty() {
            return None;
        }
        let next = (self.pos..self.lines.len()).find(|&j| !self.lines[j].trim().is_empty())?;
        Some((next, leading_columns(self.lines[next])))
    }

    /// Parses the lines from `start` that stay indented by at least
    /// `columns`, with that indentation removed.
    fn indented_blocks(&mut self, start: usize, columns: usize) -> Vec<BlockNode> {
        let lines = self.lines;
        let mut end = (start..lines.len())
            .find(|&j| !lines[j].trim().is_empty() && leading_columns(lines[j]) < columns)
            .unwrap_or(lines.len());
        // Trailing blank lines stay outside so the caller sees the break.
        while end > start && lines[end - 1].trim().is_empty() {
            end -= 1;
        }
        let dedented: Vec<&str> = lines[start..end]
            .iter()
            .map(|line| strip_columns(line, columns))
            .collect();
        self.pos = end;
        BlockParser::new(&dedented, self.offset + start, self.warnings).parse_blocks()
    }

    fn degrade(&mut self, construct: &str) {
        Warning::ParseDegradation {
            line: self.offset + self.pos + 1,
            construct: construct.to_string(),
        }
        .record(self.warnings);
    }

    fn fenced_code(&mut self) -> Option<BlockNode> {
        let trimmed = self.lines[self.pos].trim_start();
        let fence_char = if trimmed.starts_with("```") {
            '`'
        } else if trimmed.starts_with("~~~") {
            '~'
        } else {
            return None;
        };
        let language = trimmed.trim_start_matches(fence_char).trim().to_string();

        let close = (self.pos + 1..self.lines.len()).find(|&j| {
            let t = self.lines[j].trim();
            t.len() >= 3 && t.chars().all(|c| c == fence_char)
        });
        let Some(end) = close else {
            self.degrade("code fence");
            return None;
        };

        let code = self.lines[self.pos + 1..end].join("\n");
        self.pos = end + 1;
        let spans = if code.is_empty() {
            Vec::new()
        } else {
            vec![InlineSpan::plain(code)]
        };
        Some(BlockNode::new(BlockKind::CodeBlock { language }, spans))
    }

    fn callout(&mut self) -> Option<BlockNode> {
        let emoji = callout_open(self.lines[self.pos])?;
        let close = (self.pos + 1..self.lines.len()).find(|&j| self.lines[j].trim() == ":::");
        let Some(end) = close else {
            self.degrade("callout");
            return None;
        };

        let lines = self.lines;
        let body = &lines[self.pos + 1..end];
        let mut inner =
            BlockParser::new(body, self.offset + self.pos + 1, self.warnings).parse_blocks();
        self.pos = end + 1;

        let spans = match inner.first() {
            Some(first) if first.kind == BlockKind::Paragraph && first.children.is_empty() => {
                inner.remove(0).spans
            }
            _ => Vec::new(),
        };
        let emoji = if emoji.is_empty() {
            DEFAULT_CALLOUT_EMOJI.to_string()
        } else {
            emoji
        };
        Some(BlockNode::new(BlockKind::Callout { emoji }, spans).with_children(inner))
    }

    fn display_math(&mut self) -> Option<BlockNode> {
        let trimmed = self.lines[self.pos].trim();
        if !trimmed.starts_with("$$") {
            return None;
        }

        if trimmed.len() > 4 && trimmed.ends_with("$$") {
            let expression = trimmed[2..trimmed.len() - 2].trim().to_string();
            self.pos += 1;
            return Some(equation(expression, true));
        }
        if trimmed != "$$" {
            return None;
        }

        let close = (self.pos + 1..self.lines.len()).find(|&j| self.lines[j].trim() == "$$");
        let Some(end) = close else {
            self.degrade("math block");
            return None;
        };
        let expression = self.lines[self.pos + 1..end].join("\n").trim().to_string();
        self.pos = end + 1;
        Some(equation(expression, true))
    }

    fn heading(&mut self) -> Option<BlockNode> {
        let (level, text) = heading_parts(self.lines[self.pos])?;
        self.pos += 1;
        Some(BlockNode::new(
            BlockKind::Heading { level },
            parse_inline(text),
        ))
    }

    fn rule(&mut self) -> Option<BlockNode> {
        if !is_rule(self.lines[self.pos]) {
            return None;
        }
        self.pos += 1;
        Some(BlockNode::new(BlockKind::Divider, Vec::new()))
    }

    fn quote(&mut self) -> Option<BlockNode> {
        let start = self.pos;
        let mut items = Vec::new();
        while let Some(line) = self.lines.get(self.pos).copied() {
            match quote_parts(line) {
                Some(item) => items.push(item),
                None => break,
            }
            self.pos += 1;
        }
        if items.is_empty() {
            return None;
        }
        Some(build_quote(&items, 1, self.offset + start, self.warnings))
    }

    fn list(&mut self) -> Option<Vec<BlockNode>> {
        list_marker(self.lines[self.pos])?;

        let mut entries: Vec<(usize, ListEntry)> = Vec::new();
        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.trim().is_empty() {
                // Past a blank line only indented content stays in the list.
                let Some((next, columns)) = self.next_after_blank() else {
                    break;
                };
                if columns < INDENT_UNIT {
                    break;
                }
                if list_marker(self.lines[next]).is_some() {
                    self.pos = next;
                    continue;
                }
                let level = columns / INDENT_UNIT;
                let blocks = self.indented_blocks(next, level * INDENT_UNIT);
                entries.extend(blocks.into_iter().map(|b| (level, ListEntry::Block(b))));
                continue;
            }
            if let Some(marker) = list_marker(line) {
                entries.push((
                    marker.level,
                    ListEntry::Item {
                        kind: marker.kind,
                        text: marker.text.to_string(),
                    },
                ));
            } else if leading_columns(line) > 0 {
                match entries.last_mut() {
                    Some((_, ListEntry::Item { text, .. })) => {
                        text.push('\n');
                        text.push_str(line.trim());
                    }
                    _ => break,
                }
            } else {
                break;
            }
            self.pos += 1;
        }

        let nodes = entries
            .into_iter()
            .map(|(level, entry)| match entry {
                ListEntry::Item { kind, text } => (level, BlockNode::new(kind, parse_inline(&text))),
                ListEntry::Block(node) => (level, node),
            })
            .collect();
        Some(nest_by_level(nodes))
    }

    fn table(&mut self) -> Option<BlockNode> {
        if !starts_table(self.lines, self.pos) {
            return None;
        }
        let header = split_row(self.lines[self.pos]);
        let width = header.len();
        let mut rows = vec![header];
        self.pos += 2;

        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.trim().is_empty() || !line.contains('|') {
                break;
            }
            let mut row = split_row(line);
            row.resize(width, String::new());
            rows.push(row);
            self.pos += 1;
        }

        let rows = rows
            .into_iter()
            .map(|row| row.iter().map(|cell| parse_inline(cell)).collect())
            .collect();
        Some(BlockNode::new(BlockKind::Table { rows }, Vec::new()))
    }

    /// Lines that stand alone as a block: an image, a child page link or a
    /// single inline equation.
    fn single_line_block(&mut self) -> Option<BlockNode> {
        let block = single_line_kind(self.lines[self.pos])?;
        self.pos += 1;
        Some(block)
    }

    fn paragraph(&mut self) -> BlockNode {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() || starts_block(self.lines, self.pos) {
                break;
            }
            self.pos += 1;
        }
        let text = self.lines[start..self.pos]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n");
        BlockNode::paragraph(parse_inline(&text))
    }
}

pub(crate) const DEFAULT_CALLOUT_EMOJI: &str = "💡";

fn equation(expression: String, display: bool) -> BlockNode {
    let spans = if expression.is_empty() {
        Vec::new()
    } else {
        vec![InlineSpan::plain(expression)]
    };
    BlockNode::new(BlockKind::Equation { display }, spans)
}

fn callout_open(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(":::")?.trim_start();
    let emoji = rest.strip_prefix("callout")?;
    Some(emoji.trim().to_string())
}

fn heading_parts(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t')) {
        return None;
    }
    Some((hashes.min(3) as u8, rest.trim()))
}

fn is_rule(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.first() {
        Some(&c @ ('-' | '*' | '_')) => compact.len() >= 3 && compact.iter().all(|&x| x == c),
        _ => false,
    }
}

/// Returns the quote depth and the text after the markers.
fn quote_parts(line: &str) -> Option<(usize, &str)> {
    let mut rest = line.trim_start();
    if !rest.starts_with('>') {
        return None;
    }
    let mut depth = 0;
    while let Some(after) = rest.strip_prefix('>') {
        depth += 1;
        rest = after.strip_prefix(' ').unwrap_or(after);
        if !rest.starts_with('>') {
            break;
        }
    }
    Some((depth, rest))
}

/// Builds the quote at `level` from lines whose depth is at least `level`.
///
/// Runs of lines at `level` are parsed as blocks. A paragraph on the very
/// first line is the quote's own text; everything else becomes a child.
fn build_quote(
    items: &[(usize, &str)],
    level: usize,
    offset: usize,
    warnings: &mut Vec<Warning>,
) -> BlockNode {
    let mut spans = Vec::new();
    let mut children = Vec::new();
    let mut i = 0;

    while i < items.len() {
        let (depth, _) = items[i];
        let run_end = (i..items.len())
            .find(|&j| (items[j].0 == level) != (depth == level))
            .unwrap_or(items.len());

        if depth == level {
            let lines: Vec<&str> = items[i..run_end].iter().map(|(_, t)| *t).collect();
            let mut blocks = BlockParser::new(&lines, offset + i, warnings).parse_blocks();
            let opens_with_text = i == 0 && !lines[0].trim().is_empty();
            if opens_with_text
                && blocks
                    .first()
                    .is_some_and(|b| b.kind == BlockKind::Paragraph && b.children.is_empty())
            {
                spans = blocks.remove(0).spans;
            }
            children.extend(blocks);
        } else {
            children.push(build_quote(&items[i..run_end], level + 1, offset + i, warnings));
        }
        i = run_end;
    }

    BlockNode::new(BlockKind::Quote, spans).with_children(children)
}

enum ListEntry {
    Item { kind: BlockKind, text: String },
    /// Content indented under an item after a blank line.
    Block(BlockNode),
}

struct ListMarker<'l> {
    level: usize,
    kind: BlockKind,
    text: &'l str,
}

fn leading_columns(line: &str) -> usize {
    let mut columns = 0;
    for c in line.chars() {
        match c {
            ' ' => columns += 1,
            '\t' => columns += INDENT_UNIT,
            _ => break,
        }
    }
    columns
}

/// Removes up to `columns` columns of leading indentation.
fn strip_columns(line: &str, columns: usize) -> &str {
    let mut removed = 0;
    for (i, c) in line.char_indices() {
        if removed >= columns {
            return &line[i..];
        }
        match c {
            ' ' => removed += 1,
            '\t' => removed += INDENT_UNIT,
            _ => return &line[i..],
        }
    }
    ""
}

fn list_marker(line: &str) -> Option<ListMarker<'_>> {
    let level = leading_columns(line) / INDENT_UNIT;
    let body = line.trim_start();

    let (ordered, after) = if let Some(rest) = body
        .strip_prefix("- ")
        .or_else(|| body.strip_prefix("* "))
        .or_else(|| body.strip_prefix("+ "))
    {
        (false, rest)
    } else {
        let digits = body.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || digits > 9 {
            return None;
        }
        let rest = &body[digits..];
        let rest = rest
            .strip_prefix(". ")
            .or_else(|| rest.strip_prefix(") "))?;
        (true, rest)
    };

    if !ordered {
        for (prefix, checked) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
            if let Some(rest) = after.strip_prefix(prefix) {
                if rest.is_empty() || rest.starts_with(' ') {
                    return Some(ListMarker {
                        level,
                        kind: BlockKind::TodoItem { checked },
                        text: rest.trim_start(),
                    });
                }
            }
        }
    }

    let kind = if ordered {
        BlockKind::NumberedItem
    } else {
        BlockKind::BulletItem
    };
    Some(ListMarker {
        level,
        kind,
        text: after,
    })
}

/// Attaches each node to the nearest preceding node with a lower level.
fn nest_by_level(items: Vec<(usize, BlockNode)>) -> Vec<BlockNode> {
    fn attach(node: BlockNode, open: &mut [(usize, BlockNode)], roots: &mut Vec<BlockNode>) {
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    let mut roots = Vec::new();
    let mut open: Vec<(usize, BlockNode)> = Vec::new();
    for (level, node) in items {
        while open.last().is_some_and(|(l, _)| *l >= level) {
            if let Some((_, done)) = open.pop() {
                attach(done, &mut open, &mut roots);
            }
        }
        open.push((level, node));
    }
    while let Some((_, done)) = open.pop() {
        attach(done, &mut open, &mut roots);
    }
    roots
}

fn is_table_separator(line: &str) -> bool {
    let cells = split_row(line);
    !cells.is_empty()
        && line.contains('-')
        && cells.iter().all(|cell| {
            let core = cell.trim_start_matches(':').trim_end_matches(':');
            !core.is_empty() && core.chars().all(|c| c == '-')
        })
}

fn starts_table(lines: &[&str], pos: usize) -> bool {
    lines[pos].contains('|')
        && lines
            .get(pos + 1)
            .is_some_and(|next| is_table_separator(next))
}

/// Splits a table row on unescaped pipes, dropping the outer ones.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => trimmed,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn is_relative_markdown(url: &str) -> bool {
    !url.contains("://")
        && !url.starts_with('/')
        && !url.starts_with('#')
        && !url.starts_with("mailto:")
        && url.to_ascii_lowercase().ends_with(".md")
}

fn single_line_kind(line: &str) -> Option<BlockNode> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix('!') {
        let (alt, url) = whole_line_link(rest)?;
        return Some(BlockNode::new(BlockKind::Image { alt, url }, Vec::new()));
    }

    if let Some((text, url)) = whole_line_link(trimmed) {
        if !is_relative_markdown(&url) {
            return None;
        }
        let file = urlencoding::decode(&url)
            .map(|f| f.into_owned())
            .unwrap_or(url);
        let title = super::node::plain_text(&parse_inline(&text));
        return Some(BlockNode::new(
            BlockKind::ChildPageRef { title, file },
            Vec::new(),
        ));
    }

    if trimmed.starts_with('$') && !trimmed.starts_with("$$") {
        let spans = parse_inline(trimmed);
        if let [span] = spans.as_slice() {
            if span.math {
                return Some(equation(span.text.clone(), false));
            }
        }
    }

    None
}

/// True when the line at `pos` would be read as something other than
/// paragraph text.
pub(crate) fn starts_block(lines: &[&str], pos: usize) -> bool {
    let line = lines[pos];
    let trimmed = line.trim_start();
    trimmed.starts_with("```")
        || trimmed.starts_with("~~~")
        || trimmed.starts_with("$$")
        || callout_open(line).is_some()
        || heading_parts(line).is_some()
        || is_rule(line)
        || trimmed.starts_with('>')
        || list_marker(line).is_some()
        || starts_table(lines, pos)
        || single_line_kind(line).is_some()
}
