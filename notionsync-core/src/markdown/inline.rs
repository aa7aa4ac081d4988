//! Inline Markdown: emphasis, strikethrough, code, math and links.
//!
//! Parsing produces a flat sequence of spans, each carrying the full set of
//! annotations that apply to it, so `*a **b** c*` and `**a *b* c**` both
//! yield a middle span that is bold and italic.

use super::node::{Annotations, InlineSpan};

/// Characters that a backslash turns into literal text.
const ESCAPABLE: &[char] = &[
    '\\', '*', '_', '`', '~', '$', '[', ']', '(', ')', '#', '>', '-', '+', '!', '|', ':', '.',
];

/// Parses inline Markdown into spans. Never fails: unmatched delimiters are
/// kept as literal text.
pub fn parse_inline(text: &str) -> Vec<InlineSpan> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    parse_range(&chars, Annotations::default(), None, &mut spans);
    merge_spans(spans)
}

fn parse_range(
    chars: &[char],
    annotations: Annotations,
    link: Option<&str>,
    out: &mut Vec<InlineSpan>,
) {
    let mut buf = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\\' => {
                if let Some(escaped) = next.filter(|n| ESCAPABLE.contains(n)) {
                    buf.push(escaped);
                    i += 2;
                    continue;
                }
            }
            '`' => {
                let run = run_len(chars, i, '`');
                if let Some(end) = find_backtick_run(chars, i + run, run) {
                    flush(&mut buf, annotations, link, out);
                    out.push(make_span(
                        code_content(&chars[i + run..end]),
                        annotations.with_code(),
                        link,
                        false,
                    ));
                    i = end + run;
                } else {
                    buf.extend(std::iter::repeat('`').take(run));
                    i += run;
                }
                continue;
            }
            '$' => {
                // $`...`$ holds math that cannot sit between bare dollars.
                if next == Some('`') {
                    let run = run_len(chars, i + 1, '`');
                    if let Some(end) = find_backtick_run(chars, i + 1 + run, run)
                        .filter(|&end| chars.get(end + run) == Some(&'$'))
                    {
                        flush(&mut buf, annotations, link, out);
                        out.push(make_span(
                            code_content(&chars[i + 1 + run..end]),
                            annotations,
                            link,
                            true,
                        ));
                        i = end + run + 1;
                        continue;
                    }
                }
                if let Some(end) = find_math_end(chars, i) {
                    flush(&mut buf, annotations, link, out);
                    out.push(make_span(
                        collect(&chars[i + 1..end]),
                        annotations,
                        link,
                        true,
                    ));
                    i = end + 1;
                    continue;
                }
            }
            '!' | '[' => {
                let open = if c == '!' { i + 1 } else { i };
                if chars.get(open) == Some(&'[') {
                    if let Some(found) = parse_link(chars, open) {
                        flush(&mut buf, annotations, link, out);
                        parse_range(
                            &chars[found.text_start..found.text_end],
                            annotations,
                            Some(&found.url),
                            out,
                        );
                        i = found.next;
                        continue;
                    }
                }
            }
            '~' if next == Some('~') => {
                if let Some(end) = find_double_tilde(chars, i + 2) {
                    flush(&mut buf, annotations, link, out);
                    parse_range(
                        &chars[i + 2..end],
                        annotations.with_strikethrough(),
                        link,
                        out,
                    );
                    i = end + 2;
                    continue;
                }
            }
            '*' | '_' => {
                if let Some(em) = match_emphasis(chars, i) {
                    flush(&mut buf, annotations, link, out);
                    let mut inner = annotations;
                    if em.bold {
                        inner = inner.with_bold();
                    }
                    if em.italic {
                        inner = inner.with_italic();
                    }
                    parse_range(&chars[em.inner_start..em.inner_end], inner, link, out);
                    i = em.next;
                    continue;
                }
                let run = run_len(chars, i, c);
                buf.extend(std::iter::repeat(c).take(run));
                i += run;
                continue;
            }
            _ => {}
        }

        buf.push(c);
        i += 1;
    }

    flush(&mut buf, annotations, link, out);
}

fn make_span(text: String, annotations: Annotations, link: Option<&str>, math: bool) -> InlineSpan {
    InlineSpan {
        text,
        annotations,
        link: link.map(str::to_string),
        math,
    }
}

fn flush(buf: &mut String, annotations: Annotations, link: Option<&str>, out: &mut Vec<InlineSpan>) {
    if !buf.is_empty() {
        out.push(make_span(std::mem::take(buf), annotations, link, false));
    }
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn run_len(chars: &[char], start: usize, c: char) -> usize {
    chars[start..].iter().take_while(|&&x| x == c).count()
}

/// Code span content with one space stripped from each end when both ends
/// have one and the content is not all spaces.
fn code_content(chars: &[char]) -> String {
    let padded = chars.len() >= 2
        && chars[0] == ' '
        && chars[chars.len() - 1] == ' '
        && chars.iter().any(|&c| c != ' ');
    if padded {
        collect(&chars[1..chars.len() - 1])
    } else {
        collect(chars)
    }
}

/// Finds a backtick run of exactly `len` starting at or after `from`.
fn find_backtick_run(chars: &[char], from: usize, len: usize) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        if chars[j] == '`' {
            let m = run_len(chars, j, '`');
            if m == len {
                return Some(j);
            }
            j += m;
        } else {
            j += 1;
        }
    }
    None
}

fn find_double_tilde(chars: &[char], from: usize) -> Option<usize> {
    (from + 1..chars.len().saturating_sub(1)).find(|&j| chars[j] == '~' && chars[j + 1] == '~')
}

/// Finds the closing `$` of inline math opened at `open`.
fn find_math_end(chars: &[char], open: usize) -> Option<usize> {
    let first = *chars.get(open + 1)?;
    if first.is_whitespace() || first == '$' {
        return None;
    }
    let mut j = open + 1;
    while j < chars.len() {
        if chars[j] == '\\' {
            j += 2;
            continue;
        }
        if chars[j] == '$' && !chars[j - 1].is_whitespace() {
            return Some(j);
        }
        j += 1;
    }
    None
}

struct LinkMatch {
    text_start: usize,
    text_end: usize,
    url: String,
    next: usize,
}

/// Matches `[text](url)` starting at the `[` at `open`.
fn parse_link(chars: &[char], open: usize) -> Option<LinkMatch> {
    let mut depth = 0usize;
    let mut j = open;
    let close = loop {
        match *chars.get(j)? {
            '\\' => {
                j += 2;
                continue;
            }
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    break j;
                }
            }
            _ => {}
        }
        j += 1;
    };

    if chars.get(close + 1) != Some(&'(') {
        return None;
    }

    let (url, end) = if chars.get(close + 2) == Some(&'<') {
        // [text](<url with spaces or parens>)
        let gt = (close + 3..chars.len()).find(|&k| matches!(chars[k], '<' | '>' | '\n'))?;
        if chars[gt] != '>' {
            return None;
        }
        let end = (gt + 1..chars.len()).find(|&k| chars[k] == ')')?;
        (collect(&chars[close + 3..gt]), end)
    } else {
        let mut depth = 0usize;
        let mut k = close + 1;
        let end = loop {
            match *chars.get(k)? {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break k;
                    }
                }
                _ => {}
            }
            k += 1;
        };

        // Drop an optional link title: [text](url "title")
        let target = collect(&chars[close + 2..end]);
        (target.split_whitespace().next()?.to_string(), end)
    };

    Some(LinkMatch {
        text_start: open + 1,
        text_end: close,
        url,
        next: end + 1,
    })
}

/// Matches a line made of exactly one `[text](url)` link, returning the raw
/// link text and the target.
pub(crate) fn whole_line_link(line: &str) -> Option<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    if chars.first() != Some(&'[') {
        return None;
    }
    let found = parse_link(&chars, 0)?;
    if found.next != chars.len() {
        return None;
    }
    Some((collect(&chars[found.text_start..found.text_end]), found.url))
}

struct Emphasis {
    bold: bool,
    italic: bool,
    inner_start: usize,
    inner_end: usize,
    next: usize,
}

/// Matches an emphasis run (`*`, `**`, `***` or the `_` forms) at `i`.
///
/// A `**` opener closes on the first later run of two or more delimiters,
/// taking the last two; a single opener closes on the first odd-length run,
/// taking the last one. This lets `**a *b***` and `*a **b***` nest.
fn match_emphasis(chars: &[char], i: usize) -> Option<Emphasis> {
    let d = chars[i];
    let run = run_len(chars, i, d);
    if run > 3 {
        return None;
    }
    if d == '_' && i > 0 && chars[i - 1].is_alphanumeric() {
        return None;
    }

    let open = run;
    let inner_start = i + open;
    match chars.get(inner_start) {
        Some(c) if !c.is_whitespace() => {}
        _ => return None,
    }

    let mut j = inner_start;
    while j < chars.len() {
        let c = chars[j];
        if c == '\\' {
            j += 2;
            continue;
        }
        if c == '`' {
            let run = run_len(chars, j, '`');
            j = find_backtick_run(chars, j + run, run).map_or(j + run, |end| end + run);
            continue;
        }
        if c == d {
            let m = run_len(chars, j, d);
            let prev_ok = j > inner_start && !chars[j - 1].is_whitespace();
            let next_ok = d != '_' || chars.get(j + m).map_or(true, |n| !n.is_alphanumeric());
            let closes = match open {
                3 => m >= 3,
                2 => m >= 2,
                _ => m % 2 == 1,
            };
            if prev_ok && next_ok && closes {
                let close_end = j + m;
                return Some(Emphasis {
                    bold: open >= 2,
                    italic: open != 2,
                    inner_start,
                    inner_end: close_end - open,
                    next: close_end,
                });
            }
            j += m;
            continue;
        }
        j += 1;
    }
    None
}

/// Drops empty spans and joins neighbours with identical formatting.
pub fn merge_spans(spans: Vec<InlineSpan>) -> Vec<InlineSpan> {
    let mut merged: Vec<InlineSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if span.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.same_format(&span) => last.text.push_str(&span.text),
            _ => merged.push(span),
        }
    }
    merged
}

#[derive(Clone, Copy)]
enum Mark {
    Bold,
    Italic,
    Strike,
}

impl Mark {
    fn applies(self, annotations: &Annotations) -> bool {
        match self {
            Mark::Bold => annotations.bold,
            Mark::Italic => annotations.italic,
            Mark::Strike => annotations.strikethrough,
        }
    }
}

/// Renders spans back to inline Markdown that [`parse_inline`] reads as the
/// same spans.
pub fn render_inline(spans: &[InlineSpan]) -> String {
    let mut out = String::new();
    render_marks(spans, &[Mark::Bold, Mark::Italic, Mark::Strike], &mut out);
    out
}

fn render_marks(spans: &[InlineSpan], marks: &[Mark], out: &mut String) {
    let Some((&mark, rest)) = marks.split_first() else {
        for span in spans {
            out.push_str(&render_leaf(span));
        }
        return;
    };

    let mut i = 0;
    while i < spans.len() {
        let on = mark.applies(&spans[i].annotations);
        let mut j = i;
        while j < spans.len() && mark.applies(&spans[j].annotations) == on {
            j += 1;
        }

        let mut inner = String::new();
        render_marks(&spans[i..j], rest, &mut inner);

        if on {
            let next_char = spans.get(j).and_then(|s| s.text.chars().next());
            wrap(&inner, mark, next_char, out);
        } else {
            out.push_str(&inner);
        }
        i = j;
    }
}

/// Wraps `inner` in the delimiter for `mark`, keeping surrounding whitespace
/// outside the delimiters so the result still parses as emphasis.
fn wrap(inner: &str, mark: Mark, next_char: Option<char>, out: &mut String) {
    let core = inner.trim();
    if core.is_empty() {
        out.push_str(inner);
        return;
    }
    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    out.push_str(lead);

    let delimiter = match mark {
        Mark::Bold => "**",
        Mark::Strike => "~~",
        Mark::Italic => {
            let prev_alnum = out.chars().last().is_some_and(|c| c.is_alphanumeric());
            let next_alnum = trail.is_empty() && next_char.is_some_and(|c| c.is_alphanumeric());
            if prev_alnum || next_alnum {
                "*"
            } else {
                "_"
            }
        }
    };

    out.push_str(delimiter);
    out.push_str(core);
    out.push_str(delimiter);
    out.push_str(trail);
}

fn render_leaf(span: &InlineSpan) -> String {
    let body = if span.math {
        math_span(&span.text)
    } else if span.annotations.code {
        code_span(&span.text)
    } else {
        escape_text(&span.text)
    };

    match &span.link {
        Some(url) => format!("[{}]({})", body, link_destination(url)),
        None => body,
    }
}

/// Wraps code in a backtick fence longer than any run inside it.
fn code_span(text: &str) -> String {
    let longest = text.split(|c: char| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    let pad = text.starts_with('`')
        || text.ends_with('`')
        || (text.len() >= 2
            && text.starts_with(' ')
            && text.ends_with(' ')
            && text.contains(|c: char| c != ' '));
    let space = if pad { " " } else { "" };
    format!("{fence}{space}{text}{space}{fence}")
}

/// Renders inline math between dollars, or as `` $`...`$ `` when the
/// expression has edge whitespace, a dollar or a trailing backslash.
pub(crate) fn math_span(expression: &str) -> String {
    let bare = !expression.is_empty()
        && !expression.starts_with(char::is_whitespace)
        && !expression.ends_with(char::is_whitespace)
        && !expression.starts_with('`')
        && !expression.ends_with('\\')
        && !expression.contains('$');
    if bare {
        format!("${expression}$")
    } else {
        format!("${}$", code_span(expression))
    }
}

/// Link target, in angle brackets when the bare form would not parse back
/// to the same URL.
pub(crate) fn link_destination(url: &str) -> String {
    let bare = !url.is_empty()
        && !url.starts_with('<')
        && !url.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')'));
    if bare {
        url.to_string()
    } else {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    }
}

/// Escapes characters that would otherwise start inline syntax.
pub fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let needs_escape = match c {
            '\\' | '*' | '`' | '$' | '[' | ']' => true,
            '~' => chars.get(i + 1) == Some(&'~') || (i > 0 && chars[i - 1] == '~'),
            '_' => {
                let prev_alnum = i > 0 && chars[i - 1].is_alphanumeric();
                let next_alnum = chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
                !(prev_alnum && next_alnum)
            }
            _ => false,
        };
        if needs_escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
