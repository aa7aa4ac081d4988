use std::collections::BTreeMap;

/// `key: value` pairs from a leading `---` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub fields: BTreeMap<String, String>,
}

impl FrontMatter {
    pub fn title(&self) -> Option<&str> {
        self.fields
            .get("title")
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// Splits a leading front matter block from the document body.
///
/// The block is only recognised when every non-blank line inside it is a
/// `key: value` pair, so a document that merely starts with a horizontal
/// rule is left alone.
pub fn split_front_matter(text: &str) -> (Option<FrontMatter>, &str) {
    let Some(rest) = strip_delimiter_line(text) else {
        return (None, text);
    };

    let mut fields = BTreeMap::new();
    let mut cursor = rest;
    loop {
        if cursor.is_empty() {
            return (None, text);
        }
        let (line, next) = match cursor.find('\n') {
            Some(i) => (&cursor[..i], &cursor[i + 1..]),
            None => (cursor, ""),
        };
        let line = line.trim_end_matches('\r');

        if line.trim_end() == "---" {
            return (Some(FrontMatter { fields }), next);
        }
        if !line.trim().is_empty() {
            let Some((key, value)) = parse_field(line) else {
                return (None, text);
            };
            fields.insert(key, value);
        }
        cursor = next;
    }
}

fn strip_delimiter_line(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("---")?;
    let rest = rest.trim_start_matches([' ', '\t']);
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

fn parse_field(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((key.to_lowercase(), value.to_string()))
}
