//! Non-fatal conditions surfaced during conversion and sync.
//!
//! Warnings never abort an operation. They are logged when recorded and
//! travel with the operation's report so the CLI can summarize them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    /// A Markdown construct could not be parsed and was kept as plain text.
    ParseDegradation { line: usize, construct: String },
    /// Content exceeded a remote limit and was split automatically.
    MappingOverflow { detail: String },
    /// A page nested beyond the depth cap was moved up the hierarchy.
    HierarchyDepthExceeded {
        title: String,
        depth: usize,
        max_depth: usize,
    },
    /// Two pages mapped to the same filename; the later one was suffixed.
    TitleCollision { title: String, file: String },
    /// A remote block type outside the modeled set was degraded to text.
    UnsupportedBlock { block_type: String },
    /// A code block language the remote does not accept; sent as plain text.
    UnknownCodeLanguage { language: String },
}

impl Warning {
    /// Logs the warning and appends it to `sink`.
    pub fn record(self, sink: &mut Vec<Warning>) {
        tracing::warn!("{}", self);
        sink.push(self);
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ParseDegradation { line, construct } => {
                write!(f, "line {}: unterminated {} kept as text", line, construct)
            }
            Warning::MappingOverflow { detail } => write!(f, "split oversized content: {}", detail),
            Warning::HierarchyDepthExceeded {
                title,
                depth,
                max_depth,
            } => write!(
                f,
                "page '{}' at depth {} exceeds the maximum depth {}; flattened",
                title, depth, max_depth
            ),
            Warning::TitleCollision { title, file } => {
                write!(f, "title '{}' collides with another page; using {}", title, file)
            }
            Warning::UnsupportedBlock { block_type } => {
                write!(f, "unsupported block type '{}' converted to text", block_type)
            }
            Warning::UnknownCodeLanguage { language } => {
                write!(f, "code language '{}' is not supported remotely; using plain text", language)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends() {
        let mut sink = Vec::new();
        Warning::UnsupportedBlock {
            block_type: "bookmark".to_string(),
        }
        .record(&mut sink);
        assert_eq!(sink.len(), 1);
        assert!(sink[0].to_string().contains("bookmark"));
    }
}
