use std::collections::HashSet;

use crate::warning::Warning;

/// File holding the root page.
pub const ROOT_FILE: &str = "index.md";

const MARKDOWN_EXT: &str = ".md";

/// Makes a title safe to use as a file stem.
///
/// Alphanumerics, space, `.`, `-` and `_` are kept; everything else becomes
/// `_`. An empty result becomes `Untitled`.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derives a page title from its file name.
pub fn title_from_file(file: &str) -> String {
    let stem = file.strip_suffix(MARKDOWN_EXT).unwrap_or(file);
    if stem.is_empty() {
        "Untitled".to_string()
    } else {
        stem.to_string()
    }
}

pub fn is_markdown_file(file: &str) -> bool {
    file.to_ascii_lowercase().ends_with(MARKDOWN_EXT)
}

/// Hands out unique file names, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct FileNamer {
    taken: HashSet<String>,
}

impl Default for FileNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl FileNamer {
    /// A namer with the root file name already reserved.
    pub fn new() -> Self {
        let mut namer = Self {
            taken: HashSet::new(),
        };
        namer.reserve(ROOT_FILE);
        namer
    }

    /// Marks an existing file name as taken.
    pub fn reserve(&mut self, file: &str) {
        self.taken.insert(file.to_lowercase());
    }

    /// Returns a unique `.md` file name for `title`, suffixing `-2`, `-3`, …
    /// on collision.
    pub fn assign(&mut self, title: &str, warnings: &mut Vec<Warning>) -> String {
        let stem = sanitize_title(title);
        let mut file = format!("{}{}", stem, MARKDOWN_EXT);
        let mut n = 2;
        while self.taken.contains(&file.to_lowercase()) {
            file = format!("{}-{}{}", stem, n, MARKDOWN_EXT);
            n += 1;
        }
        if n > 2 {
            Warning::TitleCollision {
                title: title.to_string(),
                file: file.clone(),
            }
            .record(warnings);
        }
        self.reserve(&file);
        file
    }
}
