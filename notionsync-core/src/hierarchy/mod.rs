//! Page hierarchy: remote parent/child pages mapped onto a flat directory.

mod filename;
mod resolver;
mod table;

pub use filename::{is_markdown_file, sanitize_title, title_from_file, FileNamer, ROOT_FILE};
pub use resolver::{
    link_child_pages, resolve_local, resolve_remote, KnownPage, LocalPage, RemotePageInfo,
    ResolveOptions, DEFAULT_MAX_DEPTH,
};
pub use table::{PageIdx, PageRecord, PageTable};
