use std::collections::HashMap;

/// Index of a record in a [`PageTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageIdx(usize);

impl PageIdx {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// File name inside the workspace.
    pub path: String,
    /// Exact remote title.
    pub title: String,
    /// `None` until the page is first pushed.
    pub remote_id: Option<String>,
    /// `None` for the root page and for top-level database entries.
    pub parent: Option<PageIdx>,
    /// 0 for the root page.
    pub depth: usize,
    /// Set when the page was moved up to respect the depth cap.
    pub flattened: bool,
}

impl PageRecord {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            remote_id: None,
            parent: None,
            depth: 0,
            flattened: false,
        }
    }
}

/// Arena of page records keyed by path, with parent links as indices.
#[derive(Debug, Clone, Default)]
pub struct PageTable {
    records: Vec<PageRecord>,
    by_path: HashMap<String, PageIdx>,
}

impl PageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any record with the same path.
    pub fn insert(&mut self, record: PageRecord) -> PageIdx {
        if let Some(&idx) = self.by_path.get(&record.path) {
            self.records[idx.0] = record;
            return idx;
        }
        let idx = PageIdx(self.records.len());
        self.by_path.insert(record.path.clone(), idx);
        self.records.push(record);
        idx
    }

    pub fn get(&self, idx: PageIdx) -> &PageRecord {
        &self.records[idx.0]
    }

    pub fn get_mut(&mut self, idx: PageIdx) -> &mut PageRecord {
        &mut self.records[idx.0]
    }

    pub fn lookup(&self, path: &str) -> Option<PageIdx> {
        self.by_path.get(path).copied()
    }

    pub fn record(&self, path: &str) -> Option<&PageRecord> {
        self.lookup(path).map(|idx| self.get(idx))
    }

    pub fn find_remote(&self, remote_id: &str) -> Option<PageIdx> {
        self.records
            .iter()
            .position(|r| r.remote_id.as_deref() == Some(remote_id))
            .map(PageIdx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PageIdx, &PageRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (PageIdx(i), r))
    }

    /// Path of the record's parent, if any.
    pub fn parent_path(&self, idx: PageIdx) -> Option<&str> {
        self.get(idx).parent.map(|p| self.get(p).path.as_str())
    }

    /// Indices ordered so every parent precedes its children; ties keep
    /// path order.
    pub fn parents_first(&self) -> Vec<PageIdx> {
        let mut order: Vec<PageIdx> = self.iter().map(|(idx, _)| idx).collect();
        order.sort_by(|a, b| {
            let (ra, rb) = (self.get(*a), self.get(*b));
            ra.depth.cmp(&rb.depth).then_with(|| ra.path.cmp(&rb.path))
        });
        order
    }
}
