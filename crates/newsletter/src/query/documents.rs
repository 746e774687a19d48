//! Document query functions

use std::collections::{HashSet, VecDeque};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{BrandId, Document, DocumentId, DocumentKind, Violation};
use crate::storage::{DocumentStore, DocumentSummary, ListKey, ListRange};

/// Page size used by [`list`]
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// A document together with anything `validate` still reports about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub document: Document,
    /// Normally empty; only hand-edited or legacy data produces violations
    pub violations: Vec<Violation>,
}

/// List documents of one kind with pagination
///
/// Sorted by modification time, newest first; ties put the higher id first.
pub fn list_documents(
    store: &dyn DocumentStore,
    kind: DocumentKind,
    brand: Option<&BrandId>,
    limit: usize,
    offset: usize,
) -> Result<Vec<DocumentSummary>> {
    store.list_page(kind, brand, limit, offset)
}

/// Lazily walk every document of one kind, a page at a time
///
/// Pages are fetched on demand, so a caller that stops early never loads
/// the rest. The walk is keyed on `(modified_at, id)` rather than offsets:
/// each document is yielded at most once, and one saved while the walk is
/// under way is picked up by a final pass over everything newer than the
/// walk's starting point.
pub fn list<'a>(
    store: &'a dyn DocumentStore,
    kind: DocumentKind,
    brand: Option<BrandId>,
) -> DocumentPages<'a> {
    DocumentPages {
        store,
        kind,
        brand,
        page_size: DEFAULT_PAGE_SIZE,
        pass: Pass::Main,
        head: None,
        cursor: None,
        seen: HashSet::new(),
        buffer: VecDeque::new(),
    }
}

/// Load a document and report its violations
pub fn get_document_detail(store: &dyn DocumentStore, id: DocumentId) -> Result<DocumentDetail> {
    let document = store.get(id)?;
    let violations = document.validate();
    Ok(DocumentDetail {
        document,
        violations,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Everything at or below the newest key seen on the first page
    Main,
    /// Documents saved after the walk started
    CatchUp,
    Done,
}

/// Iterator returned by [`list`]
pub struct DocumentPages<'a> {
    store: &'a dyn DocumentStore,
    kind: DocumentKind,
    brand: Option<BrandId>,
    page_size: usize,
    pass: Pass,
    /// Newest key when the walk started
    head: Option<ListKey>,
    /// Last key fetched in the current pass
    cursor: Option<ListKey>,
    seen: HashSet<DocumentId>,
    buffer: VecDeque<DocumentSummary>,
}

impl DocumentPages<'_> {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn fetch_page(&mut self) -> Result<()> {
        let range = match self.pass {
            Pass::Main => ListRange {
                before: self.cursor,
                after: None,
            },
            Pass::CatchUp => ListRange {
                before: self.cursor,
                after: self.head,
            },
            Pass::Done => return Ok(()),
        };
        let page = self
            .store
            .list_range(self.kind, self.brand.as_ref(), &range, self.page_size)?;
        debug!(
            "[QUERY] Fetched {} {} summaries ({:?} pass)",
            page.len(),
            self.kind,
            self.pass
        );

        if self.head.is_none() {
            self.head = page.first().map(DocumentSummary::key);
        }
        if let Some(last) = page.last() {
            self.cursor = Some(last.key());
        }
        if page.len() < self.page_size {
            self.pass = match (self.pass, self.head) {
                (Pass::Main, Some(_)) => Pass::CatchUp,
                _ => Pass::Done,
            };
            self.cursor = None;
        }

        let seen = &mut self.seen;
        self.buffer
            .extend(page.into_iter().filter(|summary| seen.insert(summary.id)));
        Ok(())
    }
}

impl Iterator for DocumentPages<'_> {
    type Item = Result<DocumentSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() && self.pass != Pass::Done {
            if let Err(e) = self.fetch_page() {
                self.pass = Pass::Done;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
