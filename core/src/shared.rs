use crate::document::DocumentRecord;
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::posting::PostingList;
use crate::{DocId, Term};
use parking_lot::RwLock;
use std::path::Path;

/// An [`InvertedIndex`] that several ingestion threads can add to.
///
/// One index-wide lock: `add` and `optimize` are exclusive, so the
/// lookup-or-create of a posting list and the posting update it feeds
/// happen as one step. Readers share the lock with each other only.
#[derive(Debug)]
pub struct SharedIndex<T: Term = String> {
    inner: RwLock<InvertedIndex<T>>,
}

impl<T: Term> SharedIndex<T> {
    pub fn new(index: InvertedIndex<T>) -> Self {
        Self { inner: RwLock::new(index) }
    }

    pub fn add(&self, doc: &DocumentRecord<T>) {
        self.inner.write().add(doc);
    }

    pub fn optimize(&self) {
        self.inner.write().optimize();
    }

    /// Snapshot of the posting list for `term`.
    pub fn search(&self, term: &T) -> Option<PostingList> {
        self.inner.read().search(term).cloned()
    }

    /// Runs `f` against the stored list without copying it.
    pub fn with_postings<R>(&self, term: &T, f: impl FnOnce(Option<&PostingList>) -> R) -> R {
        f(self.inner.read().search(term))
    }

    pub fn doc_path(&self, doc_id: DocId) -> Option<String> {
        self.inner.read().doc_path(doc_id).map(str::to_string)
    }

    pub fn dictionary(&self) -> Vec<T> {
        self.inner.read().dictionary().cloned().collect()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.read().save(path)
    }

    pub fn into_inner(self) -> InvertedIndex<T> {
        self.inner.into_inner()
    }
}

impl<T: Term> Default for SharedIndex<T> {
    fn default() -> Self {
        Self::new(InvertedIndex::default())
    }
}

impl<T: Term> From<InvertedIndex<T>> for SharedIndex<T> {
    fn from(index: InvertedIndex<T>) -> Self {
        Self::new(index)
    }
}
