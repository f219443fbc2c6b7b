use crate::config::IndexConfig;
use crate::document::DocumentRecord;
use crate::error::Result;
use crate::persist;
use crate::posting::PostingList;
use crate::{DocId, Term};
use std::collections::hash_map::Keys;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Capabilities shared by index implementations.
pub trait Index {
    type Term: Term;

    fn add(&mut self, doc: &DocumentRecord<Self::Term>);
    fn search(&self, term: &Self::Term) -> Option<&PostingList>;
    fn optimize(&mut self);
    fn dictionary(&self) -> Box<dyn Iterator<Item = &Self::Term> + '_>;
    fn doc_path(&self, doc_id: DocId) -> Option<&str>;
    fn save(&self, path: &Path) -> Result<()>;
    fn load(&mut self, path: &Path) -> Result<()>;
}

/// Term dictionary plus the docId -> path table.
#[derive(Debug, Clone)]
pub struct InvertedIndex<T: Term = String> {
    pub(crate) config: IndexConfig,
    pub(crate) doc_paths: HashMap<DocId, String>,
    pub(crate) dictionary: HashMap<T, PostingList>,
    pub(crate) optimized: bool,
}

impl<T: Term> Default for InvertedIndex<T> {
    fn default() -> Self {
        Self::with_config(IndexConfig::default())
    }
}

impl<T: Term> InvertedIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IndexConfig) -> Self {
        Self { config, doc_paths: HashMap::new(), dictionary: HashMap::new(), optimized: true }
    }

    /// Reads a saved index from `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        persist::read_index(path.as_ref())
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Folds every occurrence of `doc` into the term dictionary.
    ///
    /// Re-adding a docId replaces its path but keeps the postings already
    /// recorded for it; avoiding that is up to the caller.
    pub fn add(&mut self, doc: &DocumentRecord<T>) {
        let doc_id = doc.doc_id();
        if let Some(previous) = self.doc_paths.insert(doc_id, doc.doc_path().to_string()) {
            if self.config.warn_on_readd {
                warn!(doc_id, previous = %previous, path = doc.doc_path(), "docId added twice");
            }
        }

        let policy = self.config.frequency_policy;
        for o in doc.occurrences() {
            match self.dictionary.get_mut(&o.term) {
                Some(list) => list.record(doc_id, o.occurrence_count_hint, o.position, policy),
                None => {
                    let mut list = PostingList::new();
                    list.record(doc_id, o.occurrence_count_hint, o.position, policy);
                    self.dictionary.insert(o.term.clone(), list);
                }
            }
        }
        if !doc.is_empty() {
            self.optimized = false;
        }
        debug!(doc_id, occurrences = doc.occurrence_count(), terms = self.dictionary.len(), "added document");
    }

    /// Sorts positions within each posting and postings by docId within each
    /// list. Idempotent.
    pub fn optimize(&mut self) {
        for list in self.dictionary.values_mut() {
            list.sort();
        }
        self.optimized = true;
        info!(terms = self.dictionary.len(), docs = self.doc_paths.len(), "index optimized");
    }

    pub fn is_optimized(&self) -> bool {
        self.optimized
    }

    pub fn search(&self, term: &T) -> Option<&PostingList> {
        self.dictionary.get(term)
    }

    pub fn dictionary(&self) -> Keys<'_, T, PostingList> {
        self.dictionary.keys()
    }

    pub fn doc_path(&self, doc_id: DocId) -> Option<&str> {
        self.doc_paths.get(&doc_id).map(String::as_str)
    }

    /// (docId, path) pairs in no particular order.
    pub fn documents(&self) -> impl Iterator<Item = (DocId, &str)> + '_ {
        self.doc_paths.iter().map(|(&id, path)| (id, path.as_str()))
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty() && self.doc_paths.is_empty()
    }

    pub fn num_docs(&self) -> usize {
        self.doc_paths.len()
    }

    /// Writes the index to `path`. An index that was never optimized is
    /// written in canonical order all the same.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::write_index(self, path.as_ref())
    }

    /// Replaces the whole state with the index stored at `path`. On failure
    /// the current state is left as it was.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        *self = persist::read_index(path.as_ref())?;
        Ok(())
    }

    pub(crate) fn sorted_terms(&self) -> Vec<&T> {
        let mut terms: Vec<&T> = self.dictionary.keys().collect();
        terms.sort_unstable();
        terms
    }

    pub(crate) fn sorted_doc_ids(&self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.doc_paths.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl<T: Term> Index for InvertedIndex<T> {
    type Term = T;

    fn add(&mut self, doc: &DocumentRecord<T>) {
        InvertedIndex::add(self, doc)
    }

    fn search(&self, term: &T) -> Option<&PostingList> {
        InvertedIndex::search(self, term)
    }

    fn optimize(&mut self) {
        InvertedIndex::optimize(self)
    }

    fn dictionary(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(InvertedIndex::dictionary(self))
    }

    fn doc_path(&self, doc_id: DocId) -> Option<&str> {
        InvertedIndex::doc_path(self, doc_id)
    }

    fn save(&self, path: &Path) -> Result<()> {
        InvertedIndex::save(self, path)
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        InvertedIndex::load(self, path)
    }
}

// Equality ignores configuration; two indexes are equal when they answer
// every search and docPath lookup identically.
impl<T: Term> PartialEq for InvertedIndex<T> {
    fn eq(&self, other: &Self) -> bool {
        self.doc_paths == other.doc_paths && self.dictionary == other.dictionary
    }
}

impl<T: Term> fmt::Display for InvertedIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "doc_id->doc_path")?;
        for id in self.sorted_doc_ids() {
            writeln!(f, "{}->{}", id, self.doc_paths[&id])?;
        }
        writeln!(f, "term->postings")?;
        for term in self.sorted_terms() {
            writeln!(f, "{}->{}", term, self.dictionary[term])?;
        }
        Ok(())
    }
}
