use crate::error::{IndexError, Result};
use crate::{DocId, Position, Term};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One observed occurrence of a term inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermOccurrence<T = String> {
    pub term: T,
    /// Provisional count carried by the tokenizer; at least 1.
    pub occurrence_count_hint: u32,
    pub position: Position,
}

impl<T> TermOccurrence<T> {
    pub fn new(term: T, position: Position) -> Self {
        Self { term, occurrence_count_hint: 1, position }
    }

    pub fn with_hint(term: T, occurrence_count_hint: u32, position: Position) -> Self {
        Self { term, occurrence_count_hint: occurrence_count_hint.max(1), position }
    }
}

impl<T: fmt::Display> fmt::Display for TermOccurrence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{term: {}, occurrence_count_hint: {}, position: {}}}", self.term, self.occurrence_count_hint, self.position)
    }
}

/// Occurrences of one source document, in tokenizer order, with no two
/// entries sharing the same term and position.
#[derive(Debug, Clone)]
pub struct DocumentRecord<T = String> {
    doc_id: DocId,
    doc_path: String,
    occurrences: Vec<TermOccurrence<T>>,
    seen: HashMap<T, HashSet<Position>>,
}

impl<T: Term> DocumentRecord<T> {
    pub fn new(doc_id: DocId, doc_path: impl Into<String>) -> Self {
        Self { doc_id, doc_path: doc_path.into(), occurrences: Vec::new(), seen: HashMap::new() }
    }

    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub fn set_doc_id(&mut self, doc_id: DocId) {
        self.doc_id = doc_id;
    }

    pub fn doc_path(&self) -> &str {
        &self.doc_path
    }

    pub fn set_doc_path(&mut self, doc_path: impl Into<String>) {
        self.doc_path = doc_path.into();
    }

    /// Appends `occurrence` unless one with the same term and position is
    /// already stored. Returns whether it was appended.
    pub fn add_occurrence(&mut self, occurrence: TermOccurrence<T>) -> bool {
        if self.contains(&occurrence) {
            return false;
        }
        self.seen.entry(occurrence.term.clone()).or_default().insert(occurrence.position);
        self.occurrences.push(occurrence);
        true
    }

    pub fn contains(&self, occurrence: &TermOccurrence<T>) -> bool {
        // (term, position) is the identity; `seen` mirrors `occurrences`
        self.seen.get(&occurrence.term).is_some_and(|positions| positions.contains(&occurrence.position))
    }

    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }

    pub fn occurrence_at(&self, index: usize) -> Result<&TermOccurrence<T>> {
        self.occurrences
            .get(index)
            .ok_or(IndexError::OutOfRange { index, len: self.occurrences.len() })
    }

    pub fn occurrences(&self) -> &[TermOccurrence<T>] {
        &self.occurrences
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

impl<T: Term> Extend<TermOccurrence<T>> for DocumentRecord<T> {
    fn extend<I: IntoIterator<Item = TermOccurrence<T>>>(&mut self, iter: I) {
        for occurrence in iter {
            self.add_occurrence(occurrence);
        }
    }
}

impl<T: fmt::Display> fmt::Display for DocumentRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document {} ({}):", self.doc_id, self.doc_path)?;
        for occurrence in &self.occurrences {
            writeln!(f, "{occurrence}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(term: &str, position: Position) -> TermOccurrence {
        TermOccurrence::new(term.to_string(), position)
    }

    #[test]
    fn duplicate_occurrence_is_ignored() {
        let mut doc = DocumentRecord::new(1, "/a.txt");
        assert!(doc.add_occurrence(occ("cat", 0)));
        assert!(!doc.add_occurrence(occ("cat", 0)));
        assert_eq!(doc.occurrence_count(), 1);
    }

    #[test]
    fn same_term_different_position_is_kept() {
        let mut doc = DocumentRecord::new(1, "/a.txt");
        doc.add_occurrence(occ("cat", 0));
        doc.add_occurrence(occ("cat", 5));
        doc.add_occurrence(occ("dog", 0));
        assert_eq!(doc.occurrence_count(), 3);
    }

    #[test]
    fn hint_does_not_affect_identity() {
        let mut doc = DocumentRecord::new(1, "/a.txt");
        doc.add_occurrence(TermOccurrence::with_hint("cat".to_string(), 3, 2));
        assert!(doc.contains(&occ("cat", 2)));
        assert!(!doc.add_occurrence(occ("cat", 2)));
        assert_eq!(doc.occurrence_at(0).unwrap().occurrence_count_hint, 3);
    }

    #[test]
    fn occurrence_at_out_of_range() {
        let mut doc = DocumentRecord::new(1, "/a.txt");
        doc.add_occurrence(occ("cat", 0));
        assert_eq!(doc.occurrence_at(0).unwrap().term, "cat");
        match doc.occurrence_at(1) {
            Err(IndexError::OutOfRange { index, len }) => {
                assert_eq!((index, len), (1, 1));
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn extend_preserves_order_and_dedups() {
        let mut doc = DocumentRecord::new(4, "/d.txt");
        doc.extend(vec![occ("b", 1), occ("a", 0), occ("b", 1), occ("c", 2)]);
        let terms: Vec<&str> = doc.occurrences().iter().map(|o| o.term.as_str()).collect();
        assert_eq!(terms, vec!["b", "a", "c"]);
    }

    #[test]
    fn display_uses_field_names() {
        let o = TermOccurrence::with_hint("cat".to_string(), 2, 7);
        assert_eq!(o.to_string(), "{term: cat, occurrence_count_hint: 2, position: 7}");
    }

    #[test]
    fn zero_hint_is_clamped() {
        assert_eq!(TermOccurrence::with_hint("x".to_string(), 0, 0).occurrence_count_hint, 1);
    }
}
