use crate::config::FrequencyPolicy;
use crate::{DocId, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Summary of one term inside one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32,
    pub positions: Vec<Position>, // ascending after optimize
}

impl Posting {
    pub fn new(doc_id: DocId, frequency: u32, position: Position) -> Self {
        Self { doc_id, frequency, positions: vec![position] }
    }

    pub fn sort_positions(&mut self) {
        self.positions.sort_unstable();
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{doc_id: {}, frequency: {}, positions: {:?}}}", self.doc_id, self.frequency, self.positions)
    }
}

/// All postings of one term, at most one per document.
///
/// `slots` maps a docId to its offset in `postings` so that merging an
/// occurrence does not scan the list. It is derived state: rebuilt whenever
/// the vector is reordered or replaced, and never persisted.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    postings: Vec<Posting>,
    slots: HashMap<DocId, usize>,
}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from already-merged postings. Returns `None` if two
    /// postings share a docId.
    pub fn from_postings(postings: Vec<Posting>) -> Option<Self> {
        let mut list = Self { postings, slots: HashMap::new() };
        list.rebuild_slots();
        (list.slots.len() == list.postings.len()).then_some(list)
    }

    /// Folds one occurrence of the owning term in `doc_id` into the list.
    pub(crate) fn record(&mut self, doc_id: DocId, hint: u32, position: Position, policy: FrequencyPolicy) {
        match self.slots.get(&doc_id) {
            Some(&slot) => {
                let posting = &mut self.postings[slot];
                posting.frequency = posting.frequency.saturating_add(1);
                posting.positions.push(position);
            }
            None => {
                let frequency = match policy {
                    FrequencyPolicy::Normalized => 1,
                    FrequencyPolicy::SeedFromHint => hint,
                };
                self.slots.insert(doc_id, self.postings.len());
                self.postings.push(Posting::new(doc_id, frequency, position));
            }
        }
    }

    /// Sorts every posting's positions, then the postings by docId.
    pub fn sort(&mut self) {
        for posting in &mut self.postings {
            posting.sort_positions();
        }
        // docIds are unique, so an unstable sort is still deterministic
        self.postings.sort_unstable_by_key(|p| p.doc_id);
        self.rebuild_slots();
    }

    /// True when docIds and every posting's positions are strictly ascending.
    pub fn is_sorted(&self) -> bool {
        self.is_ordered() && self.postings.iter().all(|p| p.positions.windows(2).all(|w| w[0] < w[1]))
    }

    /// Order `sort` leaves behind: docIds strictly ascending, positions
    /// ascending. A docId added twice with the same position keeps the
    /// position twice, so repeats are allowed.
    pub fn is_ordered(&self) -> bool {
        self.postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id)
            && self.postings.iter().all(|p| p.positions.windows(2).all(|w| w[0] <= w[1]))
    }

    fn rebuild_slots(&mut self) {
        self.slots = self.postings.iter().enumerate().map(|(slot, p)| (p.doc_id, slot)).collect();
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Posting> {
        self.postings.get(index)
    }

    pub fn find(&self, doc_id: DocId) -> Option<&Posting> {
        self.slots.get(&doc_id).map(|&slot| &self.postings[slot])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    pub fn as_slice(&self) -> &[Posting] {
        &self.postings
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.postings.iter().map(|p| p.doc_id)
    }
}

// Slot maps are derived state and may be keyed identically in different
// orders; only the postings participate in equality.
impl PartialEq for PostingList {
    fn eq(&self, other: &Self) -> bool {
        self.postings == other.postings
    }
}

impl Eq for PostingList {}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}

impl fmt::Display for PostingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, posting) in self.postings.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            write!(f, "{posting}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_merges_same_document() {
        let mut list = PostingList::new();
        list.record(3, 1, 4, FrequencyPolicy::Normalized);
        list.record(1, 1, 0, FrequencyPolicy::Normalized);
        list.record(3, 1, 2, FrequencyPolicy::Normalized);
        assert_eq!(list.len(), 2);
        let p = list.find(3).unwrap();
        assert_eq!(p.frequency, 2);
        assert_eq!(p.positions, vec![4, 2]);
    }

    #[test]
    fn seed_from_hint_only_applies_to_first_occurrence() {
        let mut list = PostingList::new();
        list.record(1, 5, 0, FrequencyPolicy::SeedFromHint);
        list.record(1, 5, 1, FrequencyPolicy::SeedFromHint);
        assert_eq!(list.find(1).unwrap().frequency, 6);
    }

    #[test]
    fn sort_orders_docs_and_positions_and_keeps_lookup() {
        let mut list = PostingList::new();
        list.record(9, 1, 7, FrequencyPolicy::Normalized);
        list.record(2, 1, 3, FrequencyPolicy::Normalized);
        list.record(9, 1, 1, FrequencyPolicy::Normalized);
        assert!(!list.is_sorted());
        list.sort();
        assert!(list.is_sorted());
        assert_eq!(list.doc_ids().collect::<Vec<_>>(), vec![2, 9]);
        assert_eq!(list.find(9).unwrap().positions, vec![1, 7]);
        list.record(9, 1, 8, FrequencyPolicy::Normalized);
        assert_eq!(list.find(9).unwrap().frequency, 3);
    }

    #[test]
    fn frequency_saturates_at_max_hint() {
        let mut list = PostingList::new();
        list.record(1, u32::MAX, 0, FrequencyPolicy::SeedFromHint);
        list.record(1, u32::MAX, 1, FrequencyPolicy::SeedFromHint);
        let p = list.find(1).unwrap();
        assert_eq!(p.frequency, u32::MAX);
        assert_eq!(p.positions, vec![0, 1]);
    }

    #[test]
    fn repeated_position_is_ordered_but_not_sorted() {
        let mut list = PostingList::new();
        list.record(1, 1, 0, FrequencyPolicy::Normalized);
        list.record(1, 1, 0, FrequencyPolicy::Normalized);
        list.sort();
        assert!(list.is_ordered());
        assert!(!list.is_sorted());
    }

    #[test]
    fn from_postings_rejects_duplicate_doc_ids() {
        let dup = vec![Posting::new(1, 1, 0), Posting::new(1, 1, 4)];
        assert!(PostingList::from_postings(dup).is_none());
        let ok = PostingList::from_postings(vec![Posting::new(1, 1, 0), Posting::new(2, 1, 0)]).unwrap();
        assert_eq!(ok.find(2).unwrap().doc_id, 2);
    }

    #[test]
    fn display_joins_postings() {
        let list = PostingList::from_postings(vec![Posting::new(1, 1, 0), Posting::new(2, 1, 3)]).unwrap();
        assert_eq!(
            list.to_string(),
            "{doc_id: 1, frequency: 1, positions: [0]}->{doc_id: 2, frequency: 1, positions: [3]}"
        );
    }
}
