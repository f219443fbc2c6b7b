//! In-memory positional inverted index.
//!
//! Documents arrive as [`DocumentRecord`]s (one per source file, built from
//! tokenizer output), are folded into per-term [`PostingList`]s by
//! [`InvertedIndex::add`], canonicalized once by [`InvertedIndex::optimize`],
//! and then served or persisted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};
use std::hash::Hash;

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod persist;
pub mod posting;
pub mod shared;
pub mod tokenizer;

pub use config::{FrequencyPolicy, IndexConfig};
pub use document::{DocumentRecord, TermOccurrence};
pub use error::{IndexError, Result};
pub use index::{Index, InvertedIndex};
pub use posting::{Posting, PostingList};
pub use shared::SharedIndex;

pub type DocId = u32;
pub type Position = u32;

/// Dictionary key of the index.
///
/// `Ord` keeps enumeration and the on-disk layout deterministic.
pub trait Term:
    Clone + Eq + Hash + Ord + Debug + Display + Serialize + DeserializeOwned + Send + Sync
{
}

impl<T> Term for T where
    T: Clone + Eq + Hash + Ord + Debug + Display + Serialize + DeserializeOwned + Send + Sync
{
}
