//! Single-file index format.
//!
//! ```text
//! magic    4 bytes  "TDEX"
//! version  u32 LE
//! policy   u8       frequency policy the index was built with
//! length   u64 LE   payload length
//! payload  bincode  doc paths ascending by docId, then terms ascending
//! crc32    u32 LE   over payload
//! ```

use crate::config::{FrequencyPolicy, IndexConfig};
use crate::error::{IndexError, Result};
use crate::index::InvertedIndex;
use crate::posting::{Posting, PostingList};
use crate::{DocId, Term};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MAGIC: [u8; 4] = *b"TDEX";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 1 + 8;
const TRAILER_LEN: usize = 4;

#[derive(Serialize)]
struct PayloadRef<'a, T> {
    doc_paths: Vec<(DocId, &'a str)>,
    dictionary: Vec<(&'a T, &'a [Posting])>,
}

#[derive(Deserialize)]
struct Payload<T> {
    doc_paths: Vec<(DocId, String)>,
    dictionary: Vec<(T, Vec<Posting>)>,
}

/// Serializes `index` in canonical order.
pub fn encode<T: Term>(index: &InvertedIndex<T>) -> Result<Vec<u8>> {
    let canonical;
    let index = if index.is_optimized() {
        index
    } else {
        warn!("encoding an index that was not optimized; sorting a copy");
        let mut copy = index.clone();
        copy.optimize();
        canonical = copy;
        &canonical
    };

    let payload = PayloadRef {
        doc_paths: index.sorted_doc_ids().into_iter().map(|id| (id, index.doc_paths[&id].as_str())).collect(),
        dictionary: index
            .sorted_terms()
            .into_iter()
            .map(|term| (term, index.dictionary[term].as_slice()))
            .collect(),
    };
    let body = bincode::serialize(&payload).map_err(IndexError::Encode)?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(index.config.frequency_policy.to_tag());
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    Ok(out)
}

/// Parses and validates bytes produced by [`encode`].
pub fn decode<T: Term>(bytes: &[u8]) -> Result<InvertedIndex<T>> {
    if bytes.len() < HEADER_LEN {
        return Err(IndexError::Truncated { expected: HEADER_LEN as u64, actual: bytes.len() as u64 });
    }
    if bytes[0..4] != MAGIC {
        return Err(IndexError::BadMagic);
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(IndexError::UnsupportedVersion { found: version, expected: FORMAT_VERSION });
    }
    let policy = FrequencyPolicy::from_tag(bytes[8])
        .ok_or_else(|| IndexError::Corrupt(format!("unknown frequency policy tag {}", bytes[8])))?;
    let mut len_buf = [0u8; 8];
    len_buf.copy_from_slice(&bytes[9..HEADER_LEN]);
    let body_len = u64::from_le_bytes(len_buf);

    let expected = (HEADER_LEN as u64 + TRAILER_LEN as u64).saturating_add(body_len);
    let actual = bytes.len() as u64;
    if actual < expected {
        return Err(IndexError::Truncated { expected, actual });
    }
    if actual > expected {
        return Err(IndexError::Corrupt(format!("{} trailing bytes", actual - expected)));
    }

    let body_end = HEADER_LEN + body_len as usize;
    let body = &bytes[HEADER_LEN..body_end];
    let mut crc_buf = [0u8; 4];
    crc_buf.copy_from_slice(&bytes[body_end..]);
    let stored = u32::from_le_bytes(crc_buf);
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(IndexError::ChecksumMismatch { stored, computed });
    }

    let payload: Payload<T> = bincode::deserialize(body).map_err(IndexError::Decode)?;
    build(payload, policy)
}

fn build<T: Term>(payload: Payload<T>, policy: FrequencyPolicy) -> Result<InvertedIndex<T>> {
    let mut doc_paths = HashMap::with_capacity(payload.doc_paths.len());
    for (id, path) in payload.doc_paths {
        if doc_paths.insert(id, path).is_some() {
            return Err(IndexError::Corrupt(format!("docId {id} stored twice")));
        }
    }

    let mut dictionary = HashMap::with_capacity(payload.dictionary.len());
    for (term, postings) in payload.dictionary {
        for p in &postings {
            check_posting(&term, p, policy, &doc_paths)?;
        }
        let list = PostingList::from_postings(postings)
            .ok_or_else(|| IndexError::Corrupt(format!("duplicate docId in postings of {term}")))?;
        if list.is_empty() || !list.is_ordered() {
            return Err(IndexError::Corrupt(format!("postings of {term} are empty or out of order")));
        }
        if dictionary.contains_key(&term) {
            return Err(IndexError::Corrupt(format!("term {term} stored twice")));
        }
        dictionary.insert(term, list);
    }

    Ok(InvertedIndex {
        config: IndexConfig::with_policy(policy),
        doc_paths,
        dictionary,
        optimized: true,
    })
}

fn check_posting<T: Term>(
    term: &T,
    p: &Posting,
    policy: FrequencyPolicy,
    doc_paths: &HashMap<DocId, String>,
) -> Result<()> {
    if !doc_paths.contains_key(&p.doc_id) {
        return Err(IndexError::Corrupt(format!("posting of {term} references unknown docId {}", p.doc_id)));
    }
    let n = p.positions.len() as u64;
    let frequency = u64::from(p.frequency);
    let consistent = match policy {
        FrequencyPolicy::Normalized => frequency == n,
        FrequencyPolicy::SeedFromHint => frequency >= n,
    };
    if n == 0 || !consistent {
        return Err(IndexError::Corrupt(format!(
            "posting of {term} in doc {} has frequency {} for {} positions",
            p.doc_id, p.frequency, n
        )));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes through a sibling temp file so `path` never holds a partial index.
pub(crate) fn write_index<T: Term>(index: &InvertedIndex<T>, path: &Path) -> Result<()> {
    let bytes = encode(index)?;
    let tmp = tmp_path(path);
    let written = File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(&bytes)?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(IndexError::io(path, e));
    }
    info!(path = %path.display(), bytes = bytes.len(), terms = index.len(), docs = index.num_docs(), "index saved");
    Ok(())
}

pub(crate) fn read_index<T: Term>(path: &Path) -> Result<InvertedIndex<T>> {
    let bytes = fs::read(path).map_err(|e| IndexError::io(path, e))?;
    let index = decode(&bytes)?;
    info!(path = %path.display(), terms = index.len(), docs = index.num_docs(), "index loaded");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentRecord, TermOccurrence};

    fn small_index() -> InvertedIndex {
        let mut index = InvertedIndex::new();
        let mut d = DocumentRecord::new(1, "/a.txt");
        d.add_occurrence(TermOccurrence::new("cat".to_string(), 0));
        index.add(&d);
        index.optimize();
        index
    }

    #[test]
    fn header_layout() {
        let bytes = encode(&small_index()).unwrap();
        assert_eq!(&bytes[0..4], b"TDEX");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), FORMAT_VERSION);
        assert_eq!(bytes[8], 0);
    }

    #[test]
    fn rejects_unknown_policy_tag() {
        let mut bytes = encode(&small_index()).unwrap();
        bytes[8] = 9;
        assert!(matches!(decode::<String>(&bytes), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode(&small_index()).unwrap();
        bytes.push(0);
        assert!(matches!(decode::<String>(&bytes), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn rejects_posting_for_unknown_doc() {
        let payload = Payload {
            doc_paths: vec![(1, "/a.txt".to_string())],
            dictionary: vec![("cat".to_string(), vec![Posting::new(2, 1, 0)])],
        };
        assert!(matches!(build(payload, FrequencyPolicy::Normalized), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn rejects_inconsistent_frequency_under_normalized_policy() {
        let mut p = Posting::new(1, 1, 0);
        p.frequency = 3;
        let payload = Payload {
            doc_paths: vec![(1, "/a.txt".to_string())],
            dictionary: vec![("cat".to_string(), vec![p.clone()])],
        };
        assert!(build(payload, FrequencyPolicy::Normalized).is_err());
        let payload = Payload {
            doc_paths: vec![(1, "/a.txt".to_string())],
            dictionary: vec![("cat".to_string(), vec![p])],
        };
        assert!(build(payload, FrequencyPolicy::SeedFromHint).is_ok());
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(tmp_path(Path::new("/x/index.tdx")), PathBuf::from("/x/index.tdx.tmp"));
    }
}
