//! # Segmented Persistence
//!
//! Stores payloads larger than the backend's per-value ceiling by splitting
//! them into fixed-size character segments.
//!
//! ## Layout
//!
//! ```text
//! K_count    = "N"
//! K_chunk_0  = chars [0, SEG)
//! K_chunk_1  = chars [SEG, 2*SEG)
//! ...
//! K_chunk_N-1
//! ```
//!
//! Reading concatenates segments in order. Deleting clears the count key
//! and every segment key. Corrupt JSON on load is logged and treated as
//! "nothing saved".

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PersistError, PersistResult};
use crate::store::KeyValueStore;

/// Characters per segment.
pub const SEGMENT_LEN: usize = 20_000;

/// Segmenting view over a [`KeyValueStore`].
pub struct SegmentedStore<'a> {
    store: &'a dyn KeyValueStore,
    segment_len: usize,
}

impl<'a> SegmentedStore<'a> {
    /// Wraps a store with the default segment length.
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self::with_segment_len(store, SEGMENT_LEN)
    }

    /// Wraps a store with a custom segment length.
    ///
    /// # Panics
    ///
    /// Panics if `segment_len` is zero.
    #[must_use]
    pub fn with_segment_len(store: &'a dyn KeyValueStore, segment_len: usize) -> Self {
        assert!(segment_len > 0, "segment length must be non-zero");
        Self { store, segment_len }
    }

    fn count_key(key: &str) -> String {
        format!("{key}_count")
    }

    fn segment_key(key: &str, index: usize) -> String {
        format!("{key}_chunk_{index}")
    }

    fn stored_count(&self, key: &str) -> PersistResult<Option<usize>> {
        let Some(raw) = self.store.get(&Self::count_key(key)) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| PersistError::BadCount {
                key: key.to_owned(),
                raw,
            })
    }

    /// Writes `payload` under `key`, replacing any previous segments.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn write(&self, key: &str, payload: &str) -> PersistResult<()> {
        let chars: Vec<char> = payload.chars().collect();
        let count = chars.len().div_ceil(self.segment_len).max(1);
        for index in 0..count {
            let start = index * self.segment_len;
            let end = (start + self.segment_len).min(chars.len());
            let segment: String = chars[start..end].iter().collect();
            self.store.set(&Self::segment_key(key, index), &segment)?;
        }
        self.store.set(&Self::count_key(key), &count.to_string())?;

        let stale = self.clear_segments_from(key, count);
        debug!(key, segments = count, stale, chars = chars.len(), "segmented write");
        Ok(())
    }

    /// Reads and concatenates the segments under `key`.
    ///
    /// # Errors
    ///
    /// A malformed count header or a missing segment.
    pub fn read(&self, key: &str) -> PersistResult<Option<String>> {
        let Some(count) = self.stored_count(key)? else {
            return Ok(None);
        };
        let mut payload = String::new();
        for index in 0..count {
            let segment = self.store.get(&Self::segment_key(key, index)).ok_or_else(|| {
                PersistError::MissingSegment {
                    key: key.to_owned(),
                    index,
                }
            })?;
            payload.push_str(&segment);
        }
        Ok(Some(payload))
    }

    /// Removes the count key and every segment key.
    pub fn delete(&self, key: &str) {
        self.clear_segments_from(key, 0);
        self.store.delete(&Self::count_key(key));
    }

    /// Deletes consecutive segments starting at `start`, stopping at the
    /// first absent one. The count header is never consulted here.
    fn clear_segments_from(&self, key: &str, start: usize) -> usize {
        let mut index = start;
        loop {
            let segment = Self::segment_key(key, index);
            if self.store.get(&segment).is_none() {
                return index - start;
            }
            self.store.delete(&segment);
            index += 1;
        }
    }

    /// Serializes `value` as JSON and writes it segmented.
    ///
    /// # Errors
    ///
    /// Serialization or backend failure.
    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PersistResult<()> {
        let payload = serde_json::to_string(value).map_err(|e| PersistError::Serialize {
            key: key.to_owned(),
            reason: e.to_string(),
        })?;
        self.write(key, &payload)
    }

    /// Loads and parses a JSON value.
    ///
    /// Absent, truncated, or corrupt state yields `None`; the latter two are
    /// logged.
    #[must_use]
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = match self.read(key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "persisted state unreadable, using defaults");
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "corrupt persisted JSON, using defaults");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_roundtrip_across_segment_sizes() {
        let store = MemoryStore::new();
        let segmented = SegmentedStore::with_segment_len(&store, 4);

        for payload in ["", "abc", "abcd", "abcdefghij"] {
            segmented.write("k", payload).unwrap();
            assert_eq!(segmented.read("k").unwrap().as_deref(), Some(payload));
        }
        assert_eq!(store.get("k_count").as_deref(), Some("3"));
        assert_eq!(store.get("k_chunk_2").as_deref(), Some("ij"));
    }

    #[test]
    fn test_shrinking_write_drops_stale_segments() {
        let store = MemoryStore::new();
        let segmented = SegmentedStore::with_segment_len(&store, 2);
        segmented.write("k", "abcdef").unwrap();
        segmented.write("k", "ab").unwrap();
        assert_eq!(store.keys(), vec!["k_chunk_0".to_owned(), "k_count".to_owned()]);
    }

    #[test]
    fn test_delete_clears_every_key() {
        let store = MemoryStore::new();
        let segmented = SegmentedStore::with_segment_len(&store, 3);
        segmented.write("k", "0123456789").unwrap();
        assert_eq!(store.len(), 5);
        segmented.delete("k");
        assert!(store.is_empty());
        assert_eq!(segmented.read("k").unwrap(), None);
    }

    #[test]
    fn test_default_segment_fits_backend_ceiling() {
        let store = MemoryStore::with_value_limit(SEGMENT_LEN);
        let segmented = SegmentedStore::new(&store);
        let payload = "x".repeat(SEGMENT_LEN * 2 + 7);
        segmented.write("big", &payload).unwrap();
        assert_eq!(segmented.read("big").unwrap().unwrap().len(), payload.len());
    }

    #[test]
    fn test_multibyte_chars_are_not_split() {
        let store = MemoryStore::new();
        let segmented = SegmentedStore::with_segment_len(&store, 2);
        segmented.write("k", "äöüß").unwrap();
        assert_eq!(segmented.read("k").unwrap().as_deref(), Some("äöüß"));
    }

    #[test]
    fn test_json_roundtrip_and_corruption() {
        let store = MemoryStore::new();
        let segmented = SegmentedStore::with_segment_len(&store, 8);

        let mut map = BTreeMap::new();
        map.insert("0 0".to_owned(), 3u8);
        map.insert("-1 4".to_owned(), 6u8);
        segmented.save_json("map", &map).unwrap();
        assert_eq!(segmented.load_json::<BTreeMap<String, u8>>("map"), Some(map));

        segmented.write("map", "{not json").unwrap();
        assert_eq!(segmented.load_json::<BTreeMap<String, u8>>("map"), None);

        store.delete("map_chunk_0");
        assert_eq!(segmented.load_json::<BTreeMap<String, u8>>("map"), None);
        assert_eq!(segmented.load_json::<BTreeMap<String, u8>>("absent"), None);
    }

    #[test]
    fn test_oversized_count_header_is_bounded() {
        let store = MemoryStore::new();
        let segmented = SegmentedStore::with_segment_len(&store, 2);
        segmented.write("k", "abcd").unwrap();
        store.set("k_count", "4000000000").unwrap();

        assert!(matches!(
            segmented.read("k"),
            Err(PersistError::MissingSegment { index: 2, .. })
        ));
        assert_eq!(segmented.load_json::<Vec<u8>>("k"), None);

        segmented.write("k", "xy").unwrap();
        assert_eq!(store.keys(), vec!["k_chunk_0".to_owned(), "k_count".to_owned()]);

        store.set("k_count", "4000000000").unwrap();
        segmented.delete("k");
        assert!(store.is_empty());
    }

    #[test]
    fn test_bad_count_header() {
        let store = MemoryStore::new();
        store.set("k_count", "many").unwrap();
        let segmented = SegmentedStore::new(&store);
        assert!(matches!(
            segmented.read("k"),
            Err(PersistError::BadCount { .. })
        ));
    }
}
