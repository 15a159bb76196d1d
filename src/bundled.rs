//! In-memory index over statically-packaged translations.
//!
//! The raw verse list of a bundle is loaded at most once per
//! translation, and the per-chapter index is derived lazily on first
//! query. Everything here is a rebuildable cache over the embedded
//! asset, never a source of truth, so dropping it (unload/clear_all)
//! is always safe.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::catalog::{self, BundledLoader};
use crate::logger::{info, warn};
use crate::types::BundledVerse;

type ChapterKey = (i32, i32);

#[derive(Debug)]
pub struct BundledIndex {
    loaders: HashMap<&'static str, BundledLoader>,
    /// Raw verse lists as parsed from the asset, keyed by uid.
    raw: Mutex<HashMap<String, Vec<BundledVerse>>>,
    /// Derived (book, chapter) index, keyed by uid.
    index: Mutex<HashMap<String, HashMap<ChapterKey, Vec<BundledVerse>>>>,
}

impl BundledIndex {
    /// An index over the build-time bundled translations.
    pub fn new() -> Self {
        Self::with_loaders(catalog::BUNDLED_LOADERS.clone())
    }

    /// Construct with an explicit loader registry. Tests inject fake
    /// loaders here instead of touching the embedded assets.
    pub fn with_loaders(loaders: HashMap<&'static str, BundledLoader>) -> Self {
        BundledIndex {
            loaders,
            raw: Mutex::new(HashMap::new()),
            index: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the raw verse list for a translation exactly once.
    /// Malformed or missing bundle data yields an empty list; callers
    /// treat "no verses" as a valid degenerate state.
    pub fn load(&self, uid: &str) {
        let mut raw = self.raw.lock();
        if raw.contains_key(uid) {
            return;
        }

        let verses = match self.loaders.get(uid) {
            Some(loader) => {
                let data = loader();
                match serde_json::from_str::<Vec<BundledVerse>>(data) {
                    Ok(v) => {
                        info(&format!("BundledIndex: loaded {} verses for {}", v.len(), uid));
                        v
                    }
                    Err(e) => {
                        warn(&format!("BundledIndex: malformed bundle data for {}: {}", uid, e));
                        Vec::new()
                    }
                }
            }
            None => {
                warn(&format!("BundledIndex: no bundled asset registered for {}", uid));
                Vec::new()
            }
        };

        raw.insert(uid.to_string(), verses);
    }

    /// Derives the (book, chapter) map for a translation. Built on
    /// first query, cached thereafter. Verses within a chapter are
    /// sorted by verse number with duplicates dropped (first kept).
    fn ensure_index(&self, uid: &str) {
        {
            let index = self.index.lock();
            if index.contains_key(uid) {
                return;
            }
        }

        self.load(uid);

        let chapters: HashMap<ChapterKey, Vec<BundledVerse>> = {
            let raw = self.raw.lock();
            let verses = raw.get(uid).cloned().unwrap_or_default();

            let mut chapters: HashMap<ChapterKey, Vec<BundledVerse>> = HashMap::new();
            for v in verses {
                chapters.entry((v.book_id, v.chapter)).or_default().push(v);
            }

            for list in chapters.values_mut() {
                list.sort_by_key(|v| v.verse);
                list.dedup_by_key(|v| v.verse);
            }

            chapters
        };

        // Racing builders produce identical maps; last write wins.
        self.index.lock().insert(uid.to_string(), chapters);
    }

    pub fn get_chapter(&self, uid: &str, book_id: i32, chapter: i32) -> Vec<BundledVerse> {
        self.ensure_index(uid);

        let index = self.index.lock();
        index
            .get(uid)
            .and_then(|chapters| chapters.get(&(book_id, chapter)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_verse(&self, uid: &str, book_id: i32, chapter: i32, verse: i32) -> Option<BundledVerse> {
        self.ensure_index(uid);

        let index = self.index.lock();
        index
            .get(uid)
            .and_then(|chapters| chapters.get(&(book_id, chapter)))
            .and_then(|list| list.iter().find(|v| v.verse == verse))
            .cloned()
    }

    /// All verses of a translation, for search fallback over bundled
    /// content.
    pub fn all_verses(&self, uid: &str) -> Vec<BundledVerse> {
        self.load(uid);
        self.raw.lock().get(uid).cloned().unwrap_or_default()
    }

    pub fn is_loaded(&self, uid: &str) -> bool {
        self.raw.lock().contains_key(uid)
    }

    /// Drops the cached list and index for one translation. Multiple
    /// translations may be bundled and should not all stay resident.
    pub fn unload(&self, uid: &str) {
        self.raw.lock().remove(uid);
        self.index.lock().remove(uid);
    }

    pub fn clear_all(&self) {
        self.raw.lock().clear();
        self.index.lock().clear();
    }
}

impl Default for BundledIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_bundle() -> &'static str {
        r#"[
            { "bookId": 1, "chapter": 1, "verse": 2, "text": "second" },
            { "bookId": 1, "chapter": 1, "verse": 1, "text": "first" },
            { "bookId": 1, "chapter": 1, "verse": 2, "text": "duplicate, dropped" },
            { "bookId": 2, "chapter": 3, "verse": 1, "text": "other book" }
        ]"#
    }

    fn broken_bundle() -> &'static str {
        "{ not json ]"
    }

    fn test_index() -> BundledIndex {
        let mut loaders: HashMap<&'static str, BundledLoader> = HashMap::new();
        loaders.insert("FAKE", fake_bundle as BundledLoader);
        loaders.insert("BROKEN", broken_bundle as BundledLoader);
        BundledIndex::with_loaders(loaders)
    }

    #[test]
    fn test_chapter_is_sorted_and_deduplicated() {
        let index = test_index();
        let chapter = index.get_chapter("FAKE", 1, 1);

        assert_eq!(chapter.len(), 2);
        assert_eq!(chapter[0].verse, 1);
        assert_eq!(chapter[1].verse, 2);
        assert_eq!(chapter[1].text, "second");
    }

    #[test]
    fn test_get_verse() {
        let index = test_index();
        let v = index.get_verse("FAKE", 2, 3, 1).expect("verse");
        assert_eq!(v.text, "other book");
        assert!(index.get_verse("FAKE", 2, 3, 99).is_none());
    }

    #[test]
    fn test_malformed_bundle_yields_empty() {
        let index = test_index();
        assert!(index.get_chapter("BROKEN", 1, 1).is_empty());
        assert!(index.get_verse("BROKEN", 1, 1, 1).is_none());
    }

    #[test]
    fn test_unknown_uid_yields_empty() {
        let index = test_index();
        assert!(index.get_chapter("NOPE", 1, 1).is_empty());
    }

    #[test]
    fn test_unload_and_reload() {
        let index = test_index();
        index.load("FAKE");
        assert!(index.is_loaded("FAKE"));

        index.unload("FAKE");
        assert!(!index.is_loaded("FAKE"));

        // Queries transparently reload.
        assert_eq!(index.get_chapter("FAKE", 1, 1).len(), 2);
    }

    #[test]
    fn test_clear_all() {
        let index = test_index();
        index.load("FAKE");
        index.load("BROKEN");
        index.clear_all();
        assert!(!index.is_loaded("FAKE"));
        assert!(!index.is_loaded("BROKEN"));
    }
}
