//! Version-acquisition pipeline: fetches a translation book by book,
//! transforms it into the corpus schema, and commits it in batches with
//! progress reporting and cooperative cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::catalog::{self, TranslationInfo};
use crate::db::corpus_models::NewVerse;
use crate::db::DbManager;
use crate::logger::{info, warn};
use crate::types::{DownloadProgress, DownloadState, RemoteChapter, TranslationOrigin};

/// Rows per corpus write. Cancellation is only observed between
/// batches, so this also bounds how much work a cancel can undo.
pub const BATCH_SIZE: usize = 100;

/// The fetch phase maps to 0..=70 percent, processing to 70..=100.
const FETCH_PHASE_PERCENT: u8 = 70;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Translation {0} is not in the catalog")]
    UnknownTranslation(String),

    #[error("Translation {0} is bundled and is never fetched or deleted")]
    BundledTranslation(String),

    /// Network/transport failure. Retryable by the caller.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Storage failure. Fatal for this attempt.
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// One unit of fetch per book. The HTTP implementation talks to the
/// translation server; tests inject a fake.
pub trait TranslationSource: Send + Sync {
    fn fetch_book(&self, translation: &TranslationInfo, book_id: i32) -> Result<Vec<RemoteChapter>>;
}

pub struct HttpTranslationSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTranslationSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| DownloadError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl TranslationSource for HttpTranslationSource {
    fn fetch_book(&self, translation: &TranslationInfo, book_id: i32) -> Result<Vec<RemoteChapter>> {
        let url = format!("{}/translations/{}/books/{}", self.base_url, translation.uid, book_id);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DownloadError::Transport(format!("GET {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(DownloadError::Transport(format!(
                "GET {}: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .json::<Vec<RemoteChapter>>()
            .map_err(|e| DownloadError::Transport(format!("Invalid payload from {}: {}", url, e)))
    }
}

/// Per-translation download state machine. Cancellation flags are
/// runtime-only; the durable record of what exists on-device is the
/// downloaded_versions ledger.
pub struct DownloadManager {
    source: Box<dyn TranslationSource>,
    states: Mutex<HashMap<String, DownloadState>>,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("states", &*self.states.lock())
            .finish()
    }
}

impl DownloadManager {
    pub fn new(source: Box<dyn TranslationSource>) -> Self {
        DownloadManager {
            source,
            states: Mutex::new(HashMap::new()),
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self, uid: &str) -> Option<DownloadState> {
        self.states.lock().get(uid).copied()
    }

    fn set_state(&self, uid: &str, state: DownloadState) {
        self.states.lock().insert(uid.to_string(), state);
    }

    fn cancel_flag(&self, uid: &str) -> Arc<AtomicBool> {
        let mut flags = self.cancel_flags.lock();
        let flag = flags
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)));
        flag.store(false, Ordering::SeqCst);
        flag.clone()
    }

    /// Requests cancellation of an in-flight download. Best-effort and
    /// non-atomic: batches already flushed stay in the corpus store, so
    /// callers must treat Cancelled as "possibly partially applied".
    /// A later re-download completes without manual cleanup because all
    /// verse writes are upserts.
    pub fn cancel(&self, uid: &str) {
        if let Some(flag) = self.cancel_flags.lock().get(uid) {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// Fetches and commits one translation. Progress is reported per
    /// book during the fetch phase (0-70%) and per committed batch
    /// during processing (70-100%). Returns the terminal state:
    /// Completed, or Cancelled when the cancel flag was observed.
    pub fn download<F>(&self, dbm: &DbManager, uid: &str, mut on_progress: F) -> Result<DownloadState>
    where
        F: FnMut(DownloadProgress),
    {
        let translation = catalog::get_translation(uid)
            .ok_or_else(|| DownloadError::UnknownTranslation(uid.to_string()))?;

        if translation.origin == TranslationOrigin::Bundled {
            return Err(DownloadError::BundledTranslation(uid.to_string()));
        }

        let flag = self.cancel_flag(uid);

        self.set_state(uid, DownloadState::Pending);
        on_progress(DownloadProgress {
            translation_uid: uid.to_string(),
            state: DownloadState::Pending,
            percent: 0,
        });

        // Fetch phase: one unit per book, fully preceding processing.
        self.set_state(uid, DownloadState::Downloading);
        let mut new_verses: Vec<NewVerse> = Vec::new();
        let book_total = catalog::BOOKS.len();

        for (i, (book_id, _, _, _)) in catalog::BOOKS.iter().enumerate() {
            if flag.load(Ordering::SeqCst) {
                return Ok(self.finish_cancelled(uid, &mut on_progress));
            }

            let chapters = self.source.fetch_book(translation, *book_id).map_err(|e| {
                self.set_state(uid, DownloadState::Error);
                e
            })?;

            for chapter in chapters {
                new_verses.extend(transform_chapter(uid, *book_id, chapter));
            }

            let percent = (((i + 1) * FETCH_PHASE_PERCENT as usize) / book_total) as u8;
            on_progress(DownloadProgress {
                translation_uid: uid.to_string(),
                state: DownloadState::Downloading,
                percent,
            });
        }

        // Processing phase: batched upserts, cancellation observed only
        // at batch boundaries.
        self.set_state(uid, DownloadState::Processing);
        let batch_total = new_verses.len().div_ceil(BATCH_SIZE).max(1);

        for (batch_num, batch) in new_verses.chunks(BATCH_SIZE).enumerate() {
            if flag.load(Ordering::SeqCst) {
                return Ok(self.finish_cancelled(uid, &mut on_progress));
            }

            dbm.corpus.upsert_verses_batch(batch).map_err(|e| {
                self.set_state(uid, DownloadState::Error);
                DownloadError::Storage(e.to_string())
            })?;

            let percent = FETCH_PHASE_PERCENT
                + (((batch_num + 1) * (100 - FETCH_PHASE_PERCENT as usize)) / batch_total) as u8;
            on_progress(DownloadProgress {
                translation_uid: uid.to_string(),
                state: DownloadState::Processing,
                percent,
            });
        }

        dbm.corpus
            .upsert_translation(translation)
            .map_err(|e| DownloadError::Storage(e.to_string()))?;
        dbm.userdata
            .register_downloaded_version(uid, translation.size_bytes, new_verses.len() as i32)
            .map_err(|e| DownloadError::Storage(e.to_string()))?;

        info(&format!("download(): {} completed, {} verses", uid, new_verses.len()));
        self.set_state(uid, DownloadState::Completed);
        on_progress(DownloadProgress {
            translation_uid: uid.to_string(),
            state: DownloadState::Completed,
            percent: 100,
        });

        Ok(DownloadState::Completed)
    }

    fn finish_cancelled<F>(&self, uid: &str, on_progress: &mut F) -> DownloadState
    where
        F: FnMut(DownloadProgress),
    {
        warn(&format!("download(): {} cancelled", uid));
        self.set_state(uid, DownloadState::Cancelled);
        on_progress(DownloadProgress {
            translation_uid: uid.to_string(),
            state: DownloadState::Cancelled,
            percent: 0,
        });
        DownloadState::Cancelled
    }

    /// Removes a downloaded translation: all verse rows, the corpus
    /// catalog row, and the ledger entry. Refuses for bundled ones.
    pub fn delete(&self, dbm: &DbManager, uid: &str) -> Result<usize> {
        let translation = catalog::get_translation(uid)
            .ok_or_else(|| DownloadError::UnknownTranslation(uid.to_string()))?;

        if translation.origin == TranslationOrigin::Bundled {
            return Err(DownloadError::BundledTranslation(uid.to_string()));
        }

        let deleted = dbm
            .corpus
            .delete_translation(uid)
            .map_err(|e| DownloadError::Storage(e.to_string()))?;

        dbm.userdata
            .remove_downloaded_version(uid)
            .map_err(|e| DownloadError::Storage(e.to_string()))?;

        self.states.lock().remove(uid);
        Ok(deleted)
    }
}

/// Sorts a fetched chapter's verses and drops duplicate verse numbers,
/// keeping the first occurrence after sorting.
fn transform_chapter(uid: &str, book_id: i32, chapter: RemoteChapter) -> Vec<NewVerse> {
    let mut verses = chapter.verses;
    verses.sort_by_key(|v| v.verse);
    verses.dedup_by_key(|v| v.verse);

    verses
        .into_iter()
        .map(|v| NewVerse {
            translation_uid: uid.to_string(),
            book_id,
            chapter: chapter.chapter,
            verse: v.verse,
            content: v.text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteVerse;

    #[test]
    fn test_transform_chapter_sorts_and_deduplicates() {
        let chapter = RemoteChapter {
            chapter: 3,
            verses: vec![
                RemoteVerse { verse: 2, text: "two".into() },
                RemoteVerse { verse: 1, text: "one".into() },
                RemoteVerse { verse: 2, text: "two again".into() },
            ],
        };

        let rows = transform_chapter("WEB", 43, chapter);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].verse, 1);
        assert_eq!(rows[1].verse, 2);
        assert_eq!(rows[1].content, "two");
        assert!(rows.iter().all(|r| r.book_id == 43 && r.chapter == 3));
    }
}
