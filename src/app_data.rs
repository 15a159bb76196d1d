//! The application-wide handle: both stores, the bundled index, the
//! download manager, and the per-install encryption key, behind one
//! struct with the operations the UI layer calls.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::backup::{BackupManager, ImportStats};
use crate::bundled::BundledIndex;
use crate::catalog;
use crate::db::corpus_models::{Book, BookName};
use crate::db::userdata_models::{Bookmark, DownloadedVersion, Highlight};
use crate::db::DbManager;
use crate::download::{DownloadManager, HttpTranslationSource, TranslationSource};
use crate::logger::info;
use crate::memos::{MemoRepository, MemoView};
use crate::search::SearchEngine;
use crate::types::{DownloadProgress, DownloadState, SearchParams, SearchResult, VerseRecord};

pub const TRANSLATION_SERVER_URL: &str = "https://content.selah.app";

pub struct AppData {
    pub dbm: DbManager,
    pub bundled: BundledIndex,
    pub downloads: DownloadManager,
    install_key: [u8; crate::crypto::KEY_SIZE],
}

// The install key never appears in Debug output.
impl std::fmt::Debug for AppData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppData")
            .field("dbm", &self.dbm)
            .field("downloads", &self.downloads)
            .finish()
    }
}

impl AppData {
    /// Opens both stores under `assets_dir` with the default HTTP
    /// translation source and the build-time bundled assets.
    pub fn open(assets_dir: &Path) -> Result<AppData> {
        let source = HttpTranslationSource::new(TRANSLATION_SERVER_URL)
            .map_err(anyhow::Error::new)?;
        Self::open_with_source(assets_dir, Box::new(source), BundledIndex::new())
    }

    /// Opens with an injected translation source and bundled index.
    /// Tests use this with a fake source and fake bundle loaders.
    pub fn open_with_source(
        assets_dir: &Path,
        source: Box<dyn TranslationSource>,
        bundled: BundledIndex,
    ) -> Result<AppData> {
        let dbm = DbManager::open(assets_dir)?;
        let install_key = dbm.userdata.get_or_create_install_key()?;

        info(&format!("AppData::open() {}", assets_dir.to_string_lossy()));

        Ok(AppData {
            dbm,
            bundled,
            downloads: DownloadManager::new(source),
            install_key,
        })
    }

    /// Resolves the store directory from SELAH_DIR (also via .env),
    /// falling back to the platform user-data directory.
    pub fn from_env() -> Result<AppData> {
        dotenvy::dotenv().ok();

        let assets_dir = match std::env::var("SELAH_DIR") {
            Ok(dir) if !dir.is_empty() => {
                let p = PathBuf::from(dir);
                if !p.exists() {
                    std::fs::create_dir_all(&p)?;
                }
                p
            }
            _ => crate::get_create_selah_assets_path(),
        };

        Self::open(&assets_dir)
    }

    // --- Reading ---

    pub fn get_books(&self, lang: &str) -> Vec<(Book, BookName)> {
        self.dbm.corpus.get_books(lang)
    }

    /// A chapter's verses in a uniform shape, regardless of whether the
    /// translation is served from the bundled index or the corpus store.
    pub fn get_chapter(&self, t_uid: &str, book_id: i32, chapter: i32) -> Vec<VerseRecord> {
        if catalog::is_bundled(t_uid) {
            return self
                .bundled
                .get_chapter(t_uid, book_id, chapter)
                .into_iter()
                .map(|v| VerseRecord {
                    translation_uid: t_uid.to_string(),
                    book_id: v.book_id,
                    chapter: v.chapter,
                    verse: v.verse,
                    content: v.text,
                })
                .collect();
        }

        let _ = self.dbm.userdata.touch_version_last_used(t_uid);

        self.dbm
            .corpus
            .get_chapter(t_uid, book_id, chapter)
            .into_iter()
            .map(|v| VerseRecord {
                translation_uid: v.translation_uid,
                book_id: v.book_id,
                chapter: v.chapter,
                verse: v.verse,
                content: v.content,
            })
            .collect()
    }

    pub fn get_verse(&self, t_uid: &str, book_id: i32, chapter: i32, verse: i32) -> Option<VerseRecord> {
        if catalog::is_bundled(t_uid) {
            return self.bundled.get_verse(t_uid, book_id, chapter, verse).map(|v| VerseRecord {
                translation_uid: t_uid.to_string(),
                book_id: v.book_id,
                chapter: v.chapter,
                verse: v.verse,
                content: v.text,
            });
        }

        self.dbm.corpus.get_verse(t_uid, book_id, chapter, verse).map(|v| VerseRecord {
            translation_uid: v.translation_uid,
            book_id: v.book_id,
            chapter: v.chapter,
            verse: v.verse,
            content: v.content,
        })
    }

    pub fn search(&self, t_uid: &str, query: &str, params: &SearchParams) -> Vec<SearchResult> {
        SearchEngine::new(&self.dbm, &self.bundled).search(t_uid, query, params)
    }

    // --- Memos ---

    pub fn memos(&self) -> MemoRepository<'_> {
        MemoRepository::new(&self.dbm.userdata, self.install_key)
    }

    pub fn create_memo(
        &self,
        t_uid: &str,
        book_id: i32,
        chapter: i32,
        verse: i32,
        verse_end: Option<i32>,
        text: &str,
    ) -> Result<i32> {
        self.memos().create(t_uid, book_id, chapter, verse, verse_end, text)
    }

    pub fn update_memo(&self, memo_id: i32, text: &str) -> Result<usize> {
        self.memos().update(memo_id, text)
    }

    pub fn delete_memo(&self, memo_id: i32) -> Result<usize> {
        self.memos().delete(memo_id)
    }

    pub fn purge_memo(&self, memo_id: i32) -> Result<usize> {
        self.memos().purge(memo_id)
    }

    pub fn get_memo(&self, memo_id: i32) -> Option<MemoView> {
        self.memos().get(memo_id)
    }

    pub fn get_memos_by_chapter(&self, t_uid: &str, book_id: i32, chapter: i32) -> Vec<MemoView> {
        self.memos().list_by_chapter(t_uid, book_id, chapter)
    }

    // --- Bookmarks and highlights ---

    pub fn toggle_bookmark(
        &self,
        t_uid: &str,
        book_id: i32,
        chapter: i32,
        verse: i32,
        title: Option<&str>,
    ) -> Result<bool> {
        self.dbm.userdata.toggle_bookmark(t_uid, book_id, chapter, verse, title)
    }

    pub fn list_bookmarks(&self) -> Vec<Bookmark> {
        self.dbm.userdata.list_bookmarks()
    }

    pub fn set_highlight(&self, t_uid: &str, book_id: i32, chapter: i32, verse: i32, color: &str) -> Result<usize> {
        self.dbm.userdata.set_highlight(t_uid, book_id, chapter, verse, color)
    }

    pub fn remove_highlight(&self, t_uid: &str, book_id: i32, chapter: i32, verse: i32) -> Result<usize> {
        self.dbm.userdata.remove_highlight(t_uid, book_id, chapter, verse)
    }

    pub fn get_highlights_by_chapter(&self, t_uid: &str, book_id: i32, chapter: i32) -> Vec<Highlight> {
        self.dbm.userdata.get_highlights_by_chapter(t_uid, book_id, chapter)
    }

    // --- Versions ---

    pub fn download_version<F>(&self, t_uid: &str, on_progress: F) -> Result<DownloadState>
    where
        F: FnMut(DownloadProgress),
    {
        // Errors stay downcastable to DownloadError so callers can
        // tell retryable Transport failures from fatal Storage ones.
        self.downloads
            .download(&self.dbm, t_uid, on_progress)
            .map_err(anyhow::Error::new)
    }

    pub fn cancel_download(&self, t_uid: &str) {
        self.downloads.cancel(t_uid);
    }

    pub fn delete_version(&self, t_uid: &str) -> Result<usize> {
        self.downloads
            .delete(&self.dbm, t_uid)
            .map_err(anyhow::Error::new)
    }

    pub fn downloaded_versions(&self) -> Vec<DownloadedVersion> {
        self.dbm.userdata.downloaded_versions()
    }

    // --- Backup ---

    pub fn backup(&self) -> BackupManager<'_> {
        BackupManager::new(&self.dbm.userdata, self.install_key)
    }

    pub fn create_backup(&self, path: &Path) -> Result<()> {
        self.backup().export_to_file(path)
    }

    pub fn restore_backup(&self, path: &Path) -> Result<ImportStats> {
        self.backup()
            .import_from_file(path)
            .map_err(anyhow::Error::new)
    }
}
