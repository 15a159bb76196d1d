#![allow(dead_code)]

use std::collections::HashMap;

use tempfile::TempDir;

use selah_backend::app_data::AppData;
use selah_backend::bundled::BundledIndex;
use selah_backend::catalog::{BundledLoader, TranslationInfo};
use selah_backend::download::{self, DownloadError, TranslationSource};
use selah_backend::types::{BundledVerse, RemoteChapter, RemoteVerse};

/// A deterministic stand-in for the packaged primary translation.
pub const FAKE_KRV_JSON: &str = r#"[
    { "bookId": 43, "chapter": 3, "verse": 16, "text": "하나님이 세상을 이처럼 사랑하사 독생자를 주셨으니 이는 저를 믿는 자마다 멸망치 않고 영생을 얻게 하려 하심이라" },
    { "bookId": 43, "chapter": 3, "verse": 17, "text": "하나님이 그 아들을 세상에 보내신 것은 세상을 심판하려 하심이 아니요" },
    { "bookId": 43, "chapter": 1, "verse": 1, "text": "태초에 말씀이 계시니 이 말씀이 하나님과 함께 계셨으니" },
    { "bookId": 1, "chapter": 1, "verse": 1, "text": "태초에 하나님이 천지를 창조하시니라" },
    { "bookId": 19, "chapter": 23, "verse": 1, "text": "여호와는 나의 목자시니 내가 부족함이 없으리로다" }
]"#;

fn fake_krv_loader() -> &'static str {
    FAKE_KRV_JSON
}

pub fn fake_bundled_index() -> BundledIndex {
    let mut loaders: HashMap<&'static str, BundledLoader> = HashMap::new();
    loaders.insert("KRV", fake_krv_loader as BundledLoader);
    BundledIndex::with_loaders(loaders)
}

/// Serves two 3-verse chapters per book, plus John 3:16-17. The uid
/// "ASV" instead serves exactly the fake bundle's verses, for
/// bundled-vs-stored agreement tests.
pub struct FakeTranslationSource;

impl TranslationSource for FakeTranslationSource {
    fn fetch_book(
        &self,
        translation: &TranslationInfo,
        book_id: i32,
    ) -> download::Result<Vec<RemoteChapter>> {
        if translation.uid == "ASV" {
            return Ok(bundle_as_chapters(book_id));
        }

        let mut chapters: Vec<RemoteChapter> = (1..=2)
            .map(|c| RemoteChapter {
                chapter: c,
                verses: (1..=3)
                    .map(|v| RemoteVerse {
                        verse: v,
                        text: format!("{} book {} chapter {} verse {}", translation.uid, book_id, c, v),
                    })
                    .collect(),
            })
            .collect();

        if book_id == 43 {
            chapters.push(RemoteChapter {
                chapter: 3,
                verses: vec![
                    RemoteVerse {
                        verse: 16,
                        text: "For God so loved the world that he gave his only Son".into(),
                    },
                    RemoteVerse {
                        verse: 17,
                        text: "For God did not send his Son to condemn the world".into(),
                    },
                ],
            });
        }

        Ok(chapters)
    }
}

/// Total verses FakeTranslationSource serves for a non-ASV uid.
pub const FAKE_VERSE_TOTAL: i64 = 66 * 2 * 3 + 2;

fn bundle_as_chapters(book_id: i32) -> Vec<RemoteChapter> {
    let verses: Vec<BundledVerse> =
        serde_json::from_str(FAKE_KRV_JSON).expect("fake bundle parses");

    let mut by_chapter: HashMap<i32, Vec<RemoteVerse>> = HashMap::new();
    for v in verses.into_iter().filter(|v| v.book_id == book_id) {
        by_chapter
            .entry(v.chapter)
            .or_default()
            .push(RemoteVerse { verse: v.verse, text: v.text });
    }

    let mut chapters: Vec<RemoteChapter> = by_chapter
        .into_iter()
        .map(|(chapter, verses)| RemoteChapter { chapter, verses })
        .collect();
    chapters.sort_by_key(|c| c.chapter);
    chapters
}

/// Fails every fetch, for error-path tests.
pub struct FailingSource;

impl TranslationSource for FailingSource {
    fn fetch_book(&self, _: &TranslationInfo, book_id: i32) -> download::Result<Vec<RemoteChapter>> {
        Err(DownloadError::Transport(format!("no route to host (book {})", book_id)))
    }
}

pub fn test_app() -> (TempDir, AppData) {
    test_app_with_source(Box::new(FakeTranslationSource))
}

pub fn test_app_with_source(source: Box<dyn TranslationSource>) -> (TempDir, AppData) {
    let dir = tempfile::tempdir().expect("Can't create a temp dir");
    let app = AppData::open_with_source(dir.path(), source, fake_bundled_index())
        .expect("Can't create AppData");
    (dir, app)
}
