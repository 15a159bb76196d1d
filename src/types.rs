use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a translation's text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationOrigin {
    #[serde(rename = "bundled")]
    Bundled,
    #[serde(rename = "downloaded")]
    Downloaded,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid TranslationOrigin value: {0}")]
pub struct ParseOriginError(String);

impl FromStr for TranslationOrigin {
    type Err = ParseOriginError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bundled" => Ok(TranslationOrigin::Bundled),
            "downloaded" => Ok(TranslationOrigin::Downloaded),
            _ => Err(ParseOriginError(s.to_string())),
        }
    }
}

impl TranslationOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationOrigin::Bundled => "bundled",
            TranslationOrigin::Downloaded => "downloaded",
        }
    }
}

/// The uniform verse shape returned to callers, regardless of whether
/// the text was served from the bundled index or the corpus store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub content: String,
}

/// One verse in a statically-packaged translation asset. The asset is
/// a flat, unordered list of these records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundledVerse {
    #[serde(rename = "bookId")]
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub text: String,
}

/// Remote fetch payload: one unit of fetch per book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteChapter {
    pub chapter: i32,
    pub verses: Vec<RemoteVerse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteVerse {
    pub verse: i32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub lang: String,
    pub limit: usize,
    pub offset: usize,
    pub book_id: Option<i32>,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            lang: "en".to_string(),
            limit: crate::PAGE_LEN,
            offset: 0,
            book_id: None,
        }
    }
}

/// A search hit. Carries the resolved localized book name so callers
/// never have to map a bare book id themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub translation_uid: String,
    pub book_id: i32,
    pub book_name: String,
    pub chapter: i32,
    pub verse: i32,
    pub content: String,
    /// Shortened match context with the query term marked up.
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadState {
    Pending,
    Downloading,
    Processing,
    Completed,
    Error,
    Cancelled,
}

/// Progress report passed to the download callback. `percent` covers
/// the whole operation: fetch maps to 0-70, batch inserts to 70-100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub translation_uid: String,
    pub state: DownloadState,
    pub percent: u8,
}
