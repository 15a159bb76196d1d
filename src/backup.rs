//! Snapshot export/import of the user store (memos, tags, bookmarks,
//! highlights) as a versioned JSON document.
//!
//! Memo content is exported decrypted so a snapshot restores on any
//! install regardless of its key; rows that cannot be decrypted are
//! exported with their raw blob and `content_readable: false`. Import
//! validates the envelope before touching the store and merges inside
//! a single transaction.

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::crypto::{self, KEY_SIZE};
use crate::db::userdata::UserdataDbHandle;
use crate::db::userdata_models::*;
use crate::logger::info;
use crate::memos::{MemoContent, MemoRepository};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
pub const SNAPSHOT_PRODUCER: &str = "selah-backup";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Snapshot is not valid JSON: {0}")]
    Malformed(String),

    #[error("Unsupported snapshot format version {0}")]
    UnsupportedFormat(u32),

    #[error("Unknown snapshot producer '{0}'")]
    UnknownProducer(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("File i/o failure: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub producer: String,
    pub created_at: String,
    pub memos: Vec<SnapshotMemo>,
    pub tags: Vec<SnapshotTag>,
    pub bookmarks: Vec<SnapshotBookmark>,
    pub highlights: Vec<SnapshotHighlight>,
    pub memo_tag_links: Vec<SnapshotLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMemo {
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub verse_end: Option<i32>,
    /// Plaintext when readable, otherwise the original ciphertext blob.
    pub content: String,
    pub content_readable: bool,
    pub sentiment_json: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTag {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBookmark {
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub title: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHighlight {
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub color: String,
    pub created_at: NaiveDateTime,
}

/// Links are keyed by the memo's natural key plus the tag name; row ids
/// are install-local and never exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLink {
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub memo_created_at: NaiveDateTime,
    pub tag_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub memos_added: usize,
    pub memos_updated: usize,
    pub memos_skipped: usize,
    pub tags_added: usize,
    pub bookmarks_added: usize,
    pub highlights_added: usize,
    pub links_added: usize,
}

pub struct BackupManager<'a> {
    db: &'a UserdataDbHandle,
    key: [u8; KEY_SIZE],
}

impl<'a> BackupManager<'a> {
    pub fn new(db: &'a UserdataDbHandle, key: [u8; KEY_SIZE]) -> Self {
        BackupManager { db, key }
    }

    /// Builds a snapshot of the current user store. Soft-deleted memos
    /// are not exported.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        let repo = MemoRepository::new(self.db, self.key);

        let memo_views = repo.list_all();
        let mut link_rows: Vec<SnapshotLink> = Vec::new();

        for view in &memo_views {
            for tag in repo.tags_for_memo(view.id) {
                link_rows.push(SnapshotLink {
                    translation_uid: view.translation_uid.clone(),
                    book_id: view.book_id,
                    chapter: view.chapter,
                    verse: view.verse,
                    memo_created_at: view.created_at,
                    tag_name: tag.name,
                });
            }
        }

        let memo_rows = memo_views
            .into_iter()
            .map(|view| {
                let (content, content_readable) = match view.content {
                    MemoContent::Plain(text) => (text, true),
                    MemoContent::Unreadable { ciphertext } => (ciphertext, false),
                };
                SnapshotMemo {
                    translation_uid: view.translation_uid,
                    book_id: view.book_id,
                    chapter: view.chapter,
                    verse: view.verse,
                    verse_end: view.verse_end,
                    content,
                    content_readable,
                    sentiment_json: view.sentiment_json,
                    created_at: view.created_at,
                    updated_at: view.updated_at,
                }
            })
            .collect();

        let tag_rows = repo
            .list_tags()
            .into_iter()
            .map(|t| SnapshotTag { name: t.name, color: t.color })
            .collect();

        let bookmark_rows = self
            .db
            .list_bookmarks()
            .into_iter()
            .map(|b| SnapshotBookmark {
                translation_uid: b.translation_uid,
                book_id: b.book_id,
                chapter: b.chapter,
                verse: b.verse,
                title: b.title,
                created_at: b.created_at,
            })
            .collect();

        let highlight_rows = self
            .db
            .list_highlights()
            .into_iter()
            .map(|h| SnapshotHighlight {
                translation_uid: h.translation_uid,
                book_id: h.book_id,
                chapter: h.chapter,
                verse: h.verse,
                color: h.color,
                created_at: h.created_at,
            })
            .collect();

        Ok(Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            producer: SNAPSHOT_PRODUCER.to_string(),
            created_at: Utc::now().to_rfc3339(),
            memos: memo_rows,
            tags: tag_rows,
            bookmarks: bookmark_rows,
            highlights: highlight_rows,
            memo_tag_links: link_rows,
        })
    }

    pub fn export_json(&self) -> Result<String> {
        let snapshot = self.export_snapshot()?;
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json()?;
        std::fs::write(path, json).map_err(|e| BackupError::Io(e.to_string()))?;
        info(&format!("Backup written to {}", path.to_string_lossy()));
        Ok(())
    }

    /// Validates the snapshot envelope without touching the store.
    fn validate(snapshot: &Snapshot) -> std::result::Result<(), BackupError> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(BackupError::UnsupportedFormat(snapshot.format_version));
        }
        if snapshot.producer != SNAPSHOT_PRODUCER {
            return Err(BackupError::UnknownProducer(snapshot.producer.clone()));
        }
        Ok(())
    }

    /// Merges a snapshot into the store inside one transaction:
    /// nothing is written when any part fails. Memos match on their
    /// verse coordinates plus created_at; the snapshot wins only when
    /// its updated_at is newer. Readable content is re-encrypted under
    /// this install's key.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> std::result::Result<ImportStats, BackupError> {
        Self::validate(snapshot)?;

        let key = self.key;

        let stats = self
            .db
            .do_write(|db_conn| {
                db_conn.transaction::<ImportStats, diesel::result::Error, _>(|conn| {
                    let mut stats = ImportStats::default();

                    for tag in &snapshot.tags {
                        stats.tags_added += upsert_tag(conn, &tag.name, &tag.color)?;
                    }

                    for memo in &snapshot.memos {
                        merge_memo(conn, &key, memo, &mut stats)?;
                    }

                    for bm in &snapshot.bookmarks {
                        stats.bookmarks_added += merge_bookmark(conn, bm)?;
                    }

                    for hl in &snapshot.highlights {
                        stats.highlights_added += merge_highlight(conn, hl)?;
                    }

                    for link in &snapshot.memo_tag_links {
                        stats.links_added += merge_link(conn, link)?;
                    }

                    Ok(stats)
                })
            })
            .map_err(|e| BackupError::Storage(e.to_string()))?;

        info(&format!(
            "Backup import: {} memos added, {} updated, {} skipped",
            stats.memos_added, stats.memos_updated, stats.memos_skipped
        ));
        Ok(stats)
    }

    pub fn import_json(&self, json: &str) -> std::result::Result<ImportStats, BackupError> {
        let snapshot: Snapshot =
            serde_json::from_str(json).map_err(|e| BackupError::Malformed(e.to_string()))?;
        self.import_snapshot(&snapshot)
    }

    pub fn import_from_file(&self, path: &Path) -> std::result::Result<ImportStats, BackupError> {
        let json = std::fs::read_to_string(path).map_err(|e| BackupError::Io(e.to_string()))?;
        self.import_json(&json)
    }
}

fn upsert_tag(
    conn: &mut SqliteConnection,
    tag_name: &str,
    tag_color: &str,
) -> std::result::Result<usize, diesel::result::Error> {
    use crate::db::userdata_schema::tags::dsl::*;

    let existing = tags
        .filter(name.eq(tag_name))
        .first::<Tag>(conn)
        .optional()?;

    if existing.is_some() {
        return Ok(0);
    }

    diesel::insert_into(tags)
        .values(&NewTag { name: tag_name, color: tag_color })
        .execute(conn)
}

fn find_memo_by_natural_key(
    conn: &mut SqliteConnection,
    t_uid: &str,
    book: i32,
    chap: i32,
    verse_num: i32,
    created: NaiveDateTime,
) -> std::result::Result<Option<Memo>, diesel::result::Error> {
    use crate::db::userdata_schema::memos::dsl::*;

    memos
        .filter(translation_uid.eq(t_uid))
        .filter(book_id.eq(book))
        .filter(chapter.eq(chap))
        .filter(verse.eq(verse_num))
        .filter(created_at.eq(created))
        .select(Memo::as_select())
        .first(conn)
        .optional()
}

fn merge_memo(
    conn: &mut SqliteConnection,
    key: &[u8; KEY_SIZE],
    snap: &SnapshotMemo,
    stats: &mut ImportStats,
) -> std::result::Result<(), diesel::result::Error> {
    use crate::db::userdata_schema::memos::dsl::*;

    // Unreadable rows carry their original blob; re-encrypting is
    // impossible, so the blob is stored as-is and stays unreadable
    // unless this install holds the producing key.
    let blob = if snap.content_readable {
        crypto::encrypt_string(key, &snap.content)
    } else {
        snap.content.clone()
    };

    let existing = find_memo_by_natural_key(
        conn,
        &snap.translation_uid,
        snap.book_id,
        snap.chapter,
        snap.verse,
        snap.created_at,
    )?;

    match existing {
        Some(row) if row.updated_at >= snap.updated_at => {
            stats.memos_skipped += 1;
        }
        Some(row) => {
            diesel::update(memos.find(row.id))
                .set((
                    content.eq(&blob),
                    is_encrypted.eq(true),
                    verse_end.eq(snap.verse_end),
                    sentiment_json.eq(snap.sentiment_json.as_deref()),
                    updated_at.eq(snap.updated_at),
                    is_deleted.eq(false),
                ))
                .execute(conn)?;
            stats.memos_updated += 1;
        }
        None => {
            diesel::insert_into(memos)
                .values(&NewMemo {
                    translation_uid: &snap.translation_uid,
                    book_id: snap.book_id,
                    chapter: snap.chapter,
                    verse: snap.verse,
                    verse_end: snap.verse_end,
                    content: &blob,
                    is_encrypted: true,
                    sentiment_json: snap.sentiment_json.as_deref(),
                    created_at: snap.created_at,
                    updated_at: snap.updated_at,
                    is_deleted: false,
                })
                .execute(conn)?;
            stats.memos_added += 1;
        }
    }
    Ok(())
}

fn merge_bookmark(
    conn: &mut SqliteConnection,
    snap: &SnapshotBookmark,
) -> std::result::Result<usize, diesel::result::Error> {
    use crate::db::userdata_schema::bookmarks::dsl::*;

    let existing = bookmarks
        .filter(translation_uid.eq(&snap.translation_uid))
        .filter(book_id.eq(snap.book_id))
        .filter(chapter.eq(snap.chapter))
        .filter(verse.eq(snap.verse))
        .first::<Bookmark>(conn)
        .optional()?;

    if existing.is_some() {
        return Ok(0);
    }

    diesel::insert_into(bookmarks)
        .values(&NewBookmark {
            translation_uid: &snap.translation_uid,
            book_id: snap.book_id,
            chapter: snap.chapter,
            verse: snap.verse,
            title: snap.title.as_deref(),
            created_at: snap.created_at,
        })
        .execute(conn)
}

fn merge_highlight(
    conn: &mut SqliteConnection,
    snap: &SnapshotHighlight,
) -> std::result::Result<usize, diesel::result::Error> {
    use crate::db::userdata_schema::highlights::dsl::*;

    let existing = highlights
        .filter(translation_uid.eq(&snap.translation_uid))
        .filter(book_id.eq(snap.book_id))
        .filter(chapter.eq(snap.chapter))
        .filter(verse.eq(snap.verse))
        .first::<Highlight>(conn)
        .optional()?;

    match existing {
        Some(row) => {
            // Existing highlight keeps its verse but takes the snapshot
            // color.
            diesel::update(highlights.find(row.id))
                .set(color.eq(&snap.color))
                .execute(conn)?;
            Ok(0)
        }
        None => {
            diesel::insert_into(highlights)
                .values(&NewHighlight {
                    translation_uid: &snap.translation_uid,
                    book_id: snap.book_id,
                    chapter: snap.chapter,
                    verse: snap.verse,
                    color: &snap.color,
                    created_at: snap.created_at,
                })
                .execute(conn)?;
            Ok(1)
        }
    }
}

fn merge_link(
    conn: &mut SqliteConnection,
    link: &SnapshotLink,
) -> std::result::Result<usize, diesel::result::Error> {
    use crate::db::userdata_schema::memo_tags::dsl::*;
    use crate::db::userdata_schema::tags;

    let Some(memo_row) = find_memo_by_natural_key(
        conn,
        &link.translation_uid,
        link.book_id,
        link.chapter,
        link.verse,
        link.memo_created_at,
    )?
    else {
        // Dangling link in the snapshot: skip rather than fail the
        // whole import.
        return Ok(0);
    };

    let Some(tag_row) = tags::table
        .filter(tags::name.eq(&link.tag_name))
        .select(Tag::as_select())
        .first(conn)
        .optional()?
    else {
        return Ok(0);
    };

    let existing = memo_tags
        .filter(memo_id.eq(memo_row.id))
        .filter(tag_id.eq(tag_row.id))
        .first::<MemoTag>(conn)
        .optional()?;

    if existing.is_some() {
        return Ok(0);
    }

    diesel::insert_into(memo_tags)
        .values(&NewMemoTag { memo_id: memo_row.id, tag_id: tag_row.id })
        .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_wrong_version() {
        let snapshot = Snapshot {
            format_version: 99,
            producer: SNAPSHOT_PRODUCER.to_string(),
            created_at: Utc::now().to_rfc3339(),
            memos: vec![],
            tags: vec![],
            bookmarks: vec![],
            highlights: vec![],
            memo_tag_links: vec![],
        };
        assert!(matches!(
            BackupManager::validate(&snapshot),
            Err(BackupError::UnsupportedFormat(99))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_producer() {
        let snapshot = Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            producer: "someone-else".to_string(),
            created_at: Utc::now().to_rfc3339(),
            memos: vec![],
            tags: vec![],
            bookmarks: vec![],
            highlights: vec![],
            memo_tag_links: vec![],
        };
        assert!(matches!(
            BackupManager::validate(&snapshot),
            Err(BackupError::UnknownProducer(_))
        ));
    }
}
