//! Encrypted verse memos with tags and sentiment annotations.
//!
//! Plaintext exists only in memory: content is encrypted before every
//! write and decrypted on read. A row whose blob cannot be decrypted
//! (key mismatch, corruption) is still returned, with its content
//! marked unreadable, so the caller can surface it instead of silently
//! dropping user data.

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::crypto::{self, KEY_SIZE};
use crate::db::userdata::UserdataDbHandle;
use crate::db::userdata_models::*;
use crate::logger::{error, warn};

/// Decrypted memo content, or the raw blob when decryption fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoContent {
    Plain(String),
    Unreadable { ciphertext: String },
}

impl MemoContent {
    pub fn is_readable(&self) -> bool {
        matches!(self, MemoContent::Plain(_))
    }

    pub fn as_plain(&self) -> Option<&str> {
        match self {
            MemoContent::Plain(s) => Some(s),
            MemoContent::Unreadable { .. } => None,
        }
    }
}

/// A memo row with its content decrypted for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoView {
    pub id: i32,
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub verse_end: Option<i32>,
    pub content: MemoContent,
    pub sentiment_json: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub struct MemoRepository<'a> {
    db: &'a UserdataDbHandle,
    key: [u8; KEY_SIZE],
}

impl<'a> MemoRepository<'a> {
    pub fn new(db: &'a UserdataDbHandle, key: [u8; KEY_SIZE]) -> Self {
        MemoRepository { db, key }
    }

    fn decode(&self, memo: Memo) -> MemoView {
        // Rows written before content encryption shipped carry the
        // plaintext directly.
        let content = if !memo.is_encrypted {
            MemoContent::Plain(memo.content)
        } else {
            match crypto::decrypt_string(&self.key, &memo.content) {
                Ok(text) => MemoContent::Plain(text),
                Err(e) => {
                    warn(&format!("Memo {} is unreadable: {}", memo.id, e));
                    MemoContent::Unreadable { ciphertext: memo.content }
                }
            }
        };

        MemoView {
            id: memo.id,
            translation_uid: memo.translation_uid,
            book_id: memo.book_id,
            chapter: memo.chapter,
            verse: memo.verse,
            verse_end: memo.verse_end,
            content,
            sentiment_json: memo.sentiment_json,
            created_at: memo.created_at,
            updated_at: memo.updated_at,
        }
    }

    /// Creates a memo on a verse (or verse range) and returns its id.
    pub fn create(
        &self,
        t_uid: &str,
        book: i32,
        chap: i32,
        verse_num: i32,
        verse_end_num: Option<i32>,
        text: &str,
    ) -> Result<i32> {
        use crate::db::userdata_schema::memos::dsl::*;

        let blob = crypto::encrypt_string(&self.key, text);
        let now = Utc::now().naive_utc();

        self.db.do_write(|db_conn| {
            diesel::insert_into(memos)
                .values(&NewMemo {
                    translation_uid: t_uid,
                    book_id: book,
                    chapter: chap,
                    verse: verse_num,
                    verse_end: verse_end_num,
                    content: &blob,
                    is_encrypted: true,
                    sentiment_json: None,
                    created_at: now,
                    updated_at: now,
                    is_deleted: false,
                })
                .returning(id)
                .get_result::<i32>(db_conn)
        })
    }

    /// Replaces a memo's content with freshly encrypted text and bumps
    /// updated_at. Soft-deleted memos cannot be updated.
    pub fn update(&self, memo_id: i32, text: &str) -> Result<usize> {
        use crate::db::userdata_schema::memos::dsl::*;

        let blob = crypto::encrypt_string(&self.key, text);

        self.db.do_write(|db_conn| {
            diesel::update(memos.find(memo_id).filter(is_deleted.eq(false)))
                .set((
                    content.eq(&blob),
                    is_encrypted.eq(true),
                    updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(db_conn)
        })
    }

    pub fn set_sentiment(&self, memo_id: i32, sentiment: Option<&str>) -> Result<usize> {
        use crate::db::userdata_schema::memos::dsl::*;

        self.db.do_write(|db_conn| {
            diesel::update(memos.find(memo_id))
                .set((
                    sentiment_json.eq(sentiment),
                    updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(db_conn)
        })
    }

    pub fn get(&self, memo_id: i32) -> Option<MemoView> {
        use crate::db::userdata_schema::memos::dsl::*;

        let res = self.db.do_read(|db_conn| {
            memos
                .find(memo_id)
                .filter(is_deleted.eq(false))
                .select(Memo::as_select())
                .first(db_conn)
                .optional()
        });

        match res {
            Ok(row) => row.map(|m| self.decode(m)),
            Err(e) => {
                error(&format!("get(): {}", e));
                None
            }
        }
    }

    pub fn list_by_verse(&self, t_uid: &str, book: i32, chap: i32, verse_num: i32) -> Vec<MemoView> {
        use crate::db::userdata_schema::memos::dsl::*;

        self.load_memos(|q| {
            q.filter(translation_uid.eq(t_uid.to_string()))
                .filter(book_id.eq(book))
                .filter(chapter.eq(chap))
                .filter(verse.eq(verse_num))
        })
    }

    pub fn list_by_chapter(&self, t_uid: &str, book: i32, chap: i32) -> Vec<MemoView> {
        use crate::db::userdata_schema::memos::dsl::*;

        self.load_memos(|q| {
            q.filter(translation_uid.eq(t_uid.to_string()))
                .filter(book_id.eq(book))
                .filter(chapter.eq(chap))
        })
    }

    pub fn list_all(&self) -> Vec<MemoView> {
        self.load_memos(|q| q)
    }

    fn load_memos<F>(&self, apply: F) -> Vec<MemoView>
    where
        F: FnOnce(
            crate::db::userdata_schema::memos::BoxedQuery<'static, diesel::sqlite::Sqlite>,
        )
            -> crate::db::userdata_schema::memos::BoxedQuery<'static, diesel::sqlite::Sqlite>,
    {
        use crate::db::userdata_schema::memos::dsl::*;

        let res = self.db.do_read(|db_conn| {
            let q = apply(memos.into_boxed()).filter(is_deleted.eq(false));
            q.order((book_id.asc(), chapter.asc(), verse.asc(), created_at.asc()))
                .select(Memo::as_select())
                .load::<Memo>(db_conn)
        });

        match res {
            Ok(rows) => rows.into_iter().map(|m| self.decode(m)).collect(),
            Err(e) => {
                error(&format!("load_memos(): {}", e));
                Vec::new()
            }
        }
    }

    /// Soft delete: the row stays (tags intact) but disappears from all
    /// listings. Reversible only by purge-and-recreate.
    pub fn delete(&self, memo_id: i32) -> Result<usize> {
        use crate::db::userdata_schema::memos::dsl::*;

        self.db.do_write(|db_conn| {
            diesel::update(memos.find(memo_id))
                .set((is_deleted.eq(true), updated_at.eq(Utc::now().naive_utc())))
                .execute(db_conn)
        })
    }

    /// Hard delete. Tag links go with the row via cascade.
    pub fn purge(&self, memo_id: i32) -> Result<usize> {
        use crate::db::userdata_schema::memos::dsl::*;

        self.db
            .do_write(|db_conn| diesel::delete(memos.find(memo_id)).execute(db_conn))
    }

    // --- Tags ---

    /// Creates a tag, or returns the existing id when the name is
    /// already taken.
    pub fn create_tag(&self, tag_name: &str, tag_color: &str) -> Result<i32> {
        use crate::db::userdata_schema::tags::dsl::*;

        self.db.do_write(|db_conn| {
            let existing = tags
                .filter(name.eq(tag_name))
                .select(Tag::as_select())
                .first(db_conn)
                .optional()?;

            if let Some(tag) = existing {
                return Ok(tag.id);
            }

            diesel::insert_into(tags)
                .values(&NewTag { name: tag_name, color: tag_color })
                .execute(db_conn)?;

            tags.filter(name.eq(tag_name))
                .select(Tag::as_select())
                .first(db_conn)
                .map(|t| t.id)
        })
    }

    /// Removes the tag and its memo links; the memos themselves stay.
    pub fn delete_tag(&self, tag_id_val: i32) -> Result<usize> {
        use crate::db::userdata_schema::tags::dsl::*;

        self.db
            .do_write(|db_conn| diesel::delete(tags.find(tag_id_val)).execute(db_conn))
    }

    pub fn list_tags(&self) -> Vec<Tag> {
        use crate::db::userdata_schema::tags::dsl::*;

        let res = self.db.do_read(|db_conn| {
            tags.order(name.asc()).select(Tag::as_select()).load(db_conn)
        });

        match res {
            Ok(rows) => rows,
            Err(e) => {
                error(&format!("list_tags(): {}", e));
                Vec::new()
            }
        }
    }

    /// Idempotent: assigning a tag twice is a no-op.
    pub fn assign_tag(&self, memo_id_val: i32, tag_id_val: i32) -> Result<usize> {
        use crate::db::userdata_schema::memo_tags::dsl::*;

        self.db.do_write(|db_conn| {
            let existing = memo_tags
                .filter(memo_id.eq(memo_id_val))
                .filter(tag_id.eq(tag_id_val))
                .first::<MemoTag>(db_conn)
                .optional()?;

            if existing.is_some() {
                return Ok(0);
            }

            diesel::insert_into(memo_tags)
                .values(&NewMemoTag { memo_id: memo_id_val, tag_id: tag_id_val })
                .execute(db_conn)
        })
    }

    pub fn remove_tag(&self, memo_id_val: i32, tag_id_val: i32) -> Result<usize> {
        use crate::db::userdata_schema::memo_tags::dsl::*;

        self.db.do_write(|db_conn| {
            diesel::delete(
                memo_tags
                    .filter(memo_id.eq(memo_id_val))
                    .filter(tag_id.eq(tag_id_val)),
            )
            .execute(db_conn)
        })
    }

    pub fn tags_for_memo(&self, memo_id_val: i32) -> Vec<Tag> {
        use crate::db::userdata_schema::{memo_tags, tags};

        let res = self.db.do_read(|db_conn| {
            memo_tags::table
                .inner_join(tags::table)
                .filter(memo_tags::memo_id.eq(memo_id_val))
                .order(tags::name.asc())
                .select(Tag::as_select())
                .load(db_conn)
        });

        match res {
            Ok(rows) => rows,
            Err(e) => {
                error(&format!("tags_for_memo(): {}", e));
                Vec::new()
            }
        }
    }

    pub fn memos_for_tag(&self, tag_id_val: i32) -> Vec<MemoView> {
        use crate::db::userdata_schema::{memo_tags, memos};

        let res = self.db.do_read(|db_conn| {
            memo_tags::table
                .inner_join(memos::table)
                .filter(memo_tags::tag_id.eq(tag_id_val))
                .filter(memos::is_deleted.eq(false))
                .order((memos::book_id.asc(), memos::chapter.asc(), memos::verse.asc()))
                .select(Memo::as_select())
                .load::<Memo>(db_conn)
        });

        match res {
            Ok(rows) => rows.into_iter().map(|m| self.decode(m)).collect(),
            Err(e) => {
                error(&format!("memos_for_tag(): {}", e));
                Vec::new()
            }
        }
    }
}
