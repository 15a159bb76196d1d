use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::userdata_schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = app_settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AppSetting {
    pub id: i32,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = app_settings)]
pub struct NewAppSetting<'a> {
    pub key: &'a str,
    pub value: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = memos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Memo {
    pub id: i32,
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub verse_end: Option<i32>,
    /// Ciphertext blob (hex). Plaintext never reaches this field; the
    /// is_encrypted flag exists only so rows written before encryption
    /// was introduced can be migrated.
    pub content: String,
    pub is_encrypted: bool,
    pub sentiment_json: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
}

#[derive(Insertable)]
#[diesel(table_name = memos)]
pub struct NewMemo<'a> {
    pub translation_uid: &'a str,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub verse_end: Option<i32>,
    pub content: &'a str,
    pub is_encrypted: bool,
    pub sentiment_json: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub color: String,
}

#[derive(Insertable)]
#[diesel(table_name = tags)]
pub struct NewTag<'a> {
    pub name: &'a str,
    pub color: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Associations)]
#[diesel(belongs_to(Memo))]
#[diesel(belongs_to(Tag))]
#[diesel(table_name = memo_tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MemoTag {
    pub id: i32,
    pub memo_id: i32,
    pub tag_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = memo_tags)]
pub struct NewMemoTag {
    pub memo_id: i32,
    pub tag_id: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = bookmarks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Bookmark {
    pub id: i32,
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub title: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = bookmarks)]
pub struct NewBookmark<'a> {
    pub translation_uid: &'a str,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub title: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = highlights)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Highlight {
    pub id: i32,
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub color: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = highlights)]
pub struct NewHighlight<'a> {
    pub translation_uid: &'a str,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub color: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = downloaded_versions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DownloadedVersion {
    pub id: i32,
    pub translation_uid: String,
    pub size_bytes: i64,
    pub verse_count: i32,
    pub last_used_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = downloaded_versions)]
pub struct NewDownloadedVersion<'a> {
    pub translation_uid: &'a str,
    pub size_bytes: i64,
    pub verse_count: i32,
    pub last_used_at: NaiveDateTime,
}
