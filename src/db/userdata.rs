use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use anyhow::{anyhow, Result};

use crate::crypto;
use crate::db::ensure_columns;
use crate::db::userdata_models::*;
use crate::db::DatabaseHandle;
use crate::logger::error;

pub type UserdataDbHandle = DatabaseHandle;

pub const INSTALL_KEY_SETTING: &str = "install_key";

static USERDATA_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS app_settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    value TEXT
);

CREATE TABLE IF NOT EXISTS memos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    translation_uid TEXT NOT NULL,
    book_id INTEGER NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    verse_end INTEGER,
    content TEXT NOT NULL,
    is_encrypted BOOLEAN NOT NULL DEFAULT 1,
    sentiment_json TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    is_deleted BOOLEAN NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_memos_verse
    ON memos (translation_uid, book_id, chapter, verse);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    color TEXT NOT NULL DEFAULT '#999999'
);

CREATE TABLE IF NOT EXISTS memo_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memo_id INTEGER NOT NULL REFERENCES memos (id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
    UNIQUE (memo_id, tag_id)
);

CREATE TABLE IF NOT EXISTS bookmarks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    translation_uid TEXT NOT NULL,
    book_id INTEGER NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    title TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (translation_uid, book_id, chapter, verse)
);

CREATE TABLE IF NOT EXISTS highlights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    translation_uid TEXT NOT NULL,
    book_id INTEGER NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    color TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (translation_uid, book_id, chapter, verse)
);

CREATE TABLE IF NOT EXISTS downloaded_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    translation_uid TEXT NOT NULL UNIQUE,
    size_bytes BIGINT NOT NULL DEFAULT 0,
    verse_count INTEGER NOT NULL DEFAULT 0,
    last_used_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

impl UserdataDbHandle {
    pub fn init_userdata_schema(&self) -> Result<()> {
        self.do_write(|db_conn| {
            db_conn.batch_execute(USERDATA_SCHEMA_SQL)?;
            // Columns added after the first shipped schema version.
            ensure_columns(db_conn, "memos", &[
                ("verse_end", "INTEGER"),
                ("sentiment_json", "TEXT"),
                ("is_deleted", "BOOLEAN NOT NULL DEFAULT 0"),
            ])?;
            Ok(())
        })
    }

    pub fn get_setting(&self, setting_key: &str) -> Option<String> {
        use crate::db::userdata_schema::app_settings::dsl::*;

        let res = self.do_read(|db_conn| {
            app_settings
                .filter(key.eq(setting_key))
                .select(AppSetting::as_select())
                .first(db_conn)
                .optional()
        });

        match res {
            Ok(setting) => setting.and_then(|s| s.value),
            Err(e) => {
                error(&format!("get_setting(): {}", e));
                None
            }
        }
    }

    pub fn save_setting(&self, setting_key: &str, setting_value: &str) -> Result<usize> {
        use crate::db::userdata_schema::app_settings::dsl::*;

        self.do_write(|db_conn| {
            let existing = app_settings
                .filter(key.eq(setting_key))
                .first::<AppSetting>(db_conn)
                .optional()?;

            match existing {
                Some(setting) => {
                    diesel::update(app_settings.find(setting.id))
                        .set(value.eq(Some(setting_value)))
                        .execute(db_conn)
                }
                None => {
                    let new_setting = NewAppSetting {
                        key: setting_key,
                        value: Some(setting_value),
                    };

                    diesel::insert_into(app_settings)
                        .values(&new_setting)
                        .execute(db_conn)
                }
            }
        })
    }

    /// Returns the per-install encryption key, generating and storing
    /// it on first use.
    pub fn get_or_create_install_key(&self) -> Result<[u8; crypto::KEY_SIZE]> {
        if let Some(key_hex) = self.get_setting(INSTALL_KEY_SETTING) {
            let bytes = hex::decode(&key_hex)
                .map_err(|_| anyhow!("Stored install key is not valid hex"))?;
            let key: [u8; crypto::KEY_SIZE] = bytes
                .try_into()
                .map_err(|_| anyhow!("Stored install key has the wrong length"))?;
            return Ok(key);
        }

        let key = crypto::generate_key();
        self.save_setting(INSTALL_KEY_SETTING, &hex::encode(key))?;
        Ok(key)
    }

    /// Upserts a ledger row recording that a translation physically
    /// exists on device.
    pub fn register_downloaded_version(
        &self,
        t_uid: &str,
        size_bytes_val: i64,
        verse_count_val: i32,
    ) -> Result<usize> {
        use crate::db::userdata_schema::downloaded_versions::dsl::*;

        self.do_write(|db_conn| {
            let existing = downloaded_versions
                .filter(translation_uid.eq(t_uid))
                .first::<DownloadedVersion>(db_conn)
                .optional()?;

            let now = Utc::now().naive_utc();

            match existing {
                Some(row) => diesel::update(downloaded_versions.find(row.id))
                    .set((
                        size_bytes.eq(size_bytes_val),
                        verse_count.eq(verse_count_val),
                        last_used_at.eq(now),
                    ))
                    .execute(db_conn),
                None => diesel::insert_into(downloaded_versions)
                    .values(&NewDownloadedVersion {
                        translation_uid: t_uid,
                        size_bytes: size_bytes_val,
                        verse_count: verse_count_val,
                        last_used_at: now,
                    })
                    .execute(db_conn),
            }
        })
    }

    pub fn downloaded_versions(&self) -> Vec<DownloadedVersion> {
        use crate::db::userdata_schema::downloaded_versions::dsl::*;

        let res = self.do_read(|db_conn| {
            downloaded_versions
                .order(translation_uid.asc())
                .select(DownloadedVersion::as_select())
                .load(db_conn)
        });

        match res {
            Ok(rows) => rows,
            Err(e) => {
                error(&format!("downloaded_versions(): {}", e));
                Vec::new()
            }
        }
    }

    pub fn remove_downloaded_version(&self, t_uid: &str) -> Result<usize> {
        use crate::db::userdata_schema::downloaded_versions::dsl::*;

        self.do_write(|db_conn| {
            diesel::delete(downloaded_versions.filter(translation_uid.eq(t_uid)))
                .execute(db_conn)
        })
    }

    pub fn touch_version_last_used(&self, t_uid: &str) -> Result<usize> {
        use crate::db::userdata_schema::downloaded_versions::dsl::*;

        self.do_write(|db_conn| {
            diesel::update(downloaded_versions.filter(translation_uid.eq(t_uid)))
                .set(last_used_at.eq(Utc::now().naive_utc()))
                .execute(db_conn)
        })
    }

    /// Re-applying a bookmark on the same verse removes it. Returns
    /// whether the verse is bookmarked after the call.
    pub fn toggle_bookmark(
        &self,
        t_uid: &str,
        book: i32,
        chap: i32,
        verse_num: i32,
        bookmark_title: Option<&str>,
    ) -> Result<bool> {
        use crate::db::userdata_schema::bookmarks::dsl::*;

        self.do_write(|db_conn| {
            let existing = bookmarks
                .filter(translation_uid.eq(t_uid))
                .filter(book_id.eq(book))
                .filter(chapter.eq(chap))
                .filter(verse.eq(verse_num))
                .first::<Bookmark>(db_conn)
                .optional()?;

            match existing {
                Some(row) => {
                    diesel::delete(bookmarks.find(row.id)).execute(db_conn)?;
                    Ok(false)
                }
                None => {
                    diesel::insert_into(bookmarks)
                        .values(&NewBookmark {
                            translation_uid: t_uid,
                            book_id: book,
                            chapter: chap,
                            verse: verse_num,
                            title: bookmark_title,
                            created_at: Utc::now().naive_utc(),
                        })
                        .execute(db_conn)?;
                    Ok(true)
                }
            }
        })
    }

    pub fn list_bookmarks(&self) -> Vec<Bookmark> {
        use crate::db::userdata_schema::bookmarks::dsl::*;

        let res = self.do_read(|db_conn| {
            bookmarks
                .order((book_id.asc(), chapter.asc(), verse.asc()))
                .select(Bookmark::as_select())
                .load(db_conn)
        });

        match res {
            Ok(rows) => rows,
            Err(e) => {
                error(&format!("list_bookmarks(): {}", e));
                Vec::new()
            }
        }
    }

    /// One highlight per verse; re-applying replaces the color.
    pub fn set_highlight(
        &self,
        t_uid: &str,
        book: i32,
        chap: i32,
        verse_num: i32,
        color_val: &str,
    ) -> Result<usize> {
        use crate::db::userdata_schema::highlights::dsl::*;

        self.do_write(|db_conn| {
            let existing = highlights
                .filter(translation_uid.eq(t_uid))
                .filter(book_id.eq(book))
                .filter(chapter.eq(chap))
                .filter(verse.eq(verse_num))
                .first::<Highlight>(db_conn)
                .optional()?;

            match existing {
                Some(row) => diesel::update(highlights.find(row.id))
                    .set(color.eq(color_val))
                    .execute(db_conn),
                None => diesel::insert_into(highlights)
                    .values(&NewHighlight {
                        translation_uid: t_uid,
                        book_id: book,
                        chapter: chap,
                        verse: verse_num,
                        color: color_val,
                        created_at: Utc::now().naive_utc(),
                    })
                    .execute(db_conn),
            }
        })
    }

    pub fn remove_highlight(&self, t_uid: &str, book: i32, chap: i32, verse_num: i32) -> Result<usize> {
        use crate::db::userdata_schema::highlights::dsl::*;

        self.do_write(|db_conn| {
            diesel::delete(
                highlights
                    .filter(translation_uid.eq(t_uid))
                    .filter(book_id.eq(book))
                    .filter(chapter.eq(chap))
                    .filter(verse.eq(verse_num)),
            )
            .execute(db_conn)
        })
    }

    pub fn get_highlights_by_chapter(&self, t_uid: &str, book: i32, chap: i32) -> Vec<Highlight> {
        use crate::db::userdata_schema::highlights::dsl::*;

        let res = self.do_read(|db_conn| {
            highlights
                .filter(translation_uid.eq(t_uid))
                .filter(book_id.eq(book))
                .filter(chapter.eq(chap))
                .order(verse.asc())
                .select(Highlight::as_select())
                .load(db_conn)
        });

        match res {
            Ok(rows) => rows,
            Err(e) => {
                error(&format!("get_highlights_by_chapter(): {}", e));
                Vec::new()
            }
        }
    }

    pub fn list_highlights(&self) -> Vec<Highlight> {
        use crate::db::userdata_schema::highlights::dsl::*;

        let res = self.do_read(|db_conn| {
            highlights
                .order((book_id.asc(), chapter.asc(), verse.asc()))
                .select(Highlight::as_select())
                .load(db_conn)
        });

        match res {
            Ok(rows) => rows,
            Err(e) => {
                error(&format!("list_highlights(): {}", e));
                Vec::new()
            }
        }
    }
}
