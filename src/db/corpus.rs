use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use anyhow::Result;

use crate::catalog::{self, TranslationInfo};
use crate::db::corpus_models::*;
use crate::db::DatabaseHandle;
use crate::db::ensure_columns;
use crate::logger::{error, info};

pub type CorpusDbHandle = DatabaseHandle;

/// Corpus DDL. The verses_fts index is an external-content FTS5 table
/// kept in sync by triggers, so batched upserts during downloads need
/// no FTS bookkeeping of their own.
static CORPUS_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS translations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    name_canonical TEXT NOT NULL,
    language TEXT NOT NULL,
    size_bytes BIGINT NOT NULL DEFAULT 0,
    verse_count INTEGER NOT NULL DEFAULT 0,
    origin TEXT NOT NULL DEFAULT 'downloaded'
);

CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    testament TEXT NOT NULL,
    chapter_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS book_names (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id INTEGER NOT NULL REFERENCES books (id),
    language TEXT NOT NULL,
    name TEXT NOT NULL,
    abbreviation TEXT NOT NULL,
    UNIQUE (book_id, language)
);

CREATE TABLE IF NOT EXISTS verses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    translation_uid TEXT NOT NULL,
    book_id INTEGER NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    content TEXT NOT NULL,
    UNIQUE (translation_uid, book_id, chapter, verse)
);

CREATE INDEX IF NOT EXISTS idx_verses_lookup
    ON verses (translation_uid, book_id, chapter);

CREATE VIRTUAL TABLE IF NOT EXISTS verses_fts
    USING fts5(content, content='verses', content_rowid='id');

CREATE TRIGGER IF NOT EXISTS verses_ai AFTER INSERT ON verses BEGIN
    INSERT INTO verses_fts (rowid, content) VALUES (new.id, new.content);
END;

CREATE TRIGGER IF NOT EXISTS verses_ad AFTER DELETE ON verses BEGIN
    INSERT INTO verses_fts (verses_fts, rowid, content) VALUES ('delete', old.id, old.content);
END;

CREATE TRIGGER IF NOT EXISTS verses_au AFTER UPDATE ON verses BEGIN
    INSERT INTO verses_fts (verses_fts, rowid, content) VALUES ('delete', old.id, old.content);
    INSERT INTO verses_fts (rowid, content) VALUES (new.id, new.content);
END;
"#;

impl CorpusDbHandle {
    pub fn init_corpus_schema(&self) -> Result<()> {
        self.do_write(|db_conn| {
            db_conn.batch_execute(CORPUS_SCHEMA_SQL)?;
            // Columns added after the first shipped schema version.
            ensure_columns(db_conn, "translations", &[
                ("origin", "TEXT NOT NULL DEFAULT 'downloaded'"),
            ])?;
            Ok(())
        })
    }

    /// Seeds the fixed 66-book canon and its localized names. Runs only
    /// when the books table is empty; the whole group is one
    /// transaction.
    pub fn seed_books(&self) -> Result<()> {
        use crate::db::corpus_schema::{book_names, books};

        self.do_write(|db_conn| {
            let book_count: i64 = books::table.count().get_result(db_conn)?;
            if book_count > 0 {
                return Ok(());
            }

            info("seed_books(): Seeding 66 books with en/ko names");

            db_conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let new_books: Vec<NewBook> = catalog::BOOKS
                    .iter()
                    .map(|(id, code, testament, chapter_count)| NewBook {
                        id: *id,
                        code,
                        testament,
                        chapter_count: *chapter_count,
                    })
                    .collect();

                diesel::insert_into(books::table)
                    .values(&new_books)
                    .execute(conn)?;

                for (lang, names) in [("en", &catalog::BOOK_NAMES_EN), ("ko", &catalog::BOOK_NAMES_KO)] {
                    let new_names: Vec<NewBookName> = names
                        .iter()
                        .map(|(book_id, name, abbreviation)| NewBookName {
                            book_id: *book_id,
                            language: lang,
                            name,
                            abbreviation,
                        })
                        .collect();

                    diesel::insert_into(book_names::table)
                        .values(&new_names)
                        .execute(conn)?;
                }

                Ok(())
            })
        })
    }

    /// Books with their localized names for `lang`, ordered by book id.
    /// Falls back to English names when the language is not seeded.
    pub fn get_books(&self, lang: &str) -> Vec<(Book, BookName)> {
        use crate::db::corpus_schema::{book_names, books};

        let for_lang = |lang: &str| {
            self.do_read(|db_conn| {
                books::table
                    .inner_join(book_names::table)
                    .filter(book_names::language.eq(lang))
                    .order(books::id.asc())
                    .select((Book::as_select(), BookName::as_select()))
                    .load::<(Book, BookName)>(db_conn)
            })
        };

        match for_lang(lang) {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => for_lang("en").unwrap_or_else(|e| {
                error(&format!("get_books(): {}", e));
                Vec::new()
            }),
            Err(e) => {
                error(&format!("get_books(): {}", e));
                Vec::new()
            }
        }
    }

    pub fn get_book_name(&self, for_book_id: i32, lang: &str) -> Option<BookName> {
        use crate::db::corpus_schema::book_names::dsl::*;

        let res = self.do_read(|db_conn| {
            book_names
                .filter(book_id.eq(for_book_id))
                .filter(language.eq(lang))
                .select(BookName::as_select())
                .first(db_conn)
                .optional()
        });

        match res {
            Ok(x) => x,
            Err(e) => {
                error(&format!("get_book_name(): {}", e));
                None
            }
        }
    }

    pub fn get_verse(&self, t_uid: &str, book: i32, chap: i32, verse_num: i32) -> Option<Verse> {
        use crate::db::corpus_schema::verses::dsl::*;

        let res = self.do_read(|db_conn| {
            verses
                .filter(translation_uid.eq(t_uid))
                .filter(book_id.eq(book))
                .filter(chapter.eq(chap))
                .filter(verse.eq(verse_num))
                .select(Verse::as_select())
                .first(db_conn)
                .optional()
        });

        match res {
            Ok(x) => x,
            Err(e) => {
                error(&format!("get_verse(): {}", e));
                None
            }
        }
    }

    pub fn get_chapter(&self, t_uid: &str, book: i32, chap: i32) -> Vec<Verse> {
        use crate::db::corpus_schema::verses::dsl::*;

        let res = self.do_read(|db_conn| {
            verses
                .filter(translation_uid.eq(t_uid))
                .filter(book_id.eq(book))
                .filter(chapter.eq(chap))
                .order(verse.asc())
                .select(Verse::as_select())
                .load(db_conn)
        });

        match res {
            Ok(x) => x,
            Err(e) => {
                error(&format!("get_chapter(): {}", e));
                Vec::new()
            }
        }
    }

    pub fn verse_count_for(&self, t_uid: &str) -> i64 {
        use crate::db::corpus_schema::verses::dsl::*;

        self.do_read(|db_conn| {
            verses
                .filter(translation_uid.eq(t_uid))
                .count()
                .get_result(db_conn)
        })
        .unwrap_or(0)
    }

    /// Upserts one batch of verses as a single transaction. Conflicts
    /// on the natural key update the content in place, which makes
    /// re-downloads idempotent. Row-at-a-time because SQLite upserts
    /// cannot take a multi-row VALUES list; the per-row updates also
    /// keep the FTS triggers firing.
    pub fn upsert_verses_batch(&self, batch: &[NewVerse]) -> Result<usize> {
        use crate::db::corpus_schema::verses;

        self.do_write(|db_conn| {
            db_conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let mut written = 0;
                for row in batch {
                    written += diesel::insert_into(verses::table)
                        .values(row)
                        .on_conflict((
                            verses::translation_uid,
                            verses::book_id,
                            verses::chapter,
                            verses::verse,
                        ))
                        .do_update()
                        .set(verses::content.eq(excluded(verses::content)))
                        .execute(conn)?;
                }
                Ok(written)
            })
        })
    }

    /// Records a downloaded translation in the corpus catalog table.
    pub fn upsert_translation(&self, t: &TranslationInfo) -> Result<usize> {
        use crate::db::corpus_schema::translations;

        let new_row = NewTranslation {
            uid: t.uid,
            name: t.name,
            name_canonical: t.name_canonical,
            language: t.language,
            size_bytes: t.size_bytes,
            verse_count: t.verse_count,
            origin: t.origin.as_str(),
        };

        self.do_write(|db_conn| {
            diesel::replace_into(translations::table)
                .values(&new_row)
                .execute(db_conn)
        })
    }

    pub fn get_translation_row(&self, t_uid: &str) -> Option<Translation> {
        use crate::db::corpus_schema::translations::dsl::*;

        let res = self.do_read(|db_conn| {
            translations
                .filter(uid.eq(t_uid))
                .select(Translation::as_select())
                .first(db_conn)
                .optional()
        });

        res.unwrap_or(None)
    }

    /// Removes a translation's verses and its catalog row as one
    /// logical unit. The verse delete cascades into verses_fts through
    /// the delete trigger.
    pub fn delete_translation(&self, t_uid: &str) -> Result<usize> {
        use crate::db::corpus_schema::{translations, verses};

        self.do_write(|db_conn| {
            db_conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let deleted = diesel::delete(
                    verses::table.filter(verses::translation_uid.eq(t_uid)),
                )
                .execute(conn)?;

                diesel::delete(translations::table.filter(translations::uid.eq(t_uid)))
                    .execute(conn)?;

                info(&format!("delete_translation(): Removed {} verses of {}", deleted, t_uid));
                Ok(deleted)
            })
        })
    }
}
