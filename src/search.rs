//! Full-text search over the corpus with a deterministic substring
//! fallback, plus book-reference queries ("John 3:16", "요한복음 3").
//!
//! The FTS5 path cannot filter per book in this design, so a book-id
//! filter always takes the fallback path. The fallback also runs when
//! FTS yields nothing, so queries the tokenizer cannot match (e.g. CJK
//! substrings) still return results.

use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use lazy_static::lazy_static;
use regex::Regex;

use crate::bundled::BundledIndex;
use crate::catalog;
use crate::db::corpus_models::Verse;
use crate::db::DbManager;
use crate::logger::{info, warn};
use crate::types::{SearchParams, SearchResult};

lazy_static! {
    // "<book name> <chapter>" or "<book name> <chapter>:<verse>"
    static ref RE_BOOK_REF: Regex = Regex::new(r"^(.+?)\s+(\d+)(?::(\d+))?$").expect("Invalid regex");
}

pub struct SearchEngine<'a> {
    pub dbm: &'a DbManager,
    pub bundled: &'a BundledIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BookRef {
    book_id: i32,
    chapter: i32,
    verse: Option<i32>,
}

/// Parses a query shaped like a localized book reference.
fn parse_book_ref(query: &str, lang: &str) -> Option<BookRef> {
    let caps = RE_BOOK_REF.captures(query.trim())?;

    let book_id = catalog::find_book_by_name(&caps[1], lang)?;
    let chapter: i32 = caps[2].parse().ok()?;
    let verse: Option<i32> = caps.get(3).and_then(|m| m.as_str().parse().ok());

    Some(BookRef { book_id, chapter, verse })
}

/// Creates a snippet around the first (case-insensitive) occurrence of
/// the term, respecting UTF-8 character boundaries, with the match
/// wrapped in a span.
fn make_snippet(term: &str, content: &str) -> String {
    const CHARS_BEFORE: usize = 20;
    const CHARS_AFTER: usize = 60;

    let content_lower = content.to_lowercase();
    let term_lower = term.to_lowercase();

    let Some(match_byte_idx) = content_lower.find(&term_lower) else {
        // Term not found (FTS stemming can cause this): return a
        // beginning chunk.
        let end = content
            .char_indices()
            .nth(CHARS_BEFORE + CHARS_AFTER)
            .map(|(b, _)| b)
            .unwrap_or(content.len());
        let postfix = if end < content.len() { " ..." } else { "" };
        return format!("{}{}", &content[..end], postfix);
    };

    // The lowercase haystack can shift byte offsets for some scripts;
    // fall back to the raw content when the index is not a boundary.
    let match_byte_idx = if content.is_char_boundary(match_byte_idx) {
        match_byte_idx
    } else {
        0
    };

    let match_char_idx = content[..match_byte_idx].chars().count();
    let term_char_len = term.chars().count();
    let total_chars = content.chars().count();

    let start_char = match_char_idx.saturating_sub(CHARS_BEFORE);
    let end_char = (match_char_idx + term_char_len + CHARS_AFTER).min(total_chars);

    let start_byte = content
        .char_indices()
        .nth(start_char)
        .map(|(b, _)| b)
        .unwrap_or(0);
    let end_byte = content
        .char_indices()
        .nth(end_char)
        .map(|(b, _)| b)
        .unwrap_or(content.len());

    let prefix = if start_char > 0 { "... " } else { "" };
    let postfix = if end_char < total_chars { " ..." } else { "" };

    let fragment = &content[start_byte..end_byte];

    let escaped_term = regex::escape(&term_lower);
    let highlighted = match Regex::new(&format!("(?i)({})", escaped_term)) {
        Ok(re) => re
            .replace_all(fragment, "<span class='match'>$1</span>")
            .into_owned(),
        Err(_) => fragment.to_string(),
    };

    format!("{}{}{}", prefix, highlighted, postfix)
}

impl<'a> SearchEngine<'a> {
    pub fn new(dbm: &'a DbManager, bundled: &'a BundledIndex) -> Self {
        SearchEngine { dbm, bundled }
    }

    fn resolve_book_name(&self, book_id: i32, lang: &str) -> String {
        if let Some(bn) = self.dbm.corpus.get_book_name(book_id, lang) {
            return bn.name;
        }
        catalog::localized_book_name(book_id, lang)
            .unwrap_or("")
            .to_string()
    }

    fn to_result(
        &self,
        t_uid: &str,
        book_id: i32,
        chapter: i32,
        verse: i32,
        content: &str,
        term: &str,
        lang: &str,
    ) -> SearchResult {
        SearchResult {
            translation_uid: t_uid.to_string(),
            book_id,
            book_name: self.resolve_book_name(book_id, lang),
            chapter,
            verse,
            content: content.to_string(),
            snippet: make_snippet(term, content),
        }
    }

    /// The main query entry point. An empty or whitespace query returns
    /// an empty result immediately, with no store access.
    pub fn search(&self, t_uid: &str, query: &str, params: &SearchParams) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        if let Some(book_ref) = parse_book_ref(query, &params.lang) {
            return self.search_book_ref(t_uid, &book_ref, query, params);
        }

        if catalog::is_bundled(t_uid) {
            return self.bundled_contains_match(t_uid, query, params);
        }

        // Primary indexed path, unless a book filter forces the
        // fallback.
        if params.book_id.is_none() {
            match self.verses_fts_match(t_uid, query, params) {
                Ok(results) if !results.is_empty() => return results,
                Ok(_) => {
                    info(&format!("search(): no FTS hits for '{}', trying fallback", query));
                }
                Err(e) => {
                    warn(&format!("search(): FTS path failed for '{}': {}", query, e));
                }
            }
        }

        self.verses_contains_match(t_uid, query, params)
    }

    /// Direct verse lookup for book-reference queries.
    fn search_book_ref(
        &self,
        t_uid: &str,
        book_ref: &BookRef,
        query: &str,
        params: &SearchParams,
    ) -> Vec<SearchResult> {
        let verses: Vec<(i32, i32, i32, String)> = if catalog::is_bundled(t_uid) {
            match book_ref.verse {
                Some(v) => self
                    .bundled
                    .get_verse(t_uid, book_ref.book_id, book_ref.chapter, v)
                    .into_iter()
                    .map(|bv| (bv.book_id, bv.chapter, bv.verse, bv.text))
                    .collect(),
                None => self
                    .bundled
                    .get_chapter(t_uid, book_ref.book_id, book_ref.chapter)
                    .into_iter()
                    .map(|bv| (bv.book_id, bv.chapter, bv.verse, bv.text))
                    .collect(),
            }
        } else {
            match book_ref.verse {
                Some(v) => self
                    .dbm
                    .corpus
                    .get_verse(t_uid, book_ref.book_id, book_ref.chapter, v)
                    .into_iter()
                    .map(|row| (row.book_id, row.chapter, row.verse, row.content))
                    .collect(),
                None => self
                    .dbm
                    .corpus
                    .get_chapter(t_uid, book_ref.book_id, book_ref.chapter)
                    .into_iter()
                    .map(|row| (row.book_id, row.chapter, row.verse, row.content))
                    .collect(),
            }
        };

        verses
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .map(|(b, c, v, text)| self.to_result(t_uid, b, c, v, &text, query, &params.lang))
            .collect()
    }

    /// Primary path: FTS5 phrase match joined back to the verses table.
    /// Ordered by id for stable pagination; unordered FTS results
    /// fluctuate between queries.
    fn verses_fts_match(
        &self,
        t_uid: &str,
        query: &str,
        params: &SearchParams,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let db_conn = &mut self.dbm.corpus.get_conn()?;

        // Quote as a single phrase so FTS operator characters in user
        // input cannot change the query shape.
        let fts_query = format!("\"{}\"", query.replace('"', "\"\""));

        let rows: Vec<Verse> = sql_query(
            r#"
            SELECT v.*
            FROM verses_fts f
            JOIN verses v ON f.rowid = v.id
            WHERE verses_fts MATCH ? AND v.translation_uid = ?
            ORDER BY v.id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind::<Text, _>(&fts_query)
        .bind::<Text, _>(t_uid)
        .bind::<BigInt, _>(params.limit as i64)
        .bind::<BigInt, _>(params.offset as i64)
        .load(db_conn)?;

        Ok(rows
            .iter()
            .map(|v| self.to_result(t_uid, v.book_id, v.chapter, v.verse, &v.content, query, &params.lang))
            .collect())
    }

    /// Fallback path: deterministic substring match over the corpus.
    /// Also the only path that supports the per-book filter.
    fn verses_contains_match(
        &self,
        t_uid: &str,
        query: &str,
        params: &SearchParams,
    ) -> Vec<SearchResult> {
        use crate::db::corpus_schema::verses::dsl::*;

        // LIKE metacharacters in the query must match literally.
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let like_pattern = format!("%{}%", escaped);

        let res = self.dbm.corpus.do_read(|db_conn| {
            let mut q = verses.into_boxed();
            q = q.filter(translation_uid.eq(t_uid));
            q = q.filter(content.like(&like_pattern).escape('\\'));

            if let Some(filter_book) = params.book_id {
                q = q.filter(book_id.eq(filter_book));
            }

            q.order(id.asc())
                .limit(params.limit as i64)
                .offset(params.offset as i64)
                .select(Verse::as_select())
                .load::<Verse>(db_conn)
        });

        match res {
            Ok(rows) => rows
                .iter()
                .map(|v| {
                    self.to_result(t_uid, v.book_id, v.chapter, v.verse, &v.content, query, &params.lang)
                })
                .collect(),
            Err(e) => {
                warn(&format!("verses_contains_match(): {}", e));
                Vec::new()
            }
        }
    }

    /// Substring scan over a bundled translation's in-memory verse
    /// list. Bundled content is not present in the corpus store, so
    /// neither SQL path applies.
    fn bundled_contains_match(
        &self,
        t_uid: &str,
        query: &str,
        params: &SearchParams,
    ) -> Vec<SearchResult> {
        let query_lower = query.to_lowercase();

        let mut verses = self.bundled.all_verses(t_uid);
        verses.sort_by_key(|v| (v.book_id, v.chapter, v.verse));

        verses
            .into_iter()
            .filter(|v| params.book_id.map_or(true, |b| v.book_id == b))
            .filter(|v| v.text.to_lowercase().contains(&query_lower))
            .skip(params.offset)
            .take(params.limit)
            .map(|v| self.to_result(t_uid, v.book_id, v.chapter, v.verse, &v.text, query, &params.lang))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_book_ref_with_verse() {
        let r = parse_book_ref("John 3:16", "en").expect("ref");
        assert_eq!(r, BookRef { book_id: 43, chapter: 3, verse: Some(16) });
    }

    #[test]
    fn test_parse_book_ref_chapter_only() {
        let r = parse_book_ref("Psalms 23", "en").expect("ref");
        assert_eq!(r, BookRef { book_id: 19, chapter: 23, verse: None });
    }

    #[test]
    fn test_parse_book_ref_localized() {
        let r = parse_book_ref("요한복음 3:16", "ko").expect("ref");
        assert_eq!(r.book_id, 43);
    }

    #[test]
    fn test_parse_book_ref_multiword_book() {
        let r = parse_book_ref("1 Corinthians 13:4", "en").expect("ref");
        assert_eq!(r, BookRef { book_id: 46, chapter: 13, verse: Some(4) });
    }

    #[test]
    fn test_parse_book_ref_rejects_plain_words() {
        assert!(parse_book_ref("shepherd", "en").is_none());
        assert!(parse_book_ref("love never fails", "en").is_none());
        assert!(parse_book_ref("", "en").is_none());
    }

    #[test]
    fn test_make_snippet_highlights_match() {
        let s = make_snippet("world", "For God so loved the world, that he gave his only Son");
        assert!(s.contains("<span class='match'>world</span>"));
    }

    #[test]
    fn test_make_snippet_case_insensitive() {
        let s = make_snippet("WORLD", "the world turns");
        assert!(s.contains("<span class='match'>world</span>"));
    }

    #[test]
    fn test_make_snippet_term_absent() {
        let s = make_snippet("absent", "short verse");
        assert_eq!(s, "short verse");
    }

    #[test]
    fn test_make_snippet_handles_multibyte() {
        let s = make_snippet("사랑", "하나님이 세상을 이처럼 사랑하사 독생자를 주셨으니");
        assert!(s.contains("<span class='match'>사랑</span>"));
    }
}
