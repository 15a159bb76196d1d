//! Static content catalog: every known translation, the fixed 66-book
//! structure, localized book names, and the bundled-asset loader
//! registry.
//!
//! Catalog entries are defined at build time and immutable. Downloaded
//! translations additionally get a ledger row at runtime (see
//! `db::userdata`), bundled ones never do more than appear here.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::types::TranslationOrigin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationInfo {
    pub uid: &'static str,
    /// Localized display name.
    pub name: &'static str,
    /// Canonical (English) name.
    pub name_canonical: &'static str,
    pub language: &'static str,
    pub size_bytes: i64,
    pub verse_count: i32,
    pub origin: TranslationOrigin,
}

/// The translation shipped inside the app binary.
pub const PRIMARY_BUNDLED_UID: &str = "KRV";

pub type BundledLoader = fn() -> &'static str;

fn load_krv() -> &'static str {
    include_str!("../assets/bundled/krv.json")
}

lazy_static! {
    pub static ref TRANSLATIONS: Vec<TranslationInfo> = vec![
        TranslationInfo {
            uid: "KRV",
            name: "개역한글",
            name_canonical: "Korean Revised Version",
            language: "ko",
            size_bytes: 4_322_000,
            verse_count: 31_102,
            origin: TranslationOrigin::Bundled,
        },
        TranslationInfo {
            uid: "ASV",
            name: "American Standard Version",
            name_canonical: "American Standard Version",
            language: "en",
            size_bytes: 4_571_000,
            verse_count: 31_102,
            origin: TranslationOrigin::Downloaded,
        },
        TranslationInfo {
            uid: "WEB",
            name: "World English Bible",
            name_canonical: "World English Bible",
            language: "en",
            size_bytes: 4_404_000,
            verse_count: 31_102,
            origin: TranslationOrigin::Downloaded,
        },
        TranslationInfo {
            uid: "KJV",
            name: "King James Version",
            name_canonical: "King James Version",
            language: "en",
            size_bytes: 4_640_000,
            verse_count: 31_102,
            origin: TranslationOrigin::Downloaded,
        },
    ];

    /// Loader registry for statically-packaged translations, built once.
    /// Keyed by translation uid so adding a bundle never grows a
    /// conditional chain.
    pub static ref BUNDLED_LOADERS: HashMap<&'static str, BundledLoader> = {
        let mut m: HashMap<&'static str, BundledLoader> = HashMap::new();
        m.insert("KRV", load_krv as BundledLoader);
        m
    };
}

pub fn get_translation(uid: &str) -> Option<&'static TranslationInfo> {
    TRANSLATIONS.iter().find(|t| t.uid == uid)
}

pub fn is_bundled(uid: &str) -> bool {
    matches!(get_translation(uid), Some(t) if t.origin == TranslationOrigin::Bundled)
}

/// (id, code, testament, chapter_count) for the fixed 66-book canon.
/// The ids are stable and seeded into the corpus store on first open.
pub static BOOKS: [(i32, &'static str, &'static str, i32); 66] = [
    (1, "gen", "OT", 50),
    (2, "exo", "OT", 40),
    (3, "lev", "OT", 27),
    (4, "num", "OT", 36),
    (5, "deu", "OT", 34),
    (6, "jos", "OT", 24),
    (7, "jdg", "OT", 21),
    (8, "rut", "OT", 4),
    (9, "1sa", "OT", 31),
    (10, "2sa", "OT", 24),
    (11, "1ki", "OT", 22),
    (12, "2ki", "OT", 25),
    (13, "1ch", "OT", 29),
    (14, "2ch", "OT", 36),
    (15, "ezr", "OT", 10),
    (16, "neh", "OT", 13),
    (17, "est", "OT", 10),
    (18, "job", "OT", 42),
    (19, "psa", "OT", 150),
    (20, "pro", "OT", 31),
    (21, "ecc", "OT", 12),
    (22, "sng", "OT", 8),
    (23, "isa", "OT", 66),
    (24, "jer", "OT", 52),
    (25, "lam", "OT", 5),
    (26, "ezk", "OT", 48),
    (27, "dan", "OT", 12),
    (28, "hos", "OT", 14),
    (29, "jol", "OT", 3),
    (30, "amo", "OT", 9),
    (31, "oba", "OT", 1),
    (32, "jon", "OT", 4),
    (33, "mic", "OT", 7),
    (34, "nam", "OT", 3),
    (35, "hab", "OT", 3),
    (36, "zep", "OT", 3),
    (37, "hag", "OT", 2),
    (38, "zec", "OT", 14),
    (39, "mal", "OT", 4),
    (40, "mat", "NT", 28),
    (41, "mrk", "NT", 16),
    (42, "luk", "NT", 24),
    (43, "jhn", "NT", 21),
    (44, "act", "NT", 28),
    (45, "rom", "NT", 16),
    (46, "1co", "NT", 16),
    (47, "2co", "NT", 13),
    (48, "gal", "NT", 6),
    (49, "eph", "NT", 6),
    (50, "php", "NT", 4),
    (51, "col", "NT", 4),
    (52, "1th", "NT", 5),
    (53, "2th", "NT", 3),
    (54, "1ti", "NT", 6),
    (55, "2ti", "NT", 4),
    (56, "tit", "NT", 3),
    (57, "phm", "NT", 1),
    (58, "heb", "NT", 13),
    (59, "jas", "NT", 5),
    (60, "1pe", "NT", 5),
    (61, "2pe", "NT", 3),
    (62, "1jn", "NT", 5),
    (63, "2jn", "NT", 1),
    (64, "3jn", "NT", 1),
    (65, "jud", "NT", 1),
    (66, "rev", "NT", 22),
];

/// (book_id, name, abbreviation) per language.
pub static BOOK_NAMES_EN: [(i32, &'static str, &'static str); 66] = [
    (1, "Genesis", "Gen"),
    (2, "Exodus", "Exod"),
    (3, "Leviticus", "Lev"),
    (4, "Numbers", "Num"),
    (5, "Deuteronomy", "Deut"),
    (6, "Joshua", "Josh"),
    (7, "Judges", "Judg"),
    (8, "Ruth", "Ruth"),
    (9, "1 Samuel", "1Sam"),
    (10, "2 Samuel", "2Sam"),
    (11, "1 Kings", "1Kgs"),
    (12, "2 Kings", "2Kgs"),
    (13, "1 Chronicles", "1Chr"),
    (14, "2 Chronicles", "2Chr"),
    (15, "Ezra", "Ezra"),
    (16, "Nehemiah", "Neh"),
    (17, "Esther", "Esth"),
    (18, "Job", "Job"),
    (19, "Psalms", "Ps"),
    (20, "Proverbs", "Prov"),
    (21, "Ecclesiastes", "Eccl"),
    (22, "Song of Solomon", "Song"),
    (23, "Isaiah", "Isa"),
    (24, "Jeremiah", "Jer"),
    (25, "Lamentations", "Lam"),
    (26, "Ezekiel", "Ezek"),
    (27, "Daniel", "Dan"),
    (28, "Hosea", "Hos"),
    (29, "Joel", "Joel"),
    (30, "Amos", "Amos"),
    (31, "Obadiah", "Obad"),
    (32, "Jonah", "Jonah"),
    (33, "Micah", "Mic"),
    (34, "Nahum", "Nah"),
    (35, "Habakkuk", "Hab"),
    (36, "Zephaniah", "Zeph"),
    (37, "Haggai", "Hag"),
    (38, "Zechariah", "Zech"),
    (39, "Malachi", "Mal"),
    (40, "Matthew", "Matt"),
    (41, "Mark", "Mark"),
    (42, "Luke", "Luke"),
    (43, "John", "John"),
    (44, "Acts", "Acts"),
    (45, "Romans", "Rom"),
    (46, "1 Corinthians", "1Cor"),
    (47, "2 Corinthians", "2Cor"),
    (48, "Galatians", "Gal"),
    (49, "Ephesians", "Eph"),
    (50, "Philippians", "Phil"),
    (51, "Colossians", "Col"),
    (52, "1 Thessalonians", "1Thess"),
    (53, "2 Thessalonians", "2Thess"),
    (54, "1 Timothy", "1Tim"),
    (55, "2 Timothy", "2Tim"),
    (56, "Titus", "Titus"),
    (57, "Philemon", "Phlm"),
    (58, "Hebrews", "Heb"),
    (59, "James", "Jas"),
    (60, "1 Peter", "1Pet"),
    (61, "2 Peter", "2Pet"),
    (62, "1 John", "1John"),
    (63, "2 John", "2John"),
    (64, "3 John", "3John"),
    (65, "Jude", "Jude"),
    (66, "Revelation", "Rev"),
];

pub static BOOK_NAMES_KO: [(i32, &'static str, &'static str); 66] = [
    (1, "창세기", "창"),
    (2, "출애굽기", "출"),
    (3, "레위기", "레"),
    (4, "민수기", "민"),
    (5, "신명기", "신"),
    (6, "여호수아", "수"),
    (7, "사사기", "삿"),
    (8, "룻기", "룻"),
    (9, "사무엘상", "삼상"),
    (10, "사무엘하", "삼하"),
    (11, "열왕기상", "왕상"),
    (12, "열왕기하", "왕하"),
    (13, "역대상", "대상"),
    (14, "역대하", "대하"),
    (15, "에스라", "스"),
    (16, "느헤미야", "느"),
    (17, "에스더", "에"),
    (18, "욥기", "욥"),
    (19, "시편", "시"),
    (20, "잠언", "잠"),
    (21, "전도서", "전"),
    (22, "아가", "아"),
    (23, "이사야", "사"),
    (24, "예레미야", "렘"),
    (25, "예레미야애가", "애"),
    (26, "에스겔", "겔"),
    (27, "다니엘", "단"),
    (28, "호세아", "호"),
    (29, "요엘", "욜"),
    (30, "아모스", "암"),
    (31, "오바댜", "옵"),
    (32, "요나", "욘"),
    (33, "미가", "미"),
    (34, "나훔", "나"),
    (35, "하박국", "합"),
    (36, "스바냐", "습"),
    (37, "학개", "학"),
    (38, "스가랴", "슥"),
    (39, "말라기", "말"),
    (40, "마태복음", "마"),
    (41, "마가복음", "막"),
    (42, "누가복음", "눅"),
    (43, "요한복음", "요"),
    (44, "사도행전", "행"),
    (45, "로마서", "롬"),
    (46, "고린도전서", "고전"),
    (47, "고린도후서", "고후"),
    (48, "갈라디아서", "갈"),
    (49, "에베소서", "엡"),
    (50, "빌립보서", "빌"),
    (51, "골로새서", "골"),
    (52, "데살로니가전서", "살전"),
    (53, "데살로니가후서", "살후"),
    (54, "디모데전서", "딤전"),
    (55, "디모데후서", "딤후"),
    (56, "디도서", "딛"),
    (57, "빌레몬서", "몬"),
    (58, "히브리서", "히"),
    (59, "야고보서", "약"),
    (60, "베드로전서", "벧전"),
    (61, "베드로후서", "벧후"),
    (62, "요한일서", "요일"),
    (63, "요한이서", "요이"),
    (64, "요한삼서", "요삼"),
    (65, "유다서", "유"),
    (66, "요한계시록", "계"),
];

pub fn book_names_for_lang(lang: &str) -> &'static [(i32, &'static str, &'static str); 66] {
    match lang {
        "ko" => &BOOK_NAMES_KO,
        _ => &BOOK_NAMES_EN,
    }
}

pub fn book_chapter_count(book_id: i32) -> Option<i32> {
    BOOKS
        .iter()
        .find(|(id, _, _, _)| *id == book_id)
        .map(|(_, _, _, chapters)| *chapters)
}

/// Resolve a localized book name for a book id. Falls back to English
/// when the requested language has no entry.
pub fn localized_book_name(book_id: i32, lang: &str) -> Option<&'static str> {
    book_names_for_lang(lang)
        .iter()
        .find(|(id, _, _)| *id == book_id)
        .map(|(_, name, _)| *name)
}

/// Match a query token against localized book names and abbreviations,
/// case-insensitive. Used by the search engine for book references.
pub fn find_book_by_name(token: &str, lang: &str) -> Option<i32> {
    let token_lower = token.trim().to_lowercase();
    if token_lower.is_empty() {
        return None;
    }

    for names in [book_names_for_lang(lang), &BOOK_NAMES_EN] {
        for (id, name, abbrev) in names.iter() {
            if name.to_lowercase() == token_lower || abbrev.to_lowercase() == token_lower {
                return Some(*id);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_chapter_count() {
        let total: i32 = BOOKS.iter().map(|(_, _, _, c)| c).sum();
        assert_eq!(total, 1189);
    }

    #[test]
    fn test_book_ids_are_contiguous() {
        for (i, (id, _, _, _)) in BOOKS.iter().enumerate() {
            assert_eq!(*id, (i + 1) as i32);
        }
        assert_eq!(BOOK_NAMES_EN.len(), 66);
        assert_eq!(BOOK_NAMES_KO.len(), 66);
    }

    #[test]
    fn test_primary_bundled_has_loader() {
        assert!(is_bundled(PRIMARY_BUNDLED_UID));
        assert!(BUNDLED_LOADERS.contains_key(PRIMARY_BUNDLED_UID));
    }

    #[test]
    fn test_find_book_by_name() {
        assert_eq!(find_book_by_name("John", "en"), Some(43));
        assert_eq!(find_book_by_name("john", "en"), Some(43));
        assert_eq!(find_book_by_name("요한복음", "ko"), Some(43));
        assert_eq!(find_book_by_name("요", "ko"), Some(43));
        // English names resolve even under a ko language filter.
        assert_eq!(find_book_by_name("Psalms", "ko"), Some(19));
        assert_eq!(find_book_by_name("Middle Earth", "en"), None);
    }

    #[test]
    fn test_localized_book_name_falls_back_to_english() {
        assert_eq!(localized_book_name(43, "ko"), Some("요한복음"));
        assert_eq!(localized_book_name(43, "de"), Some("John"));
    }
}
