diesel::table! {
    translations (id) {
        id -> Integer,
        uid -> Text,
        name -> Text,
        name_canonical -> Text,
        language -> Text,
        size_bytes -> BigInt,
        verse_count -> Integer,
        origin -> Text,
    }
}

diesel::table! {
    books (id) {
        id -> Integer,
        code -> Text,
        testament -> Text,
        chapter_count -> Integer,
    }
}

diesel::table! {
    book_names (id) {
        id -> Integer,
        book_id -> Integer,
        language -> Text,
        name -> Text,
        abbreviation -> Text,
    }
}

diesel::table! {
    verses (id) {
        id -> Integer,
        translation_uid -> Text,
        book_id -> Integer,
        chapter -> Integer,
        verse -> Integer,
        content -> Text,
    }
}

diesel::joinable!(book_names -> books (book_id));
diesel::joinable!(verses -> books (book_id));

diesel::allow_tables_to_appear_in_same_query!(
    translations,
    books,
    book_names,
    verses,
);
