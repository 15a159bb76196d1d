diesel::table! {
    app_settings (id) {
        id -> Integer,
        #[sql_name = "key"]
        key -> Text,
        value -> Nullable<Text>,
    }
}

diesel::table! {
    memos (id) {
        id -> Integer,
        translation_uid -> Text,
        book_id -> Integer,
        chapter -> Integer,
        verse -> Integer,
        verse_end -> Nullable<Integer>,
        content -> Text,
        is_encrypted -> Bool,
        sentiment_json -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        is_deleted -> Bool,
    }
}

diesel::table! {
    tags (id) {
        id -> Integer,
        name -> Text,
        color -> Text,
    }
}

diesel::table! {
    memo_tags (id) {
        id -> Integer,
        memo_id -> Integer,
        tag_id -> Integer,
    }
}

diesel::table! {
    bookmarks (id) {
        id -> Integer,
        translation_uid -> Text,
        book_id -> Integer,
        chapter -> Integer,
        verse -> Integer,
        title -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    highlights (id) {
        id -> Integer,
        translation_uid -> Text,
        book_id -> Integer,
        chapter -> Integer,
        verse -> Integer,
        color -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    downloaded_versions (id) {
        id -> Integer,
        translation_uid -> Text,
        size_bytes -> BigInt,
        verse_count -> Integer,
        last_used_at -> Timestamp,
    }
}

diesel::joinable!(memo_tags -> memos (memo_id));
diesel::joinable!(memo_tags -> tags (tag_id));

diesel::allow_tables_to_appear_in_same_query!(
    app_settings,
    memos,
    tags,
    memo_tags,
    bookmarks,
    highlights,
    downloaded_versions,
);
