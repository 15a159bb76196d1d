mod helpers;

use serial_test::serial;

use helpers::test_app;
use selah_backend::memos::{MemoContent, MemoRepository};

#[test]
#[serial]
fn test_memo_roundtrip() {
    let (_dir, app) = test_app();

    let id = app
        .create_memo("KRV", 43, 3, 16, None, "먼저 그의 나라와 그의 의를 구하라")
        .expect("create");

    let view = app.memos().get(id).expect("memo");
    assert_eq!(view.content.as_plain(), Some("먼저 그의 나라와 그의 의를 구하라"));
    assert_eq!((view.book_id, view.chapter, view.verse), (43, 3, 16));
}

#[test]
#[serial]
fn test_create_returns_the_inserted_row_id() {
    let (_dir, app) = test_app();
    let repo = app.memos();

    let a = repo.create("KRV", 43, 3, 16, None, "first").expect("create");
    let b = repo.create("KRV", 43, 3, 17, None, "second").expect("create");

    assert_ne!(a, b);
    assert_eq!(repo.get(a).expect("memo").content.as_plain(), Some("first"));
    assert_eq!(repo.get(b).expect("memo").content.as_plain(), Some("second"));
}

#[test]
#[serial]
fn test_content_is_stored_encrypted() {
    let (_dir, app) = test_app();

    let id = app.create_memo("KRV", 1, 1, 1, None, "In the beginning").expect("create");

    // Reading through a repository with a different key degrades to
    // Unreadable instead of exposing or dropping the row.
    let wrong_key = [0u8; 32];
    let stranger = MemoRepository::new(&app.dbm.userdata, wrong_key);

    let view = stranger.get(id).expect("memo row");
    match &view.content {
        MemoContent::Unreadable { ciphertext } => {
            assert!(!ciphertext.contains("In the beginning"));
        }
        MemoContent::Plain(_) => panic!("memo must not decrypt under a different key"),
    }
    assert!(!view.content.is_readable());
}

#[test]
#[serial]
fn test_update_reencrypts_and_bumps_updated_at() {
    let (_dir, app) = test_app();

    let id = app.create_memo("KRV", 19, 23, 1, None, "first draft").expect("create");
    let before = app.memos().get(id).expect("memo");

    app.update_memo(id, "second draft").expect("update");
    let after = app.memos().get(id).expect("memo");

    assert_eq!(after.content.as_plain(), Some("second draft"));
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(after.created_at, before.created_at);
}

#[test]
#[serial]
fn test_soft_delete_hides_purge_removes() {
    let (_dir, app) = test_app();

    let id = app.create_memo("KRV", 43, 3, 16, None, "to be deleted").expect("create");
    assert_eq!(app.get_memos_by_chapter("KRV", 43, 3).len(), 1);

    app.delete_memo(id).expect("soft delete");
    assert!(app.memos().get(id).is_none());
    assert!(app.get_memos_by_chapter("KRV", 43, 3).is_empty());
    assert!(app.memos().list_all().is_empty());

    // The soft-deleted row cannot be edited back to life.
    assert_eq!(app.update_memo(id, "necromancy").expect("update"), 0);

    app.purge_memo(id).expect("purge");
    assert!(app.memos().get(id).is_none());
}

#[test]
#[serial]
fn test_verse_range_memo() {
    let (_dir, app) = test_app();

    let id = app.create_memo("KRV", 19, 23, 1, Some(3), "on the whole passage").expect("create");
    let view = app.memos().get(id).expect("memo");
    assert_eq!(view.verse_end, Some(3));
}

#[test]
#[serial]
fn test_listing_filters() {
    let (_dir, app) = test_app();

    app.create_memo("KRV", 43, 3, 16, None, "a").expect("create");
    app.create_memo("KRV", 43, 3, 17, None, "b").expect("create");
    app.create_memo("KRV", 43, 4, 1, None, "c").expect("create");
    app.create_memo("WEB", 43, 3, 16, None, "d").expect("create");

    let repo = app.memos();
    assert_eq!(repo.list_by_verse("KRV", 43, 3, 16).len(), 1);
    assert_eq!(repo.list_by_chapter("KRV", 43, 3).len(), 2);
    assert_eq!(repo.list_all().len(), 4);
}

#[test]
#[serial]
fn test_tags_assign_and_cascade() {
    let (_dir, app) = test_app();
    let repo = app.memos();

    let memo_id = repo.create("KRV", 43, 3, 16, None, "tagged").expect("create");
    let tag_id = repo.create_tag("grace", "#ffcc00").expect("tag");

    // Same name returns the existing tag.
    assert_eq!(repo.create_tag("grace", "#000000").expect("tag"), tag_id);

    repo.assign_tag(memo_id, tag_id).expect("assign");
    // Assigning twice is a no-op.
    assert_eq!(repo.assign_tag(memo_id, tag_id).expect("assign"), 0);

    assert_eq!(repo.tags_for_memo(memo_id).len(), 1);
    assert_eq!(repo.memos_for_tag(tag_id).len(), 1);

    // Purging the memo drops the link but not the tag.
    repo.purge(memo_id).expect("purge");
    assert!(repo.memos_for_tag(tag_id).is_empty());
    assert_eq!(repo.list_tags().len(), 1);
}

#[test]
#[serial]
fn test_delete_tag_keeps_memos() {
    let (_dir, app) = test_app();
    let repo = app.memos();

    let memo_id = repo.create("KRV", 1, 1, 1, None, "kept").expect("create");
    let tag_id = repo.create_tag("creation", "#3366ff").expect("tag");
    repo.assign_tag(memo_id, tag_id).expect("assign");

    repo.delete_tag(tag_id).expect("delete tag");

    assert!(repo.list_tags().is_empty());
    assert!(repo.tags_for_memo(memo_id).is_empty());
    assert!(repo.get(memo_id).is_some());
}

#[test]
#[serial]
fn test_sentiment_annotation() {
    let (_dir, app) = test_app();
    let repo = app.memos();

    let id = repo.create("KRV", 19, 23, 1, None, "peaceful").expect("create");
    assert!(repo.get(id).expect("memo").sentiment_json.is_none());

    repo.set_sentiment(id, Some(r#"{"label":"calm","score":0.93}"#)).expect("set");
    let view = repo.get(id).expect("memo");
    assert_eq!(view.sentiment_json.as_deref(), Some(r#"{"label":"calm","score":0.93}"#));

    repo.set_sentiment(id, None).expect("clear");
    assert!(repo.get(id).expect("memo").sentiment_json.is_none());
}
