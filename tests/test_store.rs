mod helpers;

use serial_test::serial;

use helpers::{fake_bundled_index, FakeTranslationSource, FAKE_VERSE_TOTAL};
use selah_backend::app_data::AppData;

#[test]
#[serial]
fn test_reopen_existing_store() {
    let dir = tempfile::tempdir().expect("Can't create a temp dir");

    {
        let app = AppData::open_with_source(
            dir.path(),
            Box::new(FakeTranslationSource),
            fake_bundled_index(),
        )
        .expect("Can't create AppData");

        app.download_version("WEB", |_| {}).expect("download");
        app.create_memo("KRV", 43, 3, 16, None, "persists across opens").expect("memo");
    }

    // Reopening runs the full idempotent setup (both store schemas,
    // seeding, ledger) over the existing files.
    let app = AppData::open_with_source(
        dir.path(),
        Box::new(FakeTranslationSource),
        fake_bundled_index(),
    )
    .expect("Can't reopen AppData");

    assert_eq!(app.dbm.corpus.verse_count_for("WEB"), FAKE_VERSE_TOTAL);
    assert_eq!(app.get_books("en").len(), 66);

    // The install key is stable, so old memos stay readable.
    let memos = app.memos().list_all();
    assert_eq!(memos.len(), 1);
    assert_eq!(memos[0].content.as_plain(), Some("persists across opens"));
}

#[test]
#[serial]
fn test_initialize_twice_is_harmless() {
    let (_dir, app) = helpers::test_app();

    app.dbm.initialize().expect("re-initialize");

    assert_eq!(app.get_books("ko").len(), 66);
    assert_eq!(app.downloaded_versions().len(), 1);
}
