mod helpers;

use serial_test::serial;

use helpers::{test_app, test_app_with_source, FailingSource, FAKE_VERSE_TOTAL};
use selah_backend::db::corpus_models::NewVerse;
use selah_backend::download::DownloadError;
use selah_backend::types::{DownloadState, SearchParams, TranslationOrigin};

#[test]
#[serial]
fn test_download_completes_and_registers() {
    let (_dir, app) = test_app();

    let mut reports = Vec::new();
    let state = app
        .download_version("WEB", |p| reports.push(p))
        .expect("download");

    assert_eq!(state, DownloadState::Completed);
    assert_eq!(app.dbm.corpus.verse_count_for("WEB"), FAKE_VERSE_TOTAL);

    // Progress is monotonic and terminates at 100.
    let percents: Vec<u8> = reports.iter().map(|p| p.percent).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*percents.last().expect("reports"), 100);
    assert_eq!(reports.last().expect("reports").state, DownloadState::Completed);

    // The ledger has the new version plus the pre-registered bundled one.
    let versions = app.downloaded_versions();
    assert!(versions.iter().any(|v| v.translation_uid == "WEB"));
    assert!(versions.iter().any(|v| v.translation_uid == "KRV"));

    // The corpus catalog row was written with the right origin.
    let row = app.dbm.corpus.get_translation_row("WEB").expect("row");
    assert_eq!(row.origin, TranslationOrigin::Downloaded.as_str());
}

#[test]
#[serial]
fn test_redownload_is_idempotent() {
    let (_dir, app) = test_app();

    app.download_version("WEB", |_| {}).expect("first download");
    let count_first = app.dbm.corpus.verse_count_for("WEB");

    app.download_version("WEB", |_| {}).expect("second download");
    let count_second = app.dbm.corpus.verse_count_for("WEB");

    assert_eq!(count_first, count_second);
    assert_eq!(count_second, FAKE_VERSE_TOTAL);
}

#[test]
#[serial]
fn test_bundled_translation_is_rejected() {
    let (_dir, app) = test_app();

    let res = app.downloads.download(&app.dbm, "KRV", |_| {});
    assert!(matches!(res, Err(DownloadError::BundledTranslation(_))));

    let res = app.downloads.delete(&app.dbm, "KRV");
    assert!(matches!(res, Err(DownloadError::BundledTranslation(_))));
}

#[test]
#[serial]
fn test_unknown_translation_is_rejected() {
    let (_dir, app) = test_app();

    let res = app.downloads.download(&app.dbm, "NOPE", |_| {});
    assert!(matches!(res, Err(DownloadError::UnknownTranslation(_))));
}

#[test]
#[serial]
fn test_cancellation_mid_processing_is_recoverable() {
    let (_dir, app) = test_app();

    // Cancel as soon as the first batch has been committed.
    let state = app
        .download_version("WEB", |p| {
            if p.state == DownloadState::Processing {
                app.cancel_download("WEB");
            }
        })
        .expect("download");

    assert_eq!(state, DownloadState::Cancelled);
    assert_eq!(app.downloads.state("WEB"), Some(DownloadState::Cancelled));

    // Partial data may exist, but never more than the full set.
    let partial = app.dbm.corpus.verse_count_for("WEB");
    assert!(partial < FAKE_VERSE_TOTAL);

    // No ledger entry for a cancelled download.
    assert!(!app
        .downloaded_versions()
        .iter()
        .any(|v| v.translation_uid == "WEB"));

    // A plain re-download completes over the leftovers.
    let state = app.download_version("WEB", |_| {}).expect("re-download");
    assert_eq!(state, DownloadState::Completed);
    assert_eq!(app.dbm.corpus.verse_count_for("WEB"), FAKE_VERSE_TOTAL);
}

#[test]
#[serial]
fn test_delete_version_removes_everything() {
    let (_dir, app) = test_app();

    app.download_version("WEB", |_| {}).expect("download");
    assert!(app.dbm.corpus.verse_count_for("WEB") > 0);

    let deleted = app.delete_version("WEB").expect("delete");
    assert_eq!(deleted as i64, FAKE_VERSE_TOTAL);

    assert_eq!(app.dbm.corpus.verse_count_for("WEB"), 0);
    assert!(app.get_chapter("WEB", 43, 3).is_empty());
    assert!(app.dbm.corpus.get_translation_row("WEB").is_none());
    assert!(!app
        .downloaded_versions()
        .iter()
        .any(|v| v.translation_uid == "WEB"));
}

#[test]
#[serial]
fn test_fetch_failure_surfaces_as_error_state() {
    let (_dir, app) = test_app_with_source(Box::new(FailingSource));

    let res = app.downloads.download(&app.dbm, "WEB", |_| {});
    assert!(matches!(res, Err(DownloadError::Transport(_))));
    assert_eq!(app.downloads.state("WEB"), Some(DownloadState::Error));

    // Nothing was committed: the failure happened in the fetch phase.
    assert_eq!(app.dbm.corpus.verse_count_for("WEB"), 0);
}

#[test]
#[serial]
fn test_upsert_replaces_content_in_place() {
    let (_dir, app) = test_app();

    app.download_version("WEB", |_| {}).expect("download");
    let count = app.dbm.corpus.verse_count_for("WEB");

    let revised = vec![NewVerse {
        translation_uid: "WEB".into(),
        book_id: 43,
        chapter: 3,
        verse: 16,
        content: "Entirely revised wording zxqv".into(),
    }];
    app.dbm.corpus.upsert_verses_batch(&revised).expect("upsert");

    // Same row count: the conflict updated in place.
    assert_eq!(app.dbm.corpus.verse_count_for("WEB"), count);
    assert_eq!(
        app.get_verse("WEB", 43, 3, 16).expect("verse").content,
        "Entirely revised wording zxqv"
    );

    // The full-text index followed the update: new wording is found,
    // old wording is gone.
    let params = SearchParams { lang: "en".into(), limit: 10, offset: 0, book_id: None };
    let hits = app.search("WEB", "zxqv", &params);
    assert_eq!(hits.len(), 1);
    assert_eq!((hits[0].book_id, hits[0].chapter, hits[0].verse), (43, 3, 16));
    assert!(app.search("WEB", "so loved the world", &params).is_empty());
}

#[test]
#[serial]
fn test_facade_errors_stay_typed() {
    let (_dir, app) = test_app_with_source(Box::new(FailingSource));

    let err = app.download_version("WEB", |_| {}).expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<DownloadError>(),
        Some(DownloadError::Transport(_))
    ));

    let err = app.delete_version("NOPE").expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<DownloadError>(),
        Some(DownloadError::UnknownTranslation(_))
    ));
}

#[test]
#[serial]
fn test_stored_chapter_reads_back_in_order() {
    let (_dir, app) = test_app();

    app.download_version("WEB", |_| {}).expect("download");

    let chapter = app.get_chapter("WEB", 43, 3);
    assert_eq!(chapter.len(), 2);
    assert_eq!(chapter[0].verse, 16);
    assert_eq!(chapter[1].verse, 17);
    assert!(chapter[0].content.contains("so loved the world"));

    let verse = app.get_verse("WEB", 43, 3, 16).expect("verse");
    assert_eq!(verse.verse, 16);
    assert!(app.get_verse("WEB", 43, 3, 99).is_none());
}
