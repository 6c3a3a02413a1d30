//! End-to-end tests for `TreeSync::sync_tree`

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cloudmirror_core::config::LookupStrategy;
use cloudmirror_core::domain::EntryKind;
use cloudmirror_sync::{SyncOptions, TreeSync};

use crate::common::{self, BrokenConnector, FakeDrive, FakeSource, STAMP};

const ROOT: &str = "root";

fn engine(source: FakeSource, drive: &FakeDrive) -> TreeSync {
    engine_with(source, drive, SyncOptions::default())
}

fn engine_with(source: FakeSource, drive: &FakeDrive, options: SyncOptions) -> TreeSync {
    TreeSync::new(Arc::new(source), Arc::new(drive.clone()), options)
        .with_resolver(common::fixed_resolver())
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_empty_destination_gains_folder_and_file() {
    let source = FakeSource::new()
        .folder(ROOT, "A", "src-a")
        .file(ROOT, "doc.txt", "src-doc", b"0123456789");
    let drive = FakeDrive::new();

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    let folder = drive.child(ROOT, "A").expect("folder A created");
    assert_eq!(folder.kind, EntryKind::Folder);
    assert!(drive.children(&folder.id).is_empty());

    let file = drive.child(ROOT, "doc.txt").expect("doc.txt uploaded");
    assert_eq!(file.kind, EntryKind::File);
    assert_eq!(file.content, b"0123456789");
    assert_eq!(file.content_type, "text/plain");
    assert_eq!(drive.probed_sizes(), vec![10]);

    let stats = sync.stats();
    assert!(stats.run_id.is_some());
    assert_eq!(stats.walk.folders_created, 1);
    assert_eq!(stats.transfers.uploaded, 1);
    assert_eq!(stats.transfers.bytes_uploaded, 10);
    assert!(stats.is_complete());
}

#[tokio::test]
async fn test_conflicting_file_is_renamed_and_original_kept() {
    let source = FakeSource::new().file(ROOT, "doc.txt", "src-doc", b"new content");
    let drive = FakeDrive::new();
    let original_id = drive.seed_file(ROOT, "doc.txt", b"old");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    let original = drive.child(ROOT, "doc.txt").unwrap();
    assert_eq!(original.id, original_id);
    assert_eq!(original.content, b"old");
    assert_eq!(drive.count_named(ROOT, "doc.txt"), 1);

    let renamed = drive
        .child(ROOT, &format!("doc_{STAMP}.txt"))
        .expect("renamed copy uploaded");
    assert_eq!(renamed.content, b"new content");
    assert_eq!(sync.stats().walk.files_renamed, 1);
}

#[tokio::test]
async fn test_existing_folder_is_reused() {
    let source = FakeSource::new()
        .folder(ROOT, "reports", "src-reports")
        .file("src-reports", "q1.csv", "src-q1", b"a,b\n1,2\n");
    let drive = FakeDrive::new();
    let reports_id = drive.seed_folder(ROOT, "reports");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(drive.folder_creates(), 0);
    assert_eq!(drive.count_named(ROOT, "reports"), 1);
    let q1 = drive.child(&reports_id, "q1.csv").expect("q1.csv in existing folder");
    assert_eq!(q1.content, b"a,b\n1,2\n");
    assert_eq!(sync.stats().walk.folders_reused, 1);
}

#[tokio::test]
async fn test_file_colliding_with_folder_is_renamed() {
    let source = FakeSource::new().file(ROOT, "notes", "src-notes", b"text");
    let drive = FakeDrive::new();
    drive.seed_folder(ROOT, "notes");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(drive.count_named(ROOT, "notes"), 1);
    let renamed = drive.child(ROOT, &format!("notes_{STAMP}")).unwrap();
    assert_eq!(renamed.kind, EntryKind::File);
}

#[tokio::test]
async fn test_folder_next_to_same_named_file_is_created() {
    let source = FakeSource::new()
        .folder(ROOT, "data", "src-data")
        .file("src-data", "x.bin", "src-x", b"x");
    let drive = FakeDrive::new();
    drive.seed_file(ROOT, "data", b"file, not folder");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    let folders: Vec<_> = drive
        .children(ROOT)
        .into_iter()
        .filter(|n| n.name == "data" && n.kind == EntryKind::Folder)
        .collect();
    assert_eq!(folders.len(), 1);
    assert!(drive.child(&folders[0].id, "x.bin").is_some());
}

#[tokio::test]
async fn test_second_run_creates_no_duplicate_folders() {
    let drive = FakeDrive::new();
    let build = || {
        FakeSource::new()
            .folder(ROOT, "A", "src-a")
            .folder("src-a", "B", "src-b")
            .file("src-b", "deep.txt", "src-deep", b"deep")
    };

    engine(build(), &drive).sync_tree(ROOT, ROOT).await;
    engine(build(), &drive).sync_tree(ROOT, ROOT).await;

    assert_eq!(drive.folder_creates(), 2);
    assert_eq!(drive.count_named(ROOT, "A"), 1);
    let a = drive.child(ROOT, "A").unwrap();
    assert_eq!(drive.count_named(&a.id, "B"), 1);

    // the file itself is kept twice: original name plus renamed copy
    let b = drive.child(&a.id, "B").unwrap();
    assert!(drive.child(&b.id, "deep.txt").is_some());
    assert!(drive.child(&b.id, &format!("deep_{STAMP}.txt")).is_some());
}

#[tokio::test]
async fn test_nested_tree_is_mirrored() {
    let source = FakeSource::new()
        .folder(ROOT, "Photos", "p")
        .folder("p", "2023", "p23")
        .folder("p", "2024", "p24")
        .file("p23", "a.jpg", "a", b"AAAA")
        .file("p24", "b.jpg", "b", b"BB")
        .file(ROOT, "top.txt", "t", b"top");
    let drive = FakeDrive::new();

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    let photos = drive.child(ROOT, "Photos").unwrap();
    let y23 = drive.child(&photos.id, "2023").unwrap();
    let y24 = drive.child(&photos.id, "2024").unwrap();
    assert_eq!(drive.child(&y23.id, "a.jpg").unwrap().content, b"AAAA");
    assert_eq!(drive.child(&y24.id, "b.jpg").unwrap().content, b"BB");
    assert!(drive.child(ROOT, "top.txt").is_some());

    let stats = sync.stats();
    assert_eq!(stats.walk.folders_visited, 4);
    assert_eq!(stats.walk.folders_created, 3);
    assert_eq!(stats.transfers.uploaded, 3);
    assert_eq!(stats.transfers.bytes_uploaded, 9);
}

// ============================================================================
// Renaming edge cases
// ============================================================================

#[tokio::test]
async fn test_timestamped_name_taken_gets_counter() {
    let source = FakeSource::new().file(ROOT, "doc.txt", "src-doc", b"third");
    let drive = FakeDrive::new();
    drive.seed_file(ROOT, "doc.txt", b"first");
    drive.seed_file(ROOT, &format!("doc_{STAMP}.txt"), b"second");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    let renamed = drive
        .child(ROOT, &format!("doc_{STAMP}_2.txt"))
        .expect("counter appended");
    assert_eq!(renamed.content, b"third");
}

#[tokio::test]
async fn test_names_assigned_in_this_run_are_not_reused() {
    // the first file takes the name the second would be renamed to
    let source = FakeSource::new()
        .file(ROOT, &format!("doc_{STAMP}.txt"), "s1", b"one")
        .file(ROOT, "doc.txt", "s2", b"two");
    let drive = FakeDrive::new();
    drive.seed_file(ROOT, "doc.txt", b"old");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(
        drive.child(ROOT, &format!("doc_{STAMP}.txt")).unwrap().content,
        b"one"
    );
    assert_eq!(
        drive.child(ROOT, &format!("doc_{STAMP}_2.txt")).unwrap().content,
        b"two"
    );
    assert_eq!(drive.count_named(ROOT, &format!("doc_{STAMP}.txt")), 1);
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_destination_snapshot_one_call_per_thousand_entries() {
    let drive = FakeDrive::new();
    for i in 0..2500 {
        drive.seed_file(ROOT, &format!("old-{i}.txt"), b"");
    }
    let source = FakeSource::new().file(ROOT, "old-2499.txt", "s", b"new");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(drive.list_calls(ROOT), 3);
    // the last page was seen: the collision with old-2499.txt was detected
    assert!(drive.child(ROOT, &format!("old-2499_{STAMP}.txt")).is_some());
}

#[tokio::test]
async fn test_large_source_folder_is_fully_listed() {
    let mut source = FakeSource::new().folder(ROOT, "big", "src-big");
    for i in 0..2100 {
        source = source.file("src-big", &format!("f{i}"), &format!("id{i}"), b"1");
    }
    let drive = FakeDrive::new();

    let mut sync = engine_with(
        source,
        &drive,
        SyncOptions {
            workers: 8,
            ..SyncOptions::default()
        },
    );
    sync.sync_tree(ROOT, ROOT).await;

    let big = drive.child(ROOT, "big").unwrap();
    assert_eq!(drive.children(&big.id).len(), 2100);
    assert_eq!(sync.stats().transfers.uploaded, 2100);
}

// ============================================================================
// Failure containment
// ============================================================================

#[tokio::test]
async fn test_failing_source_branch_does_not_stop_siblings() {
    let source = FakeSource::new()
        .folder(ROOT, "bad", "src-bad")
        .folder(ROOT, "good", "src-good")
        .file("src-bad", "lost.txt", "lost", b"x")
        .file("src-good", "kept.txt", "kept", b"y")
        .failing_folder("src-bad");
    let drive = FakeDrive::new();

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    let bad = drive.child(ROOT, "bad").unwrap();
    let good = drive.child(ROOT, "good").unwrap();
    assert!(drive.children(&bad.id).is_empty());
    assert!(drive.child(&good.id, "kept.txt").is_some());
    assert_eq!(sync.stats().walk.branches_skipped, 1);
    assert!(!sync.stats().is_complete());
}

#[tokio::test]
async fn test_failing_destination_snapshot_skips_branch() {
    let source = FakeSource::new()
        .folder(ROOT, "reports", "src-reports")
        .file("src-reports", "q1.csv", "q1", b"1")
        .file(ROOT, "top.txt", "top", b"2");
    let drive = FakeDrive::new();
    let reports = drive.seed_folder(ROOT, "reports");
    drive.fail_listing(&reports);

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    assert!(drive.children(&reports).is_empty());
    assert!(drive.child(ROOT, "top.txt").is_some());
    assert_eq!(sync.stats().walk.branches_skipped, 1);
}

#[tokio::test]
async fn test_failing_root_listing_mirrors_nothing() {
    let source = FakeSource::new()
        .file(ROOT, "doc.txt", "d", b"1")
        .failing_folder(ROOT);
    let drive = FakeDrive::new();

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    assert!(drive.children(ROOT).is_empty());
    assert_eq!(sync.stats().transfers.submitted, 0);
    assert_eq!(sync.stats().walk.branches_skipped, 1);
}

#[tokio::test]
async fn test_failing_folder_creation_skips_only_that_child() {
    let source = FakeSource::new()
        .folder(ROOT, "denied", "src-denied")
        .folder(ROOT, "ok", "src-ok")
        .file("src-denied", "a.txt", "a", b"a")
        .file("src-ok", "b.txt", "b", b"b");
    let drive = FakeDrive::new();
    drive.fail_folder_create("denied");

    let sync_source = Arc::new(source);
    let mut sync = TreeSync::new(
        sync_source.clone(),
        Arc::new(drive.clone()),
        SyncOptions::default(),
    );
    sync.sync_tree(ROOT, ROOT).await;

    assert!(drive.child(ROOT, "denied").is_none());
    let ok = drive.child(ROOT, "ok").unwrap();
    assert!(drive.child(&ok.id, "b.txt").is_some());
    // the skipped folder was never listed
    assert_eq!(sync_source.list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(sync.stats().walk.branches_skipped, 1);
}

#[tokio::test]
async fn test_failed_transfer_does_not_cancel_others() {
    let source = FakeSource::new()
        .file(ROOT, "a.txt", "a", b"a")
        .file(ROOT, "bad.bin", "bad", b"bad")
        .file(ROOT, "c.txt", "c", b"c")
        .file(ROOT, "missing.txt", "missing", b"m")
        .failing_open("missing");
    let drive = FakeDrive::new();
    drive.fail_upload("bad.bin");

    let mut sync = engine(source, &drive);
    sync.sync_tree(ROOT, ROOT).await;

    assert!(drive.child(ROOT, "a.txt").is_some());
    assert!(drive.child(ROOT, "c.txt").is_some());
    assert!(drive.child(ROOT, "bad.bin").is_none());
    assert!(drive.child(ROOT, "missing.txt").is_none());

    let stats = sync.stats().transfers;
    assert_eq!(stats.submitted, 4);
    assert_eq!(stats.uploaded, 2);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.pending(), 0);
}

#[tokio::test]
async fn test_panicking_upload_does_not_lose_siblings() {
    let source = FakeSource::new()
        .file(ROOT, "boom.txt", "src-boom", b"x")
        .file(ROOT, "ok.txt", "src-ok", b"fine");
    let drive = FakeDrive::new();
    drive.panic_on_upload("boom.txt");

    let options = SyncOptions {
        workers: 1,
        ..SyncOptions::default()
    };
    let mut sync = engine_with(source, &drive, options);
    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(drive.child(ROOT, "ok.txt").unwrap().content, b"fine");
    assert!(drive.child(ROOT, "boom.txt").is_none());

    let stats = sync.stats();
    assert_eq!(stats.transfers.submitted, 2);
    assert_eq!(stats.transfers.uploaded, 1);
    assert_eq!(stats.transfers.failed, 1);
    assert_eq!(stats.transfers.pending(), 0);
    assert!(!stats.is_complete());
}

#[tokio::test]
async fn test_unreachable_destination_aborts_before_walk() {
    let source = Arc::new(FakeSource::new().file(ROOT, "doc.txt", "d", b"1"));
    let mut sync = TreeSync::new(
        source.clone(),
        Arc::new(BrokenConnector),
        SyncOptions::default(),
    );

    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(source.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(sync.stats().transfers.submitted, 0);
    assert!(sync.stats().aborted);
    assert!(!sync.stats().is_complete());
}

// ============================================================================
// Resources and strategies
// ============================================================================

#[tokio::test]
async fn test_content_is_opened_only_by_workers() {
    let source = Arc::new(
        FakeSource::new()
            .file(ROOT, "a", "a", b"1")
            .file(ROOT, "b", "b", b"2"),
    );
    let drive = FakeDrive::new();
    let mut sync = TreeSync::new(source.clone(), Arc::new(drive.clone()), SyncOptions::default());

    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(source.opens.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_one_client_per_worker_plus_control() {
    let mut source = FakeSource::new();
    for i in 0..40 {
        source = source.file(ROOT, &format!("f{i}"), &format!("s{i}"), b"x");
    }
    let drive = FakeDrive::new();

    let mut sync = engine_with(
        source,
        &drive,
        SyncOptions {
            workers: 3,
            ..SyncOptions::default()
        },
    );
    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(sync.stats().transfers.uploaded, 40);
    assert!(drive.connects() >= 2);
    assert!(drive.connects() <= 4, "connects = {}", drive.connects());
}

#[tokio::test]
async fn test_per_item_lookup_reuses_and_renames() {
    let source = FakeSource::new()
        .folder(ROOT, "reports", "src-reports")
        .file("src-reports", "q1.csv", "q1", b"1")
        .file(ROOT, "doc.txt", "doc", b"new");
    let drive = FakeDrive::new();
    let reports = drive.seed_folder(ROOT, "reports");
    drive.seed_file(ROOT, "doc.txt", b"old");

    let mut sync = engine_with(
        source,
        &drive,
        SyncOptions {
            lookup: LookupStrategy::PerItem,
            ..SyncOptions::default()
        },
    );
    sync.sync_tree(ROOT, ROOT).await;

    assert_eq!(drive.total_list_calls(), 0);
    assert!(drive.find_calls() > 0);
    assert_eq!(drive.folder_creates(), 0);
    assert!(drive.child(&reports, "q1.csv").is_some());
    assert_eq!(drive.child(ROOT, "doc.txt").unwrap().content, b"old");
    assert!(drive.child(ROOT, &format!("doc_{STAMP}.txt")).is_some());
}
