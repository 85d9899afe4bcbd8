//! Store behavior when the commit log's backend fails.

use metakv_core::{
    AppliedIndex, Config, ErrorKind, LogIndex, Mutation, Revision, RevisionedStore,
};
use metakv_dentry::{Dentry, DentryManager, FileType, MetaStatusCode};
use metakv_storage::{FileBackend, InMemoryBackend};
use metakv_testkit::FaultyBackend;
use std::sync::Arc;
use tempfile::tempdir;

fn faulty_store() -> (RevisionedStore, Arc<metakv_testkit::FaultController>) {
    let (backend, faults) = FaultyBackend::new(Box::new(InMemoryBackend::new()));
    let store = RevisionedStore::open_with_backend(Config::default(), Box::new(backend)).unwrap();
    (store, faults)
}

#[test]
fn failed_append_leaves_state_untouched() {
    let (store, faults) = faulty_store();
    store.gate().put(LogIndex::new(1), b"a", b"1").unwrap();
    let before = store.stats().unwrap();

    faults.fail_appends(true);
    let err = store.gate().put(LogIndex::new(2), b"a", b"2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
    assert_eq!(store.stats().unwrap(), before);
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.applied_index(), AppliedIndex::at(LogIndex::new(1)));

    // The index was never applied, so a redelivery goes through.
    faults.reset();
    assert!(!store.gate().put(LogIndex::new(2), b"a", b"2").unwrap().is_duplicate());
    assert_eq!(store.get(b"a").unwrap(), Some(b"2".to_vec()));
    assert_eq!(store.current_revision(), Revision::new(2));
}

#[test]
fn failed_sync_discards_appended_record() {
    let (store, faults) = faulty_store();
    store.put(b"a", b"1").unwrap();
    let size = store.stats().unwrap().log_size;

    faults.fail_syncs(true);
    assert!(store.put(b"b", b"2").is_err());
    assert_eq!(store.stats().unwrap().log_size, size);
    assert_eq!(store.get(b"b").unwrap(), None);
    assert!(faults.injected() >= 1);
}

#[test]
fn coordinated_transaction_is_all_or_nothing_on_engine_failure() {
    let (store, faults) = faulty_store();
    store.put(b"old", b"inode").unwrap();

    faults.fail_appends(true);
    let err = store
        .coordinator()
        .commit(
            LogIndex::new(5),
            &[Mutation::delete_existing("old"), Mutation::put("new", "inode")],
        )
        .unwrap_err();
    // Engine failures keep their kind through the coordinator.
    assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
    assert_eq!(store.get(b"old").unwrap(), Some(b"inode".to_vec()));
    assert_eq!(store.get(b"new").unwrap(), None);
    assert_eq!(store.applied_index(), AppliedIndex::UNINITIALIZED);
}

#[test]
fn dentry_requests_report_engine_unavailable() {
    let (store, faults) = faulty_store();
    let manager = DentryManager::new(Arc::new(store));
    let dentry = Dentry::new(1, 1, "f", 2, 0, FileType::File);

    faults.fail_appends(true);
    assert_eq!(
        manager.create_dentry(&dentry, LogIndex::new(1)),
        MetaStatusCode::EngineUnavailable
    );
    assert_eq!(manager.get_dentry(&dentry), Err(MetaStatusCode::NotFound));

    faults.reset();
    assert_eq!(manager.create_dentry(&dentry, LogIndex::new(1)), MetaStatusCode::Ok);
}

#[test]
fn torn_record_left_by_crash_is_dropped_on_reopen() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("commit.log");
    {
        let file = FileBackend::open_with_create_dirs(&log_path).unwrap();
        let (backend, faults) = FaultyBackend::new(Box::new(file));
        let store =
            RevisionedStore::open_with_backend(Config::default(), Box::new(backend)).unwrap();
        store.gate().put(LogIndex::new(1), b"a", b"1").unwrap();

        // A crash mid-append: part of the record reaches disk and nothing
        // gets a chance to clean it up.
        faults.fail_truncates(true);
        faults.tear_next_append(7);
        assert!(store.gate().put(LogIndex::new(2), b"b", b"2").is_err());
    }

    let store = RevisionedStore::open(dir.path()).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get(b"b").unwrap(), None);
    assert_eq!(store.applied_index(), AppliedIndex::at(LogIndex::new(1)));
    assert!(!store.gate().put(LogIndex::new(2), b"b", b"2").unwrap().is_duplicate());
}

#[test]
fn unremovable_partial_record_refuses_later_commits() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("commit.log");
    {
        let file = FileBackend::open_with_create_dirs(&log_path).unwrap();
        let (backend, faults) = FaultyBackend::new(Box::new(file));
        let store =
            RevisionedStore::open_with_backend(Config::default(), Box::new(backend)).unwrap();
        store.put(b"a", b"1").unwrap();

        faults.fail_truncates(true);
        faults.tear_next_append(20);
        assert!(store.put(b"b", b"2").is_err());

        // Nothing may be acknowledged behind the partial record, even once
        // the backend recovers.
        faults.reset();
        let err = store.put(b"c", b"3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
        assert_eq!(store.get(b"c").unwrap(), None);
        assert_eq!(store.current_revision(), Revision::new(1));
    }

    let store = RevisionedStore::open(dir.path()).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get(b"b").unwrap(), None);
    assert_eq!(store.put(b"c", b"3").unwrap(), Revision::new(2));
}
