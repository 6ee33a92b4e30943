use familytree_core::db::migrations::latest_version;
use familytree_core::db::{open_db, open_db_in_memory, DbError};
use familytree_core::repo::snapshot_repo::{ID_COUNTER_KEY, SNAPSHOT_KEY};
use familytree_core::{
    LoadOrigin, SnapshotRepoError, SnapshotRepository, SqliteSnapshotRepository, TreeService,
    SAMPLE_DOCUMENT,
};
use rusqlite::Connection;

#[test]
fn fresh_store_is_migrated_and_empty() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());

    let repo = SqliteSnapshotRepository::try_new(&conn).unwrap();
    assert_eq!(repo.get(SNAPSHOT_KEY).unwrap(), None);
}

#[test]
fn put_overwrites_and_remove_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSnapshotRepository::try_new(&conn).unwrap();

    repo.put(ID_COUNTER_KEY, "4").unwrap();
    repo.put(ID_COUNTER_KEY, "9").unwrap();
    assert_eq!(repo.get(ID_COUNTER_KEY).unwrap().as_deref(), Some("9"));

    repo.remove(ID_COUNTER_KEY).unwrap();
    repo.remove(ID_COUNTER_KEY).unwrap();
    assert_eq!(repo.get(ID_COUNTER_KEY).unwrap(), None);
}

#[test]
fn unmigrated_connection_is_rejected() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteSnapshotRepository::try_new(&conn)
        .err()
        .expect("bare connection must be rejected");
    assert!(matches!(
        err,
        SnapshotRepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn edits_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("familytree.sqlite3");

    let minted = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteSnapshotRepository::try_new(&conn).unwrap();
        let mut service = TreeService::new(repo);
        assert_eq!(
            service.load(|| Ok(SAMPLE_DOCUMENT.to_string())).unwrap(),
            LoadOrigin::Source
        );
        service.add_spouse("n5", "Ivy Lane").unwrap();
        service.add_child("n5").unwrap().applied().unwrap()
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteSnapshotRepository::try_new(&conn).unwrap();
    let mut service = TreeService::new(repo);
    let origin = service
        .load(|| Err(std::io::Error::other("source must not be fetched")))
        .unwrap();
    assert_eq!(origin, LoadOrigin::Snapshot);

    let arthur = service.find_by_id("n5").unwrap();
    assert_eq!(arthur.spouses[0].name, "Ivy Lane");
    assert_eq!(arthur.children[0].id, minted);

    let next = service.add_child("n5").unwrap().applied().unwrap();
    assert_ne!(next, minted);
}
