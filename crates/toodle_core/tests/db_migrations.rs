use rusqlite::Connection;
use toodle_core::db::migrations::{latest_version, schema_version};
use toodle_core::db::{open_db, open_db_in_memory, open_store, DbError};
use toodle_core::StoreConfig;

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name;")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

#[test]
fn fresh_store_is_fully_migrated() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_eq!(table_names(&conn), vec!["item_labels", "items", "labels"]);
    let foreign_keys: i64 = conn
        .pragma_query_value(None, "foreign_keys", |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn reopen_keeps_rows_and_does_not_remigrate() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::in_dir(dir.path());

    let conn = open_store(&config).unwrap();
    conn.execute(
        "INSERT INTO items (uuid, name, due_date) VALUES (?1, 'kept', 0);",
        ["5f0c6f4e-8a0b-4b8e-9a55-0d3c3f6a1e01"],
    )
    .unwrap();
    drop(conn);

    let conn = open_store(&config).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let due: Option<i64> = conn
        .query_row("SELECT due_date FROM items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(due, Some(0));
}

#[test]
fn store_from_newer_build_is_refused_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .pragma_update(None, "user_version", 42_u32)
        .unwrap();

    let err = open_db(&path).unwrap_err();
    assert!(
        matches!(
            err,
            DbError::UnsupportedSchemaVersion { db_version: 42, latest_supported }
                if latest_supported == latest_version()
        ),
        "{err}"
    );

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 42);
    assert!(table_names(&conn).is_empty());
}

#[test]
fn directory_path_is_not_a_store() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(open_db(dir.path()), Err(DbError::Sqlite(_))));
}
