use toodle_core::db::open_db_in_memory;
use toodle_core::{
    DateUpdate, Item, ItemRepository, ItemService, ItemUpdate, RepoError, ServiceError,
    SqliteItemRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let item = Item::new("buy milk").with_due_date(Some(1_700_000_000));
    let id = repo.create_item(&item).unwrap();

    let loaded = repo.get_item(id).unwrap().unwrap();
    assert_eq!(loaded, item);
}

#[test]
fn absent_due_date_is_stored_as_null() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let undated = Item::new("someday");
    let epoch = Item::new("epoch").with_due_date(Some(0));
    repo.create_item(&undated).unwrap();
    repo.create_item(&epoch).unwrap();

    assert_eq!(raw_due_date(&conn, undated.uuid), None);
    assert_eq!(raw_due_date(&conn, epoch.uuid), Some(0));
    assert_eq!(repo.get_item(epoch.uuid).unwrap().unwrap().due_date, Some(0));
}

#[test]
fn list_preserves_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let names = ["first", "second", "third", "fourth"];
    for name in names {
        repo.create_item(&Item::new(name)).unwrap();
    }

    let listed = repo
        .list_items()
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect::<Vec<_>>();
    assert_eq!(listed, names);
}

#[test]
fn update_missing_item_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let item = Item::new("ghost");
    let err = repo.update_item(&item).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == item.uuid));
}

#[test]
fn validation_blocks_blank_names() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let err = repo.create_item(&Item::new("  ")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn corrupted_rows_are_rejected_on_read() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO items (uuid, name) VALUES ('not-a-uuid', 'broken');",
        [],
    )
    .unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let err = repo.list_items().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_refuses_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(SqliteItemRepository::try_new(&conn).is_err());
}

#[test]
fn service_rename_keeps_both_dates() {
    let conn = open_db_in_memory().unwrap();
    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());

    let created = service.create_item("draft", Some(100)).unwrap();
    service.complete_item(created.uuid, 200).unwrap();

    let renamed = service
        .update_item(created.uuid, &ItemUpdate::rename("final"))
        .unwrap();
    assert_eq!(renamed.name, "final");
    assert_eq!(renamed.due_date, Some(100));
    assert_eq!(renamed.completion_date, Some(200));
}

#[test]
fn service_clears_one_date_and_keeps_the_other() {
    let conn = open_db_in_memory().unwrap();
    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());

    let created = service.create_item("task", Some(100)).unwrap();
    service.complete_item(created.uuid, 200).unwrap();

    let update = ItemUpdate {
        completion_date: DateUpdate::Clear,
        ..ItemUpdate::default()
    };
    let reopened = service.update_item(created.uuid, &update).unwrap();
    assert_eq!(reopened.due_date, Some(100));
    assert_eq!(reopened.completion_date, None);

    let update = ItemUpdate::replace("task", None, Some(300));
    let swapped = service.update_item(created.uuid, &update).unwrap();
    assert_eq!(swapped.due_date, None);
    assert_eq!(swapped.completion_date, Some(300));
}

#[test]
fn service_update_of_unknown_item_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());

    let id = Uuid::new_v4();
    let err = service
        .update_item(id, &ItemUpdate::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::ItemNotFound(missing) if missing == id));
}

fn raw_due_date(conn: &Connection, id: Uuid) -> Option<i64> {
    conn.query_row(
        "SELECT due_date FROM items WHERE uuid = ?1;",
        [id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}
