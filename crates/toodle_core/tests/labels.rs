use toodle_core::db::open_db_in_memory;
use toodle_core::{
    Item, ItemRepository, Label, LabelRepository, RepoError, SqliteItemRepository,
    SqliteLabelRepository,
};
use uuid::Uuid;

#[test]
fn create_label_upserts_color() {
    let conn = open_db_in_memory().unwrap();
    let labels = SqliteLabelRepository::try_new(&conn).unwrap();

    labels.create_label(&Label::new("Home", "#112233").unwrap()).unwrap();
    labels.create_label(&Label::new("home", "#445566").unwrap()).unwrap();
    labels.create_label(&Label::new("errands", "#000000").unwrap()).unwrap();

    let all = labels.list_labels().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "errands");
    assert_eq!(all[1].color, "#445566");
}

#[test]
fn attach_and_detach_labels() {
    let conn = open_db_in_memory().unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let labels = SqliteLabelRepository::try_new(&conn).unwrap();

    let item = Item::new("paint fence");
    items.create_item(&item).unwrap();
    labels.create_label(&Label::new("home", "#112233").unwrap()).unwrap();

    labels.add_item_label(item.uuid, "HOME").unwrap();
    labels.add_item_label(item.uuid, "home").unwrap();
    assert_eq!(labels.labels_for_item(item.uuid).unwrap().len(), 1);

    labels.remove_item_label(item.uuid, "home").unwrap();
    assert!(labels.labels_for_item(item.uuid).unwrap().is_empty());
}

#[test]
fn attaching_unknown_label_or_item_fails() {
    let conn = open_db_in_memory().unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let labels = SqliteLabelRepository::try_new(&conn).unwrap();

    let item = Item::new("water plants");
    items.create_item(&item).unwrap();

    let err = labels.add_item_label(item.uuid, "garden").unwrap_err();
    assert!(matches!(err, RepoError::LabelNotFound(name) if name == "garden"));

    let missing = Uuid::new_v4();
    let err = labels.add_item_label(missing, "garden").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn set_item_labels_replaces_the_whole_set() {
    let conn = open_db_in_memory().unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let labels = SqliteLabelRepository::try_new(&conn).unwrap();

    let item = Item::new("fix bike");
    items.create_item(&item).unwrap();
    for (name, color) in [("home", "#112233"), ("outdoor", "#445566"), ("urgent", "#ff0000")] {
        labels.create_label(&Label::new(name, color).unwrap()).unwrap();
    }
    labels.add_item_label(item.uuid, "home").unwrap();

    let wanted = ["Urgent", "outdoor", "urgent"].map(String::from);
    labels.set_item_labels(item.uuid, &wanted).unwrap();
    let names = labels
        .labels_for_item(item.uuid)
        .unwrap()
        .into_iter()
        .map(|label| label.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["outdoor", "urgent"]);

    labels.set_item_labels(item.uuid, &[]).unwrap();
    assert!(labels.labels_for_item(item.uuid).unwrap().is_empty());
}

#[test]
fn set_item_labels_with_unknown_name_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let labels = SqliteLabelRepository::try_new(&conn).unwrap();

    let item = Item::new("call plumber");
    items.create_item(&item).unwrap();
    labels.create_label(&Label::new("home", "#112233").unwrap()).unwrap();
    labels.add_item_label(item.uuid, "home").unwrap();

    let err = labels
        .set_item_labels(item.uuid, &["garden".to_string()])
        .unwrap_err();
    assert!(matches!(err, RepoError::LabelNotFound(name) if name == "garden"));
    assert_eq!(labels.labels_for_item(item.uuid).unwrap().len(), 1);
}

#[test]
fn items_with_label_keeps_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let labels = SqliteLabelRepository::try_new(&conn).unwrap();
    labels.create_label(&Label::new("work", "#123456").unwrap()).unwrap();

    let first = Item::new("report");
    let skipped = Item::new("nap");
    let last = Item::new("email");
    for item in [&first, &skipped, &last] {
        items.create_item(item).unwrap();
    }
    labels.add_item_label(last.uuid, "work").unwrap();
    labels.add_item_label(first.uuid, "work").unwrap();

    let tagged = labels.items_with_label("WORK").unwrap();
    assert_eq!(tagged, vec![first, last]);
    assert!(labels.items_with_label("missing").unwrap().is_empty());
}
