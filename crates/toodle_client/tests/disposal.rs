//! Runs alone in its own test binary: the native live-record counter is
//! process-wide.

use std::sync::{Arc, Mutex};

use toodle_client::StoreClient;
use toodle_ffi::toodle_live_item_records;

#[test]
fn native_records_are_released_exactly_once() {
    let client = StoreClient::open(":memory:").unwrap();
    let baseline = toodle_live_item_records();

    let during_callback = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&during_callback);
    let subscription = client
        .subscribe(move |snapshot| {
            let items = snapshot.unwrap();
            // The snapshot is already released when the callback runs.
            sink.lock().unwrap().push((items.len(), toodle_live_item_records()));
        })
        .unwrap();

    for index in 0..4 {
        client.create(&format!("item {index}"), None).unwrap();
        assert_eq!(toodle_live_item_records(), baseline);
    }
    drop(subscription);

    let mut collection = client.get_all_collection().unwrap();
    assert_eq!(collection.len(), 4);
    assert_eq!(toodle_live_item_records(), baseline + 4);
    collection.close();
    assert_eq!(toodle_live_item_records(), baseline);
    collection.close();
    assert_eq!(toodle_live_item_records(), baseline);
    drop(collection);
    assert_eq!(toodle_live_item_records(), baseline);

    let count = client
        .get_all_with(|collection| {
            assert_eq!(toodle_live_item_records(), baseline + 4);
            collection.len()
        })
        .unwrap();
    assert_eq!(count, 4);
    assert_eq!(toodle_live_item_records(), baseline);

    client.get_all().unwrap();
    assert_eq!(toodle_live_item_records(), baseline);

    let seen = during_callback.lock().unwrap();
    assert_eq!(
        *seen,
        (1..=4).map(|len| (len, baseline)).collect::<Vec<_>>()
    );
}
