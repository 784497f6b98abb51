use std::sync::Arc;
use std::thread;

use lazymap::{DataType, Datum, Model};
use serde_json::json;

#[test]
fn racing_first_reads_agree() {
    let model = Model::builder("Shared")
        .many("values", DataType::Integer)
        .build();
    let mapped = model
        .from_record(json!({"values": ["1", "2", "3"]}))
        .unwrap()
        .unwrap();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let mapped = Arc::clone(&mapped);
            thread::spawn(move || mapped.get("values").unwrap())
        })
        .collect();
    let expected = Datum::list([1i64, 2, 3]);
    for reader in readers {
        assert_eq!(reader.join().unwrap(), expected);
    }
    assert!(mapped.is_memoized("values"));
}
