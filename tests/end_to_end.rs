use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use lazymap::{Coercion, DataType, Datum, Model, Options};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// RUST_LOG=lazymap=trace shows resolution and memoization as it happens
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> Datum {
    Datum::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

#[test]
fn maps_a_full_record() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let post = Model::builder("Post")
        .one("created_at", DataType::Date)
        .many("updated_at", DataType::Date)
        .one_with(
            "foo",
            DataType::Integer,
            Options::new().coercion(Coercion::value(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Datum::Integer(42))
            })),
        )
        .is_with("blue", Options::new().default(false))
        .build();
    let mapped = post
        .from_record(json!({
            "createdAt": "2015-07-27",
            "updatedAt": ["2015-01-01", "2015-01-02"],
            "foo": "42",
            "blue": true
        }))
        .unwrap()
        .unwrap();

    assert_eq!(mapped.get("created_at").unwrap(), date(2015, 7, 27));
    assert_eq!(
        mapped.get("updated_at").unwrap(),
        Datum::List(vec![date(2015, 1, 1), date(2015, 1, 2)])
    );
    for _ in 0..3 {
        assert_eq!(mapped.get("foo").unwrap(), Datum::Integer(42));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(mapped.get("blue").unwrap(), Datum::Boolean(true));
}

#[test]
fn default_collections_are_not_shared() {
    let bag = Model::builder("Bag")
        .many_with(
            "things",
            DataType::String,
            Options::new().default(Datum::list(["something"])),
        )
        .build();
    let first = bag.from_record(json!({})).unwrap().unwrap();
    let second = bag.from_record(json!({})).unwrap().unwrap();

    let mut things = first.get("things").unwrap();
    assert_eq!(things, Datum::list(["something"]));
    things.as_list_mut().unwrap().push(Datum::from("else"));
    first.set("things", things).unwrap();

    assert_eq!(first.get("things").unwrap(), Datum::list(["something", "else"]));
    assert_eq!(second.get("things").unwrap(), Datum::list(["something"]));
    assert_eq!(
        bag.attribute("things").unwrap().default(),
        Some(&Datum::list(["something"]))
    );
}

#[test]
fn type_defaults_are_copied_per_instance() {
    let holder = Model::builder("Holder")
        .one("meta", DataType::Record)
        .many("ids", DataType::Integer)
        .build();
    let first = holder.from_record(json!({})).unwrap().unwrap();
    let second = holder.from_record(json!({})).unwrap().unwrap();

    let mut ids = first.get("ids").unwrap();
    ids.as_list_mut().unwrap().push(Datum::Integer(1));
    first.set("ids", ids).unwrap();

    assert_eq!(second.get("ids").unwrap(), Datum::List(vec![]));
    assert_eq!(second.get("meta").unwrap(), Datum::Record(Default::default()));
    assert_eq!(holder.type_default(&DataType::List), Some(Datum::List(vec![])));
}

#[test]
fn full_dump_forces_every_attribute_in_order() {
    init_tracing();
    let person = Model::builder("Person")
        .one("name", DataType::String)
        .one("age", DataType::Integer)
        .is("admin")
        .build();
    let mapped = person
        .from_record(json!({"name": "Ada", "age": "36"}))
        .unwrap()
        .unwrap();
    assert!(!mapped.is_memoized("age"));

    let record = mapped.to_record().unwrap();
    let names: Vec<&str> = record.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["name", "age", "admin"]);
    assert_eq!(record[1].1, Datum::Integer(36));
    assert_eq!(record[2].1, Datum::Boolean(false));
    assert!(mapped.is_memoized("age"));
}

#[test]
fn model_defaults_are_shared_instances() {
    let place = Model::builder("Place").one("city", DataType::String).build();
    let home = place.construct([("city", Datum::from("Lund"))]).unwrap();
    let person = Model::builder("Person")
        .one_with(
            "home",
            place.data_type(),
            Options::new().default(Datum::Model(Arc::clone(&home))),
        )
        .build();
    let first = person.from_record(json!({})).unwrap().unwrap();
    let second = person.from_record(json!({})).unwrap().unwrap();

    let first_home = first.get("home").unwrap();
    let second_home = second.get("home").unwrap();
    assert!(Arc::ptr_eq(first_home.as_model().unwrap(), &home));
    assert_eq!(first_home, second_home);
}
