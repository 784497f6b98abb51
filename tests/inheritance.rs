use std::sync::Arc;

use chrono::NaiveDate;
use lazymap::{Coercion, DataType, Datum, Model, Options, Settings};
use serde_json::json;

fn upper() -> Coercion {
    Coercion::value(|raw| Ok(Datum::String(raw.as_str().unwrap_or("").to_uppercase())))
}

fn setup() -> (Arc<Model>, Arc<Model>) {
    let animal = Model::builder("Animal")
        .one("name", DataType::String)
        .one("legs", DataType::Integer)
        .build();
    let bird = animal
        .derive("Bird")
        .one_with("legs", DataType::Integer, Options::new().default(2i64))
        .is("flies")
        .build();
    (animal, bird)
}

#[test]
fn derived_attributes_layer_over_inherited_ones() {
    let (animal, bird) = setup();
    let names: Vec<String> = bird
        .attributes()
        .iter()
        .map(|spec| spec.name().to_string())
        .collect();
    assert_eq!(names, ["name", "legs", "flies"]);
    assert_eq!(animal.attributes().len(), 2);
    assert_eq!(bird.own_attributes().len(), 2);

    let tweety = bird.from_record(json!({"name": "Tweety"})).unwrap().unwrap();
    assert_eq!(tweety.get("legs").unwrap(), Datum::Integer(2));
    let generic = animal.from_record(json!({"name": "Rex"})).unwrap().unwrap();
    assert_eq!(generic.get("legs").unwrap(), Datum::Nil);
}

#[test]
fn subtype_relation() {
    let (animal, bird) = setup();
    assert!(bird.is_a(&animal));
    assert!(!animal.is_a(&bird));
    assert!(bird.is_a_named("Animal"));
    assert_eq!(bird.parent().map(|p| p.name()), Some("Animal"));
}

#[test]
fn registrations_on_a_subtype_stay_there() {
    let (animal, bird) = setup();
    bird.register_type_mapper(DataType::String, upper());
    let tweety = bird.from_record(json!({"name": "tweety"})).unwrap().unwrap();
    let rex = animal.from_record(json!({"name": "rex"})).unwrap().unwrap();
    assert_eq!(tweety.get("name").unwrap(), Datum::from("TWEETY"));
    assert_eq!(rex.get("name").unwrap(), Datum::from("rex"));
}

#[test]
fn parent_registrations_after_derivation_are_not_seen() {
    let (animal, bird) = setup();
    animal.register_type_mapper(DataType::String, upper());
    animal.register_type_default(DataType::Integer, 4i64);

    let rex = animal.from_record(json!({"name": "rex"})).unwrap().unwrap();
    assert_eq!(rex.get("name").unwrap(), Datum::from("REX"));
    assert_eq!(rex.get("legs").unwrap(), Datum::Integer(4));

    // Bird copied the registry when it was defined
    let tweety = bird.from_record(json!({"name": "tweety"})).unwrap().unwrap();
    assert_eq!(tweety.get("name").unwrap(), Datum::from("tweety"));
    assert_eq!(bird.type_default(&DataType::Integer), None);

    // a model derived now takes the current registry with it
    let dog = animal.derive("Dog").build();
    let fido = dog.from_record(json!({"name": "fido"})).unwrap().unwrap();
    assert_eq!(fido.get("name").unwrap(), Datum::from("FIDO"));
}

#[test]
fn redeclaring_in_one_model_keeps_the_slot() {
    let model = Model::builder("Thing")
        .one("a", DataType::String)
        .one("b", DataType::String)
        .one("a", DataType::Integer)
        .build();
    let names: Vec<String> = model
        .attributes()
        .iter()
        .map(|spec| spec.name().to_string())
        .collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(model.attribute("a").unwrap().types(), [DataType::Integer]);
}

#[test]
fn source_key_lookup_respects_overrides() {
    let base = Model::builder("Base")
        .one("created_at", DataType::Date)
        .build();
    let child = base
        .derive("Child")
        .one_with("created_at", DataType::Date, Options::new().key("created"))
        .build();
    assert_eq!(
        base.attribute_for_key("createdAt").map(|s| s.name().to_string()),
        Some(String::from("created_at"))
    );
    assert!(child.attribute_for_key("createdAt").is_none());
    assert!(child.attribute_for_key("created").is_some());
}

#[test]
fn nested_models_and_subtypes() {
    let (animal, bird) = setup();
    let zoo = Model::builder("Zoo")
        .one("star", animal.data_type())
        .register_model(&animal)
        .build();
    let mapped = zoo
        .from_record(json!({"star": {"name": "Rex", "legs": 4}}))
        .unwrap()
        .unwrap();
    let star = mapped.get("star").unwrap();
    let star = star.as_model().unwrap();
    assert_eq!(star.get("legs").unwrap(), Datum::Integer(4));

    // a Bird instance is an Animal
    let tweety = bird.construct([("name", Datum::from("Tweety"))]).unwrap();
    mapped.set("star", tweety).unwrap();
    // but an Animal is not a Bird
    let aviary = Model::builder("Aviary").one("star", bird.data_type()).build();
    let rex = animal.construct([("name", Datum::from("Rex"))]).unwrap();
    assert!(aviary.construct([("star", Datum::Model(rex))]).is_err());
}

#[test]
fn settings_on_a_subtype_keep_the_inherited_registry() {
    let owner = Model::builder("Owner").one("name", DataType::String).build();
    let base = Model::builder("Base")
        .one("name", DataType::String)
        .one("on", DataType::Date)
        .one("count", DataType::Integer)
        .one("owner", owner.data_type())
        .register_type_mapper(DataType::String, upper())
        .register_type_default(DataType::Integer, 7i64)
        .register_model(&owner)
        .build();
    let settings = Settings {
        date_formats: vec![String::from("%d/%m/%Y")],
        ..Settings::default()
    };
    let child = base.derive("Child").with_settings(settings).build();
    let mapped = child
        .from_record(json!({"name": "x", "on": "27/07/2015", "owner": {"name": "ada"}}))
        .unwrap()
        .unwrap();

    assert_eq!(mapped.get("name").unwrap(), Datum::from("X"));
    assert_eq!(mapped.get("count").unwrap(), Datum::Integer(7));
    assert_eq!(
        mapped.get("on").unwrap(),
        Datum::Date(NaiveDate::from_ymd_opt(2015, 7, 27).unwrap())
    );
    let nested = mapped.get("owner").unwrap();
    assert_eq!(nested.as_model().unwrap().get("name").unwrap(), Datum::from("ada"));

    // the parent keeps parsing with its own formats
    let original = base
        .from_record(json!({"on": "27/07/2015"}))
        .unwrap()
        .unwrap();
    assert!(original.get("on").is_err());
}

#[test]
fn models_are_identified_by_name() {
    let (animal, _) = setup();
    let impostor = Model::builder("Animal").one("name", DataType::String).build();
    let pen = Model::builder("Pen").one("resident", animal.data_type()).build();
    let stray = impostor.construct([("name", Datum::from("Stray"))]).unwrap();
    assert!(pen.construct([("resident", Datum::Model(stray))]).is_ok());
    assert_eq!(impostor.data_type(), animal.data_type());
}
