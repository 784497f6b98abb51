use core::hash::BuildHasherDefault;
use std::collections::HashMap;

use seahash::SeaHasher;
use tracing::warn;

use crate::coercion::{self, Coercion};
use crate::datatype::{DataType, Datum};
use crate::settings::Settings;

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

#[derive(Clone, Debug, Default)]
pub struct RegistryEntry {
    mapper: Option<Coercion>,
    default: Option<Datum>,
}

/// Per-model table of type mappers and type defaults.
///
/// A derived model receives a clone of its parent's registry when it is
/// defined. From then on the two are independent: registrations on either
/// side are never seen by the other.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    entries: HashMap<DataType, RegistryEntry, KeyHasher>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn builtin(settings: &Settings) -> Self {
        let mut registry = Self::new();
        registry.register_mapper(DataType::String, Coercion::value(coercion::to_string));
        registry.register_mapper(DataType::Integer, Coercion::value(coercion::to_integer));
        registry.register_mapper(DataType::Decimal, Coercion::value(coercion::to_decimal));
        registry.register_mapper(DataType::Float, Coercion::value(coercion::to_float));
        registry.register_mapper(DataType::Boolean, Coercion::value(coercion::to_boolean));
        registry.register_mapper(DataType::Any, Coercion::value(coercion::pass_through));
        registry.apply_settings(settings);
        registry.register_mapper(DataType::Record, Coercion::value(coercion::to_record));
        registry.register_mapper(DataType::List, Coercion::value(coercion::to_list));
        registry.register_default(DataType::Record, Datum::Record(Default::default()));
        registry.register_default(DataType::List, Datum::List(Vec::new()));
        registry
    }
    /// Registers the mappers that depend on settings, the Date and DateTime
    /// parsers, replacing whatever was registered for those two types.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.entries.entry(DataType::Date).or_default().mapper =
            Some(coercion::date_parser(settings.date_formats.clone()));
        self.entries.entry(DataType::DateTime).or_default().mapper =
            Some(coercion::datetime_parser(settings.datetime_formats.clone()));
    }
    pub fn register_mapper(&mut self, data_type: DataType, mapper: Coercion) {
        let entry = self.entries.entry(data_type.clone()).or_default();
        if entry.mapper.replace(mapper).is_some() {
            warn!(%data_type, "type mapper replaced");
        }
    }
    pub fn register_default(&mut self, data_type: DataType, default: Datum) {
        let entry = self.entries.entry(data_type.clone()).or_default();
        if entry.default.replace(default).is_some() {
            warn!(%data_type, "type default replaced");
        }
    }
    pub fn mapper(&self, data_type: &DataType) -> Option<Coercion> {
        self.entries
            .get(data_type)
            .and_then(|entry| entry.mapper.clone())
    }
    /// A fresh copy of the registered default, never the stored value itself.
    pub fn default_for(&self, data_type: &DataType) -> Option<Datum> {
        self.entries
            .get(data_type)
            .and_then(|entry| entry.default.clone())
    }
    pub fn contains(&self, data_type: &DataType) -> bool {
        self.entries.contains_key(data_type)
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
