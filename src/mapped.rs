//! Instances of a model and the lazy evaluator behind attribute reads.
//!
//! Each attribute of a [`Mapped`] moves from unset to memoized exactly once:
//! the first read locates the raw value, coerces it (or falls back to a
//! default when the key is absent), validates the result and caches it.
//! `Nil` is cached like any other value.
//!
//! Coercion runs without holding the memo lock, because contextual mappers
//! may read sibling attributes of the same instance. Should two threads race
//! on the same unset attribute, the first store wins and both readers get the
//! stored value.
//!
//! An attribute whose coercion, directly or through siblings, reads the
//! attribute itself fails with `LazymapError::Recursive` instead of
//! descending forever. In-flight reads are tracked per thread, so a
//! concurrent first read on another thread is not mistaken for recursion.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::attribute::{AttributeKind, AttributeSpec};
use crate::coercion::{Coercion, InstanceMappers, MapperKey};
use crate::datatype::{DataType, Datum};
use crate::error::{LazymapError, Result};
use crate::model::Model;
use crate::registry::KeyHasher;

pub struct Mapped {
    model: Arc<Model>,
    raw: Map<String, Value>,
    mappers: Mutex<InstanceMappers>,
    memo: Mutex<HashMap<String, Datum, KeyHasher>>,
    computing: Mutex<HashSet<(ThreadId, String), KeyHasher>>,
    // entries into the renderer currently on the stack
    pub(crate) rendering: AtomicUsize,
}

impl Mapped {
    fn wrap(model: &Arc<Model>, raw: Map<String, Value>, mappers: InstanceMappers) -> Self {
        Self {
            model: Arc::clone(model),
            raw,
            mappers: Mutex::new(mappers),
            memo: Mutex::new(HashMap::default()),
            computing: Mutex::new(HashSet::default()),
            rendering: AtomicUsize::new(0),
        }
    }

    pub fn construct<I, S>(model: &Arc<Model>, values: I) -> Result<Arc<Mapped>>
    where
        I: IntoIterator<Item = (S, Datum)>,
        S: AsRef<str>,
    {
        let mapped = Self::wrap(model, Map::new(), InstanceMappers::default());
        {
            let mut memo = mapped.lock_memo();
            for (name, value) in values {
                let spec = mapped.spec(name.as_ref())?;
                spec.validate(&value)?;
                memo.insert(spec.name().to_string(), value);
            }
        }
        Ok(Arc::new(mapped))
    }

    /// `Ok(None)` for a null record, `InvalidInput` for anything that is not an object.
    pub fn from_record(
        model: &Arc<Model>,
        raw: Value,
        mappers: InstanceMappers,
    ) -> Result<Option<Arc<Mapped>>> {
        match raw {
            Value::Null => Ok(None),
            Value::Object(record) => Ok(Some(Arc::new(Self::wrap(model, record, mappers)))),
            other => Err(LazymapError::InvalidInput {
                found: other.to_string(),
            }),
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    // memo entries are inserted whole, so a poisoned lock is still consistent
    fn lock_memo(&self) -> MutexGuard<'_, HashMap<String, Datum, KeyHasher>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn lock_computing(&self) -> MutexGuard<'_, HashSet<(ThreadId, String), KeyHasher>> {
        self.computing.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn lock_mappers(&self) -> MutexGuard<'_, InstanceMappers> {
        self.mappers.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn spec(&self, name: &str) -> Result<Arc<AttributeSpec>> {
        self.model
            .attribute(name)
            .ok_or_else(|| LazymapError::UnknownAttribute {
                model: self.model.name().to_string(),
                attribute: name.to_string(),
            })
    }

    /// Reads an attribute, computing and memoizing it on first access.
    pub fn get(&self, name: &str) -> Result<Datum> {
        let spec = self.spec(name)?;
        if let Some(value) = self.lock_memo().get(spec.name()) {
            return Ok(value.clone());
        }
        let computing = Computing::enter(self, &spec)?;
        let value = self.evaluate(&spec)?;
        drop(computing);
        spec.validate(&value)?;
        let mut memo = self.lock_memo();
        Ok(memo
            .entry(spec.name().to_string())
            .or_insert(value)
            .clone())
    }

    /// Writes an attribute directly, bypassing the raw record and coercion.
    pub fn set(&self, name: &str, value: impl Into<Datum>) -> Result<()> {
        let spec = self.spec(name)?;
        let value = value.into();
        spec.validate(&value)?;
        debug!(model = %self.model.name(), attribute = spec.name(), "attribute assigned");
        self.lock_memo().insert(spec.name().to_string(), value);
        Ok(())
    }

    pub fn add_instance_mapper(&self, key: impl Into<MapperKey>, mapper: Coercion) {
        self.lock_mappers().insert(key.into(), mapper);
    }

    pub fn is_memoized(&self, name: &str) -> bool {
        self.lock_memo().contains_key(name)
    }

    /// Already materialized, non-nil attributes in declaration order. Never
    /// evaluates anything.
    pub fn memoized(&self) -> Vec<(String, Datum)> {
        let memo = self.lock_memo();
        self.model
            .attributes()
            .iter()
            .filter_map(|spec| {
                memo.get(spec.name())
                    .filter(|value| !value.is_nil())
                    .map(|value| (spec.name().to_string(), value.clone()))
            })
            .collect()
    }

    /// Forces every declared attribute, inherited ones included.
    pub fn to_record(&self) -> Result<Vec<(String, Datum)>> {
        self.model
            .attributes()
            .iter()
            .map(|spec| Ok((spec.name().to_string(), self.get(spec.name())?)))
            .collect()
    }

    /// Raw keys that no declared attribute reads from, sorted.
    pub fn unmapped_keys(&self) -> Vec<String> {
        let attributes = self.model.attributes();
        let mut keys: Vec<String> = self
            .raw
            .keys()
            .filter(|key| !attributes.iter().any(|spec| spec.source_key() == key.as_str()))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    // ------------- Resolution -------------
    // declaration site, then instance by name, then instance by type, then the model's registry
    fn resolve(&self, spec: &AttributeSpec, types: &[DataType]) -> Option<Coercion> {
        if let Some(coercion) = spec.coercion() {
            trace!(attribute = spec.name(), "declared coercion");
            return Some(coercion.clone());
        }
        let instance = self.resolve_instance(Some(spec.name()), types);
        if instance.is_some() {
            return instance;
        }
        types.iter().find_map(|t| {
            let mapper = self.model.type_mapper(t);
            if mapper.is_some() {
                trace!(attribute = spec.name(), data_type = %t, "type mapper");
            }
            mapper
        })
    }
    fn resolve_instance(&self, name: Option<&str>, types: &[DataType]) -> Option<Coercion> {
        let mappers = self.lock_mappers();
        if let Some(name) = name {
            if let Some(mapper) = mappers.get(&MapperKey::Attribute(name.to_string())) {
                trace!(attribute = name, "instance mapper by name");
                return Some(mapper.clone());
            }
        }
        types.iter().find_map(|t| {
            let mapper = mappers.get(&MapperKey::Type(t.clone())).cloned();
            if mapper.is_some() {
                trace!(data_type = %t, "instance mapper by type");
            }
            mapper
        })
    }
    // the chain a non-list raw value for a collection goes through
    fn resolve_list(&self) -> Option<Coercion> {
        let types = [DataType::List];
        self.resolve_instance(None, &types)
            .or_else(|| self.model.type_mapper(&DataType::List))
    }
    fn coerce(
        &self,
        spec: &AttributeSpec,
        mapper: Option<&Coercion>,
        types: &[DataType],
        raw: &Value,
    ) -> Result<Datum> {
        let mapper = mapper.ok_or_else(|| LazymapError::MissingMapper {
            attribute: spec.name().to_string(),
            data_type: types.to_vec(),
            value: raw.to_string(),
        })?;
        mapper
            .apply(raw, self)
            .map_err(|e| e.for_attribute(spec.name()))
    }

    // ------------- Evaluation -------------
    fn evaluate(&self, spec: &AttributeSpec) -> Result<Datum> {
        let raw = match self.raw.get(spec.source_key()) {
            Some(raw) => raw,
            None => {
                debug!(model = %self.model.name(), attribute = spec.name(), "memoizing default");
                return Ok(self.default_for(spec));
            }
        };
        debug!(model = %self.model.name(), attribute = spec.name(), "memoizing coerced value");
        match (spec.kind(), raw) {
            (AttributeKind::Many, Value::Array(items)) => {
                let mapper = self.resolve(spec, spec.types());
                items
                    .iter()
                    .map(|item| self.coerce(spec, mapper.as_ref(), spec.types(), item))
                    .collect::<Result<Vec<Datum>>>()
                    .map(Datum::List)
            }
            (AttributeKind::Many, other) => {
                let mapper = self.resolve_list();
                self.coerce(spec, mapper.as_ref(), &[DataType::List], other)
            }
            (_, raw) => {
                let mapper = self.resolve(spec, spec.types());
                self.coerce(spec, mapper.as_ref(), spec.types(), raw)
            }
        }
    }

    // a fresh copy every time, so instances never share a default
    fn default_for(&self, spec: &AttributeSpec) -> Datum {
        if let Some(default) = spec.default() {
            return default.clone();
        }
        let registered = match spec.kind() {
            AttributeKind::Many => self.model.type_default(&DataType::List),
            _ => spec
                .types()
                .iter()
                .find_map(|t| self.model.type_default(t)),
        };
        registered.unwrap_or(Datum::Nil)
    }
}

// marks an attribute as being computed on this thread until dropped
struct Computing<'a> {
    owner: &'a Mapped,
    key: (ThreadId, String),
}

impl<'a> Computing<'a> {
    fn enter(owner: &'a Mapped, spec: &AttributeSpec) -> Result<Self> {
        let key = (thread::current().id(), spec.name().to_string());
        if !owner.lock_computing().insert(key.clone()) {
            return Err(LazymapError::Recursive {
                model: owner.model.name().to_string(),
                attribute: spec.name().to_string(),
            });
        }
        Ok(Computing { owner, key })
    }
}
impl Drop for Computing<'_> {
    fn drop(&mut self) {
        self.owner.lock_computing().remove(&self.key);
    }
}
