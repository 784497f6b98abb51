//! Models: declared mappings from a raw record to typed attributes.
//!
//! A model is the static half of the mapping. It owns the attribute table
//! (immutable once built) and the type registry (mutable, behind a lock,
//! since mappers may be registered after definition). Instances are
//! [`Mapped`] values created from a model.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use crate::attribute::{AttributeKind, AttributeSpec, AttributeTable, Options};
use crate::coercion::{Coercion, InstanceMappers};
use crate::datatype::{DataType, Datum, TypeSet};
use crate::error::{LazymapError, Result};
use crate::mapped::Mapped;
use crate::registry::TypeRegistry;
use crate::settings::Settings;

#[derive(Debug)]
pub struct Model {
    name: String,
    parent: Option<Arc<Model>>,
    attributes: AttributeTable,
    registry: RwLock<TypeRegistry>,
    settings: Arc<Settings>,
}

impl Model {
    /// Starts a base model with the built-in registry and default settings.
    /// Model types are identified by name, so names should be unique among
    /// the models whose instances meet in one attribute.
    pub fn builder(name: &str) -> ModelBuilder {
        let settings = Settings::default();
        ModelBuilder::new(
            name,
            None,
            TypeRegistry::builtin(&settings),
            Arc::new(settings),
        )
    }
    /// Starts a model derived from this one. The registry is copied now;
    /// later registrations on this model are not seen by the derived one.
    pub fn derive(self: &Arc<Self>, name: &str) -> ModelBuilder {
        debug!(parent = %self.name, child = name, "deriving model");
        ModelBuilder::new(
            name,
            Some(Arc::clone(self)),
            self.registry().clone(),
            Arc::clone(&self.settings),
        )
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn parent(&self) -> Option<&Arc<Model>> {
        self.parent.as_ref()
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn data_type(&self) -> DataType {
        DataType::model(&self.name)
    }
    pub fn is_a(&self, other: &Model) -> bool {
        std::ptr::eq(self, other) || self.parent.as_ref().is_some_and(|p| p.is_a(other))
    }
    pub fn is_a_named(&self, name: &str) -> bool {
        self.name == name || self.parent.as_ref().is_some_and(|p| p.is_a_named(name))
    }

    /// The effective declaration for `name`, own declarations shadowing inherited ones.
    pub fn attribute(&self, name: &str) -> Option<Arc<AttributeSpec>> {
        match self.attributes.get(name) {
            Some(spec) => Some(Arc::clone(spec)),
            None => self.parent.as_ref().and_then(|p| p.attribute(name)),
        }
    }
    /// Every effective declaration, inherited first. An override keeps the
    /// slot of the declaration it replaces.
    pub fn attributes(&self) -> Vec<Arc<AttributeSpec>> {
        let mut merged = self
            .parent
            .as_ref()
            .map(|p| p.attributes())
            .unwrap_or_default();
        for spec in self.attributes.iter() {
            match merged.iter_mut().find(|s| s.name() == spec.name()) {
                Some(slot) => *slot = Arc::clone(spec),
                None => merged.push(Arc::clone(spec)),
            }
        }
        merged
    }
    pub fn own_attributes(&self) -> &AttributeTable {
        &self.attributes
    }
    /// The attribute fed by raw key `key`, own declarations first.
    pub fn attribute_for_key(&self, key: &str) -> Option<Arc<AttributeSpec>> {
        match self.attributes.by_source_key(key) {
            Some(spec) => Some(Arc::clone(spec)),
            None => self
                .parent
                .as_ref()
                .and_then(|p| p.attribute_for_key(key))
                .filter(|spec| self.attributes.get(spec.name()).is_none()),
        }
    }

    // the registry only ever sees whole-entry writes, so a poisoned lock is still consistent
    fn registry(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }
    fn registry_mut(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn register_type_mapper(&self, data_type: DataType, mapper: Coercion) {
        debug!(model = %self.name, %data_type, "registering type mapper");
        self.registry_mut().register_mapper(data_type, mapper);
    }
    pub fn register_type_default(&self, data_type: DataType, default: impl Into<Datum>) {
        debug!(model = %self.name, %data_type, "registering type default");
        self.registry_mut().register_default(data_type, default.into());
    }
    /// Lets attributes of `nested`'s type be mapped from raw objects.
    pub fn register_model(&self, nested: &Arc<Model>) {
        self.register_type_mapper(nested.data_type(), nested_mapper(nested));
    }
    pub fn type_mapper(&self, data_type: &DataType) -> Option<Coercion> {
        self.registry().mapper(data_type)
    }
    pub fn type_default(&self, data_type: &DataType) -> Option<Datum> {
        self.registry().default_for(data_type)
    }

    /// Builds an instance from already typed values, each validated now.
    pub fn construct<I, S>(self: &Arc<Self>, values: I) -> Result<Arc<Mapped>>
    where
        I: IntoIterator<Item = (S, Datum)>,
        S: AsRef<str>,
    {
        Mapped::construct(self, values)
    }
    /// Wraps a raw record; nothing is coerced until it is read.
    pub fn from_record(self: &Arc<Self>, raw: Value) -> Result<Option<Arc<Mapped>>> {
        Mapped::from_record(self, raw, InstanceMappers::default())
    }
    pub fn from_record_with(
        self: &Arc<Self>,
        raw: Value,
        mappers: InstanceMappers,
    ) -> Result<Option<Arc<Mapped>>> {
        Mapped::from_record(self, raw, mappers)
    }
}

fn nested_mapper(nested: &Arc<Model>) -> Coercion {
    // weak, so a model that maps itself does not keep itself alive
    let nested: Weak<Model> = Arc::downgrade(nested);
    Coercion::value(move |raw| {
        let model = nested
            .upgrade()
            .ok_or_else(|| LazymapError::coercion("nested model no longer exists"))?;
        Ok(model
            .from_record(raw.clone())?
            .map(Datum::Model)
            .unwrap_or(Datum::Nil))
    })
}

/// Declares the attributes of a model.
///
/// ```
/// use lazymap::{DataType, Model, Options};
/// let post = Model::builder("Post")
///     .one("title", DataType::String)
///     .one_with("created_at", DataType::Date, Options::new().key("created"))
///     .many("tags", DataType::String)
///     .is("published")
///     .build();
/// assert_eq!(post.attributes().len(), 4);
/// ```
pub struct ModelBuilder {
    name: String,
    parent: Option<Arc<Model>>,
    attributes: AttributeTable,
    registry: TypeRegistry,
    settings: Arc<Settings>,
}

impl ModelBuilder {
    fn new(
        name: &str,
        parent: Option<Arc<Model>>,
        registry: TypeRegistry,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            name: name.to_string(),
            parent,
            attributes: AttributeTable::new(),
            registry,
            settings,
        }
    }
    /// Replaces the settings. The Date and DateTime mappers are registered
    /// again from them; every other mapper and default, inherited or
    /// registered on this builder, is kept.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.registry.apply_settings(&settings);
        self.settings = Arc::new(settings);
        self
    }
    pub fn one(self, name: &str, types: impl Into<TypeSet>) -> Self {
        self.one_with(name, types, Options::new())
    }
    pub fn one_with(mut self, name: &str, types: impl Into<TypeSet>, options: Options) -> Self {
        self.attributes
            .declare(AttributeSpec::new(name, AttributeKind::One, types.into(), options));
        self
    }
    pub fn is(self, name: &str) -> Self {
        self.is_with(name, Options::new())
    }
    /// Flags are never nil, so `Options::allow_nil` is ignored here.
    pub fn is_with(mut self, name: &str, options: Options) -> Self {
        self.attributes.declare(AttributeSpec::new(
            name,
            AttributeKind::Is,
            TypeSet::from(DataType::Boolean),
            options,
        ));
        self
    }
    pub fn has(self, name: &str) -> Self {
        self.is(name)
    }
    pub fn has_with(self, name: &str, options: Options) -> Self {
        self.is_with(name, options)
    }
    pub fn many(self, name: &str, types: impl Into<TypeSet>) -> Self {
        self.many_with(name, types, Options::new())
    }
    pub fn many_with(mut self, name: &str, types: impl Into<TypeSet>, options: Options) -> Self {
        self.attributes
            .declare(AttributeSpec::new(name, AttributeKind::Many, types.into(), options));
        self
    }
    pub fn register_type_mapper(mut self, data_type: DataType, mapper: Coercion) -> Self {
        self.registry.register_mapper(data_type, mapper);
        self
    }
    pub fn register_type_default(mut self, data_type: DataType, default: impl Into<Datum>) -> Self {
        self.registry.register_default(data_type, default.into());
        self
    }
    pub fn register_model(mut self, nested: &Arc<Model>) -> Self {
        self.registry
            .register_mapper(nested.data_type(), nested_mapper(nested));
        self
    }
    /// Builds the model. A default that does not fit its declared types is
    /// only logged here; it fails when an absent key first falls back to it.
    pub fn build(self) -> Arc<Model> {
        for spec in self.attributes.iter() {
            if let Err(e) = spec.check_default() {
                warn!(model = %self.name, attribute = spec.name(), error = %e, "invalid default");
            }
        }
        debug!(model = %self.name, attributes = self.attributes.len(), "model defined");
        Arc::new(Model {
            name: self.name,
            parent: self.parent,
            attributes: self.attributes,
            registry: RwLock::new(self.registry),
            settings: self.settings,
        })
    }
    /// Like [`build`](Self::build), but rejects a default that does not fit
    /// its declared types.
    pub fn try_build(self) -> Result<Arc<Model>> {
        for spec in self.attributes.iter() {
            spec.check_default()?;
        }
        Ok(self.build())
    }
}
