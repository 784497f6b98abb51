use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::warn;

use crate::coercion::Coercion;
use crate::datatype::{DataType, Datum, TypeSet};
use crate::error::{LazymapError, Result};
use crate::registry::KeyHasher;

lazy_static! {
    static ref UNDERSCORE_LETTER: Regex = Regex::new(r"_([a-z])").expect("static pattern");
}

/// The raw record key an attribute reads from unless told otherwise:
/// `created_at` reads `createdAt`, `blue?` reads `blue`.
pub fn source_key_for(name: &str) -> String {
    let name = name.strip_suffix('?').unwrap_or(name);
    UNDERSCORE_LETTER
        .replace_all(name, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttributeKind {
    /// A single value of one of the declared types.
    One,
    /// A boolean flag.
    Is,
    /// A list whose elements are of the declared types.
    Many,
}

/// Optional parts of a declaration.
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub source_key: Option<String>,
    pub coercion: Option<Coercion>,
    pub default: Option<Datum>,
    pub allow_nil: Option<bool>,
}

impl Options {
    pub fn new() -> Self {
        <Self as Default>::default()
    }
    pub fn key(mut self, source_key: &str) -> Self {
        self.source_key = Some(source_key.to_string());
        self
    }
    pub fn coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = Some(coercion);
        self
    }
    /// Every read that falls back to the default gets its own clone. A
    /// `Datum::Model` clone is the same instance, so a model-valued default
    /// is shared by every instance that falls back to it.
    pub fn default(mut self, default: impl Into<Datum>) -> Self {
        self.default = Some(default.into());
        self
    }
    pub fn allow_nil(mut self, allow_nil: bool) -> Self {
        self.allow_nil = Some(allow_nil);
        self
    }
}

#[derive(Debug)]
pub struct AttributeSpec {
    name: String,
    kind: AttributeKind,
    types: Vec<DataType>,
    source_key: String,
    allow_nil: bool,
    default: Option<Datum>,
    coercion: Option<Coercion>,
}

impl AttributeSpec {
    pub fn new(name: &str, kind: AttributeKind, types: TypeSet, options: Options) -> Self {
        if kind == AttributeKind::Is {
            if let Some(allow_nil) = options.allow_nil {
                warn!(attribute = name, allow_nil, "flags never allow nil, allow_nil ignored");
            }
        }
        let (types, allow_nil, default, coercion) = match kind {
            AttributeKind::Is => (
                vec![DataType::Boolean],
                false,
                Some(options.default.unwrap_or(Datum::Boolean(false))),
                Some(
                    options
                        .coercion
                        .unwrap_or_else(|| Coercion::value(crate::coercion::to_boolean)),
                ),
            ),
            _ => (
                types.0,
                options.allow_nil.unwrap_or(true),
                options.default,
                options.coercion,
            ),
        };
        Self {
            name: name.to_string(),
            kind,
            types,
            source_key: options.source_key.unwrap_or_else(|| source_key_for(name)),
            allow_nil,
            default,
            coercion,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }
    /// For a collection these are the element types.
    pub fn types(&self) -> &[DataType] {
        &self.types
    }
    pub fn source_key(&self) -> &str {
        &self.source_key
    }
    pub fn allow_nil(&self) -> bool {
        self.allow_nil
    }
    pub fn default(&self) -> Option<&Datum> {
        self.default.as_ref()
    }
    pub fn coercion(&self) -> Option<&Coercion> {
        self.coercion.as_ref()
    }
    pub fn is_collection(&self) -> bool {
        self.kind == AttributeKind::Many
    }

    /// Checks the declared default, if any, against the declared types.
    pub fn check_default(&self) -> Result<()> {
        match &self.default {
            Some(default) => self.validate(default),
            None => Ok(()),
        }
    }

    /// Checks a value about to be stored, whichever way it arrived.
    pub fn validate(&self, value: &Datum) -> Result<()> {
        match (self.kind, value) {
            (AttributeKind::Many, Datum::List(items)) => {
                items.iter().try_for_each(|item| self.validate_scalar(item))
            }
            (AttributeKind::Many, other) => Err(self.mismatch(vec![DataType::List], other)),
            (_, value) => self.validate_scalar(value),
        }
    }
    fn validate_scalar(&self, value: &Datum) -> Result<()> {
        let accepted = if value.is_nil() {
            self.allow_nil
        } else {
            self.types.iter().any(|t| value.matches(t))
        };
        if accepted {
            Ok(())
        } else {
            Err(self.mismatch(self.types.clone(), value))
        }
    }
    fn mismatch(&self, expected: Vec<DataType>, value: &Datum) -> LazymapError {
        LazymapError::TypeMismatch {
            attribute: self.name.clone(),
            expected,
            found: value.type_name(),
            value: value.to_string(),
        }
    }
}

/// A model's own declarations, in declaration order.
#[derive(Debug, Default)]
pub struct AttributeTable {
    specs: Vec<Arc<AttributeSpec>>,
    slots: HashMap<String, usize, KeyHasher>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }
    /// Declaring a name twice replaces the first declaration in place.
    pub fn declare(&mut self, spec: AttributeSpec) {
        let spec = Arc::new(spec);
        match self.slots.get(spec.name()) {
            Some(&slot) => {
                warn!(attribute = spec.name(), "attribute redeclared");
                self.specs[slot] = spec;
            }
            None => {
                self.slots.insert(spec.name().to_string(), self.specs.len());
                self.specs.push(spec);
            }
        }
    }
    pub fn get(&self, name: &str) -> Option<&Arc<AttributeSpec>> {
        self.slots.get(name).map(|&slot| &self.specs[slot])
    }
    pub fn by_source_key(&self, key: &str) -> Option<&Arc<AttributeSpec>> {
        self.specs.iter().find(|spec| spec.source_key() == key)
    }
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AttributeSpec>> {
        self.specs.iter()
    }
    pub fn len(&self) -> usize {
        self.specs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
