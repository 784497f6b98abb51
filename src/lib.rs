//! Lazymap – declarative, lazily coerced typed views over loosely typed records.
//!
//! A [`model::Model`] declares attributes; a [`mapped::Mapped`] wraps one raw
//! record (a JSON object) under that model:
//! * An [`attribute::AttributeSpec`] names the raw key it reads, the types it
//!   accepts, whether nil is acceptable and an optional default or coercion.
//! * A [`registry::TypeRegistry`] maps each [`datatype::DataType`] to a
//!   coercion and a default. Derived models get a copy of their parent's.
//! * A [`coercion::Coercion`] turns a raw `serde_json::Value` into a typed
//!   [`datatype::Datum`], optionally looking at the owning instance.
//!
//! Nothing is coerced up front. The first read of an attribute picks a
//! coercion (declaration, then instance mapper by name, then instance mapper
//! by type, then the model's registry), applies it, validates the result
//! against the declared types and memoizes it for the life of the instance.
//! Absent keys take the attribute default, then the type default, then nil.
//!
//! ## Modules
//! * [`datatype`] – type identifiers, typed values and type-list wording.
//! * [`attribute`] – declarations, source key derivation and validation.
//! * [`coercion`] – coercion functions, instance mapper keys and built-ins.
//! * [`registry`] – per-model type registry.
//! * [`model`] – models and the declaration builder.
//! * [`mapped`] – instances and the lazy evaluator.
//! * [`render`] – cycle-safe display of instances.
//! * [`settings`] – configuration of the built-in mappers and renderer.
//!
//! ## Quick Start
//! ```
//! use lazymap::{DataType, Model, Options, Datum};
//! use serde_json::json;
//! let post = Model::builder("Post")
//!     .one("created_at", DataType::Date)
//!     .many("tags", DataType::String)
//!     .is("blue")
//!     .one_with("title", DataType::String, Options::new().key("headline"))
//!     .build();
//! let mapped = post
//!     .from_record(json!({"createdAt": "2015-07-27", "blue": true, "headline": "Hi"}))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(mapped.get("title").unwrap(), Datum::from("Hi"));
//! assert_eq!(mapped.get("tags").unwrap(), Datum::List(vec![]));
//! assert_eq!(mapped.get("blue").unwrap(), Datum::Boolean(true));
//! ```

pub mod attribute;
pub mod coercion;
pub mod datatype;
pub mod error;
pub mod mapped;
pub mod model;
pub mod registry;
pub mod render;
pub mod settings;

pub use attribute::{AttributeKind, AttributeSpec, Options, source_key_for};
pub use coercion::{Coercion, InstanceMappers, MapperKey};
pub use datatype::{DataType, Datum, Decimal, TypeSet, join_types};
pub use error::{LazymapError, Result};
pub use mapped::Mapped;
pub use model::{Model, ModelBuilder};
pub use registry::TypeRegistry;
pub use settings::Settings;
