// used for dates and timestamps produced by the built-in mappers
use chrono::{NaiveDate, NaiveDateTime};
// used for decimal numbers
use bigdecimal::BigDecimal;
// raw values and pass-through values are plain JSON
use serde_json::{Map, Value};

// used when parsing a string to a BigDecimal
use std::str::FromStr;
// used to print out readable forms of a data type
use std::fmt;
use std::ops;
use std::sync::Arc;

use crate::mapped::Mapped;

/// Stable identifier of a semantic type. Registries, instance mappers and
/// attribute declarations are all keyed by this rather than by reflection.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum DataType {
    /// Generic pass-through, accepts any non-nil value.
    Any,
    String,
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    DateTime,
    Record,
    List,
    /// A mapped model, identified by its name. The name can be used before
    /// the model is built, which is how a model refers to itself; two models
    /// sharing a name are the same type to the validator.
    Model(Arc<str>),
}

impl DataType {
    pub fn model(name: &str) -> Self {
        DataType::Model(Arc::from(name))
    }
    pub fn uid(&self) -> u8 {
        match self {
            DataType::Any => 0,
            DataType::String => 1,
            DataType::Integer => 2,
            DataType::Decimal => 3,
            DataType::Float => 4,
            DataType::Boolean => 5,
            DataType::Date => 6,
            DataType::DateTime => 7,
            DataType::Record => 8,
            DataType::List => 9,
            DataType::Model(_) => 10,
        }
    }
    pub fn name(&self) -> &str {
        match self {
            DataType::Any => "Any",
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Decimal => "Decimal",
            DataType::Float => "Float",
            DataType::Boolean => "Boolean",
            DataType::Date => "Date",
            DataType::DateTime => "DateTime",
            DataType::Record => "Record",
            DataType::List => "List",
            DataType::Model(name) => name.as_ref(),
        }
    }
}
impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Joins type names the way operators read them: `A`, `A and B`, `A, B and C`.
pub fn join_types(types: &[DataType]) -> String {
    match types {
        [] => String::from("nothing"),
        [only] => only.to_string(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(DataType::name).collect();
            format!("{} and {}", head.join(", "), last)
        }
    }
}

/// The declared type set of an attribute, one type or a union.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeSet(pub Vec<DataType>);

impl From<DataType> for TypeSet {
    fn from(data_type: DataType) -> Self {
        TypeSet(vec![data_type])
    }
}
impl From<Vec<DataType>> for TypeSet {
    fn from(types: Vec<DataType>) -> Self {
        TypeSet(types)
    }
}
impl<const N: usize> From<[DataType; N]> for TypeSet {
    fn from(types: [DataType; N]) -> Self {
        TypeSet(types.to_vec())
    }
}

// ------------- Typed values --------------
#[derive(Eq, PartialEq, Hash, PartialOrd, Ord, Clone, Debug)]
pub struct Decimal(BigDecimal);

impl Decimal {
    pub fn from_str(s: &str) -> Option<Decimal> {
        match BigDecimal::from_str(s) {
            Ok(decimal) => Some(Decimal(decimal)),
            _ => None,
        }
    }
}
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl ops::Deref for Decimal {
    type Target = BigDecimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<BigDecimal> for Decimal {
    fn from(decimal: BigDecimal) -> Self {
        Decimal(decimal)
    }
}

/// A mapped, typed value. `Nil` is a real value here: it is what a cached
/// "no value" looks like.
#[derive(Clone, Debug)]
pub enum Datum {
    Nil,
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Record(Map<String, Value>),
    /// Untyped pass-through of a raw value.
    Json(Value),
    List(Vec<Datum>),
    Model(Arc<Mapped>),
}

impl Datum {
    pub fn list<I, T>(items: I) -> Datum
    where
        I: IntoIterator<Item = T>,
        T: Into<Datum>,
    {
        Datum::List(items.into_iter().map(Into::into).collect())
    }
    pub fn is_nil(&self) -> bool {
        matches!(self, Datum::Nil)
    }
    /// The runtime type of the value; `None` for `Nil`.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Datum::Nil => return None,
            Datum::String(_) => DataType::String,
            Datum::Integer(_) => DataType::Integer,
            Datum::Decimal(_) => DataType::Decimal,
            Datum::Float(_) => DataType::Float,
            Datum::Boolean(_) => DataType::Boolean,
            Datum::Date(_) => DataType::Date,
            Datum::DateTime(_) => DataType::DateTime,
            Datum::Record(_) => DataType::Record,
            Datum::Json(_) => DataType::Any,
            Datum::List(_) => DataType::List,
            Datum::Model(mapped) => mapped.model().data_type(),
        })
    }
    pub fn type_name(&self) -> String {
        self.data_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| String::from("nil"))
    }
    /// Whether this value is an instance of `declared`. Models match their
    /// own type and every ancestor's.
    pub fn matches(&self, declared: &DataType) -> bool {
        match (self, declared) {
            (Datum::Nil, _) => false,
            (_, DataType::Any) => true,
            (Datum::Model(mapped), DataType::Model(name)) => mapped.model().is_a_named(name),
            (value, declared) => value.data_type().as_ref() == Some(declared),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Integer(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Float(x) => Some(*x),
            Datum::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Datum::Decimal(d) => Some(d),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Boolean(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Datum::Date(d) => Some(*d),
            _ => None,
        }
    }
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Datum::DateTime(d) => Some(*d),
            _ => None,
        }
    }
    pub fn as_record(&self) -> Option<&Map<String, Value>> {
        match self {
            Datum::Record(r) => Some(r),
            _ => None,
        }
    }
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Datum::Json(v) => Some(v),
            _ => None,
        }
    }
    pub fn as_list(&self) -> Option<&[Datum]> {
        match self {
            Datum::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Datum>> {
        match self {
            Datum::List(items) => Some(items),
            _ => None,
        }
    }
    pub fn as_model(&self) -> Option<&Arc<Mapped>> {
        match self {
            Datum::Model(m) => Some(m),
            _ => None,
        }
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Nil, Datum::Nil) => true,
            (Datum::String(a), Datum::String(b)) => a == b,
            (Datum::Integer(a), Datum::Integer(b)) => a == b,
            (Datum::Decimal(a), Datum::Decimal(b)) => a == b,
            (Datum::Float(a), Datum::Float(b)) => a == b,
            (Datum::Boolean(a), Datum::Boolean(b)) => a == b,
            (Datum::Date(a), Datum::Date(b)) => a == b,
            (Datum::DateTime(a), Datum::DateTime(b)) => a == b,
            (Datum::Record(a), Datum::Record(b)) => a == b,
            (Datum::Json(a), Datum::Json(b)) => a == b,
            (Datum::List(a), Datum::List(b)) => a == b,
            // instances have identity, not structural equality
            (Datum::Model(a), Datum::Model(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::String(s.to_string())
    }
}
impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::String(s)
    }
}
impl From<i64> for Datum {
    fn from(i: i64) -> Self {
        Datum::Integer(i)
    }
}
impl From<f64> for Datum {
    fn from(x: f64) -> Self {
        Datum::Float(x)
    }
}
impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Boolean(b)
    }
}
impl From<Decimal> for Datum {
    fn from(d: Decimal) -> Self {
        Datum::Decimal(d)
    }
}
impl From<NaiveDate> for Datum {
    fn from(d: NaiveDate) -> Self {
        Datum::Date(d)
    }
}
impl From<NaiveDateTime> for Datum {
    fn from(d: NaiveDateTime) -> Self {
        Datum::DateTime(d)
    }
}
impl From<Map<String, Value>> for Datum {
    fn from(r: Map<String, Value>) -> Self {
        Datum::Record(r)
    }
}
impl From<Vec<Datum>> for Datum {
    fn from(items: Vec<Datum>) -> Self {
        Datum::List(items)
    }
}
impl From<Arc<Mapped>> for Datum {
    fn from(m: Arc<Mapped>) -> Self {
        Datum::Model(m)
    }
}
impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Datum::Nil)
    }
}
