//! Coercion functions turn a raw value into a typed [`Datum`].
//!
//! A coercion either looks at the raw value alone or also gets to see the
//! instance that owns the attribute (useful when a value must be resolved
//! against sibling attributes). Which of the two a function wants is fixed
//! when it is wrapped, through [`Coercion::value`] or
//! [`Coercion::contextual`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::datatype::{DataType, Datum, Decimal};
use crate::error::{LazymapError, Result};
use crate::mapped::Mapped;
use crate::registry::KeyHasher;

pub type ValueFn = dyn Fn(&Value) -> Result<Datum> + Send + Sync;
pub type ContextFn = dyn Fn(&Value, &Mapped) -> Result<Datum> + Send + Sync;

#[derive(Clone)]
pub enum Coercion {
    Value(Arc<ValueFn>),
    Contextual(Arc<ContextFn>),
}

impl Coercion {
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Datum> + Send + Sync + 'static,
    {
        Coercion::Value(Arc::new(f))
    }
    pub fn contextual<F>(f: F) -> Self
    where
        F: Fn(&Value, &Mapped) -> Result<Datum> + Send + Sync + 'static,
    {
        Coercion::Contextual(Arc::new(f))
    }
    pub fn is_contextual(&self) -> bool {
        matches!(self, Coercion::Contextual(_))
    }
    pub fn apply(&self, raw: &Value, owner: &Mapped) -> Result<Datum> {
        match self {
            Coercion::Value(f) => f(raw),
            Coercion::Contextual(f) => f(raw, owner),
        }
    }
}
impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Coercion::Value(_) => write!(f, "Coercion::Value"),
            Coercion::Contextual(_) => write!(f, "Coercion::Contextual"),
        }
    }
}

/// Scope of an instance-level mapper: one attribute, or every attribute of a type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum MapperKey {
    Attribute(String),
    Type(DataType),
}
impl From<&str> for MapperKey {
    fn from(name: &str) -> Self {
        MapperKey::Attribute(name.to_string())
    }
}
impl From<String> for MapperKey {
    fn from(name: String) -> Self {
        MapperKey::Attribute(name)
    }
}
impl From<DataType> for MapperKey {
    fn from(data_type: DataType) -> Self {
        MapperKey::Type(data_type)
    }
}

pub type InstanceMappers = HashMap<MapperKey, Coercion, KeyHasher>;

// ------------- Built-in mappers --------------
// Every built-in maps an explicit null to Nil; only Boolean differs.

fn unexpected(target: &str, raw: &Value) -> LazymapError {
    LazymapError::coercion(format!("cannot convert {} to {}", raw, target))
}

pub fn to_string(raw: &Value) -> Result<Datum> {
    Ok(match raw {
        Value::Null => Datum::Nil,
        Value::String(s) => Datum::String(s.clone()),
        other => Datum::String(other.to_string()),
    })
}

pub fn to_integer(raw: &Value) -> Result<Datum> {
    match raw {
        Value::Null => Ok(Datum::Nil),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Datum::Integer(i)),
            (None, Some(x)) if x.is_finite() && x.abs() < i64::MAX as f64 => {
                Ok(Datum::Integer(x.trunc() as i64))
            }
            _ => Err(unexpected("Integer", raw)),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Datum::Integer)
            .map_err(|_| unexpected("Integer", raw)),
        _ => Err(unexpected("Integer", raw)),
    }
}

pub fn to_decimal(raw: &Value) -> Result<Datum> {
    let parsed = match raw {
        Value::Null => return Ok(Datum::Nil),
        Value::Number(n) => Decimal::from_str(&n.to_string()),
        Value::String(s) => Decimal::from_str(s.trim()),
        _ => None,
    };
    parsed
        .map(Datum::Decimal)
        .ok_or_else(|| unexpected("Decimal", raw))
}

pub fn to_float(raw: &Value) -> Result<Datum> {
    match raw {
        Value::Null => Ok(Datum::Nil),
        Value::Number(n) => n
            .as_f64()
            .map(Datum::Float)
            .ok_or_else(|| unexpected("Float", raw)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Datum::Float)
            .map_err(|_| unexpected("Float", raw)),
        _ => Err(unexpected("Float", raw)),
    }
}

/// Truthiness: only null and false are false.
pub fn to_boolean(raw: &Value) -> Result<Datum> {
    Ok(Datum::Boolean(!matches!(raw, Value::Null | Value::Bool(false))))
}

pub fn pass_through(raw: &Value) -> Result<Datum> {
    Ok(match raw {
        Value::Null => Datum::Nil,
        other => Datum::Json(other.clone()),
    })
}

/// Objects become records. Anything else passes through untouched so the
/// validator reports the mismatch against the declared type.
pub fn to_record(raw: &Value) -> Result<Datum> {
    Ok(match raw {
        Value::Object(map) => Datum::Record(map.clone()),
        other => pass_through(other)?,
    })
}

/// Arrays become lists of pass-through elements. Anything else passes
/// through untouched so the validator reports the mismatch.
pub fn to_list(raw: &Value) -> Result<Datum> {
    Ok(match raw {
        Value::Array(items) => Datum::List(items.iter().cloned().map(Datum::Json).collect()),
        other => pass_through(other)?,
    })
}

pub fn parse_date(s: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
}

pub fn parse_datetime(s: &str, formats: &[String]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
}

pub fn date_parser(formats: Vec<String>) -> Coercion {
    Coercion::value(move |raw| match raw {
        Value::Null => Ok(Datum::Nil),
        Value::String(s) => parse_date(s.trim(), &formats)
            .map(Datum::Date)
            .ok_or_else(|| unexpected("Date", raw)),
        _ => Err(unexpected("Date", raw)),
    })
}

pub fn datetime_parser(formats: Vec<String>) -> Coercion {
    Coercion::value(move |raw| match raw {
        Value::Null => Ok(Datum::Nil),
        Value::String(s) => parse_datetime(s.trim(), &formats)
            .map(Datum::DateTime)
            .ok_or_else(|| unexpected("DateTime", raw)),
        _ => Err(unexpected("DateTime", raw)),
    })
}
