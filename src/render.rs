//! Human readable forms of instances and values.
//!
//! Rendering an instance lists only the attributes that are already memoized
//! and not nil; it never triggers evaluation. Each instance counts how many
//! times it is currently being rendered, so an instance met again further
//! down the stack (`A -> B -> A`) is written as `#<Name ...>` instead of
//! being entered again.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::datatype::Datum;
use crate::mapped::Mapped;

struct RenderGuard<'a>(&'a AtomicUsize);

impl<'a> RenderGuard<'a> {
    // returns the guard and whether this instance was already on the stack
    fn enter(counter: &'a AtomicUsize) -> (Self, bool) {
        let previous = counter.fetch_add(1, Ordering::SeqCst);
        (RenderGuard(counter), previous > 0)
    }
}
impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Mapped {
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Mapped {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (_guard, reentered) = RenderGuard::enter(&self.rendering);
        if reentered {
            return write!(
                f,
                "#<{} {}>",
                self.model().name(),
                self.model().settings().truncation_marker
            );
        }
        write!(f, "#<{}", self.model().name())?;
        for (name, value) in self.memoized() {
            write!(f, " {}={}", name, value)?;
        }
        write!(f, ">")
    }
}

impl fmt::Debug for Mapped {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Datum::Nil => write!(f, "nil"),
            Datum::String(s) => write!(f, "{:?}", s),
            Datum::Integer(i) => write!(f, "{}", i),
            Datum::Decimal(d) => write!(f, "{}", d),
            Datum::Float(x) => write!(f, "{:?}", x),
            Datum::Boolean(b) => write!(f, "{}", b),
            Datum::Date(d) => write!(f, "{}", d),
            Datum::DateTime(d) => write!(f, "{}", d),
            Datum::Record(r) => write!(f, "{}", serde_json::Value::Object(r.clone())),
            Datum::Json(v) => write!(f, "{}", v),
            Datum::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Datum::Model(mapped) => write!(f, "{}", mapped),
        }
    }
}
