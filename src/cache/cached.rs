//! The cache miss marker.
//!
//! [`Cached::Miss`] stands for "no cached value" and is distinct from every
//! stored value, falsy ones included: `Hit(0)`, `Hit("")`, `Hit(null)` and
//! `Hit([])` are all hits. There is no boolean or integer view of a
//! `Cached`, no `Default`, and no `Deref`; anything that reads through a miss
//! fails with [`MisuseError`].

use std::fmt;

use serde_json::Value;

use super::error::MisuseError;

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use = "a cache read may be a miss; check `is_miss()`"]
pub enum Cached<T> {
    Hit(T),
    Miss,
}

impl<T> Cached<T> {
    pub const MISS: Self = Self::Miss;

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    pub fn hit(&self) -> Option<&T> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss => None,
        }
    }

    /// Borrow the cached value, failing on a miss.
    pub fn value(&self) -> Result<&T, MisuseError> {
        self.hit().ok_or(MisuseError)
    }

    /// Take the cached value, failing on a miss.
    pub fn into_value(self) -> Result<T, MisuseError> {
        self.into_option().ok_or(MisuseError)
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }

    pub fn unwrap_or_else(self, default: impl FnOnce() -> T) -> T {
        self.into_option().unwrap_or_else(default)
    }

    pub fn as_ref(&self) -> Cached<&T> {
        match self {
            Self::Hit(value) => Cached::Hit(value),
            Self::Miss => Cached::Miss,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Cached<U> {
        match self {
            Self::Hit(value) => Cached::Hit(f(value)),
            Self::Miss => Cached::Miss,
        }
    }
}

impl<T> From<Option<T>> for Cached<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Hit(value),
            None => Self::Miss,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Cached<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit(value) => write!(f, "{value}"),
            Self::Miss => f.write_str("CACHE_MISS"),
        }
    }
}

/// Structural access to JSON payloads. Each accessor fails on a miss instead
/// of behaving like an empty container.
impl Cached<Value> {
    /// Element `index` of an array hit.
    pub fn index(&self, index: usize) -> Result<Option<&Value>, MisuseError> {
        Ok(self.value()?.get(index))
    }

    /// Field `name` of an object hit.
    pub fn field(&self, name: &str) -> Result<Option<&Value>, MisuseError> {
        Ok(self.value()?.get(name))
    }

    /// Array elements or object values of a hit. Scalars yield nothing.
    pub fn iter(&self) -> Result<Box<dyn Iterator<Item = &Value> + '_>, MisuseError> {
        let iter: Box<dyn Iterator<Item = &Value> + '_> = match self.value()? {
            Value::Array(items) => Box::new(items.iter()),
            Value::Object(map) => Box::new(map.values()),
            _ => Box::new(std::iter::empty()),
        };
        Ok(iter)
    }

    /// Membership test: array element, object key, or substring.
    pub fn contains(&self, needle: &Value) -> Result<bool, MisuseError> {
        let found = match (self.value()?, needle) {
            (Value::Array(items), needle) => items.contains(needle),
            (Value::Object(map), Value::String(key)) => map.contains_key(key),
            (Value::String(haystack), Value::String(part)) => haystack.contains(part.as_str()),
            _ => false,
        };
        Ok(found)
    }
}
