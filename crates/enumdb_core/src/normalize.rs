//! Lookup key normalization.
//!
//! Callers hand the resolver keys of mixed types: raw ids, strings,
//! symbol-like identifiers, nil, or tuples for multi-attribute
//! enumerations. This module turns them into the exact representation the
//! indexes are keyed by.
//!
//! - Integers route to the id index unchanged
//! - Strings and symbols become their string form with no case folding
//! - Tuples become an ordered list of atoms (a prefix of the enumerator)
//! - Anything else (floats, booleans, nested tuples) is rejected
//!
//! [`safe_alias`] derives the format-insensitive alias some enumerations
//! index in addition to the literal value.

use enumdb_store::{RecordId, Value};
use std::fmt;

/// A symbol-like identifier (e.g. `:red`).
///
/// Symbols resolve exactly like their string form; they exist so callers
/// can distinguish identifiers from free text in their own APIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the symbol's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// A lookup key as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// No key.
    Nil,
    /// Record id.
    Id(RecordId),
    /// Enumerator value as text.
    Text(String),
    /// Enumerator value as a symbol.
    Symbol(Symbol),
    /// Leading enumerator components of a multi-attribute enumeration.
    Tuple(Vec<Key>),
}

impl Key {
    /// Creates a symbol key.
    pub fn symbol(name: impl Into<String>) -> Self {
        Key::Symbol(Symbol::new(name))
    }

    /// Whether this is the nil key.
    pub fn is_nil(&self) -> bool {
        matches!(self, Key::Nil)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Nil => f.write_str("nil"),
            Key::Id(id) => write!(f, "{id}"),
            Key::Text(s) => write!(f, "{s:?}"),
            Key::Symbol(s) => write!(f, "{s}"),
            Key::Tuple(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A value of a type that can't be used as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTypeError {
    /// Description of the offending type.
    pub type_name: String,
}

impl KeyTypeError {
    /// Creates a key type error.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for KeyTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported key type: {}", self.type_name)
    }
}

impl std::error::Error for KeyTypeError {}

/// Conversion into a lookup [`Key`].
///
/// Implemented for every type the resolver accepts. Floating point
/// numbers implement it too and always fail, so a mistyped key is reported
/// as an invalid key type rather than silently coerced.
pub trait IntoKey {
    /// Converts `self` into a key.
    ///
    /// # Errors
    ///
    /// Returns `KeyTypeError` if the value can't identify a record.
    fn into_key(self) -> Result<Key, KeyTypeError>;
}

impl IntoKey for Key {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(self)
    }
}

impl IntoKey for &Key {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(self.clone())
    }
}

impl IntoKey for i64 {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(Key::Id(self))
    }
}

impl IntoKey for i32 {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(Key::Id(i64::from(self)))
    }
}

impl IntoKey for u32 {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(Key::Id(i64::from(self)))
    }
}

impl IntoKey for u64 {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        i64::try_from(self)
            .map(Key::Id)
            .map_err(|_| KeyTypeError::new("out-of-range integer"))
    }
}

impl IntoKey for usize {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        i64::try_from(self)
            .map(Key::Id)
            .map_err(|_| KeyTypeError::new("out-of-range integer"))
    }
}

impl IntoKey for f64 {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Err(KeyTypeError::new("float"))
    }
}

impl IntoKey for f32 {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Err(KeyTypeError::new("float"))
    }
}

impl IntoKey for bool {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Err(KeyTypeError::new("bool"))
    }
}

impl IntoKey for &str {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(Key::Text(self.to_string()))
    }
}

impl IntoKey for String {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(Key::Text(self))
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(Key::Text(self.clone()))
    }
}

impl IntoKey for Symbol {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        Ok(Key::Symbol(self))
    }
}

impl<T: IntoKey> IntoKey for Option<T> {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        match self {
            Some(inner) => inner.into_key(),
            None => Ok(Key::Nil),
        }
    }
}

impl<T: IntoKey> IntoKey for Vec<T> {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        self.into_iter()
            .map(IntoKey::into_key)
            .collect::<Result<Vec<_>, _>>()
            .map(Key::Tuple)
    }
}

impl<T: IntoKey, const N: usize> IntoKey for [T; N] {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        self.into_iter()
            .map(IntoKey::into_key)
            .collect::<Result<Vec<_>, _>>()
            .map(Key::Tuple)
    }
}

impl<T: IntoKey + Clone> IntoKey for &[T] {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        self.to_vec().into_key()
    }
}

impl IntoKey for &Value {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        match self {
            Value::Null => Ok(Key::Nil),
            Value::Integer(n) => Ok(Key::Id(*n)),
            Value::Text(s) => Ok(Key::Text(s.clone())),
            Value::List(items) => items.iter().map(IntoKey::into_key).collect::<Result<Vec<_>, _>>().map(Key::Tuple),
            Value::Bool(_) | Value::Float(_) => Err(KeyTypeError::new(self.type_name())),
        }
    }
}

impl IntoKey for Value {
    fn into_key(self) -> Result<Key, KeyTypeError> {
        (&self).into_key()
    }
}

/// An indexable scalar: one normalized attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Atom {
    /// Integer value.
    Int(i64),
    /// Text value.
    Str(String),
    /// Boolean value.
    Bool(bool),
}

impl Atom {
    /// Normalizes an attribute value. Null, floats and lists aren't indexable.
    pub fn from_value(value: &Value) -> Option<Atom> {
        match value {
            Value::Integer(n) => Some(Atom::Int(*n)),
            Value::Text(s) => Some(Atom::Str(s.clone())),
            Value::Bool(b) => Some(Atom::Bool(*b)),
            Value::Null | Value::Float(_) | Value::List(_) => None,
        }
    }

    /// Returns the text form if this is a string atom.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Int(n) => write!(f, "{n}"),
            Atom::Str(s) => write!(f, "{s:?}"),
            Atom::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A normalized lookup, ready to be dispatched to an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The nil key; matches nothing.
    Nil,
    /// Lookup in the id index.
    Id(RecordId),
    /// Lookup by the leading enumerator components.
    Enumerator(Vec<Atom>),
}

/// Canonicalizes lookup keys for one enumeration.
#[derive(Debug, Clone, Copy)]
pub struct KeyNormalizer {
    arity: usize,
}

impl KeyNormalizer {
    /// Creates a normalizer for an enumerator with `arity` attributes.
    pub fn new(arity: usize) -> Self {
        Self {
            arity: arity.max(1),
        }
    }

    /// Number of enumerator attributes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Normalizes a resolver key.
    ///
    /// # Errors
    ///
    /// Returns `KeyTypeError` for tuples on single-attribute enumerations,
    /// empty or over-long tuples, and tuples with nil or nested components.
    pub fn normalize(&self, key: &Key) -> Result<Lookup, KeyTypeError> {
        match key {
            Key::Nil => Ok(Lookup::Nil),
            Key::Id(id) => Ok(Lookup::Id(*id)),
            Key::Text(s) => Ok(Lookup::Enumerator(vec![Atom::Str(s.clone())])),
            Key::Symbol(s) => Ok(Lookup::Enumerator(vec![Atom::Str(s.as_str().to_string())])),
            Key::Tuple(items) => {
                if self.arity == 1 {
                    return Err(KeyTypeError::new("tuple"));
                }
                if items.is_empty() || items.len() > self.arity {
                    return Err(KeyTypeError::new(format!(
                        "tuple of {} components (expected 1..={})",
                        items.len(),
                        self.arity
                    )));
                }
                items
                    .iter()
                    .map(|item| {
                        Self::atom(item)?.ok_or_else(|| KeyTypeError::new("tuple with nil component"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Lookup::Enumerator)
            }
        }
    }

    /// Normalizes a key for a single-attribute index.
    ///
    /// Returns `None` for the nil key.
    ///
    /// # Errors
    ///
    /// Returns `KeyTypeError` for tuples.
    pub fn atom(key: &Key) -> Result<Option<Atom>, KeyTypeError> {
        match key {
            Key::Nil => Ok(None),
            Key::Id(id) => Ok(Some(Atom::Int(*id))),
            Key::Text(s) => Ok(Some(Atom::Str(s.clone()))),
            Key::Symbol(s) => Ok(Some(Atom::Str(s.as_str().to_string()))),
            Key::Tuple(_) => Err(KeyTypeError::new("nested tuple")),
        }
    }
}

/// Derives the format-insensitive alias of an enumerator value.
///
/// The value is lowercased, every run of non-alphanumeric characters
/// becomes a single `_`, and leading or trailing `_` are trimmed.
///
/// ```rust
/// assert_eq!(enumdb_core::safe_alias("Hot-Red!"), "hot_red");
/// ```
pub fn safe_alias(value: &str) -> String {
    let mut alias = String::with_capacity(value.len());
    let mut pending_separator = false;

    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !alias.is_empty() {
                alias.push('_');
            }
            pending_separator = false;
            alias.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    alias
}
