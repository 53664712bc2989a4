//! Payload - the ordered sequence of values threaded between steps

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable, cheaply cloneable sequence of values
///
/// Every operation receives one as its input and every [`Outcome`](crate::core::Outcome)
/// carries one as its output. Cloning a payload hands the same allocation forward,
/// so [`Payload::ptr_eq`] can tell whether a step passed its input through untouched.
#[derive(Clone, PartialEq)]
pub struct Payload(Arc<[Value]>);

impl Payload {
    /// Create a payload from a list of values
    pub fn new(values: Vec<Value>) -> Self {
        Self(values.into())
    }

    /// An empty payload
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A payload holding exactly one value
    pub fn single(value: Value) -> Self {
        Self::new(vec![value])
    }

    /// Whether both payloads share the same allocation
    pub fn ptr_eq(a: &Payload, b: &Payload) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// View as a slice
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// String value at `index`, if there is one
    pub fn str_at(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(Value::as_str)
    }

    /// Path value at `index`, if the value there is a string
    pub fn path_at(&self, index: usize) -> Option<&Path> {
        self.str_at(index).map(Path::new)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Payload {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl From<Vec<Value>> for Payload {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for Payload {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Payload {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for value in self.0.iter() {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Value>::deserialize(deserializer).map(Payload::new)
    }
}

/// Normalization of whatever an operation returns into a [`Payload`]
///
/// Sequences (`Vec<Value>`, `Payload`) are used as they are. Everything else,
/// including a `Value::Array`, is one value and gets wrapped in a one-element
/// payload. Streams, iterators and generators have no implementation on purpose:
/// an operation cannot hand back something that still has to be driven.
pub trait IntoPayload {
    fn into_payload(self) -> Payload;
}

impl IntoPayload for Payload {
    fn into_payload(self) -> Payload {
        self
    }
}

impl IntoPayload for Vec<Value> {
    fn into_payload(self) -> Payload {
        Payload::new(self)
    }
}

impl IntoPayload for Value {
    fn into_payload(self) -> Payload {
        Payload::single(self)
    }
}

impl IntoPayload for () {
    fn into_payload(self) -> Payload {
        Payload::single(Value::Null)
    }
}

impl IntoPayload for PathBuf {
    fn into_payload(self) -> Payload {
        Payload::single(Value::from(self.to_string_lossy().into_owned()))
    }
}

macro_rules! single_value_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoPayload for $ty {
                fn into_payload(self) -> Payload {
                    Payload::single(Value::from(self))
                }
            }
        )*
    };
}

single_value_payload!(bool, i32, i64, u32, u64, f64, String, &str);
