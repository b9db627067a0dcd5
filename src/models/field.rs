use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Sentinel written wherever a value could not be extracted
pub const UNKNOWN: &str = "N/A";

/// A listing value that is either known or explicitly unknown.
///
/// Unknown values serialize as [`UNKNOWN`] so every key stays present in the
/// exported data, and the sentinel reads back as `Unknown` when loading a
/// checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Known(T),
    Unknown,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unknown
    }
}

impl<T> Field<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Field::Known(_))
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Unknown, Field::Known)
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Known(value) => value.fmt(f),
            Field::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Known(value) => value.serialize(serializer),
            Field::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

/// Only deserializes from the exact sentinel string
struct Sentinel;

impl<'de> Deserialize<'de> for Sentinel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == UNKNOWN {
            Ok(Sentinel)
        } else {
            Err(de::Error::custom("not the unknown sentinel"))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr<T> {
    Sentinel(Sentinel),
    Known(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Repr::<T>::deserialize(deserializer)? {
            Repr::Sentinel(Sentinel) => Ok(Field::Unknown),
            Repr::Known(value) => Ok(Field::Known(value)),
        }
    }
}
