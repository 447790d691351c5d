//! Parsed command arguments.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CommandError;

/// Flat mapping from destination name to parsed value.
///
/// Arguments the user did not pass carry their default, which is
/// [`Value::Null`] when none was configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(BTreeMap<String, Value>);

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Deserialize an argument into `T`.
    ///
    /// Use `Option<T>` for arguments that may be left unset.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, CommandError> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| CommandError::argument(name, "not present in parsed arguments"))?;
        serde_json::from_value(value.clone())
            .map_err(|e| CommandError::argument(name, e.to_string()))
    }

    /// Like [`Kwargs::get`] but falls back when the value is absent or null.
    pub fn get_or<T: DeserializeOwned>(&self, name: &str, fallback: T) -> Result<T, CommandError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(fallback),
            Some(_) => self.get(name),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

impl fmt::Display for Kwargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
