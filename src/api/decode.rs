//! Turns decoded JSON payloads into typed values.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt::Display;

use crate::error::DeserializationError;

/// A JSON object, the shape every converter receives.
pub type JsonMap = Map<String, Value>;

/// Step applied to every payload before conversion, for APIs that wrap
/// their results (e.g. `{"data": {...}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Unwrap {
  /// Use the payload as-is
  #[default]
  Identity,
  /// Descend through these object fields in order
  Path(Vec<String>),
}

impl Unwrap {
  /// Build from a dotted path such as `data.items`. Empty means identity.
  pub fn path(dotted: &str) -> Self {
    let segments: Vec<String> = dotted
      .split('.')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from)
      .collect();

    if segments.is_empty() {
      Self::Identity
    } else {
      Self::Path(segments)
    }
  }

  pub fn apply(&self, payload: Value) -> Result<Value, DeserializationError> {
    let segments = match self {
      Self::Identity => return Ok(payload),
      Self::Path(segments) => segments,
    };

    let mut current = payload;
    for segment in segments {
      current = match current {
        Value::Object(mut map) => map.remove(segment).ok_or_else(|| {
          DeserializationError::new(format!("missing field '{}' in response", segment))
        })?,
        other => {
          return Err(DeserializationError::new(format!(
            "expected an object containing '{}', found {}",
            segment,
            kind(&other)
          )))
        }
      };
    }
    Ok(current)
  }
}

/// Parse a raw response body as JSON.
pub fn parse_body(body: &str) -> Result<Value, DeserializationError> {
  serde_json::from_str(body)
    .map_err(|e| DeserializationError::new(format!("invalid JSON: {}", e)))
}

/// Convert an unwrapped object into a single value.
pub fn to_one<T, F, E>(payload: Value, unwrap: &Unwrap, convert: F) -> Result<T, DeserializationError>
where
  F: Fn(&JsonMap) -> Result<T, E>,
  E: Display,
{
  match unwrap.apply(payload)? {
    Value::Object(map) => convert(&map).map_err(|e| DeserializationError::new(e.to_string())),
    other => Err(DeserializationError::new(format!(
      "expected an object, found {}",
      kind(&other)
    ))),
  }
}

/// Convert an unwrapped array of objects, preserving order.
pub fn to_many<T, F, E>(
  payload: Value,
  unwrap: &Unwrap,
  convert: F,
) -> Result<Vec<T>, DeserializationError>
where
  F: Fn(&JsonMap) -> Result<T, E>,
  E: Display,
{
  let items = match unwrap.apply(payload)? {
    Value::Array(items) => items,
    other => {
      return Err(DeserializationError::new(format!(
        "expected an array, found {}",
        kind(&other)
      )))
    }
  };

  items
    .into_iter()
    .enumerate()
    .map(|(index, item)| match item {
      Value::Object(map) => convert(&map)
        .map_err(|e| DeserializationError::new(format!("item {}: {}", index, e))),
      other => Err(DeserializationError::new(format!(
        "item {}: expected an object, found {}",
        index,
        kind(&other)
      ))),
    })
    .collect()
}

/// Converter for any serde-deserializable type.
pub fn from_serde<T: DeserializeOwned>(map: &JsonMap) -> Result<T, serde_json::Error> {
  serde_json::from_value(Value::Object(map.clone()))
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
