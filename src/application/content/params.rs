use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// Scalar value bound to a `$name` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    String(String),
    Integer(i64),
}

impl ParamValue {
    /// JSON encoding sent on the wire.
    pub fn to_json(&self) -> String {
        match self {
            ParamValue::String(value) => Value::from(value.as_str()).to_string(),
            ParamValue::Integer(value) => Value::from(*value).to_string(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

/// Named query parameters, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Stable textual form used in cache keys. Equal parameter sets produce
    /// equal strings regardless of insertion order.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("&")?;
            }
            write!(f, "${name}={}", value.to_json())?;
        }
        Ok(())
    }
}

/// Parse a `name=value` pair from the command line. Values that parse as
/// integers are bound as integers; everything else is a string.
pub fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `name=value`, got `{raw}`"))?;
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(format!("parameter name is empty in `{raw}`"));
    }
    let value = match value.parse::<i64>() {
        Ok(number) => ParamValue::Integer(number),
        Err(_) => ParamValue::String(value.to_string()),
    };
    Ok((name.to_string(), value))
}
