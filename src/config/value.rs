//! Loosely-typed configuration values.
//!
//! Values read from `dcos.toml` or the environment are dynamically typed.
//! Every accessor on top of the store performs its own coercion through the
//! helpers here, which never fail: a value of the wrong shape degrades to the
//! zero value of the requested type.

use std::fmt;

/// A scalar configuration value. Absence is represented by `Option::None`
/// at the store boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    /// Converts a TOML value into a scalar. Arrays and tables have no
    /// scalar meaning and are treated as absent.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(Value::String(s.clone())),
            toml::Value::Integer(i) => Some(Value::Integer(*i)),
            toml::Value::Float(f) => Some(Value::Float(*f)),
            toml::Value::Boolean(b) => Some(Value::Boolean(*b)),
            toml::Value::Datetime(dt) => Some(Value::String(dt.to_string())),
            toml::Value::Array(_) | toml::Value::Table(_) => None,
        }
    }

    /// Converts the value into its TOML representation.
    pub fn to_toml(&self) -> toml::Value {
        match self {
            Value::String(s) => toml::Value::String(s.clone()),
            Value::Integer(i) => toml::Value::Integer(*i),
            Value::Float(f) => toml::Value::Float(*f),
            Value::Boolean(b) => toml::Value::Boolean(*b),
        }
    }

    /// Coerces the value to a string. Floats use their shortest
    /// representation, so `90.0` becomes `"90"`.
    pub fn to_string_lossy(&self) -> String {
        self.to_string()
    }

    /// Coerces the value to an integer, returning zero when the value has
    /// no integer meaning.
    ///
    /// Strings accept an optional sign and the `0x`, `0o` and `0b` radix
    /// prefixes. Floats are truncated toward zero. Booleans map to 0 and 1.
    pub fn to_i64(&self) -> i64 {
        match self {
            Value::Integer(i) => *i,
            Value::Float(f) if f.is_finite() => f.trunc() as i64,
            Value::Float(_) => 0,
            Value::Boolean(b) => i64::from(*b),
            Value::String(s) => parse_int(s.trim()).unwrap_or(0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// Coerces an optional value to a string; absent values become `""`.
pub fn to_string(value: Option<&Value>) -> String {
    value.map(Value::to_string_lossy).unwrap_or_default()
}

/// Coerces an optional value to an integer; absent values become `0`.
pub fn to_i64(value: Option<&Value>) -> i64 {
    value.map(Value::to_i64).unwrap_or(0)
}

fn parse_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, lower.as_str())
    };

    // from_str_radix accepts its own sign, which must not follow ours
    if body.is_empty() || body.starts_with(&['+', '-'][..]) {
        return None;
    }

    let magnitude = i128::from_str_radix(body, radix).ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}
