use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

/// Numbers are unsigned 64-bit with wrapping arithmetic; `print` displays
/// them reinterpreted as signed, so `0 - 2` renders `-2`.
pub type Number = u64;

/// Seed data for one render: variable name to user value.
pub type UserMap = FxHashMap<String, UserValue>;

/// A dynamic value on the evaluation stack. Accessors follow the
/// coerce-or-default policy: a tag mismatch yields the supplied fallback
/// instead of failing the render.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(Number),
    Str(String),
}

impl Value {
    pub fn bool_or(&self, alt: bool) -> bool {
        match self {
            Value::Bool(b) => *b,
            _ => alt,
        }
    }

    pub fn number_or(&self, alt: Number) -> Number {
        match self {
            Value::Number(n) => *n,
            _ => alt,
        }
    }

    pub fn string_or(&self, alt: &str) -> String {
        match self {
            Value::Str(s) => s.clone(),
            _ => alt.to_string(),
        }
    }

    /// Display form used by `print`.
    pub fn render(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => (*n as i64).to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    /// Tag name for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }
}

/// The richer union held in the environment. Scalars project to [`Value`]
/// on lookup; collections are projected element- or entry-wise during loop
/// binding and indexed access. Maps are ordered so `for key, value in map`
/// visits keys deterministically.
#[derive(Debug, Clone, PartialEq)]
pub enum UserValue {
    Number(Number),
    Str(String),
    NumberList(Vec<Number>),
    StrList(Vec<String>),
    NumberMap(BTreeMap<String, Number>),
    StrMap(BTreeMap<String, String>),
}

impl UserValue {
    /// Element count for collections; scalars have no iterable length.
    pub fn len(&self) -> usize {
        match self {
            UserValue::Number(_) | UserValue::Str(_) => 0,
            UserValue::NumberList(v) => v.len(),
            UserValue::StrList(v) => v.len(),
            UserValue::NumberMap(m) => m.len(),
            UserValue::StrMap(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_list(&self) -> bool {
        matches!(self, UserValue::NumberList(_) | UserValue::StrList(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, UserValue::NumberMap(_) | UserValue::StrMap(_))
    }

    pub fn scalar(&self) -> Option<Value> {
        match self {
            UserValue::Number(n) => Some(Value::Number(*n)),
            UserValue::Str(s) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }

    pub fn element(&self, index: usize) -> Option<Value> {
        match self {
            UserValue::NumberList(v) => v.get(index).map(|n| Value::Number(*n)),
            UserValue::StrList(v) => v.get(index).map(|s| Value::Str(s.clone())),
            _ => None,
        }
    }

    pub fn entry(&self, key: &str) -> Option<Value> {
        match self {
            UserValue::NumberMap(m) => m.get(key).map(|n| Value::Number(*n)),
            UserValue::StrMap(m) => m.get(key).map(|s| Value::Str(s.clone())),
            _ => None,
        }
    }

    /// The `index`-th entry of a map in key order.
    pub fn entry_at(&self, index: usize) -> Option<(String, Value)> {
        match self {
            UserValue::NumberMap(m) => m
                .iter()
                .nth(index)
                .map(|(k, v)| (k.clone(), Value::Number(*v))),
            UserValue::StrMap(m) => m
                .iter()
                .nth(index)
                .map(|(k, v)| (k.clone(), Value::Str(v.clone()))),
            _ => None,
        }
    }
}

impl From<Number> for UserValue {
    fn from(n: Number) -> Self {
        UserValue::Number(n)
    }
}

impl From<i64> for UserValue {
    fn from(n: i64) -> Self {
        UserValue::Number(n as Number)
    }
}

impl From<&str> for UserValue {
    fn from(s: &str) -> Self {
        UserValue::Str(s.to_string())
    }
}

impl From<String> for UserValue {
    fn from(s: String) -> Self {
        UserValue::Str(s)
    }
}

impl From<Vec<Number>> for UserValue {
    fn from(v: Vec<Number>) -> Self {
        UserValue::NumberList(v)
    }
}

impl From<Vec<String>> for UserValue {
    fn from(v: Vec<String>) -> Self {
        UserValue::StrList(v)
    }
}

impl From<Vec<&str>> for UserValue {
    fn from(v: Vec<&str>) -> Self {
        UserValue::StrList(v.into_iter().map(str::to_string).collect())
    }
}

impl From<BTreeMap<String, Number>> for UserValue {
    fn from(m: BTreeMap<String, Number>) -> Self {
        UserValue::NumberMap(m)
    }
}

impl From<BTreeMap<String, String>> for UserValue {
    fn from(m: BTreeMap<String, String>) -> Self {
        UserValue::StrMap(m)
    }
}
