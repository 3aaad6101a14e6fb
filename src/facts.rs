/// Fact data model: the typed values the extraction pipeline produces
///
/// A `Value` is a tagged sum over the JSON scalars plus lists. Money and
/// percentage extractions normalize to `Float`; dates and datetimes
/// normalize to ISO strings. `Null` exists only as a formula-evaluation
/// result; extraction never inserts it into `Facts` (missing facts are
/// simply absent).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single typed fact value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Numeric view: ints and floats only. Booleans and strings are not
    /// numbers for formula purposes.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Truthiness mirrors the formula DSL: zero, empty string, empty list
    /// and null are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// A fact annotated with how it was produced. Only present when the caller
/// requested confidence scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRecord {
    pub value: Value,
    /// Confidence in [0, 1]; derived and computed facts carry 1.0
    pub confidence: f64,
    /// The matched text slice (or keyword, or "computed")
    pub source: String,
    pub extractor_type: String,
}

/// A named fact: either a raw value or a full extraction record.
/// The extraction API selects one mode per call, never a mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fact {
    Value(Value),
    Record(ExtractionRecord),
}

impl Fact {
    pub fn value(&self) -> &Value {
        match self {
            Fact::Value(v) => v,
            Fact::Record(r) => &r.value,
        }
    }
}

/// Ordered map of field name to fact. Insertion order is contractual:
/// ontology extractors first (in ontology order), then built-in
/// derivations, then computed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Facts {
    entries: IndexMap<String, Fact>,
}

impl Facts {
    pub fn new() -> Self {
        Facts::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, fact: Fact) {
        self.entries.insert(name.into(), fact);
    }

    pub fn get(&self, name: &str) -> Option<&Fact> {
        self.entries.get(name)
    }

    /// The raw value for a field, regardless of confidence mode.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(Fact::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Fact)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}
