/// Ontology data model
///
/// An ontology is an immutable, named, versioned bundle of extractor and
/// constraint definitions driving one verification profile. Documents are
/// deserialized once, validated structurally by serde (the four keys
/// `name, version, constraints, extractors` are required), and finalized:
/// computed-field formulas are dependency-ordered at load so derivation is
/// a single pass at request time.

pub mod builtin;
pub mod store;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::facts::Value;
use crate::formula::Formula;

/// A named, versioned verification profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ontology {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Evaluated in order; violations are reported in this order.
    pub constraints: Vec<Constraint>,
    /// Field name -> extractor spec. Iteration order is extraction order.
    pub extractors: IndexMap<String, Extractor>,
    /// Dependency-resolved evaluation order for computed fields.
    /// Cyclic fields are excluded and settle to their default.
    #[serde(skip)]
    computed_order: Vec<String>,
}

impl Ontology {
    /// Deserialize and finalize an ontology document.
    pub fn from_value(raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut ontology: Ontology = serde_json::from_value(raw)?;
        ontology.resolve_computed_order();
        Ok(ontology)
    }

    pub fn computed_order(&self) -> &[String] {
        &self.computed_order
    }

    /// Kahn-style settlement over the computed fields. A field is ready
    /// when every computed field its formula references is already ordered
    /// (references to non-computed fields never block; the formula just
    /// sees whatever extraction produced).
    fn resolve_computed_order(&mut self) {
        let computed_names: HashSet<&str> = self
            .extractors
            .iter()
            .filter(|(_, e)| e.is_computed())
            .map(|(name, _)| name.as_str())
            .collect();

        let deps: IndexMap<&str, HashSet<String>> = self
            .extractors
            .iter()
            .filter_map(|(name, e)| match e {
                Extractor::Computed { formula, .. } => {
                    let mut field_deps = formula
                        .as_ref()
                        .map(|f| f.dependencies())
                        .unwrap_or_default();
                    field_deps.retain(|d| computed_names.contains(d.as_str()) && d != name);
                    Some((name.as_str(), field_deps))
                }
                _ => None,
            })
            .collect();

        let mut order: Vec<String> = Vec::with_capacity(deps.len());
        let mut settled: HashSet<&str> = HashSet::new();
        loop {
            let mut progressed = false;
            for (name, field_deps) in &deps {
                if settled.contains(name) {
                    continue;
                }
                if field_deps.iter().all(|d| settled.contains(d.as_str())) {
                    order.push(name.to_string());
                    settled.insert(*name);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        for name in deps.keys() {
            if !settled.contains(name) {
                tracing::warn!(
                    ontology = %self.name,
                    field = %name,
                    "computed field participates in a dependency cycle; its default will be used"
                );
            }
        }

        self.computed_order = order;
    }
}

/// One constraint: a named predicate with a citation. The machine-evaluable
/// `formula` uses the formula DSL; `formula_readable` is documentary only.
/// A constraint with no formula is trivially satisfied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub formula_readable: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    pub error_message: String,
    pub citation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
}

/// A variable the constraint reads, with its declared logical type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Closed set of extractor kinds, tagged by the document's `type` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Extractor {
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keywords: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        negation_words: Vec<String>,
        #[serde(default = "default_check_negation")]
        check_negation: bool,
    },
    Int {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Money {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Percentage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keywords: Vec<String>,
    },
    Datetime {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keywords: Vec<String>,
    },
    List {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default)]
        item_type: ItemType,
        /// Accepted for document compatibility; item boundaries come from
        /// the pattern's per-item matches, not a split.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keywords: Vec<String>,
    },
    Enum {
        choices: IndexMap<String, KeywordSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Computed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        formula: Option<Formula>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
        /// Documentary; dependency discovery walks the formula instead.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        depends_on: Vec<String>,
    },
}

fn default_check_negation() -> bool {
    true
}

impl Extractor {
    pub fn is_computed(&self) -> bool {
        matches!(self, Extractor::Computed { .. })
    }

    /// The configured regex pattern, for any kind that carries one.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Extractor::Boolean { pattern, .. }
            | Extractor::Int { pattern }
            | Extractor::Float { pattern }
            | Extractor::Money { pattern }
            | Extractor::Percentage { pattern }
            | Extractor::String { pattern }
            | Extractor::Date { pattern, .. }
            | Extractor::Datetime { pattern, .. }
            | Extractor::List { pattern, .. } => pattern.as_deref(),
            Extractor::Computed { .. } | Extractor::Enum { .. } => None,
        }
    }

    /// Wire name of the extractor kind, matching the document `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Extractor::Boolean { .. } => "boolean",
            Extractor::Int { .. } => "int",
            Extractor::Float { .. } => "float",
            Extractor::Money { .. } => "money",
            Extractor::Percentage { .. } => "percentage",
            Extractor::String { .. } => "string",
            Extractor::Date { .. } => "date",
            Extractor::Datetime { .. } => "datetime",
            Extractor::List { .. } => "list",
            Extractor::Enum { .. } => "enum",
            Extractor::Computed { .. } => "computed",
        }
    }
}

/// Item type for list extractors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    String,
    Int,
    Float,
}

/// A single keyword or a list of keywords, as enum choices allow both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordSpec {
    One(String),
    Many(Vec<String>),
}

impl KeywordSpec {
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        match self {
            KeywordSpec::One(kw) => std::slice::from_ref(kw).iter(),
            KeywordSpec::Many(kws) => kws.iter(),
        }
    }
}
