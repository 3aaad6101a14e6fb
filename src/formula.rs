/// Formula DSL: the expression language shared by computed extractors and
/// constraint predicates
///
/// A formula is JSON: a bare string is a field reference, any other scalar
/// or array is a literal, and a single-key object `{op: args}` is an
/// operator application. Documents are parsed once at ontology load into an
/// explicit AST; evaluation is a pure function of (AST, Facts).
///
/// Evaluation is three-valued: `None` means "could not compute" (missing
/// fact, null arithmetic, unknown operator) and is never itself a fact.

use std::collections::HashSet;
use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::facts::{Facts, Value};

/// The closed operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    CountTrue,
    CountFields,
    Sum,
    Any,
    All,
    Gt,
    Gte,
    Lt,
    Lte,
    Add,
    Mul,
    If,
    Not,
    And,
    Or,
}

impl Op {
    fn parse(name: &str) -> Option<Op> {
        match name {
            "count_true" => Some(Op::CountTrue),
            "count_fields" => Some(Op::CountFields),
            "sum" => Some(Op::Sum),
            "any" => Some(Op::Any),
            "all" => Some(Op::All),
            "gt" | ">" => Some(Op::Gt),
            "gte" | ">=" => Some(Op::Gte),
            "lt" | "<" => Some(Op::Lt),
            "lte" | "<=" => Some(Op::Lte),
            "add" | "+" => Some(Op::Add),
            "mul" | "*" => Some(Op::Mul),
            "if" => Some(Op::If),
            "not" => Some(Op::Not),
            "and" => Some(Op::And),
            "or" => Some(Op::Or),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Op::CountTrue => "count_true",
            Op::CountFields => "count_fields",
            Op::Sum => "sum",
            Op::Any => "any",
            Op::All => "all",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Add => "add",
            Op::Mul => "mul",
            Op::If => "if",
            Op::Not => "not",
            Op::And => "and",
            Op::Or => "or",
        }
    }

    /// Argument-count contract. Violations degrade the node to `Unknown`
    /// so evaluation fails soft instead of guessing.
    fn arity_ok(&self, n: usize) -> bool {
        match self {
            Op::Gt | Op::Gte | Op::Lt | Op::Lte => n == 2,
            Op::Add | Op::Mul => n >= 2,
            Op::If => n == 3,
            Op::Not => n == 1,
            _ => true,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed formula expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// JSON scalar or array used verbatim (null evaluates to null)
    Literal(Value),
    /// Bare string: a reference into `Facts`
    Field(String),
    /// `{op: [args...]}` with a recognized operator and valid arity
    Call(Op, Vec<Formula>),
    /// Anything else: unknown operator, bad arity, malformed node.
    /// Preserved verbatim so documents round-trip; evaluates to null.
    Unknown(Json),
}

impl Formula {
    pub fn from_json(raw: &Json) -> Formula {
        match raw {
            Json::String(s) => Formula::Field(s.clone()),
            Json::Object(map) if map.len() == 1 => {
                let (op_name, args) = map.iter().next().expect("len checked");
                match Op::parse(op_name) {
                    Some(op) => {
                        let parsed: Vec<Formula> = match args {
                            Json::Array(items) => items.iter().map(Formula::from_json).collect(),
                            single => vec![Formula::from_json(single)],
                        };
                        if op.arity_ok(parsed.len()) {
                            Formula::Call(op, parsed)
                        } else {
                            tracing::warn!(
                                op = op.name(),
                                args = parsed.len(),
                                "formula operator has wrong argument count"
                            );
                            Formula::Unknown(raw.clone())
                        }
                    }
                    None => {
                        tracing::warn!(op = %op_name, "unknown formula operator");
                        Formula::Unknown(raw.clone())
                    }
                }
            }
            Json::Object(_) => Formula::Unknown(raw.clone()),
            Json::Array(items) => {
                Formula::Literal(Value::List(items.iter().map(value_from_json).collect()))
            }
            scalar => Formula::Literal(value_from_json(scalar)),
        }
    }

    /// Field names referenced anywhere in the tree. Used for dependency
    /// ordering of computed fields; unknown nodes are walked syntactically
    /// so a half-valid formula still declares what it reads.
    pub fn dependencies(&self) -> HashSet<String> {
        let mut deps = HashSet::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies(&self, deps: &mut HashSet<String>) {
        match self {
            Formula::Field(name) => {
                deps.insert(name.clone());
            }
            Formula::Call(_, args) => {
                for arg in args {
                    arg.collect_dependencies(deps);
                }
            }
            Formula::Unknown(raw) => collect_json_strings(raw, deps),
            Formula::Literal(_) => {}
        }
    }

    /// Evaluate against a set of facts. `None` means the formula could not
    /// be computed; callers decide what that implies (defaults for computed
    /// fields, "satisfied" for constraint predicates).
    pub fn eval(&self, facts: &Facts) -> Option<Value> {
        match self {
            Formula::Literal(Value::Null) => None,
            Formula::Literal(v) => Some(v.clone()),
            Formula::Field(name) => facts.value_of(name).cloned(),
            Formula::Unknown(_) => None,
            Formula::Call(op, args) => eval_call(*op, args, facts),
        }
    }
}

fn eval_call(op: Op, args: &[Formula], facts: &Facts) -> Option<Value> {
    match op {
        Op::CountTrue => {
            let n = args
                .iter()
                .filter(|arg| match arg {
                    Formula::Field(name) => {
                        facts.value_of(name).map_or(false, Value::is_true)
                    }
                    _ => false,
                })
                .count();
            Some(Value::Int(n as i64))
        }

        Op::CountFields => {
            let n = args
                .iter()
                .filter(|arg| matches!(arg, Formula::Field(name) if facts.contains(name)))
                .count();
            Some(Value::Int(n as i64))
        }

        Op::Sum => {
            // Non-numeric and missing references contribute zero rather
            // than poisoning the total.
            let mut total = 0.0;
            let mut all_int = true;
            for arg in args {
                let contribution = match arg {
                    Formula::Field(name) => facts.value_of(name).cloned(),
                    Formula::Literal(v) => Some(v.clone()),
                    _ => None,
                };
                match contribution {
                    Some(Value::Int(i)) => total += i as f64,
                    Some(Value::Float(f)) => {
                        total += f;
                        all_int = false;
                    }
                    _ => {}
                }
            }
            Some(if all_int {
                Value::Int(total as i64)
            } else {
                Value::Float(total)
            })
        }

        // any/all treat arguments as field references (absent => false) or
        // nested formulas (null results ignored). Bare literals are not
        // references and never satisfy them.
        Op::Any | Op::All => {
            let values: Vec<Option<Value>> = args
                .iter()
                .map(|arg| match arg {
                    Formula::Field(name) => Some(
                        facts
                            .value_of(name)
                            .cloned()
                            .unwrap_or(Value::Bool(false)),
                    ),
                    Formula::Literal(_) => Some(Value::Bool(false)),
                    nested => nested.eval(facts),
                })
                .collect();
            let mut present = values.iter().flatten();
            Some(Value::Bool(if op == Op::Any {
                present.any(Value::is_truthy)
            } else {
                present.all(Value::is_truthy)
            }))
        }

        Op::Gt | Op::Gte | Op::Lt | Op::Lte => {
            let lhs = args[0].eval(facts)?.as_f64()?;
            let rhs = args[1].eval(facts)?.as_f64()?;
            Some(Value::Bool(match op {
                Op::Gt => lhs > rhs,
                Op::Gte => lhs >= rhs,
                Op::Lt => lhs < rhs,
                _ => lhs <= rhs,
            }))
        }

        Op::Add | Op::Mul => {
            let mut total = if op == Op::Add { 0.0 } else { 1.0 };
            let mut all_int = true;
            for arg in args {
                let v = arg.eval(facts)?;
                if matches!(v, Value::Float(_)) {
                    all_int = false;
                }
                let n = v.as_f64()?;
                if op == Op::Add {
                    total += n;
                } else {
                    total *= n;
                }
            }
            Some(if all_int {
                Value::Int(total as i64)
            } else {
                Value::Float(total)
            })
        }

        Op::If => {
            let cond = args[0].eval(facts);
            if cond.map_or(false, |v| v.is_truthy()) {
                args[1].eval(facts)
            } else {
                args[2].eval(facts)
            }
        }

        Op::Not => {
            let v = args[0].eval(facts)?;
            Some(Value::Bool(!v.is_truthy()))
        }

        // and/or accept literals and nested formulas; null arguments are
        // ignored, so `and` over only-missing fields is vacuously true.
        Op::And | Op::Or => {
            if args.is_empty() {
                return None;
            }
            let values: Vec<Option<Value>> = args.iter().map(|a| a.eval(facts)).collect();
            let mut present = values.iter().flatten();
            Some(Value::Bool(if op == Op::And {
                present.all(Value::is_truthy)
            } else {
                present.any(Value::is_truthy)
            }))
        }
    }
}

fn value_from_json(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(value_from_json).collect()),
        Json::Object(_) => Value::Null,
    }
}

fn collect_json_strings(raw: &Json, deps: &mut HashSet<String>) {
    match raw {
        Json::String(s) => {
            deps.insert(s.clone());
        }
        Json::Array(items) => {
            for item in items {
                collect_json_strings(item, deps);
            }
        }
        Json::Object(map) => {
            for value in map.values() {
                collect_json_strings(value, deps);
            }
        }
        _ => {}
    }
}

impl Serialize for Formula {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Formula::Literal(v) => v.serialize(serializer),
            Formula::Field(name) => serializer.serialize_str(name),
            Formula::Call(op, args) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(op.name(), args)?;
                map.end()
            }
            Formula::Unknown(raw) => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Formula {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Json::deserialize(deserializer)?;
        Ok(Formula::from_json(&raw))
    }
}
