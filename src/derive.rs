/// Derived facts: built-in derivations and ontology-declared computed fields
///
/// Runs after extraction, in two stages. Built-in derivations come first so
/// computed formulas can reference them. Computed fields are evaluated in
/// the dependency order resolved at ontology load; fields excluded from
/// that order (cycles) settle to their configured default.
///
/// Derived and computed facts always carry confidence 1.0 and the source
/// marker "computed".

use std::collections::HashSet;

use crate::facts::{ExtractionRecord, Fact, Facts, Value};
use crate::formula::Formula;
use crate::ontology::{Extractor, Ontology};

/// Unconditional derivations available to every ontology.
///
/// - `fee_percentage` = fees / loan_amount * 100, when both facts are
///   present and the loan amount is positive;
/// - `word_count` = whitespace-separated token count of the text.
pub fn apply_builtin_derivations(facts: &mut Facts, text_lower: &str, with_confidence: bool) {
    let fees = facts.value_of("fees").and_then(Value::as_f64);
    let loan_amount = facts.value_of("loan_amount").and_then(Value::as_f64);
    if let (Some(fees), Some(loan_amount)) = (fees, loan_amount) {
        if loan_amount > 0.0 {
            set_derived(
                facts,
                "fee_percentage",
                Value::Float((fees / loan_amount) * 100.0),
                with_confidence,
            );
        }
    }

    let word_count = text_lower.split_whitespace().count() as i64;
    set_derived(facts, "word_count", Value::Int(word_count), with_confidence);
}

/// Evaluate the ontology's computed extractors against the facts gathered
/// so far. Formula failures fall back to the field's default, or leave the
/// field absent; they never error.
pub fn settle_computed(facts: &mut Facts, ontology: &Ontology, with_confidence: bool) {
    for name in ontology.computed_order() {
        let Some(Extractor::Computed {
            formula, default, ..
        }) = ontology.extractors.get(name)
        else {
            continue;
        };

        let result = formula.as_ref().and_then(|f| evaluate(name, f, facts));
        match result.or_else(|| default.clone()) {
            Some(value) => set_derived(facts, name, value, with_confidence),
            None => {
                tracing::debug!(field = %name, "computed field has no value and no default");
            }
        }
    }

    // Cyclic fields never enter the resolved order; they settle to their
    // default when one is configured.
    let ordered: HashSet<&str> = ontology.computed_order().iter().map(String::as_str).collect();
    for (name, extractor) in &ontology.extractors {
        if let Extractor::Computed {
            default: Some(default),
            ..
        } = extractor
        {
            if !ordered.contains(name.as_str()) && !facts.contains(name) {
                set_derived(facts, name, default.clone(), with_confidence);
            }
        }
    }
}

fn evaluate(name: &str, formula: &Formula, facts: &Facts) -> Option<Value> {
    let result = formula.eval(facts);
    if result.is_none() {
        tracing::warn!(field = %name, "computed formula evaluated to null");
    }
    result
}

fn set_derived(facts: &mut Facts, name: &str, value: Value, with_confidence: bool) {
    let fact = if with_confidence {
        Fact::Record(ExtractionRecord {
            value,
            confidence: 1.0,
            source: "computed".to_string(),
            extractor_type: "computed".to_string(),
        })
    } else {
        Fact::Value(value)
    };
    facts.insert(name.to_string(), fact);
}
