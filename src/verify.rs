/// Constraint evaluation: facts in, verdict and violations out
///
/// Constraints are evaluated in ontology order and a violation is recorded
/// only when the predicate reduces to an exact `false`. A missing formula,
/// or one that evaluates to null (missing facts, unknown operator), is
/// treated as satisfied: the engine never reports a violation it could
/// not actually prove.

use std::time::Instant;

use serde::Serialize;
use serde_json::json;

use crate::derive;
use crate::extract;
use crate::facts::{Facts, Value};
use crate::ontology::Ontology;

/// One failed constraint, in response shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub id: String,
    pub category: String,
    pub description: String,
    pub error_message: String,
    pub citation: String,
}

/// Result of evaluating every constraint in an ontology.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub violations: Vec<Violation>,
    /// Opaque evidence object: per-constraint variable bindings and the
    /// predicate result at evaluation time. JSON-serializable, otherwise
    /// not contractual.
    pub proof: serde_json::Value,
    pub execution_time_ms: u64,
}

/// Evaluate all constraints against the facts.
pub fn verify(facts: &Facts, ontology: &Ontology) -> VerificationOutcome {
    let started = Instant::now();
    let mut violations = Vec::new();
    let mut proof = serde_json::Map::new();

    for constraint in &ontology.constraints {
        let result = constraint.formula.as_ref().map(|f| f.eval(facts));

        let bindings: serde_json::Map<String, serde_json::Value> = constraint
            .variables
            .iter()
            .map(|var| {
                let bound = facts
                    .value_of(&var.name)
                    .and_then(|v| serde_json::to_value(v).ok())
                    .unwrap_or(serde_json::Value::Null);
                (var.name.clone(), bound)
            })
            .collect();

        let result_json = match &result {
            Some(Some(value)) => serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            _ => serde_json::Value::Null,
        };
        proof.insert(
            constraint.id.clone(),
            json!({"variables": bindings, "result": result_json}),
        );

        match result {
            Some(Some(Value::Bool(false))) => {
                violations.push(Violation {
                    id: constraint.id.clone(),
                    category: constraint.category.clone(),
                    description: constraint.description.clone(),
                    error_message: constraint.error_message.clone(),
                    citation: constraint.citation.clone(),
                });
            }
            Some(None) => {
                tracing::warn!(
                    constraint = %constraint.id,
                    "constraint predicate evaluated to null, treating as satisfied"
                );
            }
            _ => {}
        }
    }

    VerificationOutcome {
        verified: violations.is_empty(),
        violations,
        proof: serde_json::Value::Object(proof),
        execution_time_ms: started.elapsed().as_millis() as u64,
    }
}

/// The full pipeline for one request: extract, derive, settle computed
/// fields, evaluate constraints. Pure over (text, ontology) apart from the
/// wall-clock measurement in the outcome.
pub fn verify_output(
    text: &str,
    ontology: &Ontology,
    with_confidence: bool,
) -> (Facts, VerificationOutcome) {
    let text_lower = text.to_lowercase();
    let mut facts = extract::extract(text, ontology, with_confidence);
    derive::apply_builtin_derivations(&mut facts, &text_lower, with_confidence);
    derive::settle_computed(&mut facts, ontology, with_confidence);
    let outcome = verify(&facts, ontology);
    (facts, outcome)
}
