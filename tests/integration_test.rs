use serde_json::json;

use veritext::facts::{Fact, Facts, Value};
use veritext::ontology::{builtin, Ontology};
use veritext::verify::{verify_output, VerificationOutcome};

fn run(text: &str, ontology_name: &str) -> (Facts, VerificationOutcome) {
    let ontology = builtin::get(ontology_name).expect("built-in ontology");
    verify_output(text, &ontology, false)
}

fn violation_ids(outcome: &VerificationOutcome) -> Vec<&str> {
    outcome.violations.iter().map(|v| v.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// End-to-end scenarios against the built-in ontologies
// ---------------------------------------------------------------------------

#[test]
fn test_mortgage_high_dti_and_waived_escrow() {
    let (facts, outcome) = run("DTI: 52, FICO 580, escrow waived", "mortgage-compliance-v1");

    assert_eq!(facts.value_of("dti"), Some(&Value::Float(52.0)));
    assert_eq!(facts.value_of("credit_score"), Some(&Value::Int(580)));
    assert_eq!(facts.value_of("escrow_waived"), Some(&Value::Bool(true)));
    assert_eq!(facts.value_of("compensating_factors"), Some(&Value::Int(0)));

    assert!(!outcome.verified);
    assert_eq!(violation_ids(&outcome), vec!["ATR_QM_DTI", "HPML_ESCROW"]);
}

#[test]
fn test_mortgage_clean_approval_verifies() {
    let (facts, outcome) = run("DTI: 35, FICO 720, approved", "mortgage-compliance-v1");

    assert_eq!(facts.value_of("dti"), Some(&Value::Float(35.0)));
    assert_eq!(facts.value_of("credit_score"), Some(&Value::Int(720)));
    assert_eq!(facts.value_of("has_approval"), Some(&Value::Bool(true)));

    assert!(outcome.verified);
    assert!(outcome.violations.is_empty());
}

#[test]
fn test_mortgage_guarantee_language_violates_udaap() {
    let (facts, outcome) = run("Approval guaranteed", "mortgage-compliance-v1");

    assert_eq!(facts.value_of("has_guarantee"), Some(&Value::Bool(true)));
    assert_eq!(facts.value_of("has_approval"), Some(&Value::Bool(true)));

    assert!(!outcome.verified);
    assert_eq!(violation_ids(&outcome), vec!["UDAAP_NO_GUARANTEES"]);
}

#[test]
fn test_hipaa_ssn_and_patient_name() {
    let (facts, outcome) = run("Patient: John Doe, SSN 123-45-6789", "hipaa-v1");

    assert_eq!(facts.value_of("has_ssn"), Some(&Value::Bool(true)));
    assert_eq!(facts.value_of("has_patient_name"), Some(&Value::Bool(true)));
    assert_eq!(facts.value_of("has_street_address"), Some(&Value::Bool(false)));

    assert!(!outcome.verified);
    assert_eq!(
        violation_ids(&outcome),
        vec!["PHI_SSN_ZERO_TOLERANCE", "PHI_NAME_DISCLOSURE"]
    );
}

#[test]
fn test_fair_lending_loan_amount_limit() {
    let (facts, outcome) = run("$150,000 loan, DTI 30, FICO 650", "fair-lending-v1");

    assert_eq!(facts.value_of("loan_amount"), Some(&Value::Float(150_000.0)));
    assert_eq!(facts.value_of("dti"), Some(&Value::Float(30.0)));
    assert_eq!(facts.value_of("credit_score"), Some(&Value::Int(650)));

    assert!(!outcome.verified);
    assert_eq!(violation_ids(&outcome), vec!["LOAN_AMOUNT_LIMIT"]);
}

#[test]
fn test_denial_with_specific_reason_verifies() {
    let (facts, outcome) = run("Denied. Reason: insufficient income.", "mortgage-compliance-v1");

    assert_eq!(facts.value_of("is_denial"), Some(&Value::Bool(true)));
    assert_eq!(facts.value_of("has_specific_reason"), Some(&Value::Bool(true)));

    assert!(outcome.verified);
}

#[test]
fn test_hoepa_trigger_requires_counseling_disclosure() {
    let (facts, outcome) = run("This $500k loan has $45k fees.", "mortgage-compliance-v1");
    assert_eq!(facts.value_of("fees"), Some(&Value::Float(45_000.0)));
    assert_eq!(facts.value_of("loan_amount"), Some(&Value::Float(500_000.0)));
    assert_eq!(facts.value_of("fee_percentage"), Some(&Value::Float(9.0)));
    assert_eq!(violation_ids(&outcome), vec!["HOEPA_HIGH_COST"]);

    let (_, outcome) = run(
        "This $500k loan has $45k fees. Homeownership counseling disclosed.",
        "mortgage-compliance-v1",
    );
    assert!(outcome.verified);
}

// ---------------------------------------------------------------------------
// Pipeline invariants
// ---------------------------------------------------------------------------

#[test]
fn test_determinism_modulo_timing() {
    let text = "DTI: 52, FICO 580, escrow waived, $200k loan";
    let (facts_a, outcome_a) = run(text, "mortgage-compliance-v1");
    let (facts_b, outcome_b) = run(text, "mortgage-compliance-v1");

    assert_eq!(
        serde_json::to_string(&facts_a).unwrap(),
        serde_json::to_string(&facts_b).unwrap()
    );
    assert_eq!(outcome_a.violations, outcome_b.violations);
    assert_eq!(outcome_a.verified, outcome_b.verified);
    assert_eq!(outcome_a.proof, outcome_b.proof);
}

#[test]
fn test_fact_ordering_extractors_then_derived_then_computed() {
    let (facts, _) = run("DTI: 52, FICO 580, escrow waived", "mortgage-compliance-v1");
    let keys: Vec<&str> = facts.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "dti",
            "credit_score",
            "has_guarantee",
            "has_approval",
            "counseling_disclosed",
            "escrow_waived",
            "is_denial",
            "has_specific_reason",
            "has_reserves",
            "stable_employment",
            "low_ltv",
            "word_count",
            "compensating_factors",
        ]
    );
}

#[test]
fn test_word_count_always_derived() {
    let (facts, _) = run("DTI: 35, FICO 720, approved", "mortgage-compliance-v1");
    assert_eq!(facts.value_of("word_count"), Some(&Value::Int(5)));
}

#[test]
fn test_negation_window_on_default_ontology() {
    let (facts, _) = run("not approved", "mortgage-compliance-v1");
    assert_eq!(facts.value_of("has_approval"), Some(&Value::Bool(false)));

    let (facts, _) = run("approved, no issues", "mortgage-compliance-v1");
    assert_eq!(facts.value_of("has_approval"), Some(&Value::Bool(true)));
}

#[test]
fn test_money_suffix_normalization() {
    let (facts, _) = run("$5k fees on the account", "mortgage-compliance-v1");
    assert_eq!(facts.value_of("fees"), Some(&Value::Float(5000.0)));

    let (facts, _) = run("$5K FEES on the account", "mortgage-compliance-v1");
    assert_eq!(facts.value_of("fees"), Some(&Value::Float(5000.0)));
}

#[test]
fn test_confidence_mode_bounds_and_computed_confidence() {
    let ontology = builtin::get("mortgage-compliance-v1").unwrap();
    let (facts, outcome) = verify_output("DTI: 52, FICO 580, escrow waived", &ontology, true);

    for (name, fact) in facts.iter() {
        match fact {
            Fact::Record(record) => {
                assert!(
                    (0.0..=1.0).contains(&record.confidence),
                    "{} confidence out of bounds: {}",
                    name,
                    record.confidence
                );
            }
            Fact::Value(_) => panic!("{} should be a record in confidence mode", name),
        }
    }

    match facts.get("compensating_factors").unwrap() {
        Fact::Record(record) => {
            assert_eq!(record.confidence, 1.0);
            assert_eq!(record.source, "computed");
        }
        other => panic!("expected record, got {:?}", other),
    }

    // Confidence mode must not change the verdict.
    assert_eq!(violation_ids(&outcome), vec!["ATR_QM_DTI", "HPML_ESCROW"]);
}

#[test]
fn test_proof_is_json_serializable_and_binds_variables() {
    let (_, outcome) = run("DTI: 52, FICO 580, escrow waived", "mortgage-compliance-v1");
    let serialized = serde_json::to_string(&outcome.proof).unwrap();
    assert!(serialized.contains("ATR_QM_DTI"));
    assert_eq!(outcome.proof["ATR_QM_DTI"]["variables"]["dti"], json!(52.0));
    assert_eq!(outcome.proof["ATR_QM_DTI"]["result"], json!(false));
    // Missing facts bind as null rather than being dropped.
    assert_eq!(
        outcome.proof["HOEPA_HIGH_COST"]["variables"]["fee_percentage"],
        json!(null)
    );
}

// ---------------------------------------------------------------------------
// Custom ontology documents through the same pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_custom_ontology_with_computed_risk_score() {
    let ontology = Ontology::from_value(json!({
        "name": "incident-v1",
        "version": "1.0.0",
        "description": "Incident report requirements",
        "constraints": [
            {
                "id": "RISK_CEILING",
                "category": "Risk",
                "description": "Combined risk signals within tolerance",
                "formula": {"lt": ["risk_score", 3]},
                "variables": [{"name": "risk_score", "type": "int"}],
                "error_message": "Too many risk signals",
                "citation": "Policy 7",
            },
            {
                "id": "INCIDENT_DATED",
                "category": "Reporting",
                "description": "Incident date present when an incident is reported",
                "formula": {"if": ["mentions_incident", {"count_fields": ["incident_date"]}, true]},
                "variables": [{"name": "incident_date", "type": "string"}],
                "error_message": "Incident reports must carry a date",
                "citation": "Policy 9",
            },
        ],
        "extractors": {
            "mentions_incident": {"type": "boolean", "keywords": ["incident", "breach"]},
            "unencrypted": {"type": "boolean", "keywords": ["unencrypted", "plaintext"]},
            "external_party": {"type": "boolean", "keywords": ["third party", "vendor"]},
            "incident_date": {"type": "date", "keywords": ["on"]},
            "risk_score": {
                "type": "computed",
                "formula": {"count_true": ["mentions_incident", "unencrypted", "external_party"]},
                "default": 0,
            },
        },
    }))
    .unwrap();

    let (facts, outcome) = verify_output(
        "Unencrypted backup shared with a third party vendor; incident occurred on 03/15/2024.",
        &ontology,
        false,
    );

    assert_eq!(facts.value_of("risk_score"), Some(&Value::Int(3)));
    assert_eq!(
        facts.value_of("incident_date"),
        Some(&Value::Str("2024-03-15".to_string()))
    );
    assert!(!outcome.verified);
    assert_eq!(violation_ids(&outcome), vec!["RISK_CEILING"]);

    let (facts, outcome) = verify_output("Routine maintenance, nothing to report.", &ontology, false);
    assert_eq!(facts.value_of("risk_score"), Some(&Value::Int(0)));
    assert!(outcome.verified);
}

#[test]
fn test_constraint_without_formula_is_informational() {
    let ontology = Ontology::from_value(json!({
        "name": "legacy-v1",
        "version": "1.0.0",
        "constraints": [{
            "id": "READABLE_ONLY",
            "category": "Legacy",
            "description": "Documented but not machine-evaluable",
            "formula_readable": "x ≤ 10",
            "error_message": "never raised",
            "citation": "none",
        }],
        "extractors": {
            "x": {"type": "int", "pattern": "x[:\\s]*(\\d+)"},
        },
    }))
    .unwrap();

    let (facts, outcome) = verify_output("x: 9999", &ontology, false);
    assert_eq!(facts.value_of("x"), Some(&Value::Int(9999)));
    assert!(outcome.verified);
}
