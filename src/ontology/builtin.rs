/// Built-in ontology catalog
///
/// Three profiles ship compiled in: mortgage compliance (the default),
/// fair lending, and HIPAA PHI protection. Each constraint carries both a
/// human-readable formula and a machine formula in the formula DSL; the
/// machine formulas are written so that a missing trigger fact reduces to
/// satisfied while a present trigger with a failing requirement reduces to
/// an exact false.

use std::sync::Arc;

use serde_json::json;

use super::Ontology;

/// Name of the profile used when a requested ontology is unknown.
pub const DEFAULT_NAME: &str = "mortgage-compliance-v1";

/// All built-in profile names.
pub const NAMES: [&str; 3] = [DEFAULT_NAME, "fair-lending-v1", "hipaa-v1"];

/// Look up a built-in ontology by name.
pub fn get(name: &str) -> Option<Arc<Ontology>> {
    match name {
        DEFAULT_NAME => Some(mortgage_compliance()),
        "fair-lending-v1" => Some(fair_lending()),
        "hipaa-v1" => Some(hipaa()),
        _ => None,
    }
}

/// The default profile, returned for unrecognized names.
pub fn default() -> Arc<Ontology> {
    mortgage_compliance()
}

fn mortgage_compliance() -> Arc<Ontology> {
    let raw = json!({
        "name": "mortgage-compliance-v1",
        "version": "1.0.0",
        "description": "U.S. Mortgage Compliance - Core constraints",
        "constraints": [
            {
                "id": "ATR_QM_DTI",
                "category": "ATR/QM",
                "description": "Debt-to-income ratio requirements",
                "formula_readable": "(dti ≤ 43) ∨ (compensating_factors ≥ 2)",
                "formula": {"if": [{"gt": ["dti", 43]}, {"gte": ["compensating_factors", 2]}, true]},
                "variables": [
                    {"name": "dti", "type": "real"},
                    {"name": "compensating_factors", "type": "int"},
                ],
                "error_message": "DTI exceeds 43% without sufficient compensating factors",
                "citation": "12 CFR § 1026.43(c)",
            },
            {
                "id": "HOEPA_HIGH_COST",
                "category": "HOEPA",
                "description": "High-cost mortgage counseling requirement",
                "formula_readable": "(fee_percentage < 8) ∨ counseling_disclosed",
                "formula": {"if": [{"gte": ["fee_percentage", 8]}, "counseling_disclosed", true]},
                "variables": [
                    {"name": "fee_percentage", "type": "real"},
                    {"name": "counseling_disclosed", "type": "bool"},
                ],
                "error_message": "HOEPA triggered - counseling disclosure required",
                "citation": "12 CFR § 1026.32",
            },
            {
                "id": "UDAAP_NO_GUARANTEES",
                "category": "UDAAP",
                "description": "Prohibition on guarantee language",
                "formula_readable": "¬(has_guarantee ∧ has_approval)",
                "formula": {"not": {"and": ["has_guarantee", "has_approval"]}},
                "variables": [
                    {"name": "has_guarantee", "type": "bool"},
                    {"name": "has_approval", "type": "bool"},
                ],
                "error_message": "Cannot guarantee approval",
                "citation": "12 CFR § 1036.3",
            },
            {
                "id": "HPML_ESCROW",
                "category": "Escrow",
                "description": "Escrow requirements based on FICO",
                "formula_readable": "(credit_score ≥ 620) ∨ ¬escrow_waived",
                "formula": {"if": ["escrow_waived", {"gte": ["credit_score", 620]}, true]},
                "variables": [
                    {"name": "credit_score", "type": "int"},
                    {"name": "escrow_waived", "type": "bool"},
                ],
                "error_message": "Cannot waive escrow with FICO < 620",
                "citation": "12 CFR § 1026.35(b)",
            },
            {
                "id": "REG_B_ADVERSE",
                "category": "Regulation B",
                "description": "Adverse action disclosure requirements",
                "formula_readable": "is_denial → has_specific_reason",
                "formula": {"if": ["is_denial", "has_specific_reason", true]},
                "variables": [
                    {"name": "is_denial", "type": "bool"},
                    {"name": "has_specific_reason", "type": "bool"},
                ],
                "error_message": "Must disclose specific denial reason",
                "citation": "12 CFR § 1002.9",
            },
        ],
        "extractors": {
            "dti": {"type": "float", "pattern": "dti[:\\s~]*(\\d+(?:\\.\\d+)?)"},
            "credit_score": {
                "type": "int",
                "pattern": "(?:fico|credit score)[:\\s]*(\\d{3})",
            },
            "fees": {
                "type": "money",
                "pattern": "\\$?([\\d,]+)k?\\s*(?:fees?|costs?)",
            },
            "loan_amount": {
                "type": "money",
                "pattern": "\\$?([\\d,]+)k?\\s*(?:loan|mortgage)",
            },
            "has_guarantee": {
                "type": "boolean",
                "keywords": ["guaranteed", "100%", "definitely"],
            },
            "has_approval": {
                "type": "boolean",
                "keywords": ["approved", "approval", "approve"],
                "negation_words": ["not", "no", "cannot", "denied"],
            },
            "counseling_disclosed": {
                "type": "boolean",
                "keywords": ["counseling"],
            },
            "escrow_waived": {
                "type": "boolean",
                "keywords": ["escrow waived", "waive escrow", "skip escrow"],
            },
            "is_denial": {
                "type": "boolean",
                "keywords": ["denied", "cannot approve", "declined"],
            },
            "has_specific_reason": {
                "type": "boolean",
                "keywords": ["credit", "income", "dti", "debt", "score"],
            },
            "has_reserves": {
                "type": "boolean",
                "keywords": ["reserves", "substantial savings"],
            },
            "stable_employment": {
                "type": "boolean",
                "keywords": ["stable employment", "employment history", "long tenure"],
            },
            "low_ltv": {
                "type": "boolean",
                "keywords": ["low ltv", "large down payment"],
            },
            "compensating_factors": {
                "type": "computed",
                "formula": {"count_true": ["has_reserves", "stable_employment", "low_ltv"]},
            },
        },
    });

    Arc::new(Ontology::from_value(raw).expect("built-in mortgage ontology is valid"))
}

fn fair_lending() -> Arc<Ontology> {
    let raw = json!({
        "name": "fair-lending-v1",
        "version": "1.0.0",
        "description": "Fair Lending Compliance",
        "constraints": [
            {
                "id": "LOAN_AMOUNT_LIMIT",
                "category": "Fair Lending",
                "description": "Loan amount within policy limits",
                "formula_readable": "loan_amount ≤ 100000",
                "formula": {"lte": ["loan_amount", 100000]},
                "variables": [{"name": "loan_amount", "type": "int"}],
                "error_message": "Loan amount exceeds policy limit",
                "citation": "Internal Policy",
            },
            {
                "id": "MAX_DTI",
                "category": "Fair Lending",
                "description": "Maximum DTI ratio",
                "formula_readable": "dti ≤ 43",
                "formula": {"lte": ["dti", 43]},
                "variables": [{"name": "dti", "type": "real"}],
                "error_message": "DTI exceeds maximum",
                "citation": "12 CFR § 1026.43",
            },
            {
                "id": "MIN_CREDIT_SCORE",
                "category": "Fair Lending",
                "description": "Minimum credit score requirement",
                "formula_readable": "credit_score ≥ 600",
                "formula": {"gte": ["credit_score", 600]},
                "variables": [{"name": "credit_score", "type": "int"}],
                "error_message": "Credit score below minimum",
                "citation": "Internal Policy",
            },
        ],
        "extractors": {
            "loan_amount": {
                "type": "money",
                "pattern": "\\$?([\\d,]+)k?\\s*(?:loan|mortgage)",
            },
            "dti": {"type": "float", "pattern": "dti[:\\s~]*(\\d+(?:\\.\\d+)?)"},
            "credit_score": {
                "type": "int",
                "pattern": "(?:fico|credit score)[:\\s]*(\\d{3})",
            },
        },
    });

    Arc::new(Ontology::from_value(raw).expect("built-in fair-lending ontology is valid"))
}

fn hipaa() -> Arc<Ontology> {
    let raw = json!({
        "name": "hipaa-v1",
        "version": "1.0.0",
        "description": "HIPAA PHI Protection",
        "constraints": [
            {
                "id": "PHI_SSN_ZERO_TOLERANCE",
                "category": "PHI Detection",
                "description": "No SSN disclosure",
                "formula_readable": "¬has_ssn",
                "formula": {"not": "has_ssn"},
                "variables": [{"name": "has_ssn", "type": "bool"}],
                "error_message": "SSN detected in output",
                "citation": "45 CFR § 164.514",
            },
            {
                "id": "PHI_NAME_DISCLOSURE",
                "category": "PHI Detection",
                "description": "Patient name requires authorization",
                "formula_readable": "¬has_patient_name ∨ recipient_authorized",
                "formula": {"or": [{"not": "has_patient_name"}, "recipient_authorized"]},
                "variables": [
                    {"name": "has_patient_name", "type": "bool"},
                    {"name": "recipient_authorized", "type": "bool"},
                ],
                "error_message": "Patient name disclosed without authorization",
                "citation": "45 CFR § 164.502",
            },
            {
                "id": "PHI_ADDRESS_DISCLOSURE",
                "category": "PHI Detection",
                "description": "No street address disclosure",
                "formula_readable": "¬has_street_address",
                "formula": {"not": "has_street_address"},
                "variables": [{"name": "has_street_address", "type": "bool"}],
                "error_message": "Street address detected in output",
                "citation": "45 CFR § 164.514",
            },
        ],
        "extractors": {
            "has_ssn": {
                "type": "boolean",
                "pattern": "\\d{3}-\\d{2}-\\d{4}",
            },
            "has_patient_name": {
                "type": "boolean",
                "keywords": ["patient:", "name:"],
            },
            "has_street_address": {
                "type": "boolean",
                "keywords": ["street", "avenue", "blvd", "road", "lane"],
            },
            "recipient_authorized": {
                "type": "boolean",
                "keywords": ["authorized", "consent"],
            },
        },
    });

    Arc::new(Ontology::from_value(raw).expect("built-in HIPAA ontology is valid"))
}
