/// Extraction engine: pattern- and keyword-based fact extraction
///
/// Walks every non-computed extractor in ontology order and records a fact
/// per successful extraction. Missing facts are simply absent; extraction
/// never records nulls and never returns an error to the caller. Malformed
/// patterns and failed conversions are logged and the field is skipped.

pub mod dates;
pub mod patterns;

use crate::facts::{ExtractionRecord, Fact, Facts, Value};
use crate::ontology::{Extractor, ItemType, KeywordSpec, Ontology};
use indexmap::IndexMap;

/// Context window (bytes) around a pattern match checked for negation words.
const PATTERN_NEGATION_WINDOW: usize = 30;

/// Context window (bytes) before a keyword hit checked for negation words.
const KEYWORD_NEGATION_WINDOW: usize = 15;

/// A successful single-field extraction before packaging into a `Fact`.
struct Extracted {
    value: Value,
    source: String,
}

/// Extract facts from text using the ontology's extractors.
///
/// With `with_confidence` set, each fact is wrapped in an
/// `ExtractionRecord` carrying a confidence score and the matched source
/// slice; otherwise facts are raw values.
pub fn extract(text: &str, ontology: &Ontology, with_confidence: bool) -> Facts {
    let text_lower = text.to_lowercase();
    let mut facts = Facts::new();

    for (name, extractor) in &ontology.extractors {
        if extractor.is_computed() {
            continue;
        }
        let Some(extracted) = extract_field(text, &text_lower, extractor) else {
            continue;
        };
        if with_confidence {
            let confidence = confidence_for(extractor, &extracted.value, &text_lower);
            facts.insert(
                name.clone(),
                Fact::Record(ExtractionRecord {
                    value: extracted.value,
                    confidence,
                    source: extracted.source,
                    extractor_type: extractor.type_name().to_string(),
                }),
            );
        } else {
            facts.insert(name.clone(), Fact::Value(extracted.value));
        }
    }

    facts
}

fn extract_field(text: &str, text_lower: &str, extractor: &Extractor) -> Option<Extracted> {
    match extractor {
        Extractor::Boolean {
            pattern,
            keywords,
            negation_words,
            check_negation,
        } => Some(extract_boolean(
            text,
            text_lower,
            pattern.as_deref(),
            keywords,
            negation_words,
            *check_negation,
        )),
        Extractor::Int { pattern } => {
            extract_numeric(text, text_lower, pattern.as_deref()?, NumericKind::Int)
        }
        Extractor::Float { pattern } => {
            extract_numeric(text, text_lower, pattern.as_deref()?, NumericKind::Float)
        }
        Extractor::Percentage { pattern } => {
            extract_numeric(text, text_lower, pattern.as_deref()?, NumericKind::Percentage)
        }
        Extractor::Money { pattern } => {
            extract_numeric(text, text_lower, pattern.as_deref()?, NumericKind::Money)
        }
        Extractor::String { pattern } => extract_string(text, text_lower, pattern.as_deref()?),
        Extractor::Date {
            pattern,
            format,
            keywords,
        } => dates::extract_date(
            text,
            text_lower,
            pattern.as_deref(),
            format.as_deref(),
            keywords,
        )
        .map(|hit| Extracted {
            value: Value::Str(hit.iso),
            source: hit.source,
        }),
        Extractor::Datetime {
            pattern,
            format,
            keywords,
        } => dates::extract_datetime(
            text,
            text_lower,
            pattern.as_deref(),
            format.as_deref(),
            keywords,
        )
        .map(|hit| Extracted {
            value: Value::Str(hit.iso),
            source: hit.source,
        }),
        Extractor::List {
            pattern,
            item_type,
            keywords,
            ..
        } => extract_list(text, text_lower, pattern.as_deref(), *item_type, keywords),
        Extractor::Enum { choices, default } => {
            extract_enum(text_lower, choices, default.as_deref())
        }
        // Computed fields are settled after extraction and derivation.
        Extractor::Computed { .. } => None,
    }
}

/// Boolean extraction. A configured pattern takes precedence; a pattern
/// that fails to compile falls back to the keyword path. Negation words
/// within the context window flip a pattern hit to false, or skip a
/// keyword hit in favor of the next keyword.
///
/// The pattern is matched against the original-case text so the reported
/// source is a real substring of the input; negation context still reads
/// from the lowercased text.
fn extract_boolean(
    text: &str,
    text_lower: &str,
    pattern: Option<&str>,
    keywords: &[String],
    negation_words: &[String],
    check_negation: bool,
) -> Extracted {
    if let Some(raw_pattern) = pattern {
        if let Some(compiled) = patterns::compile(raw_pattern) {
            return match compiled.find(text) {
                Some(m) => {
                    if check_negation && !negation_words.is_empty() {
                        let start = floor_char_boundary(
                            text_lower,
                            m.start().saturating_sub(PATTERN_NEGATION_WINDOW),
                        );
                        let end = floor_char_boundary(
                            text_lower,
                            (m.end() + PATTERN_NEGATION_WINDOW).min(text_lower.len()),
                        );
                        let context = &text_lower[start..end.max(start)];
                        if contains_any(context, negation_words) {
                            return Extracted {
                                value: Value::Bool(false),
                                source: m.as_str().to_string(),
                            };
                        }
                    }
                    Extracted {
                        value: Value::Bool(true),
                        source: m.as_str().to_string(),
                    }
                }
                None => Extracted {
                    value: Value::Bool(false),
                    source: "false".to_string(),
                },
            };
        }
    }

    for keyword in keywords {
        let kw = keyword.to_lowercase();
        if let Some(pos) = text_lower.find(&kw) {
            if check_negation && !negation_words.is_empty() {
                // Window covers the run-up to the keyword only, so an
                // unrelated "no" later in the text cannot flip the hit.
                let start = floor_char_boundary(
                    text_lower,
                    pos.saturating_sub(KEYWORD_NEGATION_WINDOW),
                );
                let context = &text_lower[start..pos + kw.len()];
                if contains_any(context, negation_words) {
                    continue;
                }
            }
            return Extracted {
                value: Value::Bool(true),
                source: keyword.clone(),
            };
        }
    }

    Extracted {
        value: Value::Bool(false),
        source: "false".to_string(),
    }
}

fn contains_any(context: &str, words: &[String]) -> bool {
    words.iter().any(|w| context.contains(&w.to_lowercase()))
}

#[derive(Clone, Copy, PartialEq)]
enum NumericKind {
    Int,
    Float,
    Percentage,
    Money,
}

/// Numeric extraction. The pattern's first capture group is required;
/// commas are stripped before parsing. Money values are scaled by a k/m/b
/// suffix immediately following the captured number. The source slice is
/// re-derived from the original-case text.
fn extract_numeric(
    text: &str,
    text_lower: &str,
    pattern: &str,
    kind: NumericKind,
) -> Option<Extracted> {
    let compiled = patterns::compile(pattern)?;
    let caps = compiled.captures(text_lower)?;
    let group = caps.get(1)?;
    let whole = caps.get(0).expect("group 0 always present");
    let raw = group.as_str().replace(',', "");

    let value = match kind {
        NumericKind::Int => match raw.parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(e) => {
                tracing::warn!(raw = %raw, error = %e, "int conversion failed, skipping field");
                return None;
            }
        },
        NumericKind::Float | NumericKind::Percentage => match raw.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(e) => {
                tracing::warn!(raw = %raw, error = %e, "float conversion failed, skipping field");
                return None;
            }
        },
        NumericKind::Money => match raw.parse::<f64>() {
            Ok(f) => {
                let multiplier = money_multiplier(text_lower, group.end(), whole.end());
                Value::Float(f * multiplier)
            }
            Err(e) => {
                tracing::warn!(raw = %raw, error = %e, "money conversion failed, skipping field");
                return None;
            }
        },
    };

    Some(Extracted {
        value,
        source: original_source(text, &compiled, whole.as_str()),
    })
}

/// The matched slice from the original-case text. Values extract from the
/// lowercased text, so the span is re-matched against the input; if that
/// somehow fails, the lowercased slice stands in.
fn original_source(text: &str, compiled: &regex::Regex, lowered: &str) -> String {
    compiled
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| lowered.to_string())
}

/// Suffix multiplier for money values: the character directly after the
/// captured number, within the matched slice. Anchoring to the number
/// keeps trailing words like "mortgage" from reading as a multiplier.
fn money_multiplier(text_lower: &str, after_number: usize, match_end: usize) -> f64 {
    match text_lower[after_number..match_end].chars().next() {
        Some('k') => 1e3,
        Some('m') => 1e6,
        Some('b') => 1e9,
        _ => 1.0,
    }
}

fn extract_string(text: &str, text_lower: &str, pattern: &str) -> Option<Extracted> {
    let compiled = patterns::compile(pattern)?;
    let caps = compiled.captures(text_lower)?;
    let m = caps.get(1).or_else(|| caps.get(0))?;
    let whole = caps.get(0).expect("group 0 always present");
    Some(Extracted {
        value: Value::Str(m.as_str().to_string()),
        source: original_source(text, &compiled, whole.as_str()),
    })
}

/// List extraction: every pattern match contributes one item (first capture
/// group if present). String items match against the lowercased text; other
/// item types keep the original casing for conversion. With no pattern or
/// no hits, configured keywords found in the text become the items.
fn extract_list(
    text: &str,
    text_lower: &str,
    pattern: Option<&str>,
    item_type: ItemType,
    keywords: &[String],
) -> Option<Extracted> {
    let mut items: Vec<Value> = Vec::new();
    let mut source = String::new();

    if let Some(raw_pattern) = pattern {
        if let Some(compiled) = patterns::compile(raw_pattern) {
            let haystack = if item_type == ItemType::String {
                text_lower
            } else {
                text
            };
            for caps in compiled.captures_iter(haystack) {
                let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                if let Some(converted) = convert_list_item(m.as_str(), item_type) {
                    if source.is_empty() {
                        source = caps
                            .get(0)
                            .map(|w| w.as_str().to_string())
                            .unwrap_or_default();
                    }
                    items.push(converted);
                }
            }
        }
    }

    if items.is_empty() {
        for keyword in keywords {
            if text_lower.contains(&keyword.to_lowercase()) {
                if source.is_empty() {
                    source = keyword.clone();
                }
                items.push(Value::Str(keyword.clone()));
            }
        }
    }

    if items.is_empty() {
        None
    } else {
        let value = Value::List(items);
        if source.is_empty() {
            source = value.to_string();
        }
        Some(Extracted { value, source })
    }
}

fn convert_list_item(raw: &str, item_type: ItemType) -> Option<Value> {
    let cleaned = raw.trim().replace(',', "");
    match item_type {
        ItemType::String => Some(Value::Str(cleaned)),
        ItemType::Int => cleaned.parse::<f64>().ok().map(|f| Value::Int(f as i64)),
        ItemType::Float => cleaned.parse::<f64>().ok().map(Value::Float),
    }
}

/// Enum extraction: first choice whose keyword occurs wins, in declaration
/// order; otherwise the configured default, otherwise absent.
fn extract_enum(
    text_lower: &str,
    choices: &IndexMap<String, KeywordSpec>,
    default: Option<&str>,
) -> Option<Extracted> {
    for (choice, spec) in choices {
        for keyword in spec.iter() {
            if text_lower.contains(&keyword.to_lowercase()) {
                return Some(Extracted {
                    value: Value::Str(choice.clone()),
                    source: keyword.clone(),
                });
            }
        }
    }

    default.map(|d| Extracted {
        value: Value::Str(d.to_string()),
        source: d.to_string(),
    })
}

/// Confidence score for an extraction, by method and match quality.
fn confidence_for(extractor: &Extractor, value: &Value, text_lower: &str) -> f64 {
    if extractor.pattern().is_some() {
        return 0.95;
    }

    match extractor {
        Extractor::Enum { choices, .. } => match value {
            Value::Str(s) if choices.contains_key(s) => 0.90,
            _ => 0.70,
        },
        Extractor::Boolean { keywords, .. } => {
            let hits = keywords
                .iter()
                .filter(|kw| text_lower.contains(&kw.to_lowercase()))
                .count();
            match hits {
                n if n >= 3 => 0.95,
                2 => 0.85,
                1 => 0.75,
                // No keyword evidence: a negative finding is slightly more
                // trustworthy than a positive one.
                _ => {
                    if value.is_true() {
                        0.50
                    } else {
                        0.60
                    }
                }
            }
        }
        Extractor::List { .. } => match value {
            Value::List(items) if items.len() >= 3 => 0.90,
            Value::List(items) if !items.is_empty() => 0.80,
            _ => 0.50,
        },
        Extractor::Date { .. } | Extractor::Datetime { .. } => match value {
            Value::Str(s) if has_iso_date_prefix(s) => 0.90,
            _ => 0.75,
        },
        Extractor::Int { .. }
        | Extractor::Float { .. }
        | Extractor::Money { .. }
        | Extractor::Percentage { .. } => 0.90,
        _ => 0.70,
    }
}

fn has_iso_date_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[0..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

/// Largest char-boundary index not exceeding `i`. Byte windows computed
/// from match offsets may otherwise split a multi-byte character.
pub(crate) fn floor_char_boundary(s: &str, i: usize) -> usize {
    let mut i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::Ontology;
    use serde_json::json;

    fn ontology(extractors: serde_json::Value) -> Ontology {
        Ontology::from_value(json!({
            "name": "test-v1",
            "version": "1.0.0",
            "constraints": [],
            "extractors": extractors,
        }))
        .unwrap()
    }

    fn plain(text: &str, extractors: serde_json::Value) -> Facts {
        extract(text, &ontology(extractors), false)
    }

    #[test]
    fn test_float_extraction_strips_commas() {
        let facts = plain(
            "Total: 1,234.5 units",
            json!({"total": {"type": "float", "pattern": "total[:\\s]*([\\d,]+\\.?\\d*)"}}),
        );
        assert_eq!(facts.value_of("total"), Some(&Value::Float(1234.5)));
    }

    #[test]
    fn test_int_requires_capture_group() {
        let facts = plain(
            "code 42",
            json!({"code": {"type": "int", "pattern": "code \\d+"}}),
        );
        assert!(facts.value_of("code").is_none());
    }

    #[test]
    fn test_money_suffix_multipliers() {
        let extractors = json!({
            "fees": {"type": "money", "pattern": "\\$?([\\d,]+)k?\\s*(?:fees?|costs?)"},
        });
        let facts = plain("$5k fees", extractors.clone());
        assert_eq!(facts.value_of("fees"), Some(&Value::Float(5000.0)));

        let facts = plain("$5K FEES", extractors.clone());
        assert_eq!(facts.value_of("fees"), Some(&Value::Float(5000.0)));

        let facts = plain("$1,200 fees", extractors);
        assert_eq!(facts.value_of("fees"), Some(&Value::Float(1200.0)));
    }

    #[test]
    fn test_money_word_after_number_is_not_a_multiplier() {
        let facts = plain(
            "$150,000 mortgage",
            json!({"loan_amount": {"type": "money", "pattern": "\\$?([\\d,]+)k?\\s*(?:loan|mortgage)"}}),
        );
        assert_eq!(facts.value_of("loan_amount"), Some(&Value::Float(150_000.0)));
    }

    #[test]
    fn test_boolean_keyword_negation_window() {
        let extractors = json!({
            "has_approval": {
                "type": "boolean",
                "keywords": ["approved", "approval", "approve"],
                "negation_words": ["not", "no", "cannot", "denied"],
            },
        });
        let facts = plain("not approved", extractors.clone());
        assert_eq!(facts.value_of("has_approval"), Some(&Value::Bool(false)));

        let facts = plain("approved, no issues", extractors);
        assert_eq!(facts.value_of("has_approval"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_boolean_pattern_negation_window() {
        let extractors = json!({
            "signed": {
                "type": "boolean",
                "pattern": "signature on file",
                "negation_words": ["without", "missing"],
            },
        });
        let facts = plain("processed without signature on file", extractors.clone());
        assert_eq!(facts.value_of("signed"), Some(&Value::Bool(false)));

        let facts = plain("signature on file since May", extractors);
        assert_eq!(facts.value_of("signed"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_boolean_pattern_no_match_is_false_not_absent() {
        let facts = plain(
            "nothing here",
            json!({"has_ssn": {"type": "boolean", "pattern": "\\d{3}-\\d{2}-\\d{4}"}}),
        );
        assert_eq!(facts.value_of("has_ssn"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_boolean_check_negation_disabled() {
        let extractors = json!({
            "flag": {
                "type": "boolean",
                "keywords": ["approved"],
                "negation_words": ["not"],
                "check_negation": false,
            },
        });
        let facts = plain("not approved", extractors);
        assert_eq!(facts.value_of("flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_string_extraction_is_lowercased() {
        let facts = plain(
            "Officer: Jane Doe.",
            json!({"officer": {"type": "string", "pattern": "officer[:\\s]*([a-z ]+)\\."}}),
        );
        assert_eq!(
            facts.value_of("officer"),
            Some(&Value::Str("jane doe".to_string()))
        );
    }

    #[test]
    fn test_list_pattern_extraction() {
        let facts = plain(
            "Accounts 1001, 1002 and 1003 reviewed",
            json!({"accounts": {"type": "list", "pattern": "\\b(1\\d{3})\\b", "item_type": "int"}}),
        );
        assert_eq!(
            facts.value_of("accounts"),
            Some(&Value::List(vec![
                Value::Int(1001),
                Value::Int(1002),
                Value::Int(1003),
            ]))
        );
    }

    #[test]
    fn test_list_keyword_fallback_and_empty_absent() {
        let extractors = json!({
            "docs": {"type": "list", "keywords": ["w-2", "pay stub", "tax return"]},
        });
        let facts = plain("Provided W-2 and tax return.", extractors.clone());
        assert_eq!(
            facts.value_of("docs"),
            Some(&Value::List(vec![
                Value::Str("w-2".to_string()),
                Value::Str("tax return".to_string()),
            ]))
        );

        let facts = plain("nothing relevant", extractors);
        assert!(facts.value_of("docs").is_none());
    }

    #[test]
    fn test_enum_first_match_wins_then_default() {
        let extractors = json!({
            "status": {
                "type": "enum",
                "choices": {"approved": ["approved"], "denied": ["denied", "rejected"]},
                "default": "pending",
            },
        });
        let facts = plain("application denied", extractors.clone());
        assert_eq!(
            facts.value_of("status"),
            Some(&Value::Str("denied".to_string()))
        );

        let facts = plain("under review", extractors);
        assert_eq!(
            facts.value_of("status"),
            Some(&Value::Str("pending".to_string()))
        );
    }

    #[test]
    fn test_malformed_pattern_skips_field() {
        let facts = plain(
            "dti: 40",
            json!({
                "broken": {"type": "float", "pattern": "(unclosed"},
                "dti": {"type": "float", "pattern": "dti[:\\s]*(\\d+)"},
            }),
        );
        assert!(facts.value_of("broken").is_none());
        assert_eq!(facts.value_of("dti"), Some(&Value::Float(40.0)));
    }

    #[test]
    fn test_extraction_order_follows_ontology() {
        let facts = plain(
            "dti: 40, fico 700",
            json!({
                "credit_score": {"type": "int", "pattern": "fico[:\\s]*(\\d{3})"},
                "dti": {"type": "float", "pattern": "dti[:\\s]*(\\d+)"},
            }),
        );
        let keys: Vec<&String> = facts.keys().collect();
        assert_eq!(keys, vec!["credit_score", "dti"]);
    }

    #[test]
    fn test_confidence_records() {
        let ontology = ontology(json!({
            "dti": {"type": "float", "pattern": "dti[:\\s]*(\\d+)"},
            "has_approval": {"type": "boolean", "keywords": ["approved"]},
            "absent_flag": {"type": "boolean", "keywords": ["nowhere"]},
        }));
        let facts = extract("dti: 40, approved", &ontology, true);

        match facts.get("dti").unwrap() {
            Fact::Record(r) => {
                assert_eq!(r.confidence, 0.95);
                assert_eq!(r.source, "dti: 40");
                assert_eq!(r.extractor_type, "float");
            }
            other => panic!("expected record, got {:?}", other),
        }
        match facts.get("has_approval").unwrap() {
            Fact::Record(r) => {
                assert_eq!(r.confidence, 0.75);
                assert_eq!(r.source, "approved");
            }
            other => panic!("expected record, got {:?}", other),
        }
        // Keyword never seen: false finding at 0.60.
        match facts.get("absent_flag").unwrap() {
            Fact::Record(r) => {
                assert_eq!(r.value, Value::Bool(false));
                assert_eq!(r.confidence, 0.60);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_source_preserves_original_case() {
        let ontology = ontology(json!({
            "loan_amount": {"type": "money", "pattern": "\\$?([\\d,]+)k?\\s*(?:loan|mortgage)"},
            "has_approval": {"type": "boolean", "pattern": "approved"},
        }));
        let facts = extract("Pre-Approved for a $150,000 Mortgage", &ontology, true);

        match facts.get("loan_amount").unwrap() {
            Fact::Record(r) => {
                assert_eq!(r.value, Value::Float(150_000.0));
                assert_eq!(r.source, "$150,000 Mortgage");
            }
            other => panic!("expected record, got {:?}", other),
        }
        match facts.get("has_approval").unwrap() {
            Fact::Record(r) => {
                assert_eq!(r.value, Value::Bool(true));
                assert_eq!(r.source, "Approved");
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_confidence_bounds() {
        let ontology = ontology(json!({
            "dti": {"type": "float", "pattern": "dti[:\\s]*(\\d+)"},
            "flag": {"type": "boolean", "keywords": ["approved", "granted"]},
            "status": {"type": "enum", "choices": {"open": ["open"]}, "default": "closed"},
        }));
        let facts = extract("dti: 40 approved granted open", &ontology, true);
        for (_, fact) in facts.iter() {
            if let Fact::Record(r) = fact {
                assert!((0.0..=1.0).contains(&r.confidence));
            }
        }
    }
}
