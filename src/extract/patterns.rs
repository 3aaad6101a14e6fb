/// Process-wide compiled-regex interner and the standard date tables
///
/// The interner is the only mutable process-wide state in the pipeline: a
/// concurrent map from raw pattern string to compiled regex, monotonically
/// growing for the process lifetime. Duplicate compilation on a race is
/// harmless since the results are value-equal.
///
/// All patterns compile case-insensitively, matching the extraction
/// engine's lowercase-text conventions.

use std::sync::OnceLock;

use dashmap::DashMap;
use regex::{Regex, RegexBuilder};

static PATTERN_CACHE: OnceLock<DashMap<String, Regex>> = OnceLock::new();

/// Compile a pattern through the interner. Returns `None` (after logging)
/// for malformed patterns; callers skip the extractor in that case.
pub fn compile(pattern: &str) -> Option<Regex> {
    let cache = PATTERN_CACHE.get_or_init(DashMap::new);
    if let Some(hit) = cache.get(pattern) {
        return Some(hit.value().clone());
    }

    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(compiled) => {
            cache.insert(pattern.to_string(), compiled.clone());
            Some(compiled)
        }
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "invalid extractor pattern, skipping");
            None
        }
    }
}

/// Standard date forms tried in order when an extractor declares no custom
/// pattern. Interpretation is positional: a leading 4-digit group is
/// year-first, a trailing 4-digit group is US order, a trailing 2-digit
/// group is US order with the century pivot.
pub const DATE_PATTERNS: &[&str] = &[
    // ISO-ish: 2024-12-25, 2024/12/25
    r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b",
    // US: 12/25/2024, 12-25-2024
    r"\b(\d{1,2})[-/](\d{1,2})[-/](\d{4})\b",
    // US short year: 12/25/24
    r"\b(\d{1,2})[-/](\d{1,2})[-/](\d{2})\b",
    // Written: December 25, 2024 or Dec 25, 2024
    r"\b((?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\s+\d{1,2},?\s+\d{4})\b",
    // Written: 25 December 2024 or 25 Dec 2024
    r"\b(\d{1,2}\s+(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\s+\d{4})\b",
];

/// Standard datetime forms (date plus time of day), tried before falling
/// back to date-only extraction.
pub const DATETIME_PATTERNS: &[&str] = &[
    // ISO with time: 2024-12-25T14:30:00, 2024-12-25 14:30
    r"\b(\d{4}[-/]\d{1,2}[-/]\d{1,2}[T\s]\d{1,2}:\d{2}(?::\d{2})?(?:\s*(?:AM|PM|am|pm))?)\b",
    // US with time: 12/25/2024 2:30 PM
    r"\b(\d{1,2}[-/]\d{1,2}[-/]\d{4}\s+\d{1,2}:\d{2}(?::\d{2})?\s*(?:AM|PM|am|pm)?)\b",
];
