/// Date and datetime extraction with ISO normalization
///
/// Dates normalize to `YYYY-MM-DD`, datetimes to `YYYY-MM-DDTHH:MM:SS`.
/// Two-digit years pivot at 50: `<50` is 2000-relative, `>=50` is
/// 1900-relative. Calendar-invalid matches (month 13, day 32) are dropped
/// rather than emitted.
///
/// Every hit carries the raw matched span from the original-case text as
/// evidence; the normalized ISO string is only used as source when no
/// span exists.

use chrono::{NaiveDate, NaiveDateTime};

use super::{floor_char_boundary, patterns};

/// Window size searched after a context keyword hit.
const KEYWORD_WINDOW: usize = 100;

/// A normalized date or datetime plus the raw text span that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DateHit {
    /// Normalized ISO form (`YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`)
    pub iso: String,
    /// The matched substring as it appears in the input
    pub source: String,
}

/// Extract a date, normalized to `YYYY-MM-DD`.
///
/// A custom `pattern` (with optional explicit `format`) is tried against
/// the full text first. The standard pattern table then scans either the
/// whole text or, when context `keywords` are configured and one occurs,
/// the window starting at the first keyword hit.
pub fn extract_date(
    text: &str,
    text_lower: &str,
    pattern: Option<&str>,
    format: Option<&str>,
    keywords: &[String],
) -> Option<DateHit> {
    if let Some(custom) = pattern {
        if let Some(compiled) = patterns::compile(custom) {
            if let Some(caps) = compiled.captures(text) {
                let whole = caps.get(0).expect("group 0 always present");
                let matched = caps.get(1).map_or(whole, |g| g).as_str();
                if let Some(iso) = normalize_date(matched, format) {
                    return Some(DateHit {
                        iso,
                        source: whole.as_str().to_string(),
                    });
                }
            }
        }
    }

    let (offset, window) = keyword_window(text_lower, keywords);
    for table_pattern in patterns::DATE_PATTERNS {
        if let Some(compiled) = patterns::compile(table_pattern) {
            if let Some(m) = compiled.find(window) {
                if let Some(iso) = normalize_date(m.as_str(), None) {
                    let source =
                        original_slice(text, text_lower, offset + m.start(), offset + m.end());
                    return Some(DateHit { iso, source });
                }
            }
        }
    }

    None
}

/// Extract a datetime, normalized to `YYYY-MM-DDTHH:MM:SS`, falling back
/// to date extraction with a midnight time component.
pub fn extract_datetime(
    text: &str,
    text_lower: &str,
    pattern: Option<&str>,
    format: Option<&str>,
    keywords: &[String],
) -> Option<DateHit> {
    if let Some(custom) = pattern {
        if let Some(compiled) = patterns::compile(custom) {
            if let Some(caps) = compiled.captures(text) {
                let whole = caps.get(0).expect("group 0 always present");
                let matched = caps.get(1).map_or(whole, |g| g).as_str();
                if let Some(iso) = normalize_datetime(matched) {
                    return Some(DateHit {
                        iso,
                        source: whole.as_str().to_string(),
                    });
                }
            }
        }
    }

    for table_pattern in patterns::DATETIME_PATTERNS {
        if let Some(compiled) = patterns::compile(table_pattern) {
            if let Some(caps) = compiled.captures(text) {
                let whole = caps.get(0).expect("group 0 always present");
                let matched = caps.get(1).map_or(whole, |g| g).as_str();
                if let Some(iso) = normalize_datetime(matched) {
                    return Some(DateHit {
                        iso,
                        source: whole.as_str().to_string(),
                    });
                }
            }
        }
    }

    extract_date(text, text_lower, pattern, format, keywords).map(|hit| DateHit {
        iso: format!("{}T00:00:00", hit.iso),
        source: hit.source,
    })
}

/// Restrict the scan to a window after the first configured keyword hit.
/// Returns the window's byte offset into the text along with the slice.
fn keyword_window<'a>(text_lower: &'a str, keywords: &[String]) -> (usize, &'a str) {
    for keyword in keywords {
        let kw = keyword.to_lowercase();
        if let Some(pos) = text_lower.find(&kw) {
            let end = floor_char_boundary(text_lower, pos + KEYWORD_WINDOW);
            return (pos, &text_lower[pos..end]);
        }
    }
    (0, text_lower)
}

/// Recover the original-case slice for a span found in the lowercased
/// text. Lowercasing can change byte lengths outside ASCII; when the
/// offsets don't line up, the lowercased span is the best available.
fn original_slice(text: &str, text_lower: &str, start: usize, end: usize) -> String {
    if text.len() == text_lower.len() && text.is_char_boundary(start) && text.is_char_boundary(end)
    {
        text[start..end].to_string()
    } else {
        text_lower[start..end].to_string()
    }
}

/// Normalize a matched date string to ISO form.
///
/// An explicit chrono format is honored first; then the positional numeric
/// forms (year-first / US / US short-year); then written month names.
pub fn normalize_date(raw: &str, format: Option<&str>) -> Option<String> {
    let raw = raw.trim();

    if let Some(fmt) = format {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    if let Some(normalized) = normalize_numeric_date(raw) {
        return Some(normalized);
    }

    // chrono's month-name parsing accepts both full and abbreviated names.
    for fmt in ["%B %d, %Y", "%B %d %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    None
}

/// Numeric dates: interpretation is positional. A 4-digit leading part is
/// year-month-day; a 4-digit trailing part is month-day-year; a 2-digit
/// trailing part is month-day-year with the century pivot.
fn normalize_numeric_date(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.split(['-', '/']).map(str::trim).collect();
    if parts.len() != 3 {
        return None;
    }
    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    let (year, month, day) = if parts[0].len() == 4 {
        (nums[0] as i32, nums[1], nums[2])
    } else if parts[2].len() == 4 {
        (nums[2] as i32, nums[0], nums[1])
    } else if parts[2].len() <= 2 {
        (pivot_two_digit_year(nums[2]), nums[0], nums[1])
    } else {
        return None;
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn pivot_two_digit_year(yy: u32) -> i32 {
    if yy < 50 {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

/// Normalize a matched datetime string to `YYYY-MM-DDTHH:MM:SS`.
pub fn normalize_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim().replace('T', " ");

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%m-%d-%Y %I:%M %p",
        "%m-%d-%Y %I:%M:%S %p",
        "%m/%d/%Y %I:%M %p",
        "%m/%d/%Y %I:%M:%S %p",
        "%m-%d-%Y %H:%M",
        "%m/%d/%Y %H:%M",
    ];

    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&raw, fmt) {
            return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }

    None
}
