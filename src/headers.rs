//! Header-row location and header-name normalization.
//!
//! Both the fingerprint analyzer (exploration phase) and the ingestion pipeline
//! (execution phase) call these functions on the same raw prefix sample, and both must
//! arrive at identical structure: the execution phase re-derives headers instead of
//! trusting analysis output, since files may have changed in between.

use std::collections::{HashMap, HashSet};

use crate::types::{DataType, Value};

/// Number of raw rows sampled from the top of each source item for header detection.
pub const PREREAD_ROWS: usize = 20;

/// Return the zero-based index of the most likely header row in `rows`.
///
/// Each candidate row (every row except the last) gets a composite score:
///
/// - a structural score rewarding distinct, non-numeric string cells and penalizing
///   nulls (`-100` for an all-null row);
/// - a transition bonus comparing the row to the one below it, rewarding string-over-number
///   cell pairs ("label row above data row") and mildly penalizing same-type pairs.
///
/// The first strictly-best row wins; a degenerate sample (height <= 1) yields 0.
pub fn find_header_row(rows: &[Vec<Value>]) -> usize {
    let rows_to_check = rows.len().min(PREREAD_ROWS);
    if rows_to_check <= 1 {
        return 0;
    }

    let mut best_score = -999.0_f64;
    let mut best_index = 0usize;

    for i in 0..rows_to_check - 1 {
        let current = &rows[i];
        let next = &rows[i + 1];

        let score = structural_score(current) + transition_bonus(current, next);
        if score > best_score {
            best_score = score;
            best_index = i;
        }
    }

    best_index
}

fn structural_score(row: &[Value]) -> f64 {
    let total_cells = row.len();
    let mut null_count = 0usize;
    let mut string_count = 0usize;
    let mut numeric_string_count = 0usize;

    for value in row {
        match value {
            Value::Null => null_count += 1,
            Value::Utf8(s) if !s.trim().is_empty() => {
                string_count += 1;
                let trimmed = s.trim();
                if trimmed.chars().all(|c| c.is_numeric()) {
                    numeric_string_count += 1;
                }
            }
            _ => {}
        }
    }

    let non_null = total_cells - null_count;
    if non_null == 0 {
        return -100.0;
    }

    let distinct: HashSet<String> = row
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.render())
        .collect();

    let uniqueness_ratio = distinct.len() as f64 / non_null as f64;
    let string_ratio = string_count as f64 / non_null as f64;
    let numeric_string_ratio = numeric_string_count as f64 / non_null as f64;
    let null_share = null_count as f64 / total_cells as f64;

    uniqueness_ratio * 3.0 + string_ratio * 3.0 - numeric_string_ratio * 5.0 - null_share * 2.0
}

fn transition_bonus(current: &[Value], next: &[Value]) -> f64 {
    let cells = current.len();
    if cells == 0 {
        return 0.0;
    }

    let mut score = 0.0_f64;
    for j in 0..cells {
        let cur = current.get(j).unwrap_or(&Value::Null);
        let nxt = next.get(j).unwrap_or(&Value::Null);
        if cur.data_type() == DataType::Utf8 && nxt.data_type().is_numeric() {
            score += 1.0;
        } else if cur.data_type() == nxt.data_type() {
            score -= 0.2;
        }
    }

    (score / cells as f64) * 5.0
}

/// Canonicalize a raw header string into a comparison key.
///
/// Transliterates to base Latin (strips diacritics), splits camel-case, folds `.`/`_`/`-`
/// runs into spaces, lowercases, and keeps only `[a-z0-9]`. Two headers denote the same
/// logical column candidate iff their keys are byte-equal.
pub fn normalize_header_name(name: &str) -> String {
    let transliterated = deunicode::deunicode(name);

    // Separator folding and camel-case splitting happen on the case-preserved copy;
    // lowercasing first would destroy the camel boundary signal.
    let mut spaced = String::with_capacity(transliterated.len() + 4);
    let mut prev_was_lower = false;
    for c in transliterated.chars() {
        if matches!(c, '.' | '_' | '-') {
            if !spaced.ends_with(' ') {
                spaced.push(' ');
            }
            prev_was_lower = false;
            continue;
        }
        if prev_was_lower && c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        prev_was_lower = c.is_ascii_lowercase();
        spaced.push(c);
    }

    spaced
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Deduplicate a raw ordered header list for one source item.
///
/// Names occurring once are untouched; the 2nd, 3rd, ... occurrence of a repeated name is
/// suffixed `_2`, `_3`, ... in order of appearance. Idempotent on an already-unique list.
pub fn make_headers_unique(names: &[String]) -> Vec<String> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for name in names {
        *totals.entry(name.as_str()).or_insert(0) += 1;
    }
    if totals.values().all(|&c| c == 1) {
        return names.to_vec();
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    names
        .iter()
        .map(|name| {
            let n = seen.entry(name.as_str()).or_insert(0);
            *n += 1;
            if totals[name.as_str()] > 1 && *n > 1 {
                format!("{name}_{n}")
            } else {
                name.clone()
            }
        })
        .collect()
}
