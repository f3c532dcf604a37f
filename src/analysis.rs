//! Column fingerprint analysis: the exploration phase.
//!
//! Samples a bounded prefix of every configured source item, infers a coarse type and
//! null ratio per column, and groups columns across all inputs into candidate synonym
//! groups. The groups go to the collaborator for human review (split/merge) and come
//! back as a finalized [`crate::config::HeaderMapping`].
//!
//! Fingerprints live only for the duration of one analysis run; the execution phase
//! re-derives all structure from the files themselves.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cast::strict_cast;
use crate::config::{SourceItem, SourceKey};
use crate::error::ConsolidateResult;
use crate::execution::{CancellationToken, JobObserver, JobOutcome, Severity};
use crate::headers::{find_header_row, make_headers_unique, normalize_header_name, PREREAD_ROWS};
use crate::ingestion::{header_strings, read_raw_rows, table_from_raw};
use crate::types::{Column, DataType, Table};

/// Number of post-header rows sampled per column for type inference.
pub const SAMPLE_ROWS: usize = 200;

/// Profile of one column of one source item.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFingerprint {
    /// Which original column of which item this profiles.
    pub source: SourceKey,
    /// Normalized comparison key of the column name.
    pub normalized_name: String,
    /// Coarse inferred type (`Utf8` when nothing stricter fits).
    pub inferred_type: DataType,
    /// Share of null cells in the sample.
    pub null_ratio: f64,
}

/// An ordered set of source columns believed to denote the same logical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderGroup {
    /// Member columns, in discovery order.
    pub members: Vec<SourceKey>,
}

/// Analyze all source items and propose candidate column groups.
///
/// Item-level read failures are logged and skipped; the run only fails outright on
/// conditions that make every item unreadable. Cancellation is checked at every item
/// boundary and reported as [`JobOutcome::Cancelled`], never as an error.
pub fn analyze_sources(
    sources: &[SourceItem],
    delimiter: u8,
    observer: &dyn JobObserver,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<Vec<HeaderGroup>>> {
    let mut fingerprints: Vec<ColumnFingerprint> = Vec::new();

    for item in sources {
        if cancel.is_cancelled() {
            observer.on_log("analysis cancelled", Severity::Warning);
            return Ok(JobOutcome::Cancelled);
        }

        observer.on_log(&format!("analyzing {}", item.label()), Severity::Info);
        match fingerprint_item(item, delimiter) {
            Ok(mut item_prints) => fingerprints.append(&mut item_prints),
            Err(e) => {
                observer.on_log(
                    &format!("failed to analyze {}: {e}", item.label()),
                    Severity::Error,
                );
            }
        }
    }

    Ok(JobOutcome::Completed(group_fingerprints(fingerprints)))
}

fn fingerprint_item(item: &SourceItem, delimiter: u8) -> ConsolidateResult<Vec<ColumnFingerprint>> {
    // One bounded read covers both the header-detection prefix and the data sample.
    let raw = read_raw_rows(item, delimiter, Some(PREREAD_ROWS + SAMPLE_ROWS))?;
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let header_index = find_header_row(&raw[..raw.len().min(PREREAD_ROWS)]);
    let header_names = make_headers_unique(&header_strings(&raw[header_index]));

    let data_rows = &raw[(header_index + 1).min(raw.len())..];
    let sample = &data_rows[..data_rows.len().min(SAMPLE_ROWS)];
    if sample.is_empty() {
        return Ok(Vec::new());
    }

    let table: Table = table_from_raw(&header_names, sample);
    let prints = table
        .columns
        .iter()
        .map(|column| {
            let (inferred_type, null_ratio) = profile_column(column);
            ColumnFingerprint {
                source: SourceKey {
                    column: column.name.clone(),
                    path: item.path.clone(),
                    sheet: item.sheet.clone(),
                },
                normalized_name: normalize_header_name(&column.name),
                inferred_type,
                null_ratio,
            }
        })
        .collect();
    Ok(prints)
}

/// Infer a coarse type for a sampled column.
///
/// Tries strict casts in order Int64, Float64, Datetime over the trimmed
/// non-null/non-blank cells; the first target that converts every cell wins, otherwise
/// the column is `Utf8`. An empty (all-blank) column profiles as `Utf8`.
pub fn profile_column(column: &Column) -> (DataType, f64) {
    let null_ratio = column.null_ratio();

    let candidates: Vec<&crate::types::Value> = column
        .values
        .iter()
        .filter(|v| !v.is_null())
        .filter(|v| match v {
            crate::types::Value::Utf8(s) => !s.trim().is_empty(),
            _ => true,
        })
        .collect();
    if candidates.is_empty() {
        return (DataType::Utf8, null_ratio);
    }

    for target in [DataType::Int64, DataType::Float64, DataType::Datetime] {
        if candidates
            .iter()
            .all(|v| matches!(strict_cast(v, target), Some(cast) if !cast.is_null()))
        {
            return (target, null_ratio);
        }
    }
    (DataType::Utf8, null_ratio)
}

/// Group fingerprints into candidate synonym groups.
///
/// First by normalized name; a bucket of size one is a singleton group, a larger bucket
/// is split again by coarse type class (`numeric` merges Int64/Float64, everything else
/// groups by exact type). Same-name but type-incompatible columns are deliberately kept
/// apart so harmonization does not widen everything to string later.
pub fn group_fingerprints(fingerprints: Vec<ColumnFingerprint>) -> Vec<HeaderGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<ColumnFingerprint>> = HashMap::new();
    for fp in fingerprints {
        if !buckets.contains_key(&fp.normalized_name) {
            order.push(fp.normalized_name.clone());
        }
        buckets.entry(fp.normalized_name.clone()).or_default().push(fp);
    }

    let mut groups: Vec<HeaderGroup> = Vec::new();
    for name in order {
        let bucket = buckets.remove(&name).unwrap_or_default();
        if bucket.len() == 1 {
            groups.push(HeaderGroup {
                members: bucket.into_iter().map(|fp| fp.source).collect(),
            });
            continue;
        }

        let mut class_order: Vec<String> = Vec::new();
        let mut by_class: HashMap<String, Vec<SourceKey>> = HashMap::new();
        for fp in bucket {
            let class = type_class(fp.inferred_type);
            if !by_class.contains_key(&class) {
                class_order.push(class.clone());
            }
            by_class.entry(class).or_default().push(fp.source);
        }
        for class in class_order {
            groups.push(HeaderGroup {
                members: by_class.remove(&class).unwrap_or_default(),
            });
        }
    }
    groups
}

fn type_class(dtype: DataType) -> String {
    if dtype.is_numeric() {
        "numeric".to_string()
    } else {
        format!("{dtype:?}")
    }
}
