//! The per-item ingestion and mapping pipeline: the execution phase.
//!
//! For each configured source item this re-derives structure from scratch (header
//! location, unique header names), slices the data region, applies the user-approved
//! name mapping with multi-source coalescing, applies declared types, evaluates filter
//! rules, and tags rows with their origin. One item's failure never aborts the run; the
//! caller logs it and moves on.

pub mod filters;

use log::debug;

use crate::cast::{cast_column_lenient, fix_column_type};
use crate::config::{DeclaredType, FilterRule, HeaderMapping, SourceItem};
use crate::error::ConsolidateResult;
use crate::execution::{JobObserver, Severity};
use crate::headers::{find_header_row, make_headers_unique, PREREAD_ROWS};
use crate::ingestion::{header_strings, read_raw_rows, table_from_raw};
use crate::types::{Column, DataType, Table, Value};

/// Name of the trailing source-label column appended to every ingested table.
pub const ORIGIN_COLUMN: &str = "Origin";

/// Ingest one source item into a typed, mapped, filtered table.
///
/// Returns `Ok(None)` when the item is skipped (empty data region, nothing surviving
/// the mapping); the skip reason is reported through `observer` as a warning. Read
/// errors propagate to the caller, which treats them as item-local.
pub fn ingest_item(
    item: &SourceItem,
    delimiter: u8,
    mapping: &HeaderMapping,
    filter_rules: &[FilterRule],
    observer: &dyn JobObserver,
) -> ConsolidateResult<Option<Table>> {
    let label = item.label();

    // Header detection runs on the same bounded prefix the analyzer saw, but always
    // against the file as it is now.
    let raw = read_raw_rows(item, delimiter, None)?;
    if raw.is_empty() {
        observer.on_log(&format!("{label}: no rows, skipping"), Severity::Warning);
        return Ok(None);
    }

    let header_index = find_header_row(&raw[..raw.len().min(PREREAD_ROWS)]);
    let header_names = make_headers_unique(&header_strings(&raw[header_index]));

    let data_rows = &raw[(header_index + 1).min(raw.len())..];
    if data_rows.is_empty() {
        observer.on_log(
            &format!("{label}: empty after header row {header_index}, skipping"),
            Severity::Warning,
        );
        return Ok(None);
    }
    debug!("{label}: header at row {header_index}, {} data rows", data_rows.len());

    let table = table_from_raw(&header_names, data_rows);

    let mapped = if mapping.is_empty() {
        table
    } else {
        match apply_mapping(&table, item, mapping, observer) {
            Some(mapped) => mapped,
            None => {
                observer.on_log(
                    &format!("{label}: no columns match the mapping, skipping"),
                    Severity::Warning,
                );
                return Ok(None);
            }
        }
    };
    if mapped.width() == 0 {
        observer.on_log(
            &format!("{label}: no columns left after mapping, skipping"),
            Severity::Warning,
        );
        return Ok(None);
    }

    let typed = apply_declared_types(mapped, mapping, observer, &label);

    let filtered = match filters::apply_filters(&typed, filter_rules, observer) {
        Some(filtered) => {
            observer.on_log(
                &format!(
                    "{label}: filter kept {} of {} rows",
                    filtered.height(),
                    typed.height()
                ),
                Severity::Info,
            );
            filtered
        }
        None => typed,
    };

    let mut tagged = filtered;
    let height = tagged.height();
    tagged.push_column(Column::new(
        ORIGIN_COLUMN,
        DataType::Utf8,
        vec![Value::Utf8(label); height],
    ));
    Ok(Some(tagged))
}

/// Apply the name mapping with first-non-null coalescing.
///
/// Source columns are grouped by final name in the item's own column order (which is
/// also the coalescing priority order). Returns `None` when nothing survives.
fn apply_mapping(
    table: &Table,
    item: &SourceItem,
    mapping: &HeaderMapping,
    observer: &dyn JobObserver,
) -> Option<Table> {
    let mut final_order: Vec<String> = Vec::new();
    let mut sources_for: std::collections::HashMap<String, Vec<&Column>> =
        std::collections::HashMap::new();

    for column in &table.columns {
        let entry = mapping.lookup(&column.name, &item.path, item.sheet.as_deref());
        let Some(entry) = entry else { continue };
        if !entry.include {
            continue;
        }
        if !sources_for.contains_key(&entry.final_name) {
            final_order.push(entry.final_name.clone());
        }
        sources_for.entry(entry.final_name.clone()).or_default().push(column);
    }

    if final_order.is_empty() {
        return None;
    }

    let columns = final_order
        .into_iter()
        .map(|final_name| {
            let sources = sources_for.remove(&final_name).unwrap_or_default();
            if sources.len() == 1 {
                let mut col = sources[0].clone();
                col.name = final_name;
                col
            } else {
                observer.on_log(
                    &format!(
                        "{}: coalescing {:?} into '{final_name}'",
                        item.label(),
                        sources.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
                    ),
                    Severity::Info,
                );
                coalesce_columns(final_name, &sources)
            }
        })
        .collect();
    Some(Table::new(columns))
}

/// First-non-null-wins combination of several source columns, in priority order.
fn coalesce_columns(final_name: String, sources: &[&Column]) -> Column {
    let height = sources.first().map(|c| c.len()).unwrap_or(0);
    let values: Vec<Value> = (0..height)
        .map(|i| {
            sources
                .iter()
                .map(|c| &c.values[i])
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect();
    // Sources of differing types can interleave; re-fix the combined column.
    fix_column_type(final_name, values)
}

/// Cast every column with a non-`Auto` declared type, leniently.
fn apply_declared_types(
    table: Table,
    mapping: &HeaderMapping,
    observer: &dyn JobObserver,
    label: &str,
) -> Table {
    if mapping.is_empty() {
        return table;
    }
    let columns = table
        .columns
        .into_iter()
        .map(|column| {
            let declared = mapping
                .declared_type_for(&column.name)
                .unwrap_or(DeclaredType::Auto);
            match declared.target() {
                Some(target) if target != column.dtype => {
                    observer.on_log(
                        &format!("{label}: casting '{}' to {target:?}", column.name),
                        Severity::Info,
                    );
                    cast_column_lenient(&column, target)
                }
                _ => column,
            }
        })
        .collect();
    Table::new(columns)
}
