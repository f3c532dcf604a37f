//! Combination of ingested tables: diagonal concatenation, deduplication, and the
//! optional pivot summary.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::config::{AggregateOp, DuplicatesConfig, PivotRule};
use crate::execution::{JobObserver, Severity};
use crate::pipeline::ORIGIN_COLUMN;
use crate::types::{compare_values, Column, DataType, Table, Value, ValueKey};

/// Concatenate tables "diagonally": the output carries the union of all column names,
/// null-filling columns a table does not have.
///
/// Column order is first-seen order across the inputs, except the origin column which
/// always moves last. Inputs are expected to be harmonized already, so a column's type
/// is its first non-null observed type.
pub fn concat_diagonal(tables: &[Table]) -> Table {
    let mut order: Vec<String> = Vec::new();
    let mut dtypes: HashMap<String, DataType> = HashMap::new();
    for table in tables {
        for column in &table.columns {
            match dtypes.get(&column.name) {
                None => {
                    order.push(column.name.clone());
                    dtypes.insert(column.name.clone(), column.dtype);
                }
                Some(DataType::Null) if column.dtype != DataType::Null => {
                    dtypes.insert(column.name.clone(), column.dtype);
                }
                Some(_) => {}
            }
        }
    }
    if let Some(pos) = order.iter().position(|n| n == ORIGIN_COLUMN) {
        let origin = order.remove(pos);
        order.push(origin);
    }

    let total: usize = tables.iter().map(Table::height).sum();
    let columns = order
        .into_iter()
        .map(|name| {
            let dtype = dtypes.get(&name).copied().unwrap_or(DataType::Null);
            let mut values = Vec::with_capacity(total);
            for table in tables {
                match table.column(&name) {
                    Some(col) => values.extend(col.values.iter().cloned()),
                    None => values.extend(std::iter::repeat_n(Value::Null, table.height())),
                }
            }
            Column::new(name, dtype, values)
        })
        .collect();
    Table::new(columns)
}

/// Drop duplicate rows, keeping the first occurrence.
///
/// Keys are the configured key columns that exist in the table; an empty configured
/// list means the whole row (every column) is the key. Returns the deduplicated table
/// plus, when `generate_report` is set and anything was removed, the complementary
/// table of removed rows.
pub fn deduplicate(
    table: &Table,
    config: &DuplicatesConfig,
    observer: &dyn JobObserver,
) -> (Table, Option<Table>) {
    let key_columns: Vec<&Column> = if config.key_columns.is_empty() {
        table.columns.iter().collect()
    } else {
        let mut present = Vec::new();
        for name in &config.key_columns {
            match table.column(name) {
                Some(col) => present.push(col),
                None => observer.on_log(
                    &format!("duplicate key column '{name}' not found, ignoring"),
                    Severity::Warning,
                ),
            }
        }
        present
    };
    if key_columns.is_empty() {
        observer.on_log(
            "no usable duplicate key columns, skipping deduplication",
            Severity::Warning,
        );
        return (table.clone(), None);
    }

    let mut seen: HashSet<Vec<ValueKey>> = HashSet::new();
    let mut kept: Vec<usize> = Vec::new();
    let mut removed: Vec<usize> = Vec::new();
    for i in 0..table.height() {
        let key: Vec<ValueKey> = key_columns.iter().map(|c| ValueKey::from(&c.values[i])).collect();
        if seen.insert(key) {
            kept.push(i);
        } else {
            removed.push(i);
        }
    }

    observer.on_log(
        &format!("removed {} duplicate rows, {} kept", removed.len(), kept.len()),
        Severity::Info,
    );

    let report = if config.generate_report && !removed.is_empty() {
        Some(table.take_rows(&removed))
    } else {
        None
    };
    (table.take_rows(&kept), report)
}

/// Build the pivot summary table for `rule`, or `None` when the rule cannot be applied.
///
/// Groups rows by the rule's group-by columns, aggregates each measure, and sorts the
/// result ascending by the group-by columns (nulls first). Aggregated columns are named
/// `{column}_{op}`. A missing group-by column voids the whole pivot; a missing or
/// unusable measure column only drops that measure.
pub fn build_pivot(table: &Table, rule: &PivotRule, observer: &dyn JobObserver) -> Option<Table> {
    let mut group_columns: Vec<&Column> = Vec::new();
    for name in &rule.group_by {
        match table.column(name) {
            Some(col) => group_columns.push(col),
            None => {
                observer.on_log(
                    &format!("pivot group column '{name}' not found, skipping pivot"),
                    Severity::Warning,
                );
                return None;
            }
        }
    }
    if group_columns.is_empty() {
        observer.on_log("pivot has no group columns, skipping pivot", Severity::Warning);
        return None;
    }

    // Group row indices by key, preserving first-seen group order; sorted afterwards.
    let mut group_order: Vec<Vec<ValueKey>> = Vec::new();
    let mut groups: HashMap<Vec<ValueKey>, Vec<usize>> = HashMap::new();
    for i in 0..table.height() {
        let key: Vec<ValueKey> = group_columns.iter().map(|c| ValueKey::from(&c.values[i])).collect();
        match groups.get_mut(&key) {
            Some(rows) => rows.push(i),
            None => {
                group_order.push(key.clone());
                groups.insert(key, vec![i]);
            }
        }
    }

    let mut group_rows: Vec<Vec<usize>> = group_order
        .iter()
        .map(|key| groups[key].clone())
        .collect();
    group_rows.sort_by(|a, b| {
        for col in &group_columns {
            let ord = compare_null_first(&col.values[a[0]], &col.values[b[0]]);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let mut out_columns: Vec<Column> = group_columns
        .iter()
        .map(|col| {
            let values = group_rows.iter().map(|rows| col.values[rows[0]].clone()).collect();
            Column::new(col.name.clone(), col.dtype, values)
        })
        .collect();

    for agg in &rule.aggregations {
        let Some(column) = table.column(&agg.column) else {
            observer.on_log(
                &format!("pivot measure column '{}' not found, dropping measure", agg.column),
                Severity::Warning,
            );
            continue;
        };
        let Some(aggregated) = aggregate_column(column, agg.op, &group_rows) else {
            observer.on_log(
                &format!(
                    "cannot apply {:?} to '{}' ({:?}), dropping measure",
                    agg.op, column.name, column.dtype
                ),
                Severity::Warning,
            );
            continue;
        };
        out_columns.push(aggregated);
    }

    Some(Table::new(out_columns))
}

fn compare_null_first(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Aggregate one column over the grouped row index sets, or `None` when the operation
/// does not apply to the column's type.
fn aggregate_column(column: &Column, op: AggregateOp, group_rows: &[Vec<usize>]) -> Option<Column> {
    if matches!(op, AggregateOp::Sum | AggregateOp::Mean) && !column.dtype.is_numeric() {
        return None;
    }

    let name = format!("{}_{}", column.name, op.suffix());
    let values: Vec<Value> = group_rows
        .iter()
        .map(|rows| match op {
            AggregateOp::Count => Value::Int64(rows.len() as i64),
            AggregateOp::DistinctCount => {
                let distinct: HashSet<ValueKey> =
                    rows.iter().map(|&i| ValueKey::from(&column.values[i])).collect();
                Value::Int64(distinct.len() as i64)
            }
            AggregateOp::Sum => sum_values(column, rows),
            AggregateOp::Mean => mean_values(column, rows),
            AggregateOp::Min => extreme_value(column, rows, Ordering::Less),
            AggregateOp::Max => extreme_value(column, rows, Ordering::Greater),
        })
        .collect();

    let dtype = match op {
        AggregateOp::Count | AggregateOp::DistinctCount => DataType::Int64,
        AggregateOp::Mean => DataType::Float64,
        AggregateOp::Sum => {
            if column.dtype == DataType::Int64 {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        AggregateOp::Min | AggregateOp::Max => column.dtype,
    };
    Some(Column::new(name, dtype, values))
}

fn sum_values(column: &Column, rows: &[usize]) -> Value {
    let mut any = false;
    if column.dtype == DataType::Int64 {
        let mut acc: i64 = 0;
        for &i in rows {
            if let Value::Int64(v) = column.values[i] {
                acc += v;
                any = true;
            }
        }
        if any { Value::Int64(acc) } else { Value::Null }
    } else {
        let mut acc: f64 = 0.0;
        for &i in rows {
            match column.values[i] {
                Value::Float64(v) => {
                    acc += v;
                    any = true;
                }
                Value::Int64(v) => {
                    acc += v as f64;
                    any = true;
                }
                _ => {}
            }
        }
        if any { Value::Float64(acc) } else { Value::Null }
    }
}

fn mean_values(column: &Column, rows: &[usize]) -> Value {
    let mut acc = 0.0;
    let mut count = 0usize;
    for &i in rows {
        match column.values[i] {
            Value::Float64(v) => {
                acc += v;
                count += 1;
            }
            Value::Int64(v) => {
                acc += v as f64;
                count += 1;
            }
            _ => {}
        }
    }
    if count == 0 {
        Value::Null
    } else {
        Value::Float64(acc / count as f64)
    }
}

fn extreme_value(column: &Column, rows: &[usize], keep_when: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for &i in rows {
        let v = &column.values[i];
        if v.is_null() {
            continue;
        }
        best = match best {
            None => Some(v),
            Some(b) => {
                if compare_values(v, b) == Some(keep_when) {
                    Some(v)
                } else {
                    Some(b)
                }
            }
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Aggregation;
    use crate::execution::NullJobObserver;

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    #[test]
    fn concat_unions_columns_and_null_fills() {
        let a = Table::new(vec![
            Column::new("id", DataType::Int64, vec![Value::Int64(1)]),
            Column::new(ORIGIN_COLUMN, DataType::Utf8, vec![utf8("a.csv")]),
        ]);
        let b = Table::new(vec![
            Column::new("id", DataType::Int64, vec![Value::Int64(2)]),
            Column::new("extra", DataType::Utf8, vec![utf8("x")]),
            Column::new(ORIGIN_COLUMN, DataType::Utf8, vec![utf8("b.csv")]),
        ]);
        let out = concat_diagonal(&[a, b]);
        assert_eq!(
            out.column_names().collect::<Vec<_>>(),
            vec!["id", "extra", ORIGIN_COLUMN]
        );
        assert_eq!(out.height(), 2);
        assert_eq!(
            out.column("extra").unwrap().values,
            vec![Value::Null, utf8("x")]
        );
    }

    #[test]
    fn concat_keeps_origin_last_even_when_seen_first() {
        let a = Table::new(vec![
            Column::new(ORIGIN_COLUMN, DataType::Utf8, vec![utf8("a.csv")]),
            Column::new("id", DataType::Int64, vec![Value::Int64(1)]),
        ]);
        let out = concat_diagonal(&[a]);
        assert_eq!(
            out.column_names().collect::<Vec<_>>(),
            vec!["id", ORIGIN_COLUMN]
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let table = Table::new(vec![
            Column::new(
                "id",
                DataType::Int64,
                vec![Value::Int64(1), Value::Int64(1), Value::Int64(2)],
            ),
            Column::new("tag", DataType::Utf8, vec![utf8("a"), utf8("b"), utf8("c")]),
        ]);
        let config = DuplicatesConfig {
            key_columns: vec!["id".to_string()],
            generate_report: true,
        };
        let (kept, removed) = deduplicate(&table, &config, &NullJobObserver);
        assert_eq!(kept.height(), 2);
        assert_eq!(kept.column("tag").unwrap().values, vec![utf8("a"), utf8("c")]);
        let removed = removed.unwrap();
        assert_eq!(removed.height(), 1);
        assert_eq!(removed.column("tag").unwrap().values, vec![utf8("b")]);
    }

    #[test]
    fn dedup_empty_key_list_means_whole_row() {
        let table = Table::new(vec![Column::new(
            "id",
            DataType::Int64,
            vec![Value::Int64(1), Value::Int64(1), Value::Int64(2)],
        )]);
        let config = DuplicatesConfig {
            key_columns: Vec::new(),
            generate_report: false,
        };
        let (kept, removed) = deduplicate(&table, &config, &NullJobObserver);
        assert_eq!(kept.height(), 2);
        assert!(removed.is_none());
    }

    #[test]
    fn dedup_with_only_missing_keys_is_skipped() {
        let table = Table::new(vec![Column::new(
            "id",
            DataType::Int64,
            vec![Value::Int64(1), Value::Int64(1)],
        )]);
        let config = DuplicatesConfig {
            key_columns: vec!["missing".to_string()],
            generate_report: false,
        };
        let (kept, _) = deduplicate(&table, &config, &NullJobObserver);
        assert_eq!(kept.height(), 2);
    }

    fn pivot_fixture() -> Table {
        Table::new(vec![
            Column::new(
                "grupo",
                DataType::Utf8,
                vec![utf8("b"), utf8("a"), utf8("b"), utf8("a"), utf8("a")],
            ),
            Column::new(
                "valor",
                DataType::Int64,
                vec![
                    Value::Int64(10),
                    Value::Int64(1),
                    Value::Int64(20),
                    Value::Int64(2),
                    Value::Null,
                ],
            ),
        ])
    }

    #[test]
    fn pivot_groups_sorts_and_names_measures() {
        let rule = PivotRule {
            group_by: vec!["grupo".to_string()],
            aggregations: vec![
                Aggregation {
                    column: "valor".to_string(),
                    op: AggregateOp::Sum,
                },
                Aggregation {
                    column: "valor".to_string(),
                    op: AggregateOp::Count,
                },
                Aggregation {
                    column: "valor".to_string(),
                    op: AggregateOp::Mean,
                },
            ],
            only_pivot: false,
        };
        let out = build_pivot(&pivot_fixture(), &rule, &NullJobObserver).unwrap();
        assert_eq!(
            out.column_names().collect::<Vec<_>>(),
            vec!["grupo", "valor_Sum", "valor_Count", "valor_Mean"]
        );
        // Sorted ascending by group key.
        assert_eq!(out.column("grupo").unwrap().values, vec![utf8("a"), utf8("b")]);
        assert_eq!(
            out.column("valor_Sum").unwrap().values,
            vec![Value::Int64(3), Value::Int64(30)]
        );
        // Count counts all rows of the group, null cells included.
        assert_eq!(
            out.column("valor_Count").unwrap().values,
            vec![Value::Int64(3), Value::Int64(2)]
        );
        // Mean skips nulls.
        assert_eq!(
            out.column("valor_Mean").unwrap().values,
            vec![Value::Float64(1.5), Value::Float64(15.0)]
        );
    }

    #[test]
    fn distinct_count_counts_null_as_one_value() {
        let rule = PivotRule {
            group_by: vec!["grupo".to_string()],
            aggregations: vec![Aggregation {
                column: "valor".to_string(),
                op: AggregateOp::DistinctCount,
            }],
            only_pivot: false,
        };
        let out = build_pivot(&pivot_fixture(), &rule, &NullJobObserver).unwrap();
        // Group "a" holds {1, 2, null}: three distinct values.
        assert_eq!(
            out.column("valor_DistinctCount").unwrap().values,
            vec![Value::Int64(3), Value::Int64(2)]
        );
    }

    #[test]
    fn missing_group_column_voids_the_pivot() {
        let rule = PivotRule {
            group_by: vec!["missing".to_string()],
            aggregations: Vec::new(),
            only_pivot: false,
        };
        assert!(build_pivot(&pivot_fixture(), &rule, &NullJobObserver).is_none());
    }

    #[test]
    fn unusable_measure_is_dropped_not_fatal() {
        let rule = PivotRule {
            group_by: vec!["grupo".to_string()],
            aggregations: vec![
                Aggregation {
                    column: "grupo".to_string(),
                    op: AggregateOp::Sum,
                },
                Aggregation {
                    column: "grupo".to_string(),
                    op: AggregateOp::Max,
                },
            ],
            only_pivot: false,
        };
        let out = build_pivot(&pivot_fixture(), &rule, &NullJobObserver).unwrap();
        // Sum over a string column is dropped; Max works on any comparable type.
        assert_eq!(
            out.column_names().collect::<Vec<_>>(),
            vec!["grupo", "grupo_Max"]
        );
    }
}
