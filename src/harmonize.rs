//! Cross-source type harmonization.
//!
//! After per-item ingestion the same final column can carry different types in different
//! tables (one file's `valor` parsed as integers, another's as floats). Before the
//! tables can be concatenated, each final column gets one resolved type and every
//! divergent column is lenient-cast to it.
//!
//! Resolution widens, never narrows: a column never loses information to a stricter
//! type, and re-running harmonization over already-harmonized tables is a no-op.

use std::collections::HashMap;

use crate::cast::cast_column_lenient;
use crate::execution::{JobObserver, Severity};
use crate::types::{DataType, Table};

/// Resolve one common type per column name and cast every divergent column to it.
///
/// Columns absent from some tables are fine; the concatenation step null-fills them.
pub fn harmonize_tables(tables: &mut [Table], observer: &dyn JobObserver) {
    let resolved = resolve_column_types(tables);

    for table in tables.iter_mut() {
        for column in &mut table.columns {
            let Some(&target) = resolved.get(&column.name) else {
                continue;
            };
            if column.dtype != target && target != DataType::Null {
                *column = cast_column_lenient(column, target);
            }
        }
    }

    for (name, dtype) in &resolved {
        observer.on_log(
            &format!("column '{name}' harmonized to {dtype:?}"),
            Severity::Info,
        );
    }
}

/// Observed types per column name, resolved through [`resolve_common_type`].
fn resolve_column_types(tables: &[Table]) -> HashMap<String, DataType> {
    let mut order: Vec<String> = Vec::new();
    let mut observed: HashMap<String, Vec<DataType>> = HashMap::new();
    for table in tables {
        for column in &table.columns {
            let types = match observed.get_mut(&column.name) {
                Some(types) => types,
                None => {
                    order.push(column.name.clone());
                    observed.entry(column.name.clone()).or_default()
                }
            };
            if !types.contains(&column.dtype) {
                types.push(column.dtype);
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            let types = observed.remove(&name).unwrap_or_default();
            (name, resolve_common_type(&types))
        })
        .collect()
}

/// Pick the common type for a set of observed column types, in first-encounter order.
///
/// The ladder, from widest to narrowest:
/// - any string column keeps everything as string;
/// - temporal mixed with numeric or boolean degrades to string (no sane numeric
///   reading of a date);
/// - boolean mixed with numeric degrades to string;
/// - any float among numerics widens integers to float;
/// - temporal-only mixes keep the first temporal type encountered;
/// - a single observed type stands;
/// - all-null columns stay [`DataType::Null`] and are left for concatenation to type.
pub fn resolve_common_type(observed: &[DataType]) -> DataType {
    let concrete: Vec<DataType> = observed
        .iter()
        .copied()
        .filter(|t| *t != DataType::Null)
        .collect();

    match concrete.as_slice() {
        [] => DataType::Null,
        [only] => *only,
        types => {
            if types.contains(&DataType::Utf8) {
                return DataType::Utf8;
            }
            let any_temporal = types.iter().any(|t| t.is_temporal());
            let all_temporal = types.iter().all(|t| t.is_temporal());
            if any_temporal && !all_temporal {
                return DataType::Utf8;
            }
            if all_temporal {
                // Date/Datetime mix: first encountered wins.
                return types[0];
            }
            if types.contains(&DataType::Bool) {
                // Bool plus numeric; bool alone was the single-type case.
                return DataType::Utf8;
            }
            if types.contains(&DataType::Float64) {
                DataType::Float64
            } else {
                DataType::Int64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::NullJobObserver;
    use crate::types::{Column, Value};

    #[test]
    fn ladder_resolves_expected_types() {
        use DataType::*;
        assert_eq!(resolve_common_type(&[Int64, Float64]), Float64);
        assert_eq!(resolve_common_type(&[Int64, Utf8]), Utf8);
        assert_eq!(resolve_common_type(&[Datetime, Int64]), Utf8);
        assert_eq!(resolve_common_type(&[Bool, Int64]), Utf8);
        assert_eq!(resolve_common_type(&[Bool]), Bool);
        assert_eq!(resolve_common_type(&[Datetime, Date]), Datetime);
        assert_eq!(resolve_common_type(&[Date, Datetime]), Date);
        assert_eq!(resolve_common_type(&[Null, Int64]), Int64);
        assert_eq!(resolve_common_type(&[Null]), Null);
        assert_eq!(resolve_common_type(&[]), Null);
    }

    #[test]
    fn divergent_columns_are_cast_to_the_resolved_type() {
        let mut tables = vec![
            Table::new(vec![Column::new(
                "valor",
                DataType::Int64,
                vec![Value::Int64(1), Value::Int64(2)],
            )]),
            Table::new(vec![Column::new(
                "valor",
                DataType::Float64,
                vec![Value::Float64(1.5)],
            )]),
        ];
        harmonize_tables(&mut tables, &NullJobObserver);
        assert_eq!(tables[0].column("valor").unwrap().dtype, DataType::Float64);
        assert_eq!(
            tables[0].column("valor").unwrap().values,
            vec![Value::Float64(1.0), Value::Float64(2.0)]
        );
        assert_eq!(tables[1].column("valor").unwrap().dtype, DataType::Float64);
    }

    #[test]
    fn string_wins_over_everything() {
        let mut tables = vec![
            Table::new(vec![Column::new("doc", DataType::Int64, vec![Value::Int64(42)])]),
            Table::new(vec![Column::new(
                "doc",
                DataType::Utf8,
                vec![Value::Utf8("42-A".into())],
            )]),
        ];
        harmonize_tables(&mut tables, &NullJobObserver);
        assert_eq!(tables[0].column("doc").unwrap().dtype, DataType::Utf8);
        assert_eq!(
            tables[0].column("doc").unwrap().values,
            vec![Value::Utf8("42".into())]
        );
    }

    #[test]
    fn harmonization_is_idempotent() {
        let mut tables = vec![
            Table::new(vec![Column::new("v", DataType::Int64, vec![Value::Int64(1)])]),
            Table::new(vec![Column::new(
                "v",
                DataType::Float64,
                vec![Value::Float64(2.0)],
            )]),
        ];
        harmonize_tables(&mut tables, &NullJobObserver);
        let snapshot = tables.clone();
        harmonize_tables(&mut tables, &NullJobObserver);
        assert_eq!(tables, snapshot);
    }
}
