//! Filter-rule evaluation.
//!
//! Rules are grouped by target column. Within one column, `NotEqual`/`NotContains` are
//! exclusion rules and combine with AND; every other operator is inclusion and combines
//! with OR; a column's inclusion-OR and exclusion-AND combine with AND, and all column
//! predicates combine with AND across columns.
//!
//! Rule values are trimmed and lenient-cast to the column's current type before
//! comparison. A rule whose required value is missing/blank, or whose cast produces no
//! usable literal, is skipped with a warning instead of failing the item.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::cast::lenient_cast;
use crate::config::{FilterOperator, FilterRule, FilterValue};
use crate::execution::{JobObserver, Severity};
use crate::types::{compare_values, Column, DataType, Table, Value};

/// Apply `rules` to `table`.
///
/// Returns `None` when no rule targets a present column (or every such rule was
/// unusable), i.e. the table passed through unfiltered; otherwise the filtered table.
pub fn apply_filters(
    table: &Table,
    rules: &[FilterRule],
    observer: &dyn JobObserver,
) -> Option<Table> {
    let mut by_column: HashMap<&str, Vec<&FilterRule>> = HashMap::new();
    for rule in rules {
        if rule.column.is_empty() {
            continue;
        }
        by_column.entry(rule.column.as_str()).or_default().push(rule);
    }

    let mut column_masks: Vec<Vec<bool>> = Vec::new();
    for (col_name, col_rules) in by_column {
        let Some(column) = table.column(col_name) else {
            continue;
        };

        let mut inclusion: Vec<Vec<bool>> = Vec::new();
        let mut exclusion: Vec<Vec<bool>> = Vec::new();
        for rule in col_rules {
            match rule_mask(column, rule) {
                Some(mask) => {
                    if rule.operator.is_exclusion() {
                        exclusion.push(mask);
                    } else {
                        inclusion.push(mask);
                    }
                }
                None => {
                    observer.on_log(
                        &format!(
                            "skipping unusable filter rule on '{}' ({:?})",
                            rule.column, rule.operator
                        ),
                        Severity::Warning,
                    );
                }
            }
        }

        let inclusion_mask = combine_or(inclusion);
        let exclusion_mask = combine_and(exclusion);
        let mask = match (inclusion_mask, exclusion_mask) {
            (Some(inc), Some(exc)) => Some(and_masks(inc, &exc)),
            (Some(inc), None) => Some(inc),
            (None, Some(exc)) => Some(exc),
            (None, None) => None,
        };
        if let Some(mask) = mask {
            column_masks.push(mask);
        }
    }

    let combined = combine_and(column_masks)?;
    Some(table.filter_mask(&combined))
}

fn combine_or(masks: Vec<Vec<bool>>) -> Option<Vec<bool>> {
    let mut iter = masks.into_iter();
    let mut acc = iter.next()?;
    for mask in iter {
        for (a, b) in acc.iter_mut().zip(mask.iter()) {
            *a = *a || *b;
        }
    }
    Some(acc)
}

fn combine_and(masks: Vec<Vec<bool>>) -> Option<Vec<bool>> {
    let mut iter = masks.into_iter();
    let mut acc = iter.next()?;
    for mask in iter {
        acc = and_masks(acc, &mask);
    }
    Some(acc)
}

fn and_masks(mut a: Vec<bool>, b: &[bool]) -> Vec<bool> {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x = *x && *y;
    }
    a
}

/// Boolean mask of one rule over one column, or `None` when the rule is unusable here.
fn rule_mask(column: &Column, rule: &FilterRule) -> Option<Vec<bool>> {
    use FilterOperator::*;

    match rule.operator {
        IsBlank => Some(column.values.iter().map(Value::is_null).collect()),
        IsNotBlank => Some(column.values.iter().map(|v| !v.is_null()).collect()),
        Between => {
            let FilterValue::Range(lo, hi) = &rule.value else {
                return None;
            };
            let (lo, hi) = (lo.trim(), hi.trim());
            if lo.is_empty() || hi.is_empty() {
                return None;
            }
            let lo = usable_literal(lo, column.dtype)?;
            let hi = usable_literal(hi, column.dtype)?;
            Some(
                column
                    .values
                    .iter()
                    .map(|v| {
                        matches!(compare_values(v, &lo), Some(Ordering::Greater | Ordering::Equal))
                            && matches!(compare_values(v, &hi), Some(Ordering::Less | Ordering::Equal))
                    })
                    .collect(),
            )
        }
        Equal | NotEqual | GreaterThan | LessThan => {
            let raw = single_value(rule)?;
            let lit = usable_literal(raw, column.dtype)?;
            let mask = column
                .values
                .iter()
                .map(|v| match rule.operator {
                    Equal => !v.is_null() && *v == lit,
                    NotEqual => !v.is_null() && *v != lit,
                    GreaterThan => matches!(compare_values(v, &lit), Some(Ordering::Greater)),
                    LessThan => matches!(compare_values(v, &lit), Some(Ordering::Less)),
                    _ => unreachable!("handled in outer match"),
                })
                .collect();
            Some(mask)
        }
        Contains | NotContains | StartsWith | EndsWith => {
            // Substring operators only make sense on string columns.
            if column.dtype != DataType::Utf8 {
                return None;
            }
            let raw = single_value(rule)?.to_string();
            let mask = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Utf8(s) => match rule.operator {
                        Contains => s.contains(&raw),
                        NotContains => !s.contains(&raw),
                        StartsWith => s.starts_with(&raw),
                        EndsWith => s.ends_with(&raw),
                        _ => unreachable!("handled in outer match"),
                    },
                    _ => false,
                })
                .collect();
            Some(mask)
        }
    }
}

fn single_value(rule: &FilterRule) -> Option<&str> {
    let FilterValue::Single(s) = &rule.value else {
        return None;
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn usable_literal(raw: &str, dtype: DataType) -> Option<Value> {
    let lit = lenient_cast(&Value::Utf8(raw.to_string()), dtype);
    if lit.is_null() {
        None
    } else {
        Some(lit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::NullJobObserver;

    fn rule(column: &str, operator: FilterOperator, value: &str) -> FilterRule {
        FilterRule {
            column: column.to_string(),
            operator,
            value: FilterValue::Single(value.to_string()),
        }
    }

    fn string_table(values: &[Option<&str>]) -> Table {
        Table::new(vec![Column::new(
            "a",
            DataType::Utf8,
            values
                .iter()
                .map(|v| match v {
                    Some(s) => Value::Utf8(s.to_string()),
                    None => Value::Null,
                })
                .collect(),
        )])
    }

    #[test]
    fn inclusion_or_and_exclusion_and_combine() {
        let table = string_table(&[Some("x"), Some("y"), Some("z"), Some("w")]);
        let rules = vec![
            rule("a", FilterOperator::Equal, "x"),
            rule("a", FilterOperator::Equal, "y"),
            rule("a", FilterOperator::NotEqual, "z"),
        ];
        let out = apply_filters(&table, &rules, &NullJobObserver).unwrap();
        // (a == "x" OR a == "y") AND a != "z"
        assert_eq!(
            out.column("a").unwrap().values,
            vec![Value::Utf8("x".into()), Value::Utf8("y".into())]
        );
    }

    #[test]
    fn cross_column_predicates_and_together() {
        let table = Table::new(vec![
            Column::new(
                "a",
                DataType::Utf8,
                vec![Value::Utf8("k".into()), Value::Utf8("k".into()), Value::Utf8("m".into())],
            ),
            Column::new(
                "n",
                DataType::Int64,
                vec![Value::Int64(1), Value::Int64(10), Value::Int64(10)],
            ),
        ]);
        let rules = vec![
            rule("a", FilterOperator::Equal, "k"),
            rule("n", FilterOperator::GreaterThan, "5"),
        ];
        let out = apply_filters(&table, &rules, &NullJobObserver).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(out.column("n").unwrap().values, vec![Value::Int64(10)]);
    }

    #[test]
    fn between_is_inclusive_and_casts_to_column_type() {
        let table = Table::new(vec![Column::new(
            "n",
            DataType::Int64,
            vec![Value::Int64(5), Value::Int64(10), Value::Int64(15), Value::Null],
        )]);
        let rules = vec![FilterRule {
            column: "n".to_string(),
            operator: FilterOperator::Between,
            value: FilterValue::Range(" 5 ".to_string(), "10".to_string()),
        }];
        let out = apply_filters(&table, &rules, &NullJobObserver).unwrap();
        assert_eq!(
            out.column("n").unwrap().values,
            vec![Value::Int64(5), Value::Int64(10)]
        );
    }

    #[test]
    fn blank_operators_need_no_value() {
        let table = string_table(&[Some("x"), None, Some("y")]);
        let blank = vec![FilterRule {
            column: "a".to_string(),
            operator: FilterOperator::IsBlank,
            value: FilterValue::None,
        }];
        let out = apply_filters(&table, &blank, &NullJobObserver).unwrap();
        assert_eq!(out.height(), 1);

        let not_blank = vec![FilterRule {
            column: "a".to_string(),
            operator: FilterOperator::IsNotBlank,
            value: FilterValue::None,
        }];
        let out = apply_filters(&table, &not_blank, &NullJobObserver).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn unusable_rules_are_skipped_not_fatal() {
        let table = Table::new(vec![Column::new(
            "n",
            DataType::Int64,
            vec![Value::Int64(1), Value::Int64(2)],
        )]);
        // Value does not cast to the column type; the rule is skipped and the table
        // passes through unfiltered (None = no applicable predicate).
        let rules = vec![rule("n", FilterOperator::Equal, "abc")];
        assert!(apply_filters(&table, &rules, &NullJobObserver).is_none());

        // Substring operator on a numeric column is likewise unusable.
        let rules = vec![rule("n", FilterOperator::Contains, "1")];
        assert!(apply_filters(&table, &rules, &NullJobObserver).is_none());
    }

    #[test]
    fn rules_on_absent_columns_are_ignored() {
        let table = string_table(&[Some("x")]);
        let rules = vec![rule("missing", FilterOperator::Equal, "x")];
        assert!(apply_filters(&table, &rules, &NullJobObserver).is_none());
    }

    #[test]
    fn not_contains_drops_matching_and_null_rows() {
        let table = string_table(&[Some("alpha"), Some("beta"), None]);
        let rules = vec![rule("a", FilterOperator::NotContains, "alp")];
        let out = apply_filters(&table, &rules, &NullJobObserver).unwrap();
        assert_eq!(out.column("a").unwrap().values, vec![Value::Utf8("beta".into())]);
    }
}
