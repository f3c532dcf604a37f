//! Workbook (Excel/ODS) source reading via `calamine`.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::cast::parse_datetime_permissive;
use crate::error::{ConsolidateError, ConsolidateResult};
use crate::types::Value;

/// List the sheet names of a workbook, in workbook order.
///
/// Returned as a plain value for the collaborator UI to cache if it wants to; the core
/// holds no sheet-name cache of its own.
pub fn sheet_names(path: &Path) -> ConsolidateResult<Vec<String>> {
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read up to `limit` raw rows from one sheet (the first sheet when `sheet` is `None`).
///
/// Cells keep their native scalar type: numbers, strings, booleans, and datetimes come
/// through as-is; error cells and empties become [`Value::Null`].
pub fn read_raw_rows(
    path: &Path,
    sheet: Option<&str>,
    limit: Option<usize>,
) -> ConsolidateResult<Vec<Vec<Value>>> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ConsolidateError::UnsupportedSource {
                path: path.to_path_buf(),
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for row in range.rows() {
        if let Some(limit) = limit {
            if rows.len() >= limit {
                break;
            }
        }
        rows.push(row.iter().map(cell_to_value).collect());
    }
    Ok(rows)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => {
            if s.is_empty() {
                Value::Null
            } else {
                Value::Utf8(s.clone())
            }
        }
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Value::Datetime)
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) => parse_datetime_permissive(s)
            .map(Value::Datetime)
            .unwrap_or_else(|| Value::Utf8(s.clone())),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(_) => Value::Null,
    }
}
