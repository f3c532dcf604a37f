//! Raw source reading.
//!
//! Both analysis and the pipeline read sources the same way: rows of native tagged
//! scalars ([`Value`]) with no prior type coercion, so that header detection sees the
//! file exactly as it is. Format is detected from the file extension:
//!
//! - [`delimited`]: `.csv`, `.txt`, `.tsv`
//! - [`workbook`]: `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`

pub mod delimited;
pub mod workbook;

use std::path::Path;

use crate::cast::fix_column_type;
use crate::config::SourceItem;
use crate::error::{ConsolidateError, ConsolidateResult};
use crate::types::{Table, Value};

/// Physical format of one source item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text (one table per file).
    Delimited,
    /// Multi-sheet workbook.
    Workbook,
}

impl SourceFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> ConsolidateResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" | "tsv" => Ok(Self::Delimited),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(Self::Workbook),
            _ => Err(ConsolidateError::UnsupportedSource {
                path: path.to_path_buf(),
                message: format!("unrecognized extension '{ext}'"),
            }),
        }
    }
}

/// Read up to `limit` raw rows of a source item, without type coercion.
///
/// `limit = None` reads the whole item.
pub fn read_raw_rows(
    item: &SourceItem,
    delimiter: u8,
    limit: Option<usize>,
) -> ConsolidateResult<Vec<Vec<Value>>> {
    match SourceFormat::from_path(&item.path)? {
        SourceFormat::Delimited => delimited::read_raw_rows(&item.path, delimiter, limit),
        SourceFormat::Workbook => workbook::read_raw_rows(&item.path, item.sheet.as_deref(), limit),
    }
}

/// Build a typed [`Table`] from raw rows and a (uniquified) header list.
///
/// Ragged rows are padded with nulls to the header width; extra trailing cells beyond the
/// header width are dropped. Each column's type is fixed immediately (the tagged-scalar
/// representation must not leak past this point).
pub fn table_from_raw(header_names: &[String], rows: &[Vec<Value>]) -> Table {
    let columns = header_names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<Value> = rows
                .iter()
                .map(|row| row.get(j).cloned().unwrap_or(Value::Null))
                .collect();
            fix_column_type(name.clone(), values)
        })
        .collect();
    Table::new(columns)
}

/// Raw header cells rendered into usable header strings.
///
/// Null cells become positional `column_{i}` placeholders, matching how unnamed columns
/// are surfaced to the collaborator for mapping.
pub fn header_strings(header_row: &[Value]) -> Vec<String> {
    header_row
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if v.is_null() {
                format!("column_{i}")
            } else {
                v.render()
            }
        })
        .collect()
}
