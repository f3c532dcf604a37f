//! Workbook output via `rust_xlsxwriter`.

use std::borrow::Cow;
use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use super::{OutputTables, MAX_ROWS_PER_SHEET, PROGRESS_ROW_INTERVAL};
use crate::error::ConsolidateResult;
use crate::execution::{CancellationToken, JobObserver, JobOutcome, Severity};
use crate::types::{Table, Value};

const SUMMARY_SHEET: &str = "Summary";
const DATA_SHEET: &str = "Consolidated_Data";
const REMOVED_SHEET: &str = "Removed_Duplicates";

const MAX_COLUMN_WIDTH: f64 = 60.0;

struct HeaderFormats {
    /// Bold white on black: data sheets and pivot group-by columns.
    standard: Format,
    /// Bold white on dark red: pivot measure columns and the removed-rows report.
    alert: Format,
}

impl HeaderFormats {
    fn new() -> Self {
        Self {
            standard: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::Black),
            alert: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0xC00000)),
        }
    }
}

/// Write the full workbook: summary sheet first when a pivot exists, then the
/// consolidated data paginated across numbered sheets (unless only-pivot), then the
/// removed-duplicates report.
pub fn write_workbook(
    path: &Path,
    tables: &OutputTables<'_>,
    observer: &dyn JobObserver,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<()>> {
    let formats = HeaderFormats::new();
    let mut workbook = Workbook::new();

    if let Some(pivot) = tables.pivot {
        let group_width = pivot.width().saturating_sub(pivot_measure_count(pivot));
        let ws = workbook.add_worksheet();
        ws.set_name(SUMMARY_SHEET)?;
        let outcome = write_sheet(
            ws,
            pivot,
            0..pivot.height(),
            &|col| {
                if col < group_width {
                    &formats.standard
                } else {
                    &formats.alert
                }
            },
            observer,
            cancel,
        )?;
        if outcome.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }
    }

    if !tables.only_pivot {
        let data = tables.consolidated;
        for (page_index, page) in super::paginate(data.height(), MAX_ROWS_PER_SHEET)
            .into_iter()
            .enumerate()
        {
            let ws = workbook.add_worksheet();
            ws.set_name(page_name(DATA_SHEET, page_index))?;
            let outcome =
                write_sheet(ws, data, page, &|_| &formats.standard, observer, cancel)?;
            if outcome.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }
        }
    }

    if let Some(removed) = tables.removed_duplicates {
        for (page_index, page) in super::paginate(removed.height(), MAX_ROWS_PER_SHEET)
            .into_iter()
            .enumerate()
        {
            let ws = workbook.add_worksheet();
            ws.set_name(page_name(REMOVED_SHEET, page_index))?;
            let outcome =
                write_sheet(ws, removed, page, &|_| &formats.alert, observer, cancel)?;
            if outcome.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }
        }
    }

    workbook.save(path)?;
    observer.on_log(&format!("workbook saved to {}", path.display()), Severity::Info);
    Ok(JobOutcome::Completed(()))
}

/// Measures are the trailing aggregate columns; everything the pivot grouped by keeps
/// the standard header style.
fn pivot_measure_count(pivot: &Table) -> usize {
    pivot
        .columns
        .iter()
        .rev()
        .take_while(|c| c.name.rsplit_once('_').is_some_and(|(_, s)| is_op_suffix(s)))
        .count()
}

fn is_op_suffix(s: &str) -> bool {
    matches!(s, "Sum" | "Mean" | "Count" | "Min" | "Max" | "DistinctCount")
}

fn page_name(base: &str, page_index: usize) -> String {
    if page_index == 0 {
        base.to_string()
    } else {
        format!("{base}_{}", page_index + 1)
    }
}

fn write_sheet<'f>(
    ws: &mut Worksheet,
    table: &Table,
    rows: std::ops::Range<usize>,
    header_format: &dyn Fn(usize) -> &'f Format,
    observer: &dyn JobObserver,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<()>> {
    if table.width() == 0 {
        return Ok(JobOutcome::Completed(()));
    }
    let total = rows.len();

    let mut widths: Vec<usize> = Vec::with_capacity(table.width());
    for (col, column) in table.columns.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, &column.name, header_format(col))?;
        widths.push(column.name.chars().count());
    }

    for (out_row, src_row) in rows.enumerate() {
        if out_row % PROGRESS_ROW_INTERVAL == 0 {
            if cancel.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }
            if out_row > 0 {
                observer.on_progress_text(&format!("writing row {out_row} of {total}"));
            }
        }
        let sheet_row = out_row as u32 + 1;
        for (col, column) in table.columns.iter().enumerate() {
            let value = &column.values[src_row];
            match value {
                Value::Null => continue,
                Value::Int64(v) => ws.write_number(sheet_row, col as u16, *v as f64)?,
                Value::Float64(v) => ws.write_number(sheet_row, col as u16, *v)?,
                Value::Bool(v) => ws.write_boolean(sheet_row, col as u16, *v)?,
                other => {
                    // Strings, dates, and datetimes all go out as text.
                    let text = other.render();
                    let clean = sanitize_text(&text);
                    widths[col] = widths[col].max(clean.chars().count());
                    ws.write_string(sheet_row, col as u16, clean.as_ref())?
                }
            };
        }
    }

    for (col, width) in widths.iter().enumerate() {
        ws.set_column_width(col as u16, ((*width + 2) as f64).min(MAX_COLUMN_WIDTH))?;
    }
    ws.set_freeze_panes(1, 0)?;
    ws.autofilter(0, 0, total as u32, (table.width() - 1) as u16)?;
    ws.set_zoom(70);
    ws.set_screen_gridlines(false);
    Ok(JobOutcome::Completed(()))
}

/// Strip control characters that are illegal in xlsx shared strings.
fn sanitize_text(s: &str) -> Cow<'_, str> {
    if s.chars().any(is_illegal_char) {
        Cow::Owned(s.chars().filter(|c| !is_illegal_char(*c)).collect())
    } else {
        Cow::Borrowed(s)
    }
}

fn is_illegal_char(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}')
}
