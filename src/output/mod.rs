//! Output writers.
//!
//! The workbook writer is the full-featured target (summary sheet, pagination,
//! removed-duplicates report); delimited text and Parquet are single-table exports that
//! carry the pivot table when one was produced, otherwise the consolidated data.

pub mod delimited;
pub mod parquet;
pub mod xlsx;

use std::ops::Range;
use std::path::Path;

use crate::config::OutputFormat;
use crate::error::ConsolidateResult;
use crate::execution::{CancellationToken, JobObserver, JobOutcome};
use crate::types::Table;

/// Hard row ceiling per workbook sheet, a little under the xlsx format limit.
pub const MAX_ROWS_PER_SHEET: usize = 1_048_570;

/// Row-write progress text is emitted at most once per this many rows.
pub const PROGRESS_ROW_INTERVAL: usize = 5_000;

/// Everything the consolidation run produced, by reference, ready to write.
#[derive(Debug, Clone, Copy)]
pub struct OutputTables<'a> {
    /// The consolidated (and possibly deduplicated) data.
    pub consolidated: &'a Table,
    /// The pivot summary, when a pivot rule was active and applicable.
    pub pivot: Option<&'a Table>,
    /// Rows removed by deduplication, when a report was requested.
    pub removed_duplicates: Option<&'a Table>,
    /// Suppress the consolidated data sheets, writing only the pivot.
    pub only_pivot: bool,
}

impl<'a> OutputTables<'a> {
    /// The one table single-table formats export: the pivot when present.
    pub fn single_table(&self) -> &'a Table {
        self.pivot.unwrap_or(self.consolidated)
    }
}

/// Write the run's outputs to `path` in the selected format.
pub fn write_output(
    path: &Path,
    format: OutputFormat,
    tables: &OutputTables<'_>,
    observer: &dyn JobObserver,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<()>> {
    match format {
        OutputFormat::Workbook => xlsx::write_workbook(path, tables, observer, cancel),
        OutputFormat::Delimited => delimited::write_delimited(path, tables.single_table(), observer, cancel),
        OutputFormat::Parquet => parquet::write_parquet(path, tables.single_table(), cancel),
    }
}

/// Split `height` rows into contiguous pages of at most `ceiling` rows.
///
/// Zero rows still yields one (empty) page so a header-only sheet gets written.
pub fn paginate(height: usize, ceiling: usize) -> Vec<Range<usize>> {
    assert!(ceiling > 0, "page ceiling must be positive");
    if height == 0 {
        return vec![0..0];
    }
    let mut pages = Vec::new();
    let mut start = 0;
    while start < height {
        let end = (start + ceiling).min(height);
        pages.push(start..end);
        start = end;
    }
    pages
}
