//! Pipe-separated text output.

use std::path::Path;

use crate::error::ConsolidateResult;
use crate::execution::{CancellationToken, JobObserver, JobOutcome};
use crate::types::Table;

use super::PROGRESS_ROW_INTERVAL;

/// Output field delimiter. Pipe keeps commas and semicolons inside values intact.
pub const OUTPUT_DELIMITER: u8 = b'|';

/// Write `table` to `path` as pipe-separated text with a header row.
///
/// Nulls become empty fields; dates and datetimes are ISO-formatted.
pub fn write_delimited(
    path: &Path,
    table: &Table,
    observer: &dyn JobObserver,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<()>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(OUTPUT_DELIMITER)
        .from_path(path)?;
    writer.write_record(table.column_names())?;

    let total = table.height();
    for i in 0..total {
        if i % PROGRESS_ROW_INTERVAL == 0 {
            if cancel.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }
            if i > 0 {
                observer.on_progress_text(&format!("writing row {i} of {total}"));
            }
        }
        writer.write_record(table.columns.iter().map(|c| c.values[i].render()))?;
    }
    writer.flush()?;
    Ok(JobOutcome::Completed(()))
}
