//! Job execution: cancellation, outcome reporting, the consolidation orchestrator, and
//! worker-thread spawners.

mod observer;

pub use observer::{
    ChannelJobObserver, CompositeJobObserver, JobEvent, JobObserver, NullJobObserver,
    Severity, StdErrJobObserver,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::warn;

use crate::analysis::{analyze_sources, HeaderGroup};
use crate::config::{ConsolidationConfig, SourceItem};
use crate::consolidate::{build_pivot, concat_diagonal, deduplicate};
use crate::error::{ConsolidateError, ConsolidateResult};
use crate::harmonize::harmonize_tables;
use crate::output::{write_output, OutputTables};
use crate::pipeline::ingest_item;
use crate::types::Table;

/// Cooperative cancellation flag, cheap to clone and share across threads.
///
/// Workers check it at item and row-chunk boundaries; in-flight work finishes before
/// the job unwinds.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// How a job ended when it did not fail: with a result, or cancelled on request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    /// The job ran to completion.
    Completed(T),
    /// The job observed a cancellation request and stopped early.
    Cancelled,
}

impl<T> JobOutcome<T> {
    /// Whether this outcome is [`JobOutcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }

    /// The completed value, if any.
    pub fn into_completed(self) -> Option<T> {
        match self {
            JobOutcome::Completed(v) => Some(v),
            JobOutcome::Cancelled => None,
        }
    }
}

/// Run a full consolidation job.
///
/// Every terminal path reports through `observer.on_finished` before returning:
/// success, failure (with the error message), or cancellation.
pub fn run_consolidation(
    config: &ConsolidationConfig,
    observer: &dyn JobObserver,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<()>> {
    match consolidate_inner(config, observer, cancel) {
        Ok(JobOutcome::Completed(())) => {
            observer.on_progress(100);
            observer.on_finished(true, "consolidation finished");
            Ok(JobOutcome::Completed(()))
        }
        Ok(JobOutcome::Cancelled) => {
            observer.on_finished(false, "consolidation cancelled");
            Ok(JobOutcome::Cancelled)
        }
        Err(e) => {
            observer.on_log(&e.to_string(), Severity::Error);
            observer.on_finished(false, &format!("consolidation failed: {e}"));
            Err(e)
        }
    }
}

fn consolidate_inner(
    config: &ConsolidationConfig,
    observer: &dyn JobObserver,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<()>> {
    if config.sources.is_empty() {
        return Err(ConsolidateError::InvalidConfig {
            message: "no source items configured".to_string(),
        });
    }

    let total = config.sources.len();
    let mut tables: Vec<Table> = Vec::with_capacity(total);
    for (index, item) in config.sources.iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }
        observer.on_log(&format!("processing {}", item.label()), Severity::Info);
        match ingest_item(item, config.delimiter, &config.mapping, &config.filters, observer) {
            Ok(Some(table)) => tables.push(table),
            Ok(None) => {}
            Err(e) => {
                warn!("item {} failed: {e}", item.label());
                observer.on_log(
                    &format!("failed to process {}: {e}", item.label()),
                    Severity::Error,
                );
            }
        }
        observer.on_progress(((index + 1) * 60 / total) as u8);
    }

    if tables.is_empty() {
        return Err(ConsolidateError::NoData {
            message: "no source produced any rows".to_string(),
        });
    }

    harmonize_tables(&mut tables, observer);
    let consolidated = concat_diagonal(&tables);
    drop(tables);
    observer.on_log(
        &format!(
            "consolidated {} rows across {} columns",
            consolidated.height(),
            consolidated.width()
        ),
        Severity::Info,
    );
    observer.on_progress(70);

    let (consolidated, removed) = if config.duplicates.key_columns.is_empty() {
        (consolidated, None)
    } else {
        let (kept, removed) = deduplicate(&consolidated, &config.duplicates, observer);
        (kept, removed)
    };
    observer.on_progress(80);

    let pivot = if config.pivot.is_active() {
        build_pivot(&consolidated, &config.pivot, observer)
    } else {
        None
    };
    observer.on_progress(85);

    if cancel.is_cancelled() {
        return Ok(JobOutcome::Cancelled);
    }
    let output = OutputTables {
        consolidated: &consolidated,
        pivot: pivot.as_ref(),
        removed_duplicates: removed.as_ref(),
        only_pivot: config.pivot.only_pivot && pivot.is_some(),
    };
    let outcome = write_output(
        &config.output_path,
        config.output_format,
        &output,
        observer,
        cancel,
    )?;
    if outcome.is_cancelled() {
        return Ok(JobOutcome::Cancelled);
    }

    observer.on_log(
        &format!("output written to {}", config.output_path.display()),
        Severity::Success,
    );
    Ok(JobOutcome::Completed(()))
}

/// Run a consolidation job on its own thread.
///
/// All results flow back through the observer; the handle only signals thread exit.
pub fn spawn_consolidation(
    config: ConsolidationConfig,
    observer: Arc<dyn JobObserver>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let _ = run_consolidation(&config, observer.as_ref(), &cancel);
    })
}

/// Run source analysis on its own thread, returning the groups through the handle.
pub fn spawn_analysis(
    sources: Vec<SourceItem>,
    delimiter: u8,
    observer: Arc<dyn JobObserver>,
    cancel: CancellationToken,
) -> JoinHandle<ConsolidateResult<JobOutcome<Vec<HeaderGroup>>>> {
    thread::spawn(move || {
        let result = analyze_sources(&sources, delimiter, observer.as_ref(), &cancel);
        match &result {
            Ok(JobOutcome::Completed(groups)) => {
                observer.on_finished(true, &format!("analysis found {} column groups", groups.len()));
            }
            Ok(JobOutcome::Cancelled) => observer.on_finished(false, "analysis cancelled"),
            Err(e) => observer.on_finished(false, &format!("analysis failed: {e}")),
        }
        result
    })
}
