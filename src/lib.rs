//! `spreadsheet-consolidator` merges many loosely structured spreadsheet and delimited
//! files into one clean, typed output file.
//!
//! The engine works in two phases, both driven by an external collaborator (typically a
//! desktop UI) through plain data structures:
//!
//! 1. **Analysis** ([`analysis::analyze_sources`]): every source item is sampled, its
//!    header row located by a scoring heuristic, and its columns fingerprinted (name
//!    normalization + coarse type inference). Fingerprints are grouped into candidate
//!    synonym groups ("CNPJ" in one file, "C.N.P.J." in another) for human review.
//! 2. **Execution** ([`execution::run_consolidation`]): with the approved
//!    [`config::HeaderMapping`], every item is re-read in full, mapped, typed, and
//!    filtered; the per-item tables are type-harmonized, concatenated diagonally,
//!    optionally deduplicated and pivoted, and written out as a workbook, delimited
//!    text, or Parquet.
//!
//! Long phases run on worker threads ([`execution::spawn_analysis`],
//! [`execution::spawn_consolidation`]), report through a [`execution::JobObserver`],
//! and honor a [`execution::CancellationToken`].
//!
//! ## Quick example
//!
//! ```no_run
//! use spreadsheet_consolidator::config::{
//!     ConsolidationConfig, DuplicatesConfig, HeaderMapping, OutputFormat, PivotRule,
//!     SourceItem,
//! };
//! use spreadsheet_consolidator::execution::{
//!     run_consolidation, CancellationToken, StdErrJobObserver,
//! };
//!
//! # fn main() -> Result<(), spreadsheet_consolidator::ConsolidateError> {
//! let config = ConsolidationConfig {
//!     sources: vec![
//!         SourceItem::new("january.csv", None),
//!         SourceItem::new("february.xlsx", Some("Sales".to_string())),
//!     ],
//!     delimiter: b';',
//!     mapping: HeaderMapping::default(),
//!     filters: Vec::new(),
//!     duplicates: DuplicatesConfig::default(),
//!     pivot: PivotRule::default(),
//!     output_path: "consolidated.xlsx".into(),
//!     output_format: OutputFormat::Workbook,
//! };
//! run_consolidation(&config, &StdErrJobObserver, &CancellationToken::new())?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cast;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod execution;
pub mod harmonize;
pub mod headers;
pub mod ingestion;
pub mod output;
pub mod pipeline;
pub mod types;

pub use config::ConsolidationConfig;
pub use error::{ConsolidateError, ConsolidateResult};
pub use execution::{
    run_consolidation, CancellationToken, JobObserver, JobOutcome, Severity,
};
pub use types::{Column, DataType, Table, Value};
