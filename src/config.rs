//! Configuration structures supplied by the external collaborator (UI layer).
//!
//! Everything here is serde-serializable so the surrounding application can persist and
//! restore a job setup as JSON. The core never owns process-wide state: each run receives
//! its full configuration by value.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// One readable unit: a whole delimited file, or one workbook sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceItem {
    /// Path to the source file.
    pub path: PathBuf,
    /// Sheet name for workbook sources; `None` for delimited text.
    pub sheet: Option<String>,
}

impl SourceItem {
    /// Create a source item.
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }

    /// Human-readable source label: `filename` or `filename (sheet)`.
    pub fn label(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        match &self.sheet {
            Some(sheet) => format!("{file_name} ({sheet})"),
            None => file_name,
        }
    }
}

/// Identity of one original column in one source item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    /// Original (uniquified) column name within the item.
    pub column: String,
    /// Source file path.
    pub path: PathBuf,
    /// Sheet name, if a workbook sheet.
    pub sheet: Option<String>,
}

/// Type a user can declare for a mapped column.
///
/// `Auto` leaves the ingested type untouched; anything else is applied with a lenient cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeclaredType {
    /// Keep whatever type ingestion produced.
    #[default]
    Auto,
    Integer,
    Float,
    Date,
    Boolean,
}

impl DeclaredType {
    /// Concrete target type, or `None` for [`DeclaredType::Auto`].
    pub fn target(self) -> Option<DataType> {
        match self {
            DeclaredType::Auto => None,
            DeclaredType::Integer => Some(DataType::Int64),
            DeclaredType::Float => Some(DataType::Float64),
            DeclaredType::Date => Some(DataType::Date),
            DeclaredType::Boolean => Some(DataType::Bool),
        }
    }
}

/// One row of the finalized, user-approved header mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// The source column this entry maps.
    pub source: SourceKey,
    /// Destination column name.
    pub final_name: String,
    /// User-declared type for the destination column.
    #[serde(default)]
    pub declared_type: DeclaredType,
    /// Whether the source column participates at all.
    pub include: bool,
}

/// The finalized contract the ingestion pipeline executes against.
///
/// Source keys absent from the mapping are treated as excluded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderMapping {
    /// Mapping rows, in collaborator-approved order.
    pub entries: Vec<MappingEntry>,
}

impl HeaderMapping {
    /// Create a mapping from entries.
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    /// Whether the mapping has no entries (pass-through ingestion).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for one original column of one item.
    pub fn lookup(&self, column: &str, path: &std::path::Path, sheet: Option<&str>) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| {
            e.source.column == column
                && e.source.path == path
                && e.source.sheet.as_deref() == sheet
        })
    }

    /// Declared type for a final column name, if any included entry names one.
    pub fn declared_type_for(&self, final_name: &str) -> Option<DeclaredType> {
        self.entries
            .iter()
            .find(|e| e.include && e.final_name == final_name)
            .map(|e| e.declared_type)
    }
}

/// Comparison operator of a [`FilterRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    /// Inclusive range; requires two values.
    Between,
    IsBlank,
    IsNotBlank,
}

impl FilterOperator {
    /// Operators combined with AND within a column; all others combine with OR.
    pub fn is_exclusion(self) -> bool {
        matches!(self, FilterOperator::NotEqual | FilterOperator::NotContains)
    }

    /// Operators that take no comparison value.
    pub fn takes_no_value(self) -> bool {
        matches!(self, FilterOperator::IsBlank | FilterOperator::IsNotBlank)
    }
}

/// Value payload of a [`FilterRule`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterValue {
    /// No value (only valid for blank/not-blank operators).
    #[default]
    None,
    /// Single comparison value.
    Single(String),
    /// Inclusive range bounds for [`FilterOperator::Between`].
    Range(String, String),
}

/// One row-filtering rule targeting a final column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Final column name the rule applies to.
    pub column: String,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Comparison value(s); [`FilterValue::None`] for no-value operators.
    #[serde(default)]
    pub value: FilterValue,
}

/// Key-based deduplication configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicatesConfig {
    /// Final column names forming the duplicate key; empty disables deduplication.
    pub key_columns: Vec<String>,
    /// Whether to keep the removed rows as a report table.
    pub generate_report: bool,
}

/// Aggregation operation for the summary (pivot) table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateOp {
    Sum,
    Mean,
    /// Counts all rows in the group, including nulls.
    Count,
    Min,
    Max,
    /// Counts distinct values; null counts as one distinct value.
    DistinctCount,
}

impl AggregateOp {
    /// Name used in the `{column}_{operation}` result column.
    pub fn suffix(self) -> &'static str {
        match self {
            AggregateOp::Sum => "Sum",
            AggregateOp::Mean => "Mean",
            AggregateOp::Count => "Count",
            AggregateOp::Min => "Min",
            AggregateOp::Max => "Max",
            AggregateOp::DistinctCount => "DistinctCount",
        }
    }
}

/// One aggregation of the pivot rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Final column name to aggregate.
    pub column: String,
    /// Aggregation operation.
    pub op: AggregateOp,
}

/// Grouped summary-table configuration.
///
/// The pivot runs only when both `group_by` and `aggregations` are non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotRule {
    /// Final column names to group by.
    pub group_by: Vec<String>,
    /// Aggregations to compute per group.
    pub aggregations: Vec<Aggregation>,
    /// Write only the pivot table, not the consolidated data.
    pub only_pivot: bool,
}

impl PivotRule {
    /// Whether the rule is complete enough to run.
    pub fn is_active(&self) -> bool {
        !self.group_by.is_empty() && !self.aggregations.is_empty()
    }
}

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Multi-sheet workbook (`.xlsx`), paginated when the row ceiling is exceeded.
    Workbook,
    /// Pipe-separated delimited text, single table.
    Delimited,
    /// Parquet, single table.
    Parquet,
}

/// Full configuration of one consolidation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Source items in processing order.
    pub sources: Vec<SourceItem>,
    /// Field delimiter for delimited-text sources.
    pub delimiter: u8,
    /// Finalized header mapping (may be empty for pass-through).
    #[serde(default)]
    pub mapping: HeaderMapping,
    /// Row filter rules.
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    /// Deduplication configuration.
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
    /// Summary-table configuration.
    #[serde(default)]
    pub pivot: PivotRule,
    /// Destination path for the output file.
    pub output_path: PathBuf,
    /// Output format.
    pub output_format: OutputFormat,
}
