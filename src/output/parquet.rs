//! Parquet output via the `parquet` crate's low-level record writer.
//!
//! One row group, every field optional. Dates go out as `INT32`/`DATE` (days since the
//! Unix epoch), datetimes as `INT64`/`TIMESTAMP_MILLIS`.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::Datelike;
use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int32Type, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type as SchemaType;

use crate::error::ConsolidateResult;
use crate::execution::{CancellationToken, JobOutcome};
use crate::types::{Column, DataType, Table, Value};

/// `1970-01-01` in chrono's days-from-CE reckoning.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Write `table` to `path` as a single-row-group Parquet file.
pub fn write_parquet(
    path: &Path,
    table: &Table,
    cancel: &CancellationToken,
) -> ConsolidateResult<JobOutcome<()>> {
    let schema = build_schema(table)?;
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;

    let mut row_group = writer.next_row_group()?;
    let mut column_index = 0usize;
    while let Some(mut col_writer) = row_group.next_column()? {
        if cancel.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }
        let column = &table.columns[column_index];
        let def_levels: Vec<i16> = column
            .values
            .iter()
            .map(|v| if v.is_null() { 0 } else { 1 })
            .collect();

        match physical_type(column.dtype) {
            PhysicalType::INT64 => {
                let values: Vec<i64> = column
                    .values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Int64(x) => Some(*x),
                        Value::Datetime(dt) => Some(dt.and_utc().timestamp_millis()),
                        _ => None,
                    })
                    .collect();
                col_writer
                    .typed::<Int64Type>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            PhysicalType::INT32 => {
                let values: Vec<i32> = column
                    .values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Date(d) => Some(d.num_days_from_ce() - EPOCH_DAYS_FROM_CE),
                        _ => None,
                    })
                    .collect();
                col_writer
                    .typed::<Int32Type>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            PhysicalType::DOUBLE => {
                let values: Vec<f64> = column
                    .values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Float64(x) => Some(*x),
                        _ => None,
                    })
                    .collect();
                col_writer
                    .typed::<DoubleType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            PhysicalType::BOOLEAN => {
                let values: Vec<bool> = column
                    .values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Bool(x) => Some(*x),
                        _ => None,
                    })
                    .collect();
                col_writer
                    .typed::<BoolType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            _ => {
                let values: Vec<ByteArray> = column
                    .values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| ByteArray::from(v.render().into_bytes()))
                    .collect();
                col_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
        }
        col_writer.close()?;
        column_index += 1;
    }
    row_group.close()?;
    writer.close()?;
    Ok(JobOutcome::Completed(()))
}

fn build_schema(table: &Table) -> ConsolidateResult<Arc<SchemaType>> {
    let fields = table
        .columns
        .iter()
        .map(|c| field_type(c).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;
    let schema = SchemaType::group_type_builder("schema")
        .with_fields(fields)
        .build()?;
    Ok(Arc::new(schema))
}

fn field_type(column: &Column) -> Result<SchemaType, parquet::errors::ParquetError> {
    SchemaType::primitive_type_builder(&column.name, physical_type(column.dtype))
        .with_repetition(Repetition::OPTIONAL)
        .with_converted_type(converted_type(column.dtype))
        .build()
}

fn physical_type(dtype: DataType) -> PhysicalType {
    match dtype {
        DataType::Int64 | DataType::Datetime => PhysicalType::INT64,
        DataType::Float64 => PhysicalType::DOUBLE,
        DataType::Bool => PhysicalType::BOOLEAN,
        DataType::Date => PhysicalType::INT32,
        DataType::Utf8 | DataType::Null => PhysicalType::BYTE_ARRAY,
    }
}

fn converted_type(dtype: DataType) -> ConvertedType {
    match dtype {
        DataType::Utf8 | DataType::Null => ConvertedType::UTF8,
        DataType::Date => ConvertedType::DATE,
        DataType::Datetime => ConvertedType::TIMESTAMP_MILLIS,
        _ => ConvertedType::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use parquet::record::RowAccessor;

    #[test]
    fn parquet_round_trips_scalars_and_nulls() {
        let table = Table::new(vec![
            Column::new(
                "id",
                DataType::Int64,
                vec![Value::Int64(1), Value::Int64(2)],
            ),
            Column::new(
                "name",
                DataType::Utf8,
                vec![Value::Utf8("ana".into()), Value::Null],
            ),
            Column::new(
                "score",
                DataType::Float64,
                vec![Value::Float64(1.5), Value::Null],
            ),
        ]);
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let outcome =
            write_parquet(file.path(), &table, &CancellationToken::new()).unwrap();
        assert!(!outcome.is_cancelled());

        let reader = SerializedFileReader::new(File::open(file.path()).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 2);

        let rows: Vec<_> = reader
            .get_row_iter(None)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows[0].get_long(0).unwrap(), 1);
        assert_eq!(rows[0].get_string(1).unwrap(), "ana");
        assert!((rows[0].get_double(2).unwrap() - 1.5).abs() < 1e-12);
        // Second row's name and score are null.
        assert!(rows[1].get_string(1).is_err());
    }

    #[test]
    fn dates_are_written_as_days_since_epoch() {
        use chrono::NaiveDate;
        let d = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(d.num_days_from_ce() - EPOCH_DAYS_FROM_CE, 1);
    }
}
