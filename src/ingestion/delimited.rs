//! Delimited-text source reading.
//!
//! Sources from this domain are frequently exported by legacy systems: Windows-1252
//! encoded, unquoted, with ragged lines. Reading is therefore deliberately forgiving:
//! records are decoded through a transcoding reader (BOM wins if present), quoting is
//! disabled, and short rows are padded by the caller.

use std::fs::File;
use std::path::Path;

use encoding_rs::WINDOWS_1252;
use encoding_rs_io::DecodeReaderBytesBuilder;

use crate::error::ConsolidateResult;
use crate::types::Value;

/// Read up to `limit` raw rows from a delimited file.
///
/// Every cell is either [`Value::Utf8`] or, for empty fields, [`Value::Null`]; no type
/// inference happens at this stage.
pub fn read_raw_rows(
    path: &Path,
    delimiter: u8,
    limit: Option<usize>,
) -> ConsolidateResult<Vec<Vec<Value>>> {
    let file = File::open(path)?;
    let transcoded = DecodeReaderBytesBuilder::new()
        .encoding(Some(WINDOWS_1252))
        .bom_override(true)
        .build(file);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .quoting(false)
        .from_reader(transcoded);

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in reader.records() {
        if let Some(limit) = limit {
            if rows.len() >= limit {
                break;
            }
        }
        let record = result?;
        rows.push(record.iter().map(field_to_value).collect());
    }
    Ok(rows)
}

fn field_to_value(field: &str) -> Value {
    if field.is_empty() {
        Value::Null
    } else {
        Value::Utf8(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(content).unwrap();
        f
    }

    #[test]
    fn reads_raw_rows_without_header_interpretation() {
        let f = write_temp(b"id;name\n1;ana\n2;\n");
        let rows = read_raw_rows(f.path(), b';', None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], Value::Utf8("id".into()));
        assert_eq!(rows[1][1], Value::Utf8("ana".into()));
        assert_eq!(rows[2][1], Value::Null);
    }

    #[test]
    fn limit_bounds_the_prefix() {
        let f = write_temp(b"a\nb\nc\nd\n");
        let rows = read_raw_rows(f.path(), b',', Some(2)).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn decodes_windows_1252_bytes() {
        // "Endereço" with 0xE7 for c-cedilla in Windows-1252.
        let f = write_temp(b"Endere\xe7o\nrua x\n");
        let rows = read_raw_rows(f.path(), b',', None).unwrap();
        assert_eq!(rows[0][0], Value::Utf8("Endere\u{e7}o".into()));
    }

    #[test]
    fn tolerates_ragged_lines() {
        let f = write_temp(b"a,b,c\n1,2\n1,2,3,4\n");
        let rows = read_raw_rows(f.path(), b',', None).unwrap();
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[2].len(), 4);
    }
}
