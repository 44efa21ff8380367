//! Conversions between [`TabularMatrix`], the remote JSON value envelope and
//! comma-separated text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SheetError;
use crate::matrix::{Row, TabularMatrix};

/// JSON envelope the values endpoints read and write.
///
/// The API answers with something like
/// `{"range":"Sheet2!A1:Z1000","majorDimension":"ROWS","values":[["a","b"],["1","2"]]}`
/// and leaves out `values` entirely when the range holds no data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<Value>>>,
}

impl ValueRange {
    /// Build a request envelope carrying `matrix`
    pub fn for_rows(
        range: impl Into<String>,
        major_dimension: impl Into<String>,
        matrix: &TabularMatrix,
    ) -> Self {
        Self {
            range: Some(range.into()),
            major_dimension: Some(major_dimension.into()),
            values: Some(encode_rows(matrix)),
        }
    }

    /// Extract the rows; a missing `values` field is a contract violation
    pub fn into_matrix(self) -> Result<TabularMatrix, SheetError> {
        let values = self.values.ok_or_else(|| {
            SheetError::MalformedResponse(format!(
                "value range {} has no 'values' field",
                self.range.as_deref().unwrap_or("<unknown>")
            ))
        })?;

        values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect::<Result<Row, _>>())
            .collect()
    }
}

/// Decode a raw value-range response body into rows
pub fn decode_wire_values(raw: &[u8]) -> Result<TabularMatrix, SheetError> {
    let envelope: ValueRange = serde_json::from_slice(raw).map_err(|e| {
        SheetError::MalformedResponse(format!("value range is not valid JSON: {}", e))
    })?;
    envelope.into_matrix()
}

/// Encode rows as the JSON `values` array
pub fn encode_wire_values(matrix: &TabularMatrix) -> Value {
    Value::Array(
        encode_rows(matrix)
            .into_iter()
            .map(Value::Array)
            .collect(),
    )
}

fn encode_rows(matrix: &TabularMatrix) -> Vec<Vec<Value>> {
    matrix
        .iter()
        .map(|row| row.iter().map(|cell| Value::String(cell.clone())).collect())
        .collect()
}

fn cell_text(value: Value) -> Result<String, SheetError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SheetError::MalformedResponse(format!(
            "cell value must be a scalar, found {}",
            other
        ))),
    }
}

/// Parse comma-separated text into rows.
///
/// The input must hold whole rows: unless empty it has to end with a `\n`
/// (or `\r\n`) outside any quoted field. Anything else is a [`SheetError::Decode`]
/// naming the incomplete row.
pub fn text_table_to_matrix(bytes: &[u8]) -> Result<TabularMatrix, SheetError> {
    if let Some((row, reason)) = incomplete_row(bytes) {
        return Err(SheetError::Decode {
            row,
            reason: reason.to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut matrix = TabularMatrix::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| map_csv_error(e, index as u64 + 1))?;
        matrix.push_row(record.iter().map(str::to_string).collect());
    }
    Ok(matrix)
}

/// Render rows as comma-separated text, one `\n`-terminated line per row
pub fn matrix_to_text_table(matrix: &TabularMatrix) -> Result<Vec<u8>, SheetError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for (index, row) in matrix.iter().enumerate() {
        writer
            .write_record(row)
            .map_err(|e| map_csv_error(e, index as u64 + 1))?;
    }

    writer.into_inner().map_err(|e| SheetError::Decode {
        row: matrix.len() as u64,
        reason: e.error().to_string(),
    })
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> SheetError {
    let reason = err.to_string();
    let row = err
        .position()
        .map(|p| p.record() + 1)
        .unwrap_or(fallback_row);
    SheetError::Decode { row, reason }
}

/// One-based number of a row `bytes` leaves unfinished, with the reason
fn incomplete_row(bytes: &[u8]) -> Option<(u64, &'static str)> {
    let mut row = 1u64;
    let mut field_start = true;
    let mut in_quotes = false;
    let mut iter = bytes.iter().peekable();

    while let Some(&b) = iter.next() {
        if in_quotes {
            if b == b'"' {
                if iter.peek() == Some(&&b'"') {
                    iter.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }

        match b {
            b'"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            b',' => field_start = true,
            b'\n' => {
                row += 1;
                field_start = true;
            }
            b'\r' => field_start = true,
            _ => field_start = false,
        }
    }

    if in_quotes {
        Some((row, "input ends inside a quoted field"))
    } else if bytes.last().is_some_and(|&b| b != b'\n') {
        Some((row, "input ends before the end of the row"))
    } else {
        None
    }
}
