use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, FixedSizeListArray, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, LargeListArray, ListArray, UInt16Array, UInt32Array,
    UInt8Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{ColumnData, Value};
use super::source::MemorySource;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a survey file into memory.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one field per column; list fields become 2-D columns
/// * `.json`    – `{ "TEFF": [...], "IDs": [["2M...", 4102], ...], ... }`
/// * `.csv`     – one column per field; `;`-separated cells become 2-D columns
pub fn load_file(path: &Path) -> Result<MemorySource> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let source = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!("Loaded {} columns from {}", source.len(), path.display());
    Ok(source)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (column-oriented, pandas `df.to_dict(orient='list')`):
///
/// ```json
/// {
///   "IDs":  [["2M00000002+7417074", "4102"], ...],
///   "TEFF": [4512.3, 4870.0, ...],
///   "star_flag": [0, 512, ...]
/// }
/// ```
fn load_json(path: &Path) -> Result<MemorySource> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let object = root
        .as_object()
        .context("Expected top-level JSON object of columns")?;

    let mut source = MemorySource::new();
    for (name, values) in object {
        let values = values
            .as_array()
            .with_context(|| format!("Column '{name}' is not a JSON array"))?;
        let column = json_column(values).with_context(|| format!("Column '{name}'"))?;
        source.insert(name.clone(), column);
    }
    Ok(source)
}

fn json_column(values: &[JsonValue]) -> Result<ColumnData> {
    if values.iter().any(JsonValue::is_array) {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_array()
                    .map(|row| row.iter().map(json_to_value).collect::<Vec<_>>())
                    .with_context(|| format!("row {i} is not an array"))
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(ColumnData::Rows(rows));
    }

    if values.iter().all(|v| v.as_i64().is_some()) {
        return Ok(ColumnData::Integer(
            values.iter().filter_map(JsonValue::as_i64).collect(),
        ));
    }

    if values.iter().all(|v| v.is_number() || v.is_null()) {
        // null marks a missing measurement
        return Ok(ColumnData::Float(
            values
                .iter()
                .map(|v| v.as_f64().unwrap_or(f64::NAN))
                .collect(),
        ));
    }

    if values.iter().all(JsonValue::is_string) {
        return Ok(ColumnData::Text(
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ));
    }

    bail!("mixed value types")
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one star per record.
/// Cells of 2-D columns hold semicolon-separated components:
///   `"2M00000002+7417074;4102"`
/// Each column is typed from all of its cells: integer, then float, then text.
fn load_csv(path: &Path) -> Result<MemorySource> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} fields, header has {}",
                record.len(),
                headers.len()
            );
        }
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(value.to_string());
        }
    }

    Ok(headers
        .into_iter()
        .zip(cells)
        .map(|(name, column)| (name, guess_column(column)))
        .collect())
}

fn guess_column(cells: Vec<String>) -> ColumnData {
    if cells.iter().any(|c| c.contains(';')) {
        return ColumnData::Rows(
            cells
                .iter()
                .map(|c| c.split(';').map(|tok| guess_value(tok.trim())).collect::<Vec<_>>())
                .collect(),
        );
    }

    if let Ok(ints) = cells
        .iter()
        .map(|c| c.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
    {
        return ColumnData::Integer(ints);
    }

    let floats: Option<Vec<f64>> = cells
        .iter()
        .map(|c| match c.trim() {
            "" => Some(f64::NAN),
            s => s.parse::<f64>().ok(),
        })
        .collect();
    match floats {
        Some(floats) => ColumnData::Float(floats),
        None => ColumnData::Text(cells),
    }
}

fn guess_value(s: &str) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of survey columns.
///
/// Every top-level field becomes a column:
/// - floating point fields → `Float` (nulls read as NaN)
/// - integer and boolean fields → `Integer`
/// - string fields → `Text`
/// - List / LargeList / FixedSizeList fields → `Rows`, e.g. `IDs`
///
/// Record batches are concatenated in file order.
fn load_parquet(path: &Path) -> Result<MemorySource> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let mut source = MemorySource::new();
    for field in builder.schema().fields() {
        let empty = empty_column(field.data_type())
            .with_context(|| format!("reading column '{}'", field.name()))?;
        source.insert(field.name().clone(), empty);
    }

    let reader = builder.build().context("building parquet reader")?;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        for (field, col) in schema.fields().iter().zip(batch.columns()) {
            let chunk = arrow_column(col)
                .with_context(|| format!("reading column '{}'", field.name()))?;
            match source.get_mut(field.name()) {
                Some(existing) => append(existing, chunk)
                    .with_context(|| format!("column '{}' changed type", field.name()))?,
                None => source.insert(field.name().clone(), chunk),
            }
        }
    }

    Ok(source)
}

// -- Parquet / Arrow helpers --

fn append(existing: &mut ColumnData, chunk: ColumnData) -> Result<()> {
    match (existing, chunk) {
        (ColumnData::Float(a), ColumnData::Float(b)) => a.extend(b),
        (ColumnData::Integer(a), ColumnData::Integer(b)) => a.extend(b),
        (ColumnData::Text(a), ColumnData::Text(b)) => a.extend(b),
        (ColumnData::Rows(a), ColumnData::Rows(b)) => a.extend(b),
        (a, b) => bail!("{} then {}", a.kind(), b.kind()),
    }
    Ok(())
}

/// A zero-row column of the kind [`arrow_column`] produces for `data_type`.
fn empty_column(data_type: &DataType) -> Result<ColumnData> {
    Ok(match data_type {
        DataType::Float32 | DataType::Float64 => ColumnData::Float(Vec::new()),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::Boolean => ColumnData::Integer(Vec::new()),
        DataType::Utf8 | DataType::LargeUtf8 => ColumnData::Text(Vec::new()),
        DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _) => {
            ColumnData::Rows(Vec::new())
        }
        other => bail!("unsupported column type {other:?}"),
    })
}

/// Convert a whole Arrow column into [`ColumnData`].
fn arrow_column(col: &Arc<dyn Array>) -> Result<ColumnData> {
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Ok(ColumnData::Float(
                arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            ))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Ok(ColumnData::Float(
                arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect(),
            ))
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::Boolean => {
            if col.null_count() > 0 {
                bail!("{} nulls in integer column", col.null_count());
            }
            Ok(ColumnData::Integer(
                (0..col.len())
                    .map(|row| integer_at(col, row))
                    .collect::<Result<_>>()?,
            ))
        }
        DataType::Utf8 | DataType::LargeUtf8 => Ok(ColumnData::Text(
            (0..col.len())
                .map(|row| match cell_value(col, row) {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        )),
        DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _) => {
            Ok(ColumnData::Rows(
                (0..col.len())
                    .map(|row| list_row(col, row))
                    .collect::<Result<_>>()?,
            ))
        }
        other => bail!("unsupported column type {other:?}"),
    }
}

fn integer_at(col: &Arc<dyn Array>, row: usize) -> Result<i64> {
    macro_rules! value {
        ($ty:ty) => {
            col.as_any()
                .downcast_ref::<$ty>()
                .with_context(|| format!("expected {}", stringify!($ty)))?
                .value(row)
        };
    }
    Ok(match col.data_type() {
        DataType::Int8 => value!(Int8Array) as i64,
        DataType::Int16 => value!(Int16Array) as i64,
        DataType::Int32 => value!(Int32Array) as i64,
        DataType::Int64 => value!(Int64Array),
        DataType::UInt8 => value!(UInt8Array) as i64,
        DataType::UInt16 => value!(UInt16Array) as i64,
        DataType::UInt32 => value!(UInt32Array) as i64,
        DataType::Boolean => value!(BooleanArray) as i64,
        other => bail!("{other:?} is not an integer type"),
    })
}

/// Extract the components of a List, LargeList or FixedSizeList column at the given row.
fn list_row(col: &Arc<dyn Array>, row: usize) -> Result<Vec<Value>> {
    if col.is_null(row) {
        return Ok(Vec::new());
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        DataType::FixedSizeList(_, _) => col
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .context("expected FixedSizeListArray")?
            .value(row),
        other => bail!("Expected a list column, got {other:?}"),
    };

    Ok((0..values_array.len())
        .map(|i| cell_value(&values_array, i))
        .collect())
}

/// Extract a single cell from an Arrow array as a [`Value`].
fn cell_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Float32 | DataType::Float64 => match arrow_column_cell_f64(col, row) {
            Some(v) => Value::Float(v),
            None => Value::Null,
        },
        DataType::Boolean => match col.as_any().downcast_ref::<BooleanArray>() {
            Some(arr) => Value::Bool(arr.value(row)),
            None => Value::Null,
        },
        _ => match integer_at(col, row) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::String(format!("{:?}", col.data_type())),
        },
    }
}

fn arrow_column_cell_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Some(arr.value(row))
    } else {
        col.as_any()
            .downcast_ref::<Float32Array>()
            .map(|arr| f64::from(arr.value(row)))
    }
}
