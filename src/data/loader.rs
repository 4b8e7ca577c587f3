use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use arrow::array::AsArray;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::Run;

/// Column holding the time axis.
pub const TIME_COLUMN: &str = "time";
/// Column holding the unoccupied-building count.
pub const UNOCCUPIED_COLUMN: &str = "n_unoccupied";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a run file could not be turned into a [`Run`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: unsupported file extension '.{ext}'", path.display())]
    UnsupportedExtension { path: PathBuf, ext: String },

    #[error("{}: missing '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}: row {row}, {column}: '{value}' is not a number", path.display())]
    BadValue {
        path: PathBuf,
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("{}: {message}", path.display())]
    Format { path: PathBuf, message: String },
}

impl LoadError {
    /// Whether this is the one failure a batch may skip over.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::FileNotFound(_))
    }

    fn format(path: &Path, err: impl std::fmt::Display) -> Self {
        LoadError::Format {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one run from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with `time` and `n_unoccupied` columns; other
///   columns (e.g. a pandas index) are ignored
/// * `.parquet` – flat numeric `time` and `n_unoccupied` columns
/// * `.json`    – `[{ "time": 0.0, "n_unoccupied": 812 }, ...]` or
///   `{ "time": [...], "n_unoccupied": [...] }`
///
/// The file is opened before the extension is looked at, so a path that does
/// not exist always yields [`LoadError::FileNotFound`].
pub fn load_file(path: &Path) -> Result<Run, LoadError> {
    let file = open(path)?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path, file),
        "parquet" | "pq" => load_parquet(path, file),
        "json" => load_json(path, file),
        other => Err(LoadError::UnsupportedExtension {
            path: path.to_path_buf(),
            ext: other.to_string(),
        }),
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, file: File) -> Result<Run, LoadError> {
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let headers = reader
        .headers()
        .map_err(|e| LoadError::format(path, e))?
        .clone();

    let column_index = |column: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
    };
    let time_idx = column_index(TIME_COLUMN)?;
    let unocc_idx = column_index(UNOCCUPIED_COLUMN)?;

    let mut time = Vec::new();
    let mut unoccupied = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::format(path, e))?;
        time.push(parse_cell(path, record.get(time_idx), row_no, TIME_COLUMN)?);
        unoccupied.push(parse_cell(
            path,
            record.get(unocc_idx),
            row_no,
            UNOCCUPIED_COLUMN,
        )?);
    }

    Ok(Run::new(path, time, unoccupied))
}

/// Empty cells become NaN, as pandas would read them.
fn parse_cell(
    path: &Path,
    cell: Option<&str>,
    row: usize,
    column: &'static str,
) -> Result<f64, LoadError> {
    let tok = cell.unwrap_or("").trim();
    if tok.is_empty() {
        return Ok(f64::NAN);
    }
    tok.parse::<f64>().map_err(|_| LoadError::BadValue {
        path: path.to_path_buf(),
        row,
        column,
        value: tok.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Integer and float columns are accepted;
/// nulls load as NaN.
fn load_parquet(path: &Path, file: File) -> Result<Run, LoadError> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| LoadError::format(path, e))?;

    for column in [TIME_COLUMN, UNOCCUPIED_COLUMN] {
        if builder.schema().index_of(column).is_err() {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let reader = builder.build().map_err(|e| LoadError::format(path, e))?;

    let mut time = Vec::new();
    let mut unoccupied = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| LoadError::format(path, e))?;
        time.extend(f64_column(path, &batch, TIME_COLUMN)?);
        unoccupied.extend(f64_column(path, &batch, UNOCCUPIED_COLUMN)?);
    }

    Ok(Run::new(path, time, unoccupied))
}

fn f64_column(path: &Path, batch: &RecordBatch, column: &'static str) -> Result<Vec<f64>, LoadError> {
    let array = batch
        .column_by_name(column)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })?;

    let as_f64 = arrow::compute::cast(array, &DataType::Float64)
        .map_err(|e| LoadError::format(path, format!("column '{column}': {e}")))?;

    Ok(as_f64
        .as_primitive::<Float64Type>()
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Accepts the pandas `orient='records'` layout (array of row objects) and
/// the `orient='list'` layout (object of column arrays).
fn load_json(path: &Path, file: File) -> Result<Run, LoadError> {
    let root: JsonValue =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| LoadError::format(path, e))?;

    let (time, unoccupied) = match &root {
        JsonValue::Array(records) => {
            let mut time = Vec::with_capacity(records.len());
            let mut unoccupied = Vec::with_capacity(records.len());
            for (row, rec) in records.iter().enumerate() {
                let obj = rec
                    .as_object()
                    .ok_or_else(|| LoadError::format(path, format!("row {row} is not a JSON object")))?;
                time.push(json_number(path, obj.get(TIME_COLUMN), row, TIME_COLUMN)?);
                unoccupied.push(json_number(
                    path,
                    obj.get(UNOCCUPIED_COLUMN),
                    row,
                    UNOCCUPIED_COLUMN,
                )?);
            }
            (time, unoccupied)
        }
        JsonValue::Object(columns) => (
            json_column(path, columns.get(TIME_COLUMN), TIME_COLUMN)?,
            json_column(path, columns.get(UNOCCUPIED_COLUMN), UNOCCUPIED_COLUMN)?,
        ),
        _ => {
            return Err(LoadError::format(
                path,
                "expected a JSON array of records or an object of columns",
            ))
        }
    };

    if time.len() != unoccupied.len() {
        return Err(LoadError::format(
            path,
            format!(
                "'{TIME_COLUMN}' has {} values but '{UNOCCUPIED_COLUMN}' has {}",
                time.len(),
                unoccupied.len()
            ),
        ));
    }

    Ok(Run::new(path, time, unoccupied))
}

fn json_column(
    path: &Path,
    val: Option<&JsonValue>,
    column: &'static str,
) -> Result<Vec<f64>, LoadError> {
    let arr = val
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })?
        .as_array()
        .ok_or_else(|| LoadError::format(path, format!("'{column}' is not an array")))?;

    arr.iter()
        .enumerate()
        .map(|(row, v)| json_number(path, Some(v), row, column))
        .collect()
}

fn json_number(
    path: &Path,
    val: Option<&JsonValue>,
    row: usize,
    column: &'static str,
) -> Result<f64, LoadError> {
    match val {
        None => Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        }),
        Some(JsonValue::Null) => Ok(f64::NAN),
        Some(v) => v.as_f64().ok_or_else(|| LoadError::BadValue {
            path: path.to_path_buf(),
            row,
            column,
            value: v.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn csv_run_length_matches_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "run.csv",
            ",time,n_unoccupied,n_occupied\n0,0.0,812,10\n1,0.5,815,9\n2,1.0,820.5,8\n",
        );

        let run = load_file(&path).unwrap();
        assert_eq!(run.len(), 3);
        assert_eq!(run.time, vec![0.0, 0.5, 1.0]);
        assert_eq!(run.unoccupied, vec![812.0, 815.0, 820.5]);
        assert_eq!(run.source, path);
        assert_eq!(run.index, None);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        let err = load_file(&path).unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, LoadError::FileNotFound(p) if p == path));
    }

    #[test]
    fn missing_file_with_unknown_extension_is_still_not_found() {
        let err = load_file(Path::new("/definitely/not/here.xlsx")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn csv_without_required_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "run.csv", "time,n_occupied\n0,1\n");
        let err = load_file(&path).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn { column: UNOCCUPIED_COLUMN, .. }
        ));
    }

    #[test]
    fn csv_bad_cell_reports_row_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "run.csv", "time,n_unoccupied\n0,1\n1,lots\n");
        match load_file(&path).unwrap_err() {
            LoadError::BadValue { row, column, value, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, UNOCCUPIED_COLUMN);
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn csv_empty_cell_is_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "run.csv", "time,n_unoccupied\n0,\n");
        let run = load_file(&path).unwrap();
        assert!(run.unoccupied[0].is_nan());
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "run.txt", "time,n_unoccupied\n");
        assert!(matches!(
            load_file(&path).unwrap_err(),
            LoadError::UnsupportedExtension { ext, .. } if ext == "txt"
        ));
    }

    #[test]
    fn json_records_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let records = write(
            dir.path(),
            "records.json",
            r#"[{"time": 0, "n_unoccupied": 5}, {"time": 1, "n_unoccupied": null}]"#,
        );
        let run = load_file(&records).unwrap();
        assert_eq!(run.time, vec![0.0, 1.0]);
        assert_eq!(run.unoccupied[0], 5.0);
        assert!(run.unoccupied[1].is_nan());

        let columns = write(
            dir.path(),
            "columns.json",
            r#"{"time": [0, 1, 2], "n_unoccupied": [3, 4, 5]}"#,
        );
        let run = load_file(&columns).unwrap();
        assert_eq!(run.unoccupied, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn json_columns_of_different_lengths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "columns.json",
            r#"{"time": [0, 1], "n_unoccupied": [3, 4, 5, 6]}"#,
        );
        match load_file(&path).unwrap_err() {
            LoadError::Format { message, .. } => {
                assert_eq!(message, "'time' has 2 values but 'n_unoccupied' has 4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parquet_with_integer_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new(TIME_COLUMN, DataType::Float64, false),
            Field::new(UNOCCUPIED_COLUMN, DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float64Array::from(vec![0.0, 1.0])),
                Arc::new(Int64Array::from(vec![700, 710])),
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let run = load_file(&path).unwrap();
        assert_eq!(run.time, vec![0.0, 1.0]);
        assert_eq!(run.unoccupied, vec![700.0, 710.0]);
    }
}
