use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{Data, Reader, open_workbook_auto};
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::RexError;
use crate::table::{Cell, Row, Table};

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    XLSX,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Materialize a data file as an in-memory [`Table`].
pub fn load(path: PathBuf) -> Result<Table, RexError> {
    let file_info = get_file_info(path)?;
    let start_time = Instant::now();

    let table = match file_info.file_type {
        FileType::CSV => from_frame(load_csv(&file_info.path)?)?,
        FileType::PARQUET => from_frame(load_parquet(&file_info.path)?)?,
        FileType::ARROW => from_frame(load_arrow(&file_info.path)?)?,
        FileType::XLSX => load_xlsx(&file_info.path)?,
    };

    info!(
        "Loaded {:?} ({} bytes, {} rows x {} columns) in {}ms",
        file_info.path,
        file_info.file_size,
        table.nrows(),
        table.ncols(),
        start_time.elapsed().as_millis()
    );
    Ok(table)
}

/// Collect a lazy frame and convert it column-parallel into the row
/// oriented table model.
fn from_frame(frame: LazyFrame) -> Result<Table, RexError> {
    let df = frame.collect()?;
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let cells: Result<Vec<Vec<Cell>>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let cells = cells?;

    let mut rows = Vec::with_capacity(df.height());
    for ridx in 0..df.height() {
        rows.push(Row::new(cells.iter().map(|c| c[ridx].clone()).collect()));
    }
    Table::new(columns, rows)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<Cell>, PolarsError> {
    let dtype = df.column(col_name)?.dtype().clone();
    debug!("Column \"{col_name}\": {dtype:?}");

    if is_numeric_type(&dtype) {
        let col = df.column(col_name)?.cast(&DataType::Float64)?;
        let series = col.f64()?;
        Ok(series
            .into_iter()
            .map(|value| match value {
                Some(n) => Cell::Number(n),
                None => Cell::Missing,
            })
            .collect())
    } else {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        Ok(series
            .into_iter()
            .map(|value| match value {
                Some(s) => Cell::Text(s.to_string()),
                None => Cell::Missing,
            })
            .collect())
    }
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn detect_file_type(path: &Path) -> Result<FileType, RexError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("XLSX") => Ok(FileType::XLSX),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(RexError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, RexError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => RexError::FileNotFound,
        ErrorKind::PermissionDenied => RexError::PermissionDenied,
        _ => RexError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(RexError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.as_path().into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(
        PlPath::Local(path.as_path().into()),
        ScanArgsParquet::default(),
    )
}

fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.as_path().into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

/// First sheet of the workbook, first row taken as the header.
fn load_xlsx(path: &Path) -> Result<Table, RexError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RexError::LoadingFailed("workbook has no sheets".into()))??;

    let mut sheet_rows = range.rows();
    let header = sheet_rows
        .next()
        .ok_or_else(|| RexError::LoadingFailed("sheet has no header row".into()))?;
    let columns: Vec<String> = header.iter().map(|d| d.to_string()).collect();

    let mut rows = Vec::new();
    for sheet_row in sheet_rows {
        let mut cells: Vec<Cell> = sheet_row.iter().map(cell_from_data).collect();
        cells.resize(columns.len(), Cell::Missing);
        rows.push(Row::new(cells));
    }
    Table::new(columns, rows)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Missing,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::DateTime(v) => Cell::Number(v.as_f64()),
        other => Cell::Text(other.to_string()),
    }
}
