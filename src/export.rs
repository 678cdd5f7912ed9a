use std::fs;
use std::path::Path;
use std::time::Instant;

use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::domain::RexError;
use crate::table::{Cell, Table};

#[derive(Debug, PartialEq)]
enum ExportFormat {
    CSV,
    XLSX,
}

fn detect_export_format(path: &Path) -> Result<ExportFormat, RexError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(ExportFormat::CSV),
        Some("XLSX") => Ok(ExportFormat::XLSX),
        _ => Err(RexError::UnknownFileType),
    }
}

/// Serialize the table to `path`, picking the format by extension.
pub fn write(table: &Table, path: &Path) -> Result<(), RexError> {
    let start_time = Instant::now();
    match detect_export_format(path)? {
        ExportFormat::CSV => fs::write(path, to_csv(table))?,
        ExportFormat::XLSX => fs::write(path, to_xlsx(table)?)?,
    }
    info!(
        "Wrote {} rows to {:?} in {}ms",
        table.nrows(),
        path,
        start_time.elapsed().as_millis()
    );
    Ok(())
}

/// CSV rendering with a header line. Fields containing a comma, quote
/// or line break are quoted, embedded quotes are doubled.
pub fn to_csv(table: &Table) -> String {
    let mut out = String::new();

    let header = table
        .columns()
        .iter()
        .map(|name| wrap_field(name))
        .collect::<Vec<String>>();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in table.rows() {
        let fields = row
            .cells()
            .iter()
            .map(|cell| match cell {
                Cell::Missing => String::new(),
                _ => wrap_field(&cell.as_text()),
            })
            .collect::<Vec<String>>();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

pub(crate) fn wrap_field(field: &str) -> String {
    let needs_escaping = field.contains('"');
    let needs_wrapping = needs_escaping || field.contains(',') || field.contains('\n');
    let mut out = String::from(field);

    if needs_escaping {
        out = out.replace("\"", "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

/// XLSX rendering via rust_xlsxwriter, header row plus one worksheet
/// row per table row. Missing cells stay blank.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, RexError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (cidx, name) in table.columns().iter().enumerate() {
        worksheet.write(0, cidx as u16, name.as_str())?;
    }
    for (ridx, row) in table.rows().iter().enumerate() {
        for (cidx, cell) in row.cells().iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    worksheet.write(ridx as u32 + 1, cidx as u16, s.as_str())?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(ridx as u32 + 1, cidx as u16, *n)?;
                }
                Cell::Missing => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
