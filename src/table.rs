use std::borrow::Cow;

use crate::domain::RexError;

/// A single scalar value within a row.
///
/// Cells keep their loaded type until a transform needs text; coercion
/// happens explicitly through [`Cell::as_text`] instead of being baked
/// into the storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Missing,
}

impl Cell {
    /// Textual representation used for matching and splitting.
    /// Numbers drop the trailing `.0` of integral values, `Missing`
    /// coerces to the empty string.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
            Cell::Missing => Cow::Borrowed(""),
        }
    }

    /// Single-line form for table rendering. Embedded line breaks show
    /// up as ` ↵ ` and missing values as `∅`.
    pub fn display(&self) -> String {
        match self {
            Cell::Missing => String::from("∅"),
            _ => self
                .as_text()
                .replace("\r\n", " ↵ ")
                .replace("\n", " ↵ "),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }
}

/// One record, its cells ordered like the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    /// Shallow copy with a single cell replaced.
    pub fn with_cell(&self, idx: usize, cell: Cell) -> Row {
        let mut cells = self.cells.clone();
        cells[idx] = cell;
        Row { cells }
    }
}

/// In-memory ordered collection of rows sharing a column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, checking that column names are unique and that
    /// every row matches the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, RexError> {
        for (idx, name) in columns.iter().enumerate() {
            if columns[..idx].contains(name) {
                return Err(RexError::LoadingFailed(format!(
                    "duplicated column name \"{name}\""
                )));
            }
        }
        for (ridx, row) in rows.iter().enumerate() {
            if row.cells().len() != columns.len() {
                return Err(RexError::LoadingFailed(format!(
                    "row {} has {} cells, expected {}",
                    ridx,
                    row.cells().len(),
                    columns.len()
                )));
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells().get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_coercion_drops_integral_fraction() {
        assert_eq!(Cell::Number(3.0).as_text(), "3");
        assert_eq!(Cell::Number(-7.0).as_text(), "-7");
        assert_eq!(Cell::Number(2.5).as_text(), "2.5");
    }

    #[test]
    fn missing_coerces_to_empty_text() {
        assert_eq!(Cell::Missing.as_text(), "");
        assert_eq!(Cell::Missing.display(), "∅");
    }

    #[test]
    fn display_marks_line_breaks() {
        let c = Cell::Text("a\nb".to_string());
        assert_eq!(c.display(), "a ↵ b");
        assert_eq!(c.as_text(), "a\nb");
    }

    #[test]
    fn rejects_duplicated_columns() {
        let result = Table::new(vec!["A".into(), "A".into()], Vec::new());
        assert!(matches!(result, Err(RexError::LoadingFailed(_))));
    }

    #[test]
    fn rejects_ragged_rows() {
        let result = Table::new(
            vec!["A".into(), "B".into()],
            vec![Row::new(vec![Cell::Number(1.0)])],
        );
        assert!(matches!(result, Err(RexError::LoadingFailed(_))));
    }

    #[test]
    fn column_lookup_by_name() {
        let t = Table::new(vec!["ID".into(), "Note".into()], Vec::new()).unwrap();
        assert_eq!(t.column_index("Note"), Some(1));
        assert_eq!(t.column_index("nope"), None);
    }
}
