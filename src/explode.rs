use tracing::{debug, trace};

use crate::domain::RexError;
use crate::table::{Cell, Table};

/// Which cell(s) of a table an explode operation targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// One cell, addressed by 0-based row index and column name.
    SingleCell { row: usize, column: String },
    /// Every cell of a column.
    WholeColumn { column: String },
    /// Every cell of a column whose text equals `text` exactly.
    LiteralMatch { column: String, text: String },
}

impl Selection {
    pub fn column(&self) -> &str {
        match self {
            Selection::SingleCell { column, .. } => column,
            Selection::WholeColumn { column } => column,
            Selection::LiteralMatch { column, .. } => column,
        }
    }
}

/// Split the targeted cells on `'\n'` and emit one row per segment,
/// duplicating the other column values.
///
/// Empty segments are kept: `"a\n\nb"` becomes three rows with `"a"`,
/// `""` and `"b"`. A targeted cell without a line break leaves its row
/// untouched, so the original cell type survives. The input table is
/// never mutated; a fresh table is returned.
pub fn explode(table: &Table, selection: &Selection) -> Result<Table, RexError> {
    let col = table.column_index(selection.column()).ok_or_else(|| {
        RexError::InvalidSelection(format!("unknown column \"{}\"", selection.column()))
    })?;

    match selection {
        Selection::SingleCell { row, .. } if *row >= table.nrows() => {
            return Err(RexError::InvalidSelection(format!(
                "row {} out of bounds, table has {} rows",
                row,
                table.nrows()
            )));
        }
        Selection::WholeColumn { .. } | Selection::LiteralMatch { .. }
            if table.nrows() == 0 =>
        {
            return Err(RexError::EmptyTable);
        }
        _ => {}
    }

    let mut rows = Vec::with_capacity(table.nrows());
    for (ridx, row) in table.rows().iter().enumerate() {
        let targeted = match selection {
            Selection::SingleCell { row: target, .. } => *target == ridx,
            Selection::WholeColumn { .. } => true,
            Selection::LiteralMatch { text, .. } => row.cell(col).as_text() == text.as_str(),
        };
        if !targeted {
            rows.push(row.clone());
            continue;
        }

        let cell = row.cell(col);
        if !cell.is_text() {
            debug!("Coercing {cell:?} at {ridx}:{col} to text");
        }
        let text = cell.as_text();
        if !text.contains('\n') {
            // Identity case, keep the original cell as is
            rows.push(row.clone());
            continue;
        }

        let segments = text.split('\n');
        trace!(
            "Exploding row {} into {} segments",
            ridx,
            segments.clone().count()
        );
        for segment in segments {
            rows.push(row.with_cell(col, Cell::Text(segment.to_string())));
        }
    }

    Table::new(table.columns().to_vec(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Row;

    fn notes_table(notes: &[Cell]) -> Table {
        let rows = notes
            .iter()
            .enumerate()
            .map(|(idx, note)| Row::new(vec![Cell::Number(idx as f64 + 1.0), note.clone()]))
            .collect();
        Table::new(vec!["ID".into(), "Note".into()], rows).unwrap()
    }

    fn note_texts(table: &Table) -> Vec<&Cell> {
        table.rows().iter().map(|r| r.cell(1)).collect()
    }

    #[test]
    fn whole_column_splits_multiline_cells() {
        let table = notes_table(&[
            Cell::Text("a\nb".into()),
            Cell::Text("single".into()),
        ]);
        let out = explode(
            &table,
            &Selection::WholeColumn {
                column: "Note".into(),
            },
        )
        .unwrap();

        assert_eq!(out.nrows(), 3);
        assert_eq!(
            note_texts(&out),
            vec![
                &Cell::Text("a".into()),
                &Cell::Text("b".into()),
                &Cell::Text("single".into())
            ]
        );
        // Other column values duplicated across the new rows
        assert_eq!(out.cell(0, 0), Some(&Cell::Number(1.0)));
        assert_eq!(out.cell(1, 0), Some(&Cell::Number(1.0)));
        assert_eq!(out.cell(2, 0), Some(&Cell::Number(2.0)));
    }

    #[test]
    fn empty_segments_are_preserved() {
        let table = notes_table(&[Cell::Text("x\n\ny".into())]);
        let out = explode(
            &table,
            &Selection::WholeColumn {
                column: "Note".into(),
            },
        )
        .unwrap();

        assert_eq!(
            note_texts(&out),
            vec![
                &Cell::Text("x".into()),
                &Cell::Text("".into()),
                &Cell::Text("y".into())
            ]
        );
    }

    #[test]
    fn leading_and_trailing_breaks_yield_empty_rows() {
        let table = notes_table(&[Cell::Text("\nmid\n".into())]);
        let out = explode(
            &table,
            &Selection::WholeColumn {
                column: "Note".into(),
            },
        )
        .unwrap();
        assert_eq!(
            note_texts(&out),
            vec![
                &Cell::Text("".into()),
                &Cell::Text("mid".into()),
                &Cell::Text("".into())
            ]
        );
    }

    #[test]
    fn table_without_line_breaks_is_untouched() {
        let table = notes_table(&[
            Cell::Text("one".into()),
            Cell::Number(2.5),
            Cell::Missing,
        ]);
        let out = explode(
            &table,
            &Selection::WholeColumn {
                column: "Note".into(),
            },
        )
        .unwrap();
        assert_eq!(out, table);
    }

    #[test]
    fn untargeted_rows_pass_through_unchanged() {
        let table = notes_table(&[
            Cell::Text("a\nb".into()),
            Cell::Text("c\nd".into()),
        ]);
        let out = explode(
            &table,
            &Selection::SingleCell {
                row: 0,
                column: "Note".into(),
            },
        )
        .unwrap();

        // Row 1 keeps its line break, only row 0 was split
        assert_eq!(out.nrows(), 3);
        assert_eq!(out.cell(2, 1), Some(&Cell::Text("c\nd".into())));
    }

    #[test]
    fn exploded_rows_take_the_place_of_the_original() {
        let table = notes_table(&[
            Cell::Text("before".into()),
            Cell::Text("a\nb\nc".into()),
            Cell::Text("after".into()),
        ]);
        let out = explode(
            &table,
            &Selection::SingleCell {
                row: 1,
                column: "Note".into(),
            },
        )
        .unwrap();

        assert_eq!(
            note_texts(&out),
            vec![
                &Cell::Text("before".into()),
                &Cell::Text("a".into()),
                &Cell::Text("b".into()),
                &Cell::Text("c".into()),
                &Cell::Text("after".into())
            ]
        );
    }

    #[test]
    fn literal_match_targets_equal_cells_only() {
        let table = notes_table(&[
            Cell::Text("a\nb".into()),
            Cell::Text("a\nb\nextra".into()),
            Cell::Text("other".into()),
        ]);
        let out = explode(
            &table,
            &Selection::LiteralMatch {
                column: "Note".into(),
                text: "a\nb".into(),
            },
        )
        .unwrap();

        assert_eq!(out.nrows(), 4);
        assert_eq!(out.cell(0, 1), Some(&Cell::Text("a".into())));
        assert_eq!(out.cell(1, 1), Some(&Cell::Text("b".into())));
        // Second row not equal to the literal, left intact
        assert_eq!(out.cell(2, 1), Some(&Cell::Text("a\nb\nextra".into())));
    }

    #[test]
    fn literal_match_compares_coerced_numbers() {
        let table = notes_table(&[Cell::Number(42.0), Cell::Text("42".into())]);
        let out = explode(
            &table,
            &Selection::LiteralMatch {
                column: "Note".into(),
                text: "42".into(),
            },
        )
        .unwrap();
        // Both match, neither contains a break, both stay as loaded
        assert_eq!(out, table);
    }

    #[test]
    fn column_set_is_invariant() {
        let table = notes_table(&[Cell::Text("a\nb".into())]);
        let out = explode(
            &table,
            &Selection::WholeColumn {
                column: "Note".into(),
            },
        )
        .unwrap();
        assert_eq!(out.columns(), table.columns());
    }

    #[test]
    fn input_table_is_not_mutated() {
        let table = notes_table(&[Cell::Text("a\nb".into())]);
        let copy = table.clone();
        let _ = explode(
            &table,
            &Selection::WholeColumn {
                column: "Note".into(),
            },
        )
        .unwrap();
        assert_eq!(table, copy);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let table = notes_table(&[Cell::Text("a".into())]);
        let result = explode(
            &table,
            &Selection::WholeColumn {
                column: "Memo".into(),
            },
        );
        assert!(matches!(result, Err(RexError::InvalidSelection(_))));
    }

    #[test]
    fn out_of_bounds_row_is_rejected() {
        let table = notes_table(&vec![Cell::Text("a".into()); 5]);
        let result = explode(
            &table,
            &Selection::SingleCell {
                row: 100,
                column: "Note".into(),
            },
        );
        assert!(matches!(result, Err(RexError::InvalidSelection(_))));
    }

    #[test]
    fn empty_table_fails_loudly() {
        let table = notes_table(&[]);
        let result = explode(
            &table,
            &Selection::WholeColumn {
                column: "Note".into(),
            },
        );
        assert!(matches!(result, Err(RexError::EmptyTable)));

        let result = explode(
            &table,
            &Selection::LiteralMatch {
                column: "Note".into(),
                text: "a".into(),
            },
        );
        assert!(matches!(result, Err(RexError::EmptyTable)));
    }
}
