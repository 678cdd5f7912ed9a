use std::cmp::{max, min};
use std::path::{Path, PathBuf};

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, trace};

use crate::domain::{CMDMode, HELP_TEXT, Message, RexConfig, RexError};
use crate::explode::{Selection, explode};
use crate::export;
use crate::inputter::{self, InputResult, Inputter};
use crate::loader;
use crate::table::Table;
use crate::ui::{CMDLINE_HEIGHT, COLUMN_WIDTH_MARGIN, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Session state: the single current table plus everything the UI
/// needs to render it. A transform replaces the table wholesale on
/// success; on failure the previous table stays in place and the
/// error lands in the status line.
pub struct Model {
    config: RexConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    source: PathBuf,
    table: Table,
    col_widths: Vec<usize>,
    selected_row: usize,
    selected_column: usize,
    offset_row: usize,
    offset_column: usize,
    view_width: usize,
    view_height: usize,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    popup_message: String,
}

impl Model {
    pub fn load(path: PathBuf, config: RexConfig) -> Result<Self, RexError> {
        let table = loader::load(path.clone())?;
        Ok(Self::new(table, path, config))
    }

    fn new(table: Table, source: PathBuf, config: RexConfig) -> Self {
        let mut model = Self {
            config,
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            source,
            table,
            col_widths: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            offset_row: 0,
            offset_column: 0,
            view_width: 0,
            view_height: 0,
            clipboard: Clipboard::new().ok(),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
            popup_message: String::new(),
        };
        model.compute_column_widths();
        model.set_status_message(format!(
            "Loaded {} rows x {} columns",
            model.table.nrows(),
            model.table.ncols()
        ));
        model
    }

    pub fn update(&mut self, message: Message) -> Result<(), RexError> {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_selection_vertical(-1),
                Message::MoveDown => self.move_selection_vertical(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => {
                    self.move_selection_vertical(-(max(self.view_height, 1) as isize))
                }
                Message::MovePageDown => {
                    self.move_selection_vertical(max(self.view_height, 1) as isize)
                }
                Message::MoveBeginning => self.move_selection_beginning(),
                Message::MoveEnd => self.move_selection_end(),
                Message::ExplodeCell => self.explode_selected_cell(),
                Message::ExplodeColumn => self.explode_selected_column(),
                Message::ExplodeMatch => self.enter_cmd_mode(CMDMode::MatchInColumn),
                Message::Export => self.enter_cmd_mode(CMDMode::ExportPath),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.close_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CMDINPUT => match message {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Explode operations ---------------------- //

    fn selected_column_name(&self) -> String {
        self.table.columns()[self.selected_column].clone()
    }

    fn explode_selected_cell(&mut self) {
        let selection = Selection::SingleCell {
            row: self.selected_row,
            column: self.selected_column_name(),
        };
        self.apply_explode(selection);
    }

    fn explode_selected_column(&mut self) {
        let selection = Selection::WholeColumn {
            column: self.selected_column_name(),
        };
        self.apply_explode(selection);
    }

    fn apply_explode(&mut self, selection: Selection) {
        match explode(&self.table, &selection) {
            Ok(table) => {
                let before = self.table.nrows();
                self.set_status_message(format!(
                    "Exploded {} rows into {}",
                    before,
                    table.nrows()
                ));
                self.table = table;
                self.compute_column_widths();
                self.clamp_selection();
            }
            Err(e) => {
                // Keep the last known good table
                debug!("Explode failed: {e}");
                self.set_status_message(format!("Explode failed: {e}"));
            }
        }
    }

    // -------------------- Command input ---------------------- //

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?}");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn handle_cmd_input(&mut self) {
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        if self.last_input.canceled {
            self.set_status_message("Canceled");
            self.cmd_mode = None;
            return;
        }

        match self.cmd_mode {
            Some(CMDMode::MatchInColumn) => {
                let selection = Selection::LiteralMatch {
                    column: self.selected_column_name(),
                    text: inputter::unescape(&cmd_input),
                };
                self.apply_explode(selection);
            }
            Some(CMDMode::ExportPath) => self.export_to(&cmd_input),
            None => debug!("Finished command input without a mode"),
        }
        self.cmd_mode = None;
    }

    fn export_to(&mut self, raw_path: &str) {
        let path = match shellexpand::full(raw_path) {
            Ok(expanded) => PathBuf::from(expanded.into_owned()),
            Err(e) => {
                self.set_status_message(format!("Bad path: {e}"));
                return;
            }
        };
        match export::write(&self.table, &path) {
            Ok(_) => self.set_status_message(format!(
                "Wrote {} rows to {}",
                self.table.nrows(),
                path.display()
            )),
            Err(e) => self.set_status_message(format!("Export failed: {e}")),
        }
    }

    // -------------------- Clipboard ---------------------- //

    fn copy_cell(&mut self) {
        let content = self
            .table
            .cell(self.selected_row, self.selected_column)
            .map(|c| c.as_text().into_owned())
            .unwrap_or_default();
        self.copy_to_clipboard(content);
    }

    fn copy_row(&mut self) {
        let Some(row) = self.table.rows().get(self.selected_row) else {
            return;
        };
        let content = row
            .cells()
            .iter()
            .map(|c| export::wrap_field(&c.as_text()))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(content);
    }

    fn copy_to_clipboard(&mut self, content: String) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied to clipboard"),
                Err(e) => self.set_status_message(format!("Clipboard error: {e}")),
            },
            None => self.set_status_message("Clipboard unavailable"),
        }
    }

    // -------------------- Popup / status ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn close_popup(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        trace!("Status: {}", self.status_message);
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // -------------------- Navigation ---------------------- //

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.view_width, width, self.view_height, height
        );
        self.view_width = width;
        self.view_height = max(
            height.saturating_sub(TABLE_HEADER_HEIGHT + CMDLINE_HEIGHT),
            1,
        );
        self.scroll_into_view();
    }

    fn move_selection_vertical(&mut self, delta: isize) {
        if self.table.nrows() == 0 {
            return;
        }
        let last = self.table.nrows() - 1;
        self.selected_row = if delta < 0 {
            self.selected_row.saturating_sub(delta.unsigned_abs())
        } else {
            min(self.selected_row + delta as usize, last)
        };
        self.scroll_into_view();
    }

    fn move_selection_beginning(&mut self) {
        self.selected_row = 0;
        self.scroll_into_view();
    }

    fn move_selection_end(&mut self) {
        self.selected_row = self.table.nrows().saturating_sub(1);
        self.scroll_into_view();
    }

    fn move_selection_left(&mut self) {
        self.selected_column = self.selected_column.saturating_sub(1);
        self.scroll_into_view();
    }

    fn move_selection_right(&mut self) {
        self.selected_column = min(
            self.selected_column + 1,
            self.table.ncols().saturating_sub(1),
        );
        self.scroll_into_view();
    }

    fn clamp_selection(&mut self) {
        self.selected_row = min(self.selected_row, self.table.nrows().saturating_sub(1));
        self.selected_column = min(self.selected_column, self.table.ncols().saturating_sub(1));
        self.scroll_into_view();
    }

    fn scroll_into_view(&mut self) {
        if self.selected_row < self.offset_row {
            self.offset_row = self.selected_row;
        } else if self.view_height > 0
            && self.selected_row >= self.offset_row + self.view_height
        {
            self.offset_row = self.selected_row + 1 - self.view_height;
        }

        if self.selected_column < self.offset_column {
            self.offset_column = self.selected_column;
        }
        while self.offset_column < self.selected_column
            && !self.visible_columns().contains(&self.selected_column)
        {
            self.offset_column += 1;
        }
    }

    fn compute_column_widths(&mut self) {
        self.col_widths = self
            .table
            .columns()
            .iter()
            .enumerate()
            .map(|(cidx, name)| {
                let content = self
                    .table
                    .rows()
                    .iter()
                    .map(|row| row.cell(cidx).display().chars().count())
                    .max()
                    .unwrap_or(0);
                min(
                    max(name.chars().count(), content) + COLUMN_WIDTH_MARGIN,
                    self.config.max_column_width,
                )
            })
            .collect();
    }

    // -------------------- View accessors ---------------------- //

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn selected(&self) -> (usize, usize) {
        (self.selected_row, self.selected_column)
    }

    pub fn offset_row(&self) -> usize {
        self.offset_row
    }

    pub fn col_width(&self, cidx: usize) -> usize {
        self.col_widths.get(cidx).copied().unwrap_or(0)
    }

    /// Width of the 1-based row index gutter.
    pub fn index_width(&self) -> usize {
        max(3, self.table.nrows().to_string().len())
    }

    /// Column indices that fit in the current view, starting at the
    /// horizontal offset. The first one is always included even when
    /// it is wider than the view.
    pub fn visible_columns(&self) -> Vec<usize> {
        let budget = self.view_width.saturating_sub(self.index_width() + 1);
        let mut cols = Vec::new();
        let mut used = 0;
        for cidx in self.offset_column..self.table.ncols() {
            let width = self.col_width(cidx) + 1;
            if cols.is_empty() || used + width <= budget {
                used += width;
                cols.push(cidx);
            } else {
                break;
            }
        }
        cols
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn popup(&self) -> Option<&str> {
        if self.modus == Modus::POPUP {
            Some(&self.popup_message)
        } else {
            None
        }
    }

    pub fn cmdline(&self) -> Option<(CMDMode, &InputResult)> {
        if self.active_cmdinput {
            self.cmd_mode.map(|mode| (mode, &self.last_input))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Row};
    use ratatui::crossterm::event::KeyCode;

    fn test_model(notes: &[&str]) -> Model {
        let rows = notes
            .iter()
            .enumerate()
            .map(|(idx, note)| {
                Row::new(vec![
                    Cell::Number(idx as f64 + 1.0),
                    Cell::Text(note.to_string()),
                ])
            })
            .collect();
        let table = Table::new(vec!["ID".into(), "Note".into()], rows).unwrap();
        let mut model = Model::new(table, PathBuf::from("test.csv"), RexConfig::default());
        model.ui_resize(80, 24);
        model
    }

    fn press(model: &mut Model, code: KeyCode) {
        model
            .update(Message::RawKey(KeyEvent::from(code)))
            .unwrap();
    }

    #[test]
    fn explode_cell_replaces_the_table() {
        let mut model = test_model(&["a\nb", "single"]);
        model.update(Message::ExplodeCell).unwrap();
        assert_eq!(model.table().nrows(), 2);

        // Move to the Note column, where the selected cell splits
        model.update(Message::MoveRight).unwrap();
        model.update(Message::ExplodeCell).unwrap();
        assert_eq!(model.table().nrows(), 3);
        assert_eq!(
            model.table().cell(0, 1),
            Some(&Cell::Text("a".into()))
        );
    }

    #[test]
    fn failed_explode_keeps_last_known_good_table() {
        let mut model = test_model(&[]);
        model.update(Message::MoveRight).unwrap();
        model.update(Message::ExplodeColumn).unwrap();
        assert_eq!(model.table().nrows(), 0);
        assert!(model.status_message().contains("Explode failed"));
    }

    #[test]
    fn literal_match_via_command_input() {
        let mut model = test_model(&["a\nb", "a\nb", "other"]);
        model.update(Message::MoveRight).unwrap();
        model.update(Message::ExplodeMatch).unwrap();
        assert!(model.raw_keyevents());

        for c in "a\\nb".chars() {
            press(&mut model, KeyCode::Char(c));
        }
        press(&mut model, KeyCode::Enter);

        assert!(!model.raw_keyevents());
        assert_eq!(model.table().nrows(), 5);
    }

    #[test]
    fn canceled_command_input_changes_nothing() {
        let mut model = test_model(&["a\nb"]);
        model.update(Message::ExplodeMatch).unwrap();
        press(&mut model, KeyCode::Char('a'));
        press(&mut model, KeyCode::Esc);
        assert_eq!(model.table().nrows(), 1);
        assert_eq!(model.status_message(), "Canceled");
    }

    #[test]
    fn selection_stays_inside_the_table() {
        let mut model = test_model(&["a", "b"]);
        model.update(Message::MoveEnd).unwrap();
        assert_eq!(model.selected().0, 1);
        model.update(Message::MoveDown).unwrap();
        assert_eq!(model.selected().0, 1);
        model.update(Message::MoveRight).unwrap();
        model.update(Message::MoveRight).unwrap();
        assert_eq!(model.selected().1, 1);
    }

    #[test]
    fn quit_message_sets_status() {
        let mut model = test_model(&["a"]);
        model.update(Message::Quit).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }
}
