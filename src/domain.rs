use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use rust_xlsxwriter::XlsxError;

#[derive(Debug)]
pub enum RexError {
    IoError(Error),
    PolarsError(PolarsError),
    XlsxWriteError(XlsxError),
    XlsxReadError(calamine::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    InvalidSelection(String),
    EmptyTable,
}

impl From<Error> for RexError {
    fn from(err: Error) -> Self {
        RexError::IoError(err)
    }
}

impl From<PolarsError> for RexError {
    fn from(err: PolarsError) -> Self {
        RexError::PolarsError(err)
    }
}

impl From<XlsxError> for RexError {
    fn from(err: XlsxError) -> Self {
        RexError::XlsxWriteError(err)
    }
}

impl From<calamine::Error> for RexError {
    fn from(err: calamine::Error) -> Self {
        RexError::XlsxReadError(err)
    }
}

impl fmt::Display for RexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RexError::IoError(e) => write!(f, "io error: {e}"),
            RexError::PolarsError(e) => write!(f, "{e}"),
            RexError::XlsxWriteError(e) => write!(f, "xlsx write error: {e}"),
            RexError::XlsxReadError(e) => write!(f, "xlsx read error: {e}"),
            RexError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            RexError::FileNotFound => write!(f, "file not found"),
            RexError::PermissionDenied => write!(f, "permission denied"),
            RexError::UnknownFileType => write!(f, "unknown file type"),
            RexError::InvalidSelection(msg) => write!(f, "invalid selection: {msg}"),
            RexError::EmptyTable => write!(f, "table has no rows"),
        }
    }
}

#[derive(Debug, Clone, Setters)]
pub struct RexConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for RexConfig {
    fn default() -> Self {
        RexConfig {
            event_poll_time: 100,
            max_column_width: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    MatchInColumn,
    ExportPath,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    Exit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    ExplodeCell,
    ExplodeColumn,
    ExplodeMatch,
    Export,
    CopyCell,
    CopyRow,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
rex - explode multi-line cells into rows

  arrows/hjkl     move selection
  PgUp/PgDn       move one page
  g / G           first / last row
  x               explode the selected cell
  X               explode every cell of the selected column
  m               explode cells matching a literal text
                  (type \\n for an embedded line break)
  w               write the table to a file (.csv or .xlsx)
  y / Y           copy cell / row to the clipboard
  ?               show this help
  Esc             close popup / cancel input
  q               quit
";
