use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
};

use crate::domain::CMDMode;
use crate::model::Model;

pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

pub fn draw(model: &Model, frame: &mut Frame) {
    let [header_area, table_area, status_area] = Layout::vertical([
        Constraint::Length(TABLE_HEADER_HEIGHT as u16),
        Constraint::Min(1),
        Constraint::Length(CMDLINE_HEIGHT as u16),
    ])
    .areas(frame.area());

    draw_header(model, frame, header_area);
    draw_rows(model, frame, table_area);
    draw_statusline(model, frame, status_area);

    if let Some(message) = model.popup() {
        draw_popup(frame, message);
    }
}

fn draw_header(model: &Model, frame: &mut Frame, area: Rect) {
    let (_, selected_column) = model.selected();
    let mut spans: Vec<Span> = vec![Span::raw(" ".repeat(model.index_width() + 1))];
    for cidx in model.visible_columns() {
        let name = pad(&model.table().columns()[cidx], model.col_width(cidx));
        if cidx == selected_column {
            spans.push(name.bold().underlined());
        } else {
            spans.push(name.bold());
        }
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_rows(model: &Model, frame: &mut Frame, area: Rect) {
    let (selected_row, selected_column) = model.selected();
    let rbegin = model.offset_row();
    let rend = std::cmp::min(rbegin + area.height as usize, model.table().nrows());
    let visible_columns = model.visible_columns();

    let mut lines = Vec::with_capacity(rend - rbegin);
    for ridx in rbegin..rend {
        let mut spans: Vec<Span> = vec![
            Span::raw(format!("{:>width$} ", ridx + 1, width = model.index_width())).dim(),
        ];
        for &cidx in &visible_columns {
            let content = model
                .table()
                .cell(ridx, cidx)
                .map(|c| c.display())
                .unwrap_or_default();
            let cell = pad(&content, model.col_width(cidx));
            if ridx == selected_row && cidx == selected_column {
                spans.push(cell.reversed());
            } else {
                spans.push(Span::raw(cell));
            }
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_statusline(model: &Model, frame: &mut Frame, area: Rect) {
    if let Some((mode, input)) = model.cmdline() {
        let prompt = match mode {
            CMDMode::MatchInColumn => "match> ",
            CMDMode::ExportPath => "write> ",
        };
        let line = Line::from(vec![prompt.bold(), Span::raw(input.input.clone())]);
        frame.render_widget(Paragraph::new(line), area);
        frame.set_cursor_position((
            area.x + (prompt.chars().count() + input.curser_pos) as u16,
            area.y,
        ));
        return;
    }

    let (selected_row, _) = model.selected();
    let position = format!(
        "{} {}/{} ",
        model.source().display(),
        if model.table().nrows() == 0 { 0 } else { selected_row + 1 },
        model.table().nrows()
    );
    let padding = (area.width as usize)
        .saturating_sub(model.status_message().chars().count() + position.chars().count());
    let line = Line::from(vec![
        Span::raw(model.status_message().to_string()),
        Span::raw(" ".repeat(padding)),
        position.dim(),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_popup(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let lines: Vec<&str> = message.lines().collect();
    let width = std::cmp::min(
        area.width.saturating_sub(4),
        lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4,
    );
    let height = std::cmp::min(area.height.saturating_sub(2), lines.len() as u16 + 2);
    let popup = Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(message).block(Block::bordered().title(" rex ")),
        popup,
    );
}

fn pad(content: &str, width: usize) -> String {
    let mut out: String = content.chars().take(width).collect();
    if out.chars().count() == width && content.chars().count() > width {
        out.pop();
        out.push('…');
    }
    let fill = width.saturating_sub(out.chars().count());
    out.push_str(&" ".repeat(fill));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_fills_and_truncates() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abc…");
        assert_eq!(pad("abcd", 4), "abcd");
        assert_eq!(pad("", 2), "  ");
    }
}
