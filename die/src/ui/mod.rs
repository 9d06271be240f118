//! UI module root: frame layout and the individual panel painters.

pub mod header;
pub mod table;
pub mod theme;
pub mod util;

use die_core::state::ViewFrame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Lines reserved around the process table: header block, filter line,
/// status line, key legend, table heading.
pub const CHROME_ROWS: u16 = 12;

pub fn draw(f: &mut Frame<'_>, frame: &ViewFrame) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // header: logo + meters + uptime
            Constraint::Length(1), // filter line
            Constraint::Min(5),    // process table
            Constraint::Length(1), // status line
            Constraint::Length(1), // key legend
        ])
        .split(f.area());

    header::draw_header(f, rows[0], frame);
    draw_filter_line(f, rows[1], frame);
    table::draw_table(f, rows[2], frame);
    draw_status(f, rows[3], frame);
    draw_legend(f, rows[4]);
}

fn draw_filter_line(f: &mut Frame<'_>, area: Rect, frame: &ViewFrame) {
    let text = if frame.filter_mode {
        format!("FILTER: {}_", frame.filter_input)
    } else if !frame.filter_text.is_empty() {
        format!("FILTER: {}", frame.filter_text)
    } else {
        String::new()
    };
    f.render_widget(Paragraph::new(text).style(theme::dim()), area);
}

fn draw_status(f: &mut Frame<'_>, area: Rect, frame: &ViewFrame) {
    let text = format!("STATUS: {}", frame.status);
    f.render_widget(Paragraph::new(text).style(theme::dim()), area);
}

fn draw_legend(f: &mut Frame<'_>, area: Rect) {
    let line = Line::from(vec![
        Span::styled("[UP/DN] ", theme::key_magenta()),
        Span::raw("Navigate  "),
        Span::styled("[K] ", theme::key_red()),
        Span::raw("Kill  "),
        Span::styled("[T] ", theme::key_blue()),
        Span::raw("Kill Tree  "),
        Span::styled("[/] ", theme::key_green()),
        Span::raw("Filter  "),
        Span::styled("[R] ", theme::key_cyan()),
        Span::raw("Refresh  "),
        Span::styled("[Q] ", theme::key_magenta()),
        Span::raw("Quit"),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
