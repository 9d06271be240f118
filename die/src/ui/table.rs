//! Process table with zebra striping and a highlighted selection row.

use die_core::state::ViewFrame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Cell, Row, Table};
use ratatui::Frame;

use crate::ui::theme;

const COLS: [Constraint; 5] = [
    Constraint::Length(7),  // PID
    Constraint::Length(12), // USER
    Constraint::Length(6),  // CPU%
    Constraint::Length(10), // MEM
    Constraint::Min(10),    // COMMAND
];

pub fn draw_table(f: &mut Frame<'_>, area: Rect, frame: &ViewFrame) {
    let header = Row::new(["PID", "USER", "CPU%", "MEM USAGE", "COMMAND"])
        .style(theme::header_text());

    let rows = frame.visible().enumerate().map(|(i, row)| {
        let abs = frame.scroll + i;
        let style = if Some(abs) == frame.selected {
            theme::selected_row()
        } else if abs % 2 == 1 {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };
        Row::new([
            Cell::from(format!("{:>6}", row.pid)),
            Cell::from(row.user.clone()),
            Cell::from(format!("{:>5.1}", row.cpu_percent)),
            Cell::from(format!("{} MB", row.mem_mb)),
            Cell::from(row.name.clone()),
        ])
        .style(style)
    });

    let table = Table::new(rows, COLS.to_vec())
        .header(header)
        .column_spacing(1);
    f.render_widget(table, area);
}
