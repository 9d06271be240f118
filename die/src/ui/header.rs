//! Header block: logo, network and CPU/RAM meters, uptime.

use die_core::state::ViewFrame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::ui::theme;
use crate::ui::util::{format_rate, format_uptime};

const LOGO: [&str; 6] = [
    "██████╗ ██╗███████╗",
    "██╔══██╗██║██╔════╝",
    "██║  ██║██║█████╗  ",
    "██║  ██║██║██╔══╝  ",
    "██████╔╝██║███████╗",
    "╚═════╝ ╚═╝╚══════╝",
];
const TAGLINE: &str = "Die, Die, Die My Darling";

/// Vertical extent of each meter bar.
const METER_HEIGHT: usize = 5;
/// Character width of one meter column (bar or label, centered).
const COL: usize = 9;

pub fn draw_header(f: &mut Frame<'_>, area: Rect, frame: &ViewFrame) {
    let stats = &frame.snapshot.stats;

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(26), // logo
            Constraint::Fill(1),
            Constraint::Length((COL * 2 + 2) as u16), // net meters
            Constraint::Length(6),
            Constraint::Length((COL * 2 + 2) as u16), // cpu/ram meters
            Constraint::Fill(1),
            Constraint::Length(20), // uptime + disk
        ])
        .split(area);

    f.render_widget(logo_paragraph(), cols[0]);

    let (up_label, up_pct) = format_rate(stats.net_up_bps);
    let (down_label, down_pct) = format_rate(stats.net_down_bps);
    f.render_widget(
        Paragraph::new(meter_pair(("UP", &up_label, up_pct), ("DOWN", &down_label, down_pct))),
        cols[2],
    );

    let cpu_label = format!("{:>4.1}%", stats.cpu_percent);
    let mem_label = format!("{:>4.1} GB", stats.mem_used_mb as f64 / 1024.0);
    f.render_widget(
        Paragraph::new(meter_pair(
            ("CPU", &cpu_label, stats.cpu_percent as f64),
            ("RAM", &mem_label, stats.mem_percent as f64),
        )),
        cols[4],
    );

    let right = vec![
        Line::from(format!("UPTIME: {}", format_uptime(stats.uptime_secs))),
        Line::from(format!(
            "DISK: {:.0}/{:.0} GB",
            stats.disk_used_gb, stats.disk_total_gb
        )),
    ];
    f.render_widget(
        Paragraph::new(right)
            .style(theme::header_text())
            .right_aligned(),
        cols[6],
    );
}

fn logo_paragraph() -> Paragraph<'static> {
    let mut lines: Vec<Line<'static>> = LOGO
        .iter()
        .map(|l| Line::from(Span::styled(*l, theme::logo())))
        .collect();
    lines.push(Line::from(Span::styled(TAGLINE, theme::header_text())));
    Paragraph::new(lines)
}

/// Two vertical meters side by side with their labels and values underneath.
fn meter_pair(a: (&str, &str, f64), b: (&str, &str, f64)) -> Vec<Line<'static>> {
    let filled_a = filled_cells(a.2);
    let filled_b = filled_cells(b.2);
    let mut lines = Vec::with_capacity(METER_HEIGHT + 2);
    for row in 0..METER_HEIGHT {
        // Cells light up from the base; the ramp brightens toward the top.
        let level = METER_HEIGHT - row;
        let ramp = theme::RAMP[(level - 1) * (theme::RAMP.len() - 1) / (METER_HEIGHT - 1)];
        lines.push(Line::from(vec![
            meter_cell(filled_a >= level, ramp),
            Span::raw("  "),
            meter_cell(filled_b >= level, ramp),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled(format!("{:^COL$}", a.0), theme::header_text()),
        Span::raw("  "),
        Span::styled(format!("{:^COL$}", b.0), theme::header_text()),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!("{:^COL$}", a.1), theme::header_text()),
        Span::raw("  "),
        Span::styled(format!("{:^COL$}", b.1), theme::header_text()),
    ]));
    lines
}

fn filled_cells(pct: f64) -> usize {
    let pct = pct.clamp(0.0, 100.0);
    (pct / 100.0 * METER_HEIGHT as f64).round() as usize
}

fn meter_cell(on: bool, ramp: ratatui::style::Color) -> Span<'static> {
    if on {
        Span::styled(format!("{:^COL$}", "██"), Style::default().fg(ramp))
    } else {
        Span::styled(
            format!("{:^COL$}", "░░"),
            Style::default().fg(theme::METER_EMPTY),
        )
    }
}
