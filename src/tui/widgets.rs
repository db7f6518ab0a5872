// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )])
}

pub fn get_help_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "Matchday - Help",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        section("Navigation:"),
        Line::from("  ↑/k       - Move up"),
        Line::from("  ↓/j       - Move down"),
        Line::from("  PgUp/PgDn - Move by page"),
        Line::from("  Home/End  - Jump to first / last"),
        Line::from("  Enter     - Open league / Play channel"),
        Line::from("  Esc/b     - Back to leagues"),
        Line::from("  Right click - Back to leagues"),
        Line::from("  q         - Quit"),
        Line::from(""),
        section("Special Keys:"),
        Line::from("  /         - Filter list"),
        Line::from("  r         - Refresh leagues / re-check channels"),
        Line::from("  s         - Stop playback"),
        Line::from("  ?/F1      - Toggle this help"),
        Line::from("  Ctrl+C    - Force quit"),
        Line::from(""),
        section("Channel status:"),
        Line::from(vec![
            Span::styled("  …", Style::default().fg(Color::Yellow)),
            Span::raw(" checking   "),
            Span::styled("●", Style::default().fg(Color::Green)),
            Span::raw(" live   "),
            Span::styled("✗", Style::default().fg(Color::Red)),
            Span::raw(" not working"),
        ]),
        Line::from("  Channels can be played once their check has finished."),
        Line::from(""),
        Line::from("Press Esc, ? or F1 to close this help"),
    ]
}

pub fn create_help_widget() -> Paragraph<'static> {
    Paragraph::new(get_help_lines())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Help "),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false })
}
