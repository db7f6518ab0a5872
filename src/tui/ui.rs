// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::app::{App, AppState, Row};
use super::widgets::{centered_rect, create_help_widget};

pub fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(size);

    draw_header(frame, app, chunks[0]);
    draw_content(frame, app, chunks[1]);
    draw_footer(frame, app, chunks[2]);

    if app.show_help {
        draw_help_overlay(frame, size);
    }

    match &app.state {
        AppState::Loading(msg) => draw_loading_overlay(frame, size, msg),
        AppState::Error(msg) => draw_error_overlay(frame, size, msg),
        _ => {}
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let header_text = match &app.state {
        AppState::ChannelSelection(league) => format!("Channels in {}", league.name),
        AppState::Loading(_) => "Matchday".to_string(),
        _ => format!("Categories - {}", app.date.format("%A %d %B %Y")),
    };

    let header_text = match &app.playing {
        Some(title) => format!("{}   ▶ {}", header_text, title),
        None => header_text,
    };

    let header = Paragraph::new(header_text)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );

    frame.render_widget(header, area);
}

fn draw_content(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(40),    // Main list
            Constraint::Length(40), // Logs / info
        ])
        .split(area);

    draw_main_list(frame, app, chunks[0]);
    draw_side_panel(frame, app, chunks[1]);
}

fn row_line<'a>(app: &App, row: &'a Row, selected: bool) -> Line<'a> {
    let cursor = if selected { " ▶ " } else { "   " };
    let highlight = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    match row {
        Row::League {
            name,
            channel_count,
        } => {
            let name = if name.is_empty() { "(no league)" } else { name.as_str() };
            let line = Line::from(vec![
                Span::raw(cursor),
                Span::raw(name),
                Span::styled(
                    format!("  ({})", channel_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            if selected { line.style(highlight) } else { line }
        }
        Row::MatchHeader(label) => Line::from(Span::styled(
            format!(" ── {} ", label),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Row::Channel(entry) => {
            let status = app.probes.status(entry.id());
            let name_style = if selected {
                highlight
            } else if status.is_settled() {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(vec![
                Span::raw(cursor),
                Span::styled(
                    format!("{} ", status.marker()),
                    Style::default().fg(status.color()),
                ),
                Span::styled(entry.display_name(), name_style),
                Span::styled(
                    format!("  {}", status),
                    Style::default().fg(status.color()),
                ),
            ])
        }
    }
}

fn draw_main_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = match &app.state {
        AppState::ChannelSelection(_) => " Channels ",
        _ => " Categories ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title);

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    app.update_visible_height(inner_area.height as usize);

    if app.visible.is_empty() {
        let message = if app.search_query.is_empty() {
            "No matches with channels today"
        } else {
            "Nothing matches the filter"
        };
        let empty_msg = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty_msg, inner_area);
        return;
    }

    let visible_height = inner_area.height as usize;
    let start = app.scroll_offset.min(app.visible.len());
    let end = (start + visible_height).min(app.visible.len());

    let items: Vec<ListItem> = app.visible[start..end]
        .iter()
        .enumerate()
        .map(|(i, &row_index)| {
            let selected = start + i == app.selected;
            ListItem::new(row_line(app, &app.rows[row_index], selected))
        })
        .collect();

    frame.render_widget(List::new(items), inner_area);

    if app.visible.len() > visible_height {
        draw_scrollbar(
            frame,
            inner_area,
            app.scroll_offset,
            app.visible.len(),
            visible_height,
        );
    }
}

fn draw_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // Logs
            Constraint::Length(6), // Info
        ])
        .split(area);

    draw_logs_panel(frame, app, chunks[0]);
    draw_info_panel(frame, app, chunks[1]);
}

fn draw_logs_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Logs ");

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    if app.logs.is_empty() {
        return;
    }

    let visible_count = inner_area.height as usize;
    let start = app.logs.len().saturating_sub(visible_count);

    let log_lines: Vec<Line> = app.logs[start..]
        .iter()
        .map(|(at, msg)| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", at.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(msg.clone(), Style::default().fg(Color::Gray)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(log_lines).wrap(Wrap { trim: true }), inner_area);
}

fn draw_info_panel(frame: &mut Frame, app: &App, area: Rect) {
    let info_text = match &app.state {
        AppState::ChannelSelection(_) => {
            let (pending, live, dead) = app.probes.counts();
            vec![
                Line::from(vec![
                    Span::styled(format!("● {} live  ", live), Style::default().fg(Color::Green)),
                    Span::styled(format!("✗ {} dead", dead), Style::default().fg(Color::Red)),
                ]),
                Line::from(Span::styled(
                    format!("… {} checking", pending),
                    Style::default().fg(Color::Yellow),
                )),
                Line::from("Esc/right click: back"),
                Line::from("Press '?' for help"),
            ]
        }
        _ => vec![
            Line::from(""),
            Line::from("Refreshes automatically"),
            Line::from("Press '?' for help"),
            Line::from("Press 'q' to quit"),
        ],
    };

    let info = Paragraph::new(info_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Info "),
        )
        .style(Style::default().fg(Color::Cyan));

    frame.render_widget(info, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let footer_text = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        format!(
            " Item {} of {} | ↑↓/jk: Navigate | Enter: Select | Esc/b: Back | q: Quit ",
            app.selected + 1,
            app.visible.len().max(1)
        )
    };

    let footer = Paragraph::new(footer_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(footer, area);
}

fn draw_scrollbar(frame: &mut Frame, area: Rect, offset: usize, total: usize, visible: usize) {
    if total <= visible || area.width == 0 {
        return;
    }

    let scrollbar_height = area.height as usize;
    let scrollbar_pos = (offset * scrollbar_height) / total;
    let scrollbar_size = ((visible * scrollbar_height) / total).max(1);

    let mut scrollbar_chars = vec!['│'; scrollbar_height];
    for i in scrollbar_chars
        .iter_mut()
        .skip(scrollbar_pos)
        .take(scrollbar_size)
    {
        *i = '█';
    }

    let scrollbar_lines: Vec<Line> = scrollbar_chars
        .into_iter()
        .map(|c| Line::from(c.to_string()))
        .collect();
    let scrollbar = Paragraph::new(scrollbar_lines).style(Style::default().fg(Color::DarkGray));

    let scrollbar_area = Rect {
        x: area.x + area.width - 1,
        y: area.y,
        width: 1,
        height: area.height,
    };

    frame.render_widget(scrollbar, scrollbar_area);
}

fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_area = centered_rect(60, 80, area);
    frame.render_widget(Clear, help_area);
    frame.render_widget(create_help_widget(), help_area);
}

fn draw_loading_overlay(frame: &mut Frame, area: Rect, message: &str) {
    let loading_area = centered_rect(40, 20, area);
    frame.render_widget(Clear, loading_area);

    let loading = Paragraph::new(vec![
        Line::from(""),
        Line::from("⏳ Loading...").style(Style::default().fg(Color::Yellow)),
        Line::from(""),
        Line::from(message).style(Style::default().fg(Color::Gray)),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Please Wait "),
    )
    .alignment(Alignment::Center);

    frame.render_widget(loading, loading_area);
}

fn draw_error_overlay(frame: &mut Frame, area: Rect, message: &str) {
    let error_area = centered_rect(50, 30, area);
    frame.render_widget(Clear, error_area);

    let error = Paragraph::new(vec![
        Line::from(""),
        Line::from("❌ Error").style(
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
        Line::from(message).style(Style::default().fg(Color::White)),
        Line::from(""),
        Line::from("Press Enter or Esc to continue").style(Style::default().fg(Color::Gray)),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Error "),
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    frame.render_widget(error, error_area);
}
