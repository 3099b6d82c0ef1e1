//! Main dashboard layout

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
};

use crate::viewer::state::AppState;

use super::channels;

/// Render the main dashboard UI
pub fn render(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Channel grid
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state);
    channels::render(frame, chunks[1], state);
    render_footer(frame, chunks[2], state);
}

/// Render header with one tab per dataset
fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let titles: Vec<String> = state
        .tabs
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{} {}", i + 1, label))
        .collect();

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("SoD Monitor ({})", state.endpoint)),
        )
        .select(state.selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

/// Render footer with keybindings and channel summary
fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut footer_text = vec![
        Span::raw("Dataset: "),
        Span::styled("←/→", Style::default().fg(Color::Yellow)),
        Span::raw(" or "),
        Span::styled("1-9", Style::default().fg(Color::Yellow)),
        Span::raw(" | Quit: "),
        Span::styled("Q", Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
    ];

    let live = state.live_count();
    let total = state.views.len();
    let live_color = if live == total && total > 0 {
        Color::Green
    } else {
        Color::Gray
    };
    footer_text.push(Span::styled(
        format!("● {}/{} live", live, total),
        Style::default().fg(live_color),
    ));

    let degraded = state.degraded_count();
    if degraded > 0 {
        footer_text.push(Span::raw(" | "));
        footer_text.push(Span::styled(
            format!("{} degraded", degraded),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(error) = &state.error_message {
        footer_text.push(Span::raw(" | "));
        footer_text.push(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        ));
    }

    let footer =
        Paragraph::new(Line::from(footer_text)).block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}
