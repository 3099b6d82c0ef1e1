//! Channel card grid

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::view::{ChannelView, HealthStatus};
use crate::viewer::state::AppState;

use super::widgets::render_channel_chart;

/// Render the cards of the active dataset as a grid
pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.views.is_empty() {
        let message = Paragraph::new("No channels")
            .block(Block::default().borders(Borders::ALL).title("Channels"))
            .style(Style::default().fg(Color::Gray));

        frame.render_widget(message, area);
        return;
    }

    let (columns, rows) = grid_shape(state.views.len());

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    for (row, chunk) in state.views.chunks(columns).enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(row_areas[row]);

        for (view, cell) in chunk.iter().zip(cells.iter()) {
            render_card(frame, *cell, view);
        }
    }
}

/// `(columns, rows)` for `count` cards: two columns up to four cards, four above
fn grid_shape(count: usize) -> (usize, usize) {
    let columns = match count {
        0 | 1 => 1,
        2..=4 => 2,
        _ => 4,
    };
    (columns, count.div_ceil(columns))
}

fn render_card(frame: &mut Frame, area: Rect, view: &ChannelView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            view.channel.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Status lines
            Constraint::Min(0),    // Chart
        ])
        .split(inner);

    render_status(frame, chunks[0], view);
    render_channel_chart(frame, chunks[1], view);
}

fn render_status(frame: &mut Frame, area: Rect, view: &ChannelView) {
    let connection_color = if view.is_live() {
        Color::Green
    } else {
        Color::Gray
    };
    let health_color = match view.health {
        HealthStatus::Healthy => Color::Green,
        HealthStatus::Degraded => Color::Red,
    };

    let mut status = vec![
        Span::styled("● ", Style::default().fg(connection_color)),
        Span::styled(view.connection_label(), Style::default().fg(connection_color)),
        Span::raw(" | "),
        Span::styled(
            view.health.label(),
            Style::default()
                .fg(health_color)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if view.finished {
        status.push(Span::styled(" | Finished", Style::default().fg(Color::Gray)));
    }
    if let Some(updated) = view.last_update_label() {
        status.push(Span::raw(" | "));
        status.push(Span::styled(updated, Style::default().fg(Color::Gray)));
    }

    let mut details = vec![
        Span::styled("Last raw: ", Style::default().fg(Color::Cyan)),
        Span::raw(view.last_raw_label()),
    ];
    if let Some(threshold) = view.threshold_label() {
        details.push(Span::raw("  "));
        details.push(Span::styled(threshold, Style::default().fg(Color::Yellow)));
    }
    if let Some(marker) = view.marker_label() {
        details.push(Span::raw("  "));
        details.push(Span::styled(marker, Style::default().fg(Color::Red)));
    }
    if let Some(evicted) = view.evicted_label() {
        details.push(Span::raw("  "));
        details.push(Span::styled(evicted, Style::default().fg(Color::DarkGray)));
    }
    if !view.is_live()
        && let Some(error) = &view.last_error
    {
        details.push(Span::raw("  "));
        details.push(Span::styled(error.clone(), Style::default().fg(Color::DarkGray)));
    }

    frame.render_widget(
        Paragraph::new(vec![Line::from(status), Line::from(details)]),
        area,
    );
}
