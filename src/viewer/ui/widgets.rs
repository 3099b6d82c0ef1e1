//! Reusable UI widgets

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Chart, Dataset, GraphType},
};

use crate::view::ChannelView;

/// Render the kurtosis chart of one channel
///
/// Draws the raw series, the smoothed series split at the threshold, a
/// horizontal threshold line and a vertical line at the SoD index.
pub fn render_channel_chart(frame: &mut Frame, area: Rect, view: &ChannelView) {
    let series = &view.series;

    // the marker stays latched after its sample was evicted
    let [mut x_min, mut x_max] = series.x_bounds().unwrap_or([0.0, 10.0]);
    if let Some(marker) = view.degradation_marker {
        x_min = x_min.min(marker as f64);
        x_max = x_max.max(marker as f64);
    }
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }

    let [mut y_min, mut y_max] = series.y_bounds().unwrap_or([0.0, 1.0]);
    if let Some(threshold) = view.threshold_line {
        y_min = y_min.min(threshold);
        y_max = y_max.max(threshold);
    }
    let padding = ((y_max - y_min) * 0.1).max(0.1);
    y_min -= padding;
    y_max += padding;

    let threshold_data: Vec<(f64, f64)> = view
        .threshold_line
        .map(|threshold| vec![(x_min, threshold), (x_max, threshold)])
        .unwrap_or_default();
    let marker_data: Vec<(f64, f64)> = view
        .degradation_marker
        .map(|index| vec![(index as f64, y_min), (index as f64, y_max)])
        .unwrap_or_default();

    let mut datasets = vec![
        Dataset::default()
            .name("Raw")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&series.raw),
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&series.below_threshold),
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Magenta))
            .data(&series.above_threshold),
    ];

    if !threshold_data.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Yellow))
                .data(&threshold_data),
        );
    }
    if !marker_data.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Red))
                .data(&marker_data),
        );
    }

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .labels(vec![format!("{:.0}", x_min), format!("{:.0}", x_max)])
                .bounds([x_min, x_max]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .labels(vec![format!("{:.1}", y_min), format!("{:.1}", y_max)])
                .bounds([y_min, y_max]),
        );

    frame.render_widget(chart, area);
}
