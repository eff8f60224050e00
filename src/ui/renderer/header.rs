//! Header bar: logo, partition tabs, fleet summary.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::fleet::{FleetView, Partition};
use crate::ui::state::AppState;
use crate::utils::spinner_char;

pub fn render_header(frame: &mut Frame, area: Rect, state: &AppState, fleet: &FleetView) {
    let t = &state.theme;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(18), // Logo
            Constraint::Min(30),    // Partition tabs
            Constraint::Length(44), // Fleet summary
        ])
        .split(area);

    let bordered = || {
        Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style())
    };

    // Logo: pulses while the metrics timer runs
    let pulse = if fleet.is_polling() && state.tick_count % 2 == 0 {
        "●"
    } else {
        "○"
    };
    let logo = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(pulse, Style::default().fg(t.success)),
        Span::styled(" foxia", t.header_style()),
        Span::styled(" fleet", Style::default().fg(t.text_muted)),
    ]))
    .block(bordered());
    frame.render_widget(logo, chunks[0]);

    // Partition tabs
    let mut tab_spans = vec![Span::raw(" ")];
    for (i, partition) in Partition::all().iter().enumerate() {
        let label = format!(
            " {} {} ({}) ",
            partition.index() + 1,
            partition.label(),
            fleet.partition_len(*partition)
        );
        let style = if *partition == fleet.partition() {
            t.tab_active_style()
        } else {
            t.tab_inactive_style()
        };
        tab_spans.push(Span::styled(label, style));
        if i + 1 < Partition::all().len() {
            tab_spans.push(Span::styled(" │ ", Style::default().fg(t.text_muted)));
        }
    }
    if fleet.push_degraded() {
        tab_spans.push(Span::raw("  "));
        tab_spans.push(Span::styled(" push events lost ", t.badge_style(t.danger)));
    }
    let tabs = Paragraph::new(Line::from(tab_spans)).block(bordered());
    frame.render_widget(tabs, chunks[1]);

    // Fleet summary
    let counts = fleet.counts();
    let mut summary = vec![
        Span::styled(format!("● {} running", counts.running), Style::default().fg(t.success)),
        Span::styled("  ", Style::default()),
    ];
    let transient = counts.launching + counts.stopping;
    if transient > 0 {
        summary.push(Span::styled(
            format!(
                "{} {}↑ {}↓",
                spinner_char(state.tick_count),
                counts.launching,
                counts.stopping
            ),
            Style::default().fg(t.warning),
        ));
        summary.push(Span::raw("  "));
    }
    summary.push(Span::styled(
        format!("{} idle ", counts.idle),
        Style::default().fg(t.text_dim),
    ));
    let summary = Paragraph::new(Line::from(summary))
        .alignment(Alignment::Right)
        .block(bordered());
    frame.render_widget(summary, chunks[2]);
}
