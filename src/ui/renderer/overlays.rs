//! Popup overlays: profile detail and help.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::constants::{DETAIL_POPUP_HEIGHT, DETAIL_POPUP_WIDTH, HELP_POPUP_HEIGHT, HELP_POPUP_WIDTH};
use crate::fleet::FleetView;
use crate::models::{format_bytes, ProfileId};
use crate::ui::state::AppState;

use super::helpers::{centered_rect, detail_line};

pub fn render_profile_detail(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    fleet: &FleetView,
    id: &ProfileId,
) {
    let t = &state.theme;
    let Some(record) = fleet.record(id) else {
        return;
    };

    let popup_area = centered_rect(
        DETAIL_POPUP_WIDTH.min(area.width.saturating_sub(4)),
        DETAIL_POPUP_HEIGHT.min(area.height.saturating_sub(2)),
        area,
    );
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(
            format!(" {} (Esc to close) ", record.name),
            t.header_style(),
        ))
        .borders(Borders::ALL)
        .border_style(t.border_highlight_style());
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let section = |title: &str| {
        Line::from(Span::styled(
            format!(" {title}"),
            Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
        ))
    };

    let phase = fleet.phase(id);
    let mut lines = vec![
        section("Profile"),
        detail_line("Id", id.as_str(), t),
        detail_line("Browser", &format!("{} {}", record.browser, record.version), t),
        detail_line("Group", record.group_id.as_deref().unwrap_or("-"), t),
        detail_line(
            "Tags",
            &if record.tags.is_empty() {
                "-".to_string()
            } else {
                record.tags.join(", ")
            },
            t,
        ),
        detail_line("Proxy", record.proxy_id.as_deref().unwrap_or("-"), t),
        detail_line("Created", &record.created_display(), t),
        Line::from(vec![
            Span::styled(format!("  {:<10}", "State"), Style::default().fg(t.text_dim)),
            Span::styled(phase.to_string(), t.phase_style(phase)),
        ]),
        Line::raw(""),
        section("Sync"),
        detail_line(
            "Remote",
            if record.is_linked() {
                record.remote_id.as_deref().unwrap_or("-")
            } else {
                "not linked"
            },
            t,
        ),
        detail_line("Auto sync", if record.sync_enabled { "on" } else { "off" }, t),
    ];
    if let Some(status) = fleet.state().sync_status(id) {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<10}", "Status"), Style::default().fg(t.text_dim)),
            Span::styled(status.to_string(), Style::default().fg(t.sync_status_color(status))),
        ]));
    }
    lines.push(Line::raw(""));

    lines.push(section("Traffic"));
    match fleet.snapshot(id) {
        Some(snapshot) => {
            lines.push(detail_line("Sent", &format_bytes(snapshot.traffic.bytes_sent), t));
            lines.push(detail_line("Received", &format_bytes(snapshot.traffic.bytes_received), t));
            lines.push(detail_line("Requests", &snapshot.traffic.requests.to_string(), t));
            lines.push(detail_line(
                "Conns",
                &snapshot.traffic.active_connections.to_string(),
                t,
            ));
        }
        None => lines.push(Line::from(Span::styled(
            "  No metrics while the profile is not running",
            Style::default().fg(t.text_muted),
        ))),
    }

    if let Some(note) = record.note.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(Line::raw(""));
        lines.push(section("Note"));
        lines.push(Line::from(Span::styled(
            format!("  {note}"),
            Style::default().fg(t.text_primary),
        )));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

pub fn render_help_overlay(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let popup_area = centered_rect(HELP_POPUP_WIDTH, HELP_POPUP_HEIGHT, area);

    frame.render_widget(Clear, popup_area);

    let help_entry = |key: &str, desc: &str, color: ratatui::style::Color| -> Line {
        Line::from(vec![
            Span::styled(
                format!("  {:<16}", key),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(desc.to_string(), Style::default().fg(t.text_primary)),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled("  FOXIA FLEET - Keyboard Shortcuts", t.header_style())),
        Line::raw(""),
        help_entry("Up/Down / j / k", "Move cursor", t.accent),
        help_entry("PgUp / PgDn", "Page up/down", t.accent),
        help_entry("Home / End", "First / last profile", t.accent),
        help_entry("1 / 2 / 3", "All / Local / Linked", t.accent),
        help_entry("s / S", "Cycle sort column / direction", t.accent),
        help_entry("/", "Filter by name, tag or group", t.accent),
        help_entry("Enter", "Profile detail", t.accent),
        Line::raw(""),
        help_entry("l", "Launch profile", t.success),
        help_entry("x", "Stop profile", t.warning),
        help_entry("u", "Upload to remote directory", t.info),
        Line::raw(""),
        help_entry("Space", "Toggle selection", t.selected_mark),
        help_entry("a", "Select all eligible / clear", t.selected_mark),
        help_entry("L / X", "Launch / stop selection", t.selected_mark),
        help_entry("g", "Assign selection to group", t.selected_mark),
        Line::raw(""),
        help_entry("r", "Reload profiles", t.accent),
        help_entry("T", "Cycle color theme", t.accent),
        help_entry("Esc", "Clear filter / close overlay", t.accent),
        help_entry("q", "Quit", t.accent),
        Line::raw(""),
        Line::from(Span::styled(
            "  Busy profiles (launching, stopping, uploading or",
            Style::default().fg(t.text_muted),
        )),
        Line::from(Span::styled(
            "  blocked by a browser update) cannot be selected.",
            Style::default().fg(t.text_muted),
        )),
    ];

    let help = Paragraph::new(help_text).block(
        Block::default()
            .title(Span::styled(" Help (? or Esc to close) ", t.header_style()))
            .borders(Borders::ALL)
            .border_style(t.border_highlight_style()),
    );
    frame.render_widget(help, popup_area);
}
