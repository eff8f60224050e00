//! The virtualized fleet list.
//!
//! Only the rows of the current window are turned into lines. The block is
//! scrolled by the part of the window that sits above the viewport, so the
//! lines on screen line up with the list's scroll offset.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::fleet::{FleetRow, FleetView, LifecyclePhase, SortColumn};
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use crate::utils::{pad_to_width, spinner_char, truncate_str};

use super::helpers::render_scrollbar_bordered;

const MARK_WIDTH: usize = 4;
const NAME_WIDTH: usize = 26;
const BROWSER_WIDTH: usize = 11;
const VERSION_WIDTH: usize = 10;
const GROUP_WIDTH: usize = 14;
const CREATED_WIDTH: usize = 17;

/// Lines a row takes: the summary line, plus one detail line when the row
/// has metrics or a sync status to show.
pub fn row_height(row: &FleetRow<'_>) -> u32 {
    if row.metric.is_some() || row.sync_status.is_some() {
        2
    } else {
        1
    }
}

/// Split the list block into the column header and the scrolling body.
pub fn split_list_area(area: Rect) -> (Rect, Rect) {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
    (chunks[0], chunks[1])
}

pub fn render_fleet_list(frame: &mut Frame, area: Rect, state: &AppState, fleet: &FleetView) {
    let t = &state.theme;
    let sort = fleet.sort();

    let mut title = format!(
        " Profiles ({}) │ Sort: {} {} ",
        fleet.visible_len(),
        sort.column.label(),
        sort.direction.arrow()
    );
    if !fleet.filter_text().is_empty() {
        title.push_str(&format!("│ Filter: {} ", fleet.filter_text()));
    }
    let block = Block::default()
        .title(Span::styled(title, t.header_style()))
        .borders(Borders::ALL)
        .border_style(t.border_style());
    frame.render_widget(block, area);

    let (header_area, body) = split_list_area(area);
    frame.render_widget(Paragraph::new(column_header(t, sort.column, sort.direction.arrow())), header_area);

    if fleet.visible_len() == 0 {
        let empty = if fleet.records().is_empty() {
            "  No profiles found. Press r to reload."
        } else {
            "  Nothing matches the current view."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(empty, Style::default().fg(t.text_muted))),
            body,
        );
        return;
    }

    let list = fleet.list();
    let window = list.window();
    let lines: Vec<Line> = fleet
        .visible_rows()
        .iter()
        .flat_map(|row| row_lines(row, state, body.width as usize))
        .collect();
    let skip = list.scroll().saturating_sub(window.spacer_above);
    let paragraph = Paragraph::new(lines).scroll((skip.min(u16::MAX as u32) as u16, 0));
    frame.render_widget(paragraph, body);

    render_scrollbar_bordered(frame, area, window.total_extent as usize, list.scroll() as usize);
}

fn column_header(t: &Theme, active: SortColumn, arrow: &str) -> Line<'static> {
    let cell = |column: SortColumn, width: usize| {
        let label = if column == active {
            format!("{} {}", column.label().to_uppercase(), arrow)
        } else {
            column.label().to_uppercase()
        };
        Span::styled(pad_to_width(&label, width), t.table_header_style())
    };
    Line::from(vec![
        Span::raw(" ".repeat(MARK_WIDTH)),
        cell(SortColumn::Name, NAME_WIDTH),
        cell(SortColumn::Browser, BROWSER_WIDTH),
        cell(SortColumn::Version, VERSION_WIDTH),
        cell(SortColumn::Group, GROUP_WIDTH),
        cell(SortColumn::CreatedAt, CREATED_WIDTH),
        Span::styled("STATE", t.table_header_style()),
    ])
}

fn phase_glyph(phase: LifecyclePhase, tick: u64) -> &'static str {
    if phase.is_transient() {
        spinner_char(tick)
    } else if phase == LifecyclePhase::Running {
        "●"
    } else {
        "○"
    }
}

/// Exactly `row_height(row)` lines.
fn row_lines<'a>(row: &FleetRow<'a>, state: &AppState, width: usize) -> Vec<Line<'a>> {
    let t = &state.theme;
    let under_cursor = row.position == state.cursor;
    let base = if row.is_busy() {
        t.busy_row_style(under_cursor)
    } else {
        t.row_style(under_cursor)
    };
    let record = row.record;

    let mark = if row.selected {
        Span::styled(" ✔ ", t.selected_mark_style())
    } else {
        Span::raw("   ")
    };
    let mut spans = vec![
        mark,
        Span::styled(
            phase_glyph(row.phase, state.tick_count),
            t.phase_style(row.phase),
        ),
        Span::styled(pad_to_width(&record.name, NAME_WIDTH), base),
        Span::styled(
            pad_to_width(&record.browser, BROWSER_WIDTH),
            base.fg(t.accent_secondary),
        ),
        Span::styled(pad_to_width(&record.version, VERSION_WIDTH), base),
        Span::styled(
            pad_to_width(record.group_id.as_deref().unwrap_or("-"), GROUP_WIDTH),
            base,
        ),
        Span::styled(pad_to_width(&record.created_display(), CREATED_WIDTH), base),
        Span::styled(row.phase.to_string(), base.patch(t.phase_style(row.phase))),
    ];
    if row.uploading {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(" uploading ", t.badge_style(t.info)));
    }
    if row.updating {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(" updating ", t.badge_style(t.warning)));
    }
    if record.is_linked() {
        spans.push(Span::styled(" ☁", Style::default().fg(t.info)));
    }
    let mut lines = vec![Line::from(spans).style(base)];

    if row_height(row) > 1 {
        let mut detail = vec![Span::raw(" ".repeat(MARK_WIDTH + 1))];
        if let Some(metric) = row.metric {
            detail.push(Span::styled(
                metric.traffic.summary(),
                Style::default().fg(t.text_dim),
            ));
        }
        if let Some(status) = row.sync_status {
            if row.metric.is_some() {
                detail.push(Span::styled("  │  ", Style::default().fg(t.text_muted)));
            }
            detail.push(Span::styled("sync ", Style::default().fg(t.text_muted)));
            detail.push(Span::styled(
                truncate_str(status, width.saturating_sub(MARK_WIDTH + 40).max(8)),
                Style::default()
                    .fg(t.sync_status_color(status))
                    .add_modifier(Modifier::ITALIC),
            ));
        }
        lines.push(Line::from(detail).style(base));
    }
    lines
}
