//! Shared rendering helpers: keybind badges, detail lines, scrollbar, centered rect.

use ratatui::{
    layout::{Margin, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::ui::theme::Theme;

/// Keybind badge followed by its dimmed description.
pub fn key_hint<'a>(key: &str, desc: &str, color: Color, t: &Theme) -> [Span<'a>; 2] {
    [
        Span::styled(format!(" {} ", key), t.badge_style(color)),
        Span::styled(format!(" {} ", desc), Style::default().fg(t.text_dim)),
    ]
}

/// `  label  value` line used by the detail overlay.
pub fn detail_line<'a>(label: &str, value: &str, t: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", label), Style::default().fg(t.text_dim)),
        Span::styled(value.to_string(), Style::default().fg(t.text_primary)),
    ])
}

/// Render a vertical scrollbar inside a bordered area (1px vertical margin).
///
/// Only renders if `total` exceeds the inner height.
pub fn render_scrollbar_bordered(frame: &mut Frame, area: Rect, total: usize, position: usize) {
    let visible_height = area.height.saturating_sub(2) as usize;
    if total <= visible_height {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▲"))
        .end_symbol(Some("▼"));
    let mut scrollbar_state = ScrollbarState::new(total.saturating_sub(visible_height))
        .position(position)
        .viewport_content_length(visible_height);
    frame.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

/// Return a `Rect` centered within `area` with the given dimensions.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
