//! Status bar at the bottom of the screen.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::fleet::FleetView;
use crate::ui::state::{AppState, InputMode};

use super::helpers::key_hint;

pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, fleet: &FleetView) {
    let t = &state.theme;
    let mut spans = vec![Span::raw(" ")];

    match state.input_mode {
        InputMode::Filter | InputMode::GroupPrompt => {
            let prompt = if state.input_mode == InputMode::Filter {
                " / "
            } else {
                " group "
            };
            spans.push(Span::styled(prompt, t.badge_style(t.accent)));
            spans.push(Span::styled(
                format!(" {}", &state.input[..state.input_cursor]),
                Style::default().fg(t.text_primary),
            ));
            spans.push(Span::styled(
                "▏",
                Style::default().fg(t.accent).add_modifier(Modifier::SLOW_BLINK),
            ));
            spans.push(Span::styled(
                state.input[state.input_cursor..].to_string(),
                Style::default().fg(t.text_primary),
            ));
            spans.extend(key_hint("Enter", "apply", t.accent, t));
            spans.extend(key_hint("Esc", "cancel", t.accent, t));
        }
        InputMode::Normal => {
            spans.extend(key_hint("q", "Quit", t.accent, t));
            spans.extend(key_hint("l/x", "Launch/Stop", t.accent, t));
            spans.extend(key_hint("␣", "Select", t.accent, t));
            spans.extend(key_hint("s/S", "Sort", t.accent, t));
            spans.extend(key_hint("/", "Filter", t.accent, t));
            spans.extend(key_hint("?", "Help", t.accent, t));

            // Bulk actions only exist while something is selected
            if fleet.show_selection_affordances() {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    format!(" {} selected ", fleet.selection_len()),
                    t.badge_style(t.selected_mark),
                ));
                spans.extend(key_hint("L/X", "Launch/Stop all", t.selected_mark, t));
                spans.extend(key_hint("g", "Group", t.selected_mark, t));
            }
        }
    }

    // Toast, auto-expires
    if let Some((msg, level, _)) = &state.status_message {
        spans.push(Span::styled(format!("  {} ", msg), t.notice_style(*level)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
