//! Renderer module: split into focused submodules.
//!
//! - `header`: Logo, partition tabs, fleet summary
//! - `fleet_list`: The virtualized profile list
//! - `status_bar`: Bottom status bar with keybinds, prompts and toasts
//! - `overlays`: Popup overlays (profile detail, help)
//! - `helpers`: Shared rendering utilities

mod fleet_list;
mod header;
pub mod helpers;
mod overlays;
mod status_bar;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::fleet::FleetView;

use super::state::AppState;

pub use fleet_list::row_height;

fn main_chunks(size: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header bar
            Constraint::Min(5),    // Fleet list
            Constraint::Length(1), // Status bar
        ])
        .split(size);
    [chunks[0], chunks[1], chunks[2]]
}

/// Scrolling part of the fleet list for a terminal of the given size. The
/// event loop feeds its height into the list before drawing.
pub fn list_body(size: Rect) -> Rect {
    fleet_list::split_list_area(main_chunks(size)[1]).1
}

/// Top-level render function.
pub fn render(frame: &mut Frame, state: &AppState, fleet: &FleetView) {
    let size = frame.area();
    let [header_area, list_area, status_area] = main_chunks(size);

    header::render_header(frame, header_area, state, fleet);
    fleet_list::render_fleet_list(frame, list_area, state, fleet);
    status_bar::render_status_bar(frame, status_area, state, fleet);

    if let Some(id) = &state.detail {
        overlays::render_profile_detail(frame, size, state, fleet, id);
    }

    if state.show_help {
        overlays::render_help_overlay(frame, size, state);
    }
}
