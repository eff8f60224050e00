mod renderer;
mod state;
pub mod theme;

pub use renderer::{list_body, render, row_height};
pub use state::{AppState, InputMode};
pub use theme::Theme;
