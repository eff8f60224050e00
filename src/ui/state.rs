use std::time::Instant;

use crate::constants::*;
use crate::fleet::NoticeLevel;
use crate::models::ProfileId;

use super::theme::Theme;

/// What keystrokes currently feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Live text filter over name, tags and group.
    Filter,
    /// Group name for the current selection; empty clears the group.
    GroupPrompt,
}

/// Terminal-side state: cursor, overlays, prompts and the externally owned
/// selection list. Fleet state itself lives in `FleetView`.
pub struct AppState {
    pub theme: Theme,

    /// Position of the highlighted row in the visible order.
    pub cursor: usize,
    /// Selected profile ids as owned by the terminal layer. The fleet view
    /// reconciles against this list after every key press.
    pub selected_ids: Vec<ProfileId>,

    // ── Prompt ───────────────────────────────────────────────
    pub input_mode: InputMode,
    pub input: String,
    /// Byte offset of the prompt cursor in `input`.
    pub input_cursor: usize,

    // ── Overlays ─────────────────────────────────────────────
    pub show_help: bool,
    pub detail: Option<ProfileId>,

    // ── Status message (shown in status bar) ───────────────────
    pub status_message: Option<(String, NoticeLevel, Instant)>,

    /// Redraw ticks since start; drives the spinner.
    pub tick_count: u64,
}

impl AppState {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            cursor: 0,
            selected_ids: Vec::new(),
            input_mode: InputMode::Normal,
            input: String::new(),
            input_cursor: 0,
            show_help: false,
            detail: None,
            status_message: None,
            tick_count: 0,
        }
    }

    /// Cycle to the next built-in theme.
    pub fn cycle_theme(&mut self) {
        self.theme = self.theme.next_builtin();
    }

    /// Set a status bar message with automatic timestamp.
    pub fn set_status(&mut self, msg: impl Into<String>, level: NoticeLevel) {
        self.status_message = Some((msg.into(), level, Instant::now()));
    }

    /// Drop the status message once it has been shown long enough.
    pub fn expire_status(&mut self, now: Instant) {
        if let Some((_, _, at)) = &self.status_message {
            if now.duration_since(*at).as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.status_message = None;
            }
        }
    }

    // ── Cursor ───────────────────────────────────────────────

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self, len: usize) {
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(PAGE_SIZE);
    }

    pub fn page_down(&mut self, len: usize) {
        self.cursor = (self.cursor + PAGE_SIZE).min(len.saturating_sub(1));
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self, len: usize) {
        self.cursor = len.saturating_sub(1);
    }

    /// Keep the cursor inside a list that may have shrunk.
    pub fn clamp_cursor(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    // ── Prompt editing ─────────────────────────────────────────

    pub fn open_prompt(&mut self, mode: InputMode, initial: &str) {
        self.input_mode = mode;
        self.input = initial.to_string();
        self.input_cursor = self.input.len();
    }

    pub fn close_prompt(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
        self.input_cursor = 0;
    }

    pub fn input_char(&mut self, c: char) {
        self.input.insert(self.input_cursor, c);
        self.input_cursor += c.len_utf8();
    }

    pub fn input_backspace(&mut self) {
        if self.input_cursor > 0 {
            let prev = self.input[..self.input_cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.remove(prev);
            self.input_cursor = prev;
        }
    }

    pub fn input_left(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor = self.input[..self.input_cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn input_right(&mut self) {
        if self.input_cursor < self.input.len() {
            self.input_cursor = self.input[self.input_cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.input_cursor + i)
                .unwrap_or(self.input.len());
        }
    }

    /// Close the prompt and return its trimmed text.
    pub fn submit_prompt(&mut self) -> String {
        let text = self.input.trim().to_string();
        self.close_prompt();
        text
    }
}
