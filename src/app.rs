//! Application struct and event loop.
//!
//! Owns the terminal, the UI state, the fleet view and the preference store.
//! The loop waits on three sources at once: fleet completions, terminal
//! input and the redraw tick. Everything runs on the one loop task.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::Backend, backend::CrosstermBackend, layout::Rect, Terminal};
use tokio::time;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::*;
use crate::fleet::{
    DispatchOutcome, FleetAction, FleetEvent, FleetOptions, FleetView, NoticeLevel, Partition,
};
use crate::host::{Host, LocalHost};
use crate::models::ProfileId;
use crate::store::Preferences;
use crate::ui::{self, AppState, InputMode, Theme};

/// One wake-up of the event loop.
enum Step {
    Fleet(Option<FleetEvent>),
    Terminal(Option<io::Result<Event>>),
    Tick,
}

/// Main application struct.
///
/// Owns all runtime resources except the terminal, which `run` sets up and
/// restores around the loop.
pub struct App {
    state: AppState,
    fleet: FleetView,
    prefs: Preferences,
    /// Cursor row the list was last scrolled to. `None` re-follows the
    /// cursor on the next frame; the wheel leaves it alone.
    followed_cursor: Option<usize>,
}

/// Local host with the configured update locks applied.
fn build_host(config: &Config) -> Arc<dyn Host> {
    let host = LocalHost::new(&config.profiles_dir, config.host.delays());
    for browser in &config.host.updating {
        host.set_updating(browser, true);
    }
    Arc::new(host)
}

/// Preference store at the configured path, or an in-memory one if the file
/// cannot be opened.
fn open_preferences(config: &Config) -> Result<Preferences> {
    match Preferences::open(Some(&config.preferences_path)) {
        Ok(prefs) => Ok(prefs),
        Err(e) => {
            warn!(
                path = %config.preferences_path.display(),
                error = %e,
                "preference store unavailable, settings will not persist"
            );
            Preferences::open(None).context("opening in-memory preference store")
        }
    }
}

fn fleet_options(config: &Config, prefs: &Preferences) -> FleetOptions {
    FleetOptions {
        poll_interval: config.poll_interval(),
        row_height_estimate: config.row_height_estimate,
        overscan_rows: config.overscan_rows,
        sort: prefs.load_sort(),
        partition: prefs.load_partition(),
    }
}

impl App {
    /// Create a new App against the local host and mount the fleet view.
    pub fn new(config: &Config) -> Result<Self> {
        let prefs = open_preferences(config)?;
        let options = fleet_options(config, &prefs);
        info!(
            profiles_dir = %config.profiles_dir.display(),
            updating = ?config.host.updating,
            "starting fleet console"
        );
        Ok(Self::with_host(
            build_host(config),
            Theme::resolve(&config.theme),
            prefs,
            options,
        ))
    }

    /// Assemble an App around any host. Must be called inside a tokio runtime.
    pub fn with_host(
        host: Arc<dyn Host>,
        theme: Theme,
        prefs: Preferences,
        options: FleetOptions,
    ) -> Self {
        let mut fleet = FleetView::new(host, options);
        fleet.mount();
        Self {
            state: AppState::new(theme),
            fleet,
            prefs,
            followed_cursor: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Terminal init
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal).await;

        // Cleanup, also after a failed loop
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        self.fleet.teardown();

        println!("\nfoxia-fleet stopped.\n");
        result
    }

    async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut input = EventStream::new();
        let mut redraw = time::interval(Duration::from_millis(REDRAW_TICK_MS));
        redraw.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            let size = terminal.size()?;
            self.prepare_frame(Rect::new(0, 0, size.width, size.height));
            terminal.draw(|frame| ui::render(frame, &self.state, &self.fleet))?;

            let step = tokio::select! {
                event = self.fleet.recv() => Step::Fleet(event),
                event = input.next() => Step::Terminal(event),
                _ = redraw.tick() => Step::Tick,
            };

            match step {
                Step::Fleet(Some(event)) => {
                    self.fleet.apply(event);
                    self.fleet.drain();
                    self.after_fleet_change();
                }
                // The fleet view holds its own sender, so the inbox never closes.
                Step::Fleet(None) => {}
                Step::Terminal(Some(Ok(Event::Key(key)))) => {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break; // quit requested
                    }
                }
                Step::Terminal(Some(Ok(Event::Mouse(mouse)))) => {
                    self.handle_mouse(mouse, Rect::new(0, 0, size.width, size.height));
                }
                Step::Terminal(Some(Ok(_))) => {}
                Step::Terminal(Some(Err(e))) => return Err(e).context("reading terminal input"),
                Step::Terminal(None) => break,
                Step::Tick => {
                    self.state.tick_count = self.state.tick_count.wrapping_add(1);
                    self.state.expire_status(Instant::now());
                }
            }
        }
        Ok(())
    }

    /// Fit the list to the terminal, bring the cursor row on screen after
    /// it moved or a key was pressed, and lay out the rows about to be drawn.
    fn prepare_frame(&mut self, size: Rect) {
        let body = ui::list_body(size);
        self.fleet.set_viewport(body.height as u32);
        self.state.clamp_cursor(self.fleet.visible_len());
        let cursor = self.state.cursor;
        if self.followed_cursor != Some(cursor) {
            self.fleet.ensure_visible(cursor);
            self.followed_cursor = Some(cursor);
        }
        self.fleet.measure_visible(ui::row_height);
    }

    /// Move toasts into the status bar and re-run selection sync.
    fn after_fleet_change(&mut self) {
        for notice in self.fleet.take_notices() {
            self.state.set_status(notice.text, notice.level);
        }
        self.fleet.reconcile_selection(&mut self.state.selected_ids);
        self.state.clamp_cursor(self.fleet.visible_len());
    }

    fn cursor_id(&self) -> Option<ProfileId> {
        self.fleet.record_at(self.state.cursor).map(|r| r.id.clone())
    }

    // ── Mouse handling ───────────────────────────────────────────

    fn handle_mouse(&mut self, mouse: MouseEvent, size: Rect) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.fleet.scroll_by(-(WHEEL_STEP as i64));
            }
            MouseEventKind::ScrollDown => {
                self.fleet.scroll_by(WHEEL_STEP as i64);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if self.state.detail.is_some() || self.state.show_help {
                    self.state.detail = None;
                    self.state.show_help = false;
                    return;
                }
                let body = ui::list_body(size);
                if mouse.row < body.y || mouse.row >= body.y + body.height {
                    return;
                }
                let offset = self.fleet.list().scroll() + (mouse.row - body.y) as u32;
                if let Some(position) = self.fleet.list().row_at_offset(offset) {
                    self.state.cursor = position;
                    self.followed_cursor = None;
                }
            }
            _ => {}
        }
    }

    // ── Keyboard handling ────────────────────────────────────────

    /// Handle a key event. Returns `true` if the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        self.followed_cursor = None;

        let quit = if self.state.show_help {
            self.handle_key_help(key)
        } else if self.state.detail.is_some() {
            self.handle_key_detail(key)
        } else {
            match self.state.input_mode {
                InputMode::Filter => self.handle_key_filter(key),
                InputMode::GroupPrompt => self.handle_key_group_prompt(key),
                InputMode::Normal => self.handle_key_normal(key),
            }
        };

        self.after_fleet_change();
        quit
    }

    fn handle_key_help(&mut self, key: KeyEvent) -> bool {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            self.state.show_help = false;
        }
        false
    }

    fn handle_key_detail(&mut self, key: KeyEvent) -> bool {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            self.state.detail = None;
        }
        false
    }

    fn handle_key_filter(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.state.close_prompt();
                self.fleet.set_filter_text("");
            }
            KeyCode::Enter => {
                let text = self.state.submit_prompt();
                self.fleet.set_filter_text(&text);
            }
            KeyCode::Backspace => {
                self.state.input_backspace();
                self.fleet.set_filter_text(&self.state.input);
            }
            KeyCode::Left => self.state.input_left(),
            KeyCode::Right => self.state.input_right(),
            KeyCode::Char(c) => {
                self.state.input_char(c);
                self.fleet.set_filter_text(&self.state.input);
            }
            _ => {}
        }
        false
    }

    fn handle_key_group_prompt(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => self.state.close_prompt(),
            KeyCode::Enter => {
                let text = self.state.submit_prompt();
                let group = (!text.is_empty()).then_some(text);
                let ids = self.fleet.selected();
                let count = ids.len();
                if self.fleet.dispatch(FleetAction::AssignGroup { ids, group }) == DispatchOutcome::Ignored {
                    self.state.set_status("No known profiles selected", NoticeLevel::Info);
                } else {
                    info!(count, "group assignment requested");
                }
            }
            KeyCode::Backspace => self.state.input_backspace(),
            KeyCode::Left => self.state.input_left(),
            KeyCode::Right => self.state.input_right(),
            KeyCode::Char(c) => self.state.input_char(c),
            _ => {}
        }
        false
    }

    /// Handle keys in normal mode. Returns `true` if the app should quit.
    fn handle_key_normal(&mut self, key: KeyEvent) -> bool {
        let len = self.fleet.visible_len();
        match key.code {
            KeyCode::Char('q') => return true,

            // Cursor
            KeyCode::Up | KeyCode::Char('k') => self.state.cursor_up(),
            KeyCode::Down | KeyCode::Char('j') => self.state.cursor_down(len),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::PageDown => self.state.page_down(len),
            KeyCode::Home => self.state.cursor_home(),
            KeyCode::End => self.state.cursor_end(len),

            // Row commands
            KeyCode::Char('l') => self.row_command(FleetAction::Launch, "cannot launch"),
            KeyCode::Char('x') => self.row_command(FleetAction::Stop, "not running"),
            KeyCode::Char('u') => self.row_command(FleetAction::Upload, "cannot upload"),
            KeyCode::Enter => {
                if let Some(id) = self.cursor_id() {
                    if let DispatchOutcome::ShowDetail(id) = self.fleet.dispatch(FleetAction::OpenDetail(id)) {
                        self.state.detail = Some(id);
                    }
                }
            }

            // Selection
            KeyCode::Char(' ') => {
                if let Some(id) = self.cursor_id() {
                    if !self.fleet.toggle_selected(&id) {
                        self.state.set_status("Profile is busy", NoticeLevel::Info);
                    }
                }
            }
            KeyCode::Char('a') => {
                if self.fleet.select_all_eligible() == 0 {
                    self.fleet.clear_selection();
                }
            }
            KeyCode::Char('L') => {
                let started = self.fleet.launch_selection();
                self.state
                    .set_status(format!("Launching {started} profile(s)"), NoticeLevel::Info);
            }
            KeyCode::Char('X') => {
                let started = self.fleet.stop_selection();
                self.state
                    .set_status(format!("Stopping {started} profile(s)"), NoticeLevel::Info);
            }
            KeyCode::Char('g') => {
                if self.fleet.selection_len() == 0 {
                    self.state.set_status("Select profiles first", NoticeLevel::Info);
                } else {
                    self.state.open_prompt(InputMode::GroupPrompt, "");
                }
            }

            // View
            KeyCode::Char('s') => {
                let mut sort = self.fleet.sort();
                sort.cycle_column();
                self.apply_sort(sort);
            }
            KeyCode::Char('S') => {
                let mut sort = self.fleet.sort();
                sort.toggle_direction();
                self.apply_sort(sort);
            }
            KeyCode::Char('1') => self.apply_partition(Partition::All),
            KeyCode::Char('2') => self.apply_partition(Partition::Local),
            KeyCode::Char('3') => self.apply_partition(Partition::Linked),
            KeyCode::Char('/') => {
                let current = self.fleet.filter_text().to_string();
                self.state.open_prompt(InputMode::Filter, &current);
            }
            KeyCode::Esc => self.fleet.set_filter_text(""),
            KeyCode::Char('r') => {
                self.fleet.refresh();
                self.state.set_status("Reloading profiles", NoticeLevel::Info);
            }
            KeyCode::Char('T') => self.state.cycle_theme(),
            KeyCode::Char('?') => self.state.show_help = true,
            _ => {}
        }
        false
    }

    fn row_command(&mut self, action: fn(ProfileId) -> FleetAction, refused: &str) {
        let Some(id) = self.cursor_id() else {
            return;
        };
        if self.fleet.dispatch(action(id)) == DispatchOutcome::Ignored {
            self.state.set_status(format!("Profile {refused}"), NoticeLevel::Info);
        }
    }

    fn apply_sort(&mut self, sort: crate::fleet::SortSpec) {
        self.fleet.set_sort(sort);
        if let Err(e) = self.prefs.save_sort(sort) {
            warn!(error = %e, "failed to persist sort");
        }
    }

    fn apply_partition(&mut self, partition: Partition) {
        self.fleet.set_partition(partition);
        self.state.cursor = 0;
        if let Err(e) = self.prefs.save_partition(partition) {
            warn!(error = %e, "failed to persist partition");
        }
    }
}

/// Run the fleet core without a terminal: load, settle, print one summary
/// line per visible profile and the phase counts.
pub async fn run_headless(config: &Config) -> Result<()> {
    let prefs = open_preferences(config)?;
    let mut fleet = FleetView::new(build_host(config), fleet_options(config, &prefs));
    fleet.mount();

    let deadline = time::Instant::now() + Duration::from_millis(HEADLESS_SETTLE_MS);
    loop {
        tokio::select! {
            _ = time::sleep_until(deadline) => break,
            event = fleet.recv() => match event {
                Some(event) => fleet.apply(event),
                None => break,
            },
        }
    }

    for position in 0..fleet.visible_len() {
        if let Some(row) = fleet.row_at(position) {
            let record = row.record;
            println!(
                "{}\t{}\t{} {}\t{}\t{}",
                record.id,
                record.name,
                record.browser,
                record.version,
                record.group_id.as_deref().unwrap_or("-"),
                row.phase
            );
        }
    }
    let counts = fleet.counts();
    println!(
        "{} profiles: {} running, {} launching, {} stopping, {} idle",
        fleet.records().len(),
        counts.running,
        counts.launching,
        counts.stopping,
        counts.idle
    );
    fleet.teardown();
    Ok(())
}
