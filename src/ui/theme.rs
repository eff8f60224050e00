use std::path::Path;

use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

use crate::constants::config_dir;
use crate::fleet::{LifecyclePhase, NoticeLevel};

/// All available built-in theme names.
pub const BUILTIN_THEME_NAMES: &[&str] = &["default", "gruvbox", "nord"];

/// Data-driven theme: every color in one struct.
/// Constructed from built-in presets or loaded from TOML files.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    // ── Brand / Primary ──────────────────────────────────────
    pub accent: Color,
    pub accent_secondary: Color,
    pub bg_dark: Color,
    pub bg_panel: Color,

    // ── Text ─────────────────────────────────────────────────
    pub text_primary: Color,
    pub text_dim: Color,
    pub text_muted: Color,

    // ── Semantic ─────────────────────────────────────────────
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub info: Color,

    // ── Rows ─────────────────────────────────────────────────
    pub cursor_bg: Color,
    pub selected_mark: Color,

    // ── Borders ──────────────────────────────────────────────
    pub border: Color,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────

    pub fn default_dark() -> Self {
        Self {
            name: "default".to_string(),
            accent: Color::Rgb(255, 138, 76),
            accent_secondary: Color::Rgb(129, 230, 217),
            bg_dark: Color::Rgb(22, 22, 30),
            bg_panel: Color::Rgb(30, 30, 42),
            text_primary: Color::Rgb(220, 220, 235),
            text_dim: Color::Rgb(120, 120, 145),
            text_muted: Color::Rgb(80, 80, 100),
            success: Color::Rgb(72, 199, 142),
            warning: Color::Rgb(255, 193, 69),
            danger: Color::Rgb(255, 85, 85),
            info: Color::Rgb(99, 179, 237),
            cursor_bg: Color::Rgb(40, 40, 60),
            selected_mark: Color::Rgb(217, 143, 255),
            border: Color::Rgb(55, 55, 75),
        }
    }

    /// Gruvbox dark palette.
    pub fn gruvbox() -> Self {
        Self {
            name: "gruvbox".to_string(),
            accent: Color::Rgb(254, 128, 25),            // orange
            accent_secondary: Color::Rgb(142, 192, 124), // green
            bg_dark: Color::Rgb(40, 40, 40),             // bg0
            bg_panel: Color::Rgb(50, 48, 47),            // bg0_s
            text_primary: Color::Rgb(235, 219, 178),     // fg
            text_dim: Color::Rgb(168, 153, 132),         // fg4
            text_muted: Color::Rgb(102, 92, 84),         // bg4
            success: Color::Rgb(142, 192, 124),          // green
            warning: Color::Rgb(250, 189, 47),           // yellow bright
            danger: Color::Rgb(251, 73, 52),             // red
            info: Color::Rgb(131, 165, 152),             // blue
            cursor_bg: Color::Rgb(60, 56, 54),
            selected_mark: Color::Rgb(211, 134, 155), // purple
            border: Color::Rgb(80, 73, 69),
        }
    }

    /// Nord palette.
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            accent: Color::Rgb(136, 192, 208),           // nord8 frost
            accent_secondary: Color::Rgb(143, 188, 187), // nord7
            bg_dark: Color::Rgb(46, 52, 64),             // nord0
            bg_panel: Color::Rgb(59, 66, 82),            // nord1
            text_primary: Color::Rgb(229, 233, 240),     // nord5
            text_dim: Color::Rgb(182, 191, 204),
            text_muted: Color::Rgb(107, 112, 127),
            success: Color::Rgb(163, 190, 140), // nord14 green
            warning: Color::Rgb(235, 203, 139), // nord13 yellow
            danger: Color::Rgb(191, 97, 106),   // nord11 red
            info: Color::Rgb(129, 161, 193),    // nord9
            cursor_bg: Color::Rgb(67, 76, 94),  // nord2
            selected_mark: Color::Rgb(180, 142, 173), // nord15
            border: Color::Rgb(76, 86, 106),    // nord3
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default_dark()),
            "gruvbox" => Some(Self::gruvbox()),
            "nord" => Some(Self::nord()),
            _ => None,
        }
    }

    /// Built-in theme by name, then `~/.config/foxia-fleet/themes/<name>.toml`,
    /// then the default.
    pub fn resolve(name: &str) -> Self {
        Self::by_name(name)
            .or_else(|| Self::from_toml_file(&config_dir().join("themes").join(format!("{name}.toml"))))
            .unwrap_or_default()
    }

    /// Cycle to the next built-in theme. A custom theme cycles to the first
    /// built-in one.
    pub fn next_builtin(&self) -> Self {
        let next_idx = BUILTIN_THEME_NAMES
            .iter()
            .position(|&n| n == self.name)
            .map(|idx| (idx + 1) % BUILTIN_THEME_NAMES.len())
            .unwrap_or(0);
        Self::by_name(BUILTIN_THEME_NAMES[next_idx]).unwrap_or_default()
    }

    /// Load a custom theme from a TOML file, falling back to default for missing fields.
    pub fn from_toml_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let file: ThemeFile = toml::from_str(&content).ok()?;
        Some(
            file.into_theme(
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("custom"),
            ),
        )
    }

    // ── Computed Styles ──────────────────────────────────────

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_active_style(&self) -> Style {
        Style::default()
            .fg(self.bg_dark)
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive_style(&self) -> Style {
        Style::default().fg(self.text_dim)
    }

    pub fn table_header_style(&self) -> Style {
        Style::default()
            .fg(self.accent_secondary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn row_style(&self, under_cursor: bool) -> Style {
        let style = Style::default().fg(self.text_primary);
        if under_cursor {
            style.bg(self.cursor_bg).add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    /// Rows that cannot take a command right now.
    pub fn busy_row_style(&self, under_cursor: bool) -> Style {
        let style = Style::default().fg(self.text_dim);
        if under_cursor {
            style.bg(self.cursor_bg)
        } else {
            style
        }
    }

    pub fn phase_color(&self, phase: LifecyclePhase) -> Color {
        match phase {
            LifecyclePhase::Idle => self.text_dim,
            LifecyclePhase::Launching | LifecyclePhase::Stopping => self.warning,
            LifecyclePhase::Running => self.success,
        }
    }

    pub fn phase_style(&self, phase: LifecyclePhase) -> Style {
        let style = Style::default().fg(self.phase_color(phase));
        if phase == LifecyclePhase::Running {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn notice_style(&self, level: NoticeLevel) -> Style {
        match level {
            NoticeLevel::Info => Style::default().fg(self.info),
            NoticeLevel::Error => Style::default()
                .fg(self.danger)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Color for a host sync-status token. Unknown tokens render dim.
    pub fn sync_status_color(&self, status: &str) -> Color {
        match status {
            "synced" => self.success,
            "syncing" | "pending" => self.info,
            "error" | "failed" => self.danger,
            _ => self.text_dim,
        }
    }

    pub fn badge_style(&self, bg: Color) -> Style {
        Style::default()
            .fg(self.bg_dark)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected_mark_style(&self) -> Style {
        Style::default()
            .fg(self.selected_mark)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn border_highlight_style(&self) -> Style {
        Style::default().fg(self.accent)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_dark()
    }
}

// ── TOML deserialization for custom themes ──────────────────

/// Intermediate struct for parsing theme TOML files.
/// All fields are optional; missing fields inherit from the default theme.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ThemeFile {
    accent: Option<String>,
    accent_secondary: Option<String>,
    bg_dark: Option<String>,
    bg_panel: Option<String>,
    text_primary: Option<String>,
    text_dim: Option<String>,
    text_muted: Option<String>,
    success: Option<String>,
    warning: Option<String>,
    danger: Option<String>,
    info: Option<String>,
    cursor_bg: Option<String>,
    selected_mark: Option<String>,
    border: Option<String>,
}

impl ThemeFile {
    fn into_theme(self, name: &str) -> Theme {
        let base = Theme::default_dark();
        Theme {
            name: name.to_string(),
            accent: parse_color(&self.accent).unwrap_or(base.accent),
            accent_secondary: parse_color(&self.accent_secondary).unwrap_or(base.accent_secondary),
            bg_dark: parse_color(&self.bg_dark).unwrap_or(base.bg_dark),
            bg_panel: parse_color(&self.bg_panel).unwrap_or(base.bg_panel),
            text_primary: parse_color(&self.text_primary).unwrap_or(base.text_primary),
            text_dim: parse_color(&self.text_dim).unwrap_or(base.text_dim),
            text_muted: parse_color(&self.text_muted).unwrap_or(base.text_muted),
            success: parse_color(&self.success).unwrap_or(base.success),
            warning: parse_color(&self.warning).unwrap_or(base.warning),
            danger: parse_color(&self.danger).unwrap_or(base.danger),
            info: parse_color(&self.info).unwrap_or(base.info),
            cursor_bg: parse_color(&self.cursor_bg).unwrap_or(base.cursor_bg),
            selected_mark: parse_color(&self.selected_mark).unwrap_or(base.selected_mark),
            border: parse_color(&self.border).unwrap_or(base.border),
        }
    }
}

/// Parse a hex color string like "#FF8800" or "FF8800" into a ratatui Color.
fn parse_color(opt: &Option<String>) -> Option<Color> {
    let s = opt.as_ref()?;
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_color ───────────────────────────────────────────────

    #[test]
    fn parse_color_with_and_without_hash() {
        assert_eq!(parse_color(&Some("#FF8800".to_string())), Some(Color::Rgb(255, 136, 0)));
        assert_eq!(parse_color(&Some("ff8800".to_string())), Some(Color::Rgb(255, 136, 0)));
    }

    #[test]
    fn parse_color_rejects_garbage() {
        assert_eq!(parse_color(&None), None);
        assert_eq!(parse_color(&Some("#FFF".to_string())), None);
        assert_eq!(parse_color(&Some("#GGHHII".to_string())), None);
        assert_eq!(parse_color(&Some("ééé".to_string())), None);
    }

    // ── Lookup ────────────────────────────────────────────────────

    #[test]
    fn by_name_all_builtins() {
        for name in BUILTIN_THEME_NAMES {
            let theme = Theme::by_name(name);
            assert!(theme.is_some(), "missing builtin {name}");
            assert_eq!(theme.map(|t| t.name), Some(name.to_string()));
        }
        assert_eq!(Theme::by_name("NORD").map(|t| t.name), Some("nord".to_string()));
        assert!(Theme::by_name("dracula").is_none());
    }

    #[test]
    fn next_builtin_cycles_and_wraps() {
        let mut theme = Theme::default();
        let mut seen = Vec::new();
        for _ in 0..BUILTIN_THEME_NAMES.len() {
            theme = theme.next_builtin();
            seen.push(theme.name.clone());
        }
        assert_eq!(seen, vec!["gruvbox", "nord", "default"]);
    }

    #[test]
    fn custom_theme_cycles_to_first_builtin() {
        let mut theme = Theme::default();
        theme.name = "mine".to_string();
        assert_eq!(theme.next_builtin().name, "default");
    }

    #[test]
    fn theme_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ember.toml");
        std::fs::write(&path, "accent = \"#102030\"\n").unwrap();
        let theme = Theme::from_toml_file(&path).unwrap();
        assert_eq!(theme.name, "ember");
        assert_eq!(theme.accent, Color::Rgb(16, 32, 48));
        assert_eq!(theme.success, Theme::default_dark().success);
    }

    #[test]
    fn unknown_name_resolves_to_default() {
        assert_eq!(Theme::resolve("no-such-theme-here").name, "default");
    }

    // ── Styles ────────────────────────────────────────────────────

    #[test]
    fn transient_phases_share_warning_color() {
        let theme = Theme::nord();
        assert_eq!(theme.phase_color(LifecyclePhase::Launching), theme.warning);
        assert_eq!(theme.phase_color(LifecyclePhase::Stopping), theme.warning);
        assert_eq!(theme.phase_color(LifecyclePhase::Running), theme.success);
        assert_eq!(theme.phase_color(LifecyclePhase::Idle), theme.text_dim);
    }

    #[test]
    fn sync_status_colors() {
        let theme = Theme::default();
        assert_eq!(theme.sync_status_color("synced"), theme.success);
        assert_eq!(theme.sync_status_color("error"), theme.danger);
        assert_eq!(theme.sync_status_color("whatever"), theme.text_dim);
    }
}
