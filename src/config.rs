use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use cross_xdg::BaseDirs;
use nu_ansi_term::{Color, Style};

/// Styles the debugger uses to highlight its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Character under the instruction pointer.
    pub instruction: Style,
    /// A `[` or `]` under the instruction pointer whose branch will jump.
    pub skipped_branch: Style,
    /// The cell under the data pointer in memory dumps.
    pub data_pointer: Style,
    /// The address asked for with `memory <addr>`.
    pub focus: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            instruction: Style::new().bold(),
            skipped_branch: Style::new().bold().fg(Color::Red),
            data_pointer: Style::new().bold(),
            focus: Style::new().fg(Color::Green),
        }
    }
}

impl Palette {
    /// A palette that emits no escape sequences at all.
    pub fn plain() -> Self {
        Self {
            instruction: Style::new(),
            skipped_branch: Style::new(),
            data_pointer: Style::new(),
            focus: Style::new(),
        }
    }
}

/// Geometry of the debugger's source window and memory dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerLayout {
    /// Source characters shown on each side of the instruction pointer.
    pub context: usize,
    /// Rows shown above and below the focused row of a memory dump.
    pub memory_rows: usize,
    /// Cells per memory dump row.
    pub row_width: usize,
}

impl Default for DebuggerLayout {
    fn default() -> Self {
        Self { context: 10, memory_rows: 2, row_width: 8 }
    }
}

pub const MAX_CONTEXT: usize = 1024;
pub const MAX_MEMORY_ROWS: usize = 1024;
pub const MAX_ROW_WIDTH: usize = 256;

impl DebuggerLayout {
    /// Cap each dimension at its maximum. Rows are at least one cell wide.
    pub fn clamped(self) -> Self {
        Self {
            context: self.context.min(MAX_CONTEXT),
            memory_rows: self.memory_rows.min(MAX_MEMORY_ROWS),
            row_width: self.row_width.clamp(1, MAX_ROW_WIDTH),
        }
    }
}

pub const DEFAULT_FRAME_RATE: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub palette: Palette,
    pub layout: DebuggerLayout,
    pub frame_rate: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            layout: DebuggerLayout::default(),
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

/// Load `gamefuck.toml` from the XDG config home, falling back to defaults
/// when it is missing or unreadable.
pub fn load() -> Settings {
    load_from_toml().unwrap_or_default()
}

fn load_from_toml() -> Option<Settings> {
    let base_dirs = BaseDirs::new().ok()?;

    // On Linux: resolves to /home/<user>/.config
    // On macOS: resolves to /Users/<user>/.config
    let config_home = base_dirs.config_home();

    let mut path = PathBuf::from(config_home);
    path.push("gamefuck.toml");

    let content = fs::read_to_string(&path).ok()?;
    log::debug!("loading settings from {}", path.display());
    Some(parse_settings(&content))
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::Black),
    ("red", Color::Red),
    ("green", Color::Green),
    ("yellow", Color::Yellow),
    ("blue", Color::Blue),
    ("purple", Color::Purple),
    ("magenta", Color::Purple),
    ("cyan", Color::Cyan),
    ("white", Color::White),
    ("darkgray", Color::DarkGray),
    ("gray", Color::LightGray),
    ("lightgray", Color::LightGray),
    ("lightred", Color::LightRed),
    ("lightgreen", Color::LightGreen),
    ("lightyellow", Color::LightYellow),
    ("lightblue", Color::LightBlue),
    ("lightpurple", Color::LightPurple),
    ("lightmagenta", Color::LightPurple),
    ("lightcyan", Color::LightCyan),
];

/// `#RRGGBB`, or a terminal color name. Case, underscores and the
/// `grey` spelling are not significant: `Dark_Grey` is `darkgray`.
fn parse_color(value: &str) -> Option<Color> {
    let s = value.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_rgb(hex);
    }
    let name = s.replace('_', "").to_ascii_lowercase().replace("grey", "gray");
    NAMED_COLORS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|&(_, color)| color)
}

fn parse_rgb(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Parse the `[colors]`, `[debugger]` and `[display]` sections.
/// Unknown sections, unknown keys and malformed values are ignored.
pub fn parse_settings(content: &str) -> Settings {
    // section -> key -> value
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current = String::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        if line.starts_with('[') && line.ends_with(']') {
            current = line[1..line.len()-1].trim().to_string();
            continue;
        }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim().to_string();
            let val_raw = line[eq+1..].trim();
            // Accept quoted or unquoted
            let val = if val_raw.starts_with('"') && val_raw.ends_with('"') && val_raw.len() >= 2 {
                val_raw[1..val_raw.len()-1].to_string()
            } else { val_raw.to_string() };
            sections.entry(current.clone()).or_default().insert(key, val);
        }
    }

    let mut cfg = Settings::default();
    let get = |section: &str, key: &str| lookup(&sections, section, key);

    macro_rules! color {
        ($field:ident) => {
            if let Some(c) = get("colors", stringify!($field)).and_then(|s| parse_color(s)) {
                cfg.palette.$field = cfg.palette.$field.fg(c);
            }
        };
    }

    macro_rules! number {
        ($section:literal, $field:expr, $key:literal) => {
            if let Some(n) = get($section, $key).and_then(|s| s.parse().ok()) {
                $field = n;
            }
        };
    }

    color!(instruction);
    color!(skipped_branch);
    color!(data_pointer);
    color!(focus);

    number!("debugger", cfg.layout.context, "context");
    number!("debugger", cfg.layout.memory_rows, "memory_rows");
    number!("debugger", cfg.layout.row_width, "row_width");
    number!("display", cfg.frame_rate, "frame_rate");

    // A zero-width dump row would never advance; huge ones never finish.
    cfg.layout = cfg.layout.clamped();

    cfg
}

fn lookup<'a>(
    sections: &'a HashMap<String, HashMap<String, String>>,
    section: &str,
    key: &str,
) -> Option<&'a String> {
    sections.get(section).and_then(|s| s.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse_settings(""), Settings::default());
    }

    #[test]
    fn colors_keep_their_boldness() {
        let cfg = parse_settings(
            "[colors]\nskipped_branch = \"#ff8800\"\nfocus = cyan\ndata_pointer = bogus\n",
        );
        assert_eq!(cfg.palette.skipped_branch, Style::new().bold().fg(Color::Rgb(0xff, 0x88, 0x00)));
        assert_eq!(cfg.palette.focus, Style::new().fg(Color::Cyan));
        assert_eq!(cfg.palette.data_pointer, Palette::default().data_pointer);
    }

    #[test]
    fn numbers_are_read_per_section() {
        let cfg = parse_settings(
            "# comment\n[debugger]\ncontext = 4\nrow_width = 16\n\n[display]\nframe_rate = 0\n[other]\ncontext = 99\n",
        );
        assert_eq!(cfg.layout.context, 4);
        assert_eq!(cfg.layout.row_width, 16);
        assert_eq!(cfg.layout.memory_rows, 2);
        assert_eq!(cfg.frame_rate, 0);
    }

    #[test]
    fn keys_outside_their_section_are_ignored() {
        let cfg = parse_settings("context = 3\nframe_rate = 30\n");
        assert_eq!(cfg, Settings::default());
    }

    #[test]
    fn zero_row_width_is_clamped() {
        let cfg = parse_settings("[debugger]\nrow_width = 0\n");
        assert_eq!(cfg.layout.row_width, 1);
    }

    #[test]
    fn oversized_layout_is_capped() {
        let cfg = parse_settings(&format!(
            "[debugger]\ncontext = {}\nmemory_rows = 1099511627776\nrow_width = 100000\n",
            usize::MAX
        ));
        assert_eq!(cfg.layout.context, MAX_CONTEXT);
        assert_eq!(cfg.layout.memory_rows, MAX_MEMORY_ROWS);
        assert_eq!(cfg.layout.row_width, MAX_ROW_WIDTH);
    }

    #[test]
    fn layout_within_limits_is_kept() {
        let cfg = parse_settings("[debugger]\ncontext = 1024\nmemory_rows = 0\nrow_width = 256\n");
        assert_eq!(cfg.layout, DebuggerLayout { context: 1024, memory_rows: 0, row_width: 256 });
    }

    #[test]
    fn color_names_ignore_case_and_spelling() {
        assert_eq!(parse_color("Dark_Grey"), Some(Color::DarkGray));
        assert_eq!(parse_color("light_magenta"), Some(Color::LightPurple));
        assert_eq!(parse_color("GREY"), Some(Color::LightGray));
        assert_eq!(parse_color("#0a0B0c"), Some(Color::Rgb(10, 11, 12)));
        assert_eq!(parse_color("#0a0B0"), None);
        assert_eq!(parse_color("#0a0B0g"), None);
        assert_eq!(parse_color("mauve"), None);
    }

    #[test]
    fn plain_palette_paints_without_escapes() {
        let p = Palette::plain();
        assert_eq!(p.focus.paint("x").to_string(), "x");
    }
}
