use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

lazy_static! {
    static ref RENDERER: RwLock<Renderer> = RwLock::new(Renderer::default());
}

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
    colored::control::set_override(color && format == OutputFormat::Text);
}

pub mod nerd_font;
pub use nerd_font::NerdFont;

pub const SEPARATOR_LIGHT: &str = "─";

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn renderer() -> Renderer {
    RENDERER.read().map(|r| r.clone()).unwrap_or_default()
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

/// Drop CSI escape sequences so JSON consumers never see terminal control bytes.
fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for b in chars.by_ref() {
                if ('@'..='~').contains(&b) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn sink(level: Level) -> Box<dyn Write> {
    match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    }
}

/// Report an event to the user.
///
/// `code` is a stable dotted identifier (e.g. `restore.package.failed`) that
/// JSON consumers can match on; `message` is the human text. Debug events are
/// dropped unless debug mode is on.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if level == Level::Debug && !is_debug_enabled() {
        return;
    }
    let r = renderer();
    let mut out = sink(level);
    match r.format {
        OutputFormat::Text => {
            let _ = writeln!(out, "{}", colorize(level, message, r.color));
        }
        OutputFormat::Json => {
            let clean_msg = strip_ansi(message);
            let ev = Event {
                level: level.as_str(),
                code,
                message: &clean_msg,
                data,
            };
            if let Ok(s) = serde_json::to_string(&ev) {
                let _ = writeln!(out, "{}", s);
            }
        }
    }
}

pub fn get_output_format() -> OutputFormat {
    renderer().format
}

pub fn separator() {
    let r = renderer();
    // Keep stdout parseable line-by-line in JSON mode
    if matches!(r.format, OutputFormat::Json) {
        return;
    }
    let _ = writeln!(io::stdout(), "{}", SEPARATOR_LIGHT.repeat(80));
}

pub mod prelude {
    pub use super::{Level, NerdFont, OutputFormat, emit, get_output_format, separator};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_removes_color_codes() {
        let colored = "\u{1b}[1;32mdone\u{1b}[0m ok";
        assert_eq!(strip_ansi(colored), "done ok");
    }

    #[test]
    fn test_strip_ansi_keeps_plain_text() {
        assert_eq!(strip_ansi("nodejs → node"), "nodejs → node");
    }

    #[test]
    fn test_level_names() {
        assert_eq!(Level::Warn.as_str(), "warn");
        assert_eq!(Level::Success.as_str(), "success");
    }
}
