//! CLI output formatting.
//!
//! Every helper goes through [`emit`], which picks one of three renderings:
//! a `{"type", "payload"}` JSON line, colored human text, or nothing when
//! `--quiet` hides it. Warnings and errors are never hidden.

use std::fmt::Display;
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::{json, Value};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output flags shared by every handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    /// Count of `-v` flags.
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }
}

static CURRENT: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn current() -> OutputConfig {
    let cell = CURRENT.get_or_init(RwLock::default);
    match cell.read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    let cell = CURRENT.get_or_init(RwLock::default);
    match cell.write() {
        Ok(mut slot) => *slot = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

fn is_json() -> bool {
    current().json
}

#[must_use]
pub fn verbosity() -> u8 {
    current().verbose
}

/// How a line reacts to `--quiet`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Level {
    Regular,
    Always,
}

/// Write one logical line in the active mode.
fn emit(kind: &str, level: Level, payload: impl FnOnce() -> Value, human: impl FnOnce()) {
    let config = current();
    if config.json {
        println!("{}", json!({ "type": kind, "payload": payload() }));
    } else if level == Level::Always || !config.quiet {
        human();
    }
}

/// Print the application header.
pub fn header(version: &str) {
    emit(
        "header",
        Level::Regular,
        || json!({ "app": "driftpool", "version": version }),
        || println!("{} {}\n", "driftpool".bold(), version.dimmed()),
    );
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        Level::Regular,
        || json!({ "label": label, "value": value }),
        || println!("  {:<14} {}", label.dimmed(), value),
    );
}

pub fn success(message: &str) {
    emit(
        "success",
        Level::Regular,
        || json!({ "message": message }),
        || println!("  {} {}", "✓".green(), message),
    );
}

pub fn warning(message: &str) {
    emit(
        "warning",
        Level::Always,
        || json!({ "message": message }),
        || println!("  {} {}", "⚠".yellow(), message),
    );
}

/// Print an error to stderr, in JSON mode too.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
    } else {
        eprintln!("  {} {}", "×".red(), message);
    }
}

pub fn section(title: &str) {
    emit(
        "section",
        Level::Regular,
        || json!({ "title": title }),
        || println!("\n{}", title.bold()),
    );
}

pub fn note(message: &str) {
    emit(
        "note",
        Level::Regular,
        || json!({ "message": message }),
        || println!("  {}", message.dimmed()),
    );
}

pub fn hint(message: &str) {
    emit(
        "hint",
        Level::Regular,
        || json!({ "message": message }),
        || println!("  {}: {}", "hint".cyan().dimmed(), message.dimmed()),
    );
}

/// Emit a domain record as a JSON line. No-op outside JSON mode.
///
/// Handlers call this next to their human-readable fields so scripts get
/// the raw structure (micro-USDC integers, ids, timestamps) rather than
/// rendered strings.
pub fn record(kind: &str, value: &impl Serialize) {
    if !is_json() {
        return;
    }
    match serde_json::to_value(value) {
        Ok(payload) => println!("{}", json!({ "type": kind, "payload": payload })),
        Err(e) => error(&format!("failed to encode {kind}: {e}")),
    }
}

/// Render rows as a table, or one JSON line per row.
pub fn table<T: Tabled + Serialize>(kind: &str, rows: &[T]) {
    if is_json() {
        for row in rows {
            record(kind, row);
        }
        return;
    }
    if current().quiet {
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    for line in table.to_string().lines() {
        println!("  {line}");
    }
}

fn styled(value: impl Display, paint: impl FnOnce(&str) -> String) -> String {
    let value = value.to_string();
    if is_json() {
        value
    } else {
        paint(&value)
    }
}

/// Green, for gains and payouts.
pub fn positive(value: impl Display) -> String {
    styled(value, |v| v.green().to_string())
}

/// Red, for losses and debits.
pub fn negative(value: impl Display) -> String {
    styled(value, |v| v.red().to_string())
}

pub fn highlight(value: impl Display) -> String {
    styled(value, |v| v.cyan().to_string())
}

pub fn muted(value: impl Display) -> String {
    styled(value, |v| v.dimmed().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styling_is_plain_in_json_mode() {
        configure(OutputConfig::new(true, false, 0));
        assert_eq!(positive("1.5"), "1.5");
        assert_eq!(muted(42), "42");
        assert!(is_json());
        configure(OutputConfig::default());
        assert!(!is_json());
    }
}
