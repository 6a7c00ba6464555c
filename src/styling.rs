//! Terminal output styling.
//!
//! stdout carries primary data (the dry-run plan, pipeline summary);
//! stderr carries status messages (progress, warnings, errors). This split
//! lets `repofleet run | grep foo` work without status noise interfering.

pub use anstream::{eprintln, println};

use color_print::cformat;

use std::sync::atomic::{AtomicU8, Ordering};

static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Set the global verbosity level once at startup, from `-v`/`--debug`.
pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

pub const SUCCESS_EMOJI: &str = "\u{2705}";
pub const ERROR_EMOJI: &str = "\u{274c}";
pub const WARNING_EMOJI: &str = "\u{1f7e1}";
pub const SKIP_EMOJI: &str = "\u{23ed}";
pub const PROGRESS_EMOJI: &str = "\u{1f504}";

pub fn success_message(content: impl AsRef<str>) -> String {
    cformat!("{SUCCESS_EMOJI} <green>{}</>", content.as_ref())
}

pub fn error_message(content: impl AsRef<str>) -> String {
    cformat!("{ERROR_EMOJI} <red>{}</>", content.as_ref())
}

pub fn warning_message(content: impl AsRef<str>) -> String {
    cformat!("{WARNING_EMOJI} <yellow>{}</>", content.as_ref())
}

pub fn progress_message(content: impl AsRef<str>) -> String {
    cformat!("{PROGRESS_EMOJI} <cyan>{}</>", content.as_ref())
}

/// The `clap::builder::Styles` used on every command: green headers/usage,
/// cyan literals, matching the teacher's help-template conventions.
pub fn cli_styles() -> clap::builder::Styles {
    use clap::builder::styling::{AnsiColor, Styles};
    Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
}
