//! Notices printed for the person at the terminal
//!
//! Log records carry timestamps and targets; these do not. Each notice is
//! written to stderr with a blank line above and below, colored by tone.

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Warning,
    Error,
    Plain,
}

fn render(tone: Tone, message: &str) -> String {
    match tone {
        Tone::Warning => format!("\n{}\n", message.yellow()),
        Tone::Error => format!("\n{}\n", message.red()),
        Tone::Plain => format!("\n{}\n", message),
    }
}

/// Something the user asked for was adjusted, e.g. a capped `--max`
pub fn warn(message: &str) {
    eprintln!("{}", render(Tone::Warning, message));
}

/// A command failed
pub fn error(message: &str) {
    eprintln!("{}", render(Tone::Error, message));
}

/// Empty results and other neutral outcomes
pub fn info(message: &str) {
    eprintln!("{}", render(Tone::Plain, message));
}
