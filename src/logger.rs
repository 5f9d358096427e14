//! Logging utilities with colored output and a compile status block.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro gated by `--verbose`
//! - `CompileStatus` for the result of the latest compile
//!
//! Everything is written to stderr. Stdout belongs to command output
//! (`extract`) and, inside the worker process, to the protocol channel.
//!
//! # Example
//!
//! ```ignore
//! log!("worker"; "spawned pid {}", pid);
//! status_error("compile failed", &message);
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stderr},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut out = stderr().lock();
    writeln!(out, "{prefix} {message}").ok();
    out.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "compile" => prefix.bright_blue().bold().to_string(),
        "worker" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Compile Status (single status block with overwrite)
// ============================================================================

/// Current UTC time formatted as HH:MM:SS
fn now() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

/// Status display for the outcome of the latest compile.
///
/// Each message replaces the previous block so an edit loop shows only the
/// result of the most recent attempt.
pub struct CompileStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

static COMPILE_STATUS: LazyLock<Mutex<CompileStatus>> =
    LazyLock::new(|| Mutex::new(CompileStatus::new()));

impl CompileStatus {
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    /// Display warning message (⚠ prefix, yellow).
    pub fn warning(&mut self, detail: &str) {
        self.display(format!("{}", "⚠".yellow()), detail);
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut out = stderr().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(out, cursor::MoveUp(lines)).ok();
            execute!(out, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(out, "{timestamp} {symbol} {message}").ok();
        out.flush().ok();

        self.last_lines = message.matches('\n').count() + 1;
    }

    /// Forget the previous block so the next message does not overwrite it.
    ///
    /// Called after anything else (an editor session, a prompt) has written
    /// to the terminal.
    pub fn detach(&mut self) {
        self.last_lines = 0;
    }
}

/// Global compile status: success
pub fn status_success(message: &str) {
    COMPILE_STATUS.lock().success(message);
}

/// Global compile status: error
pub fn status_error(summary: &str, detail: &str) {
    COMPILE_STATUS.lock().error(summary, detail);
}

/// Global compile status: warning
pub fn status_warning(detail: &str) {
    COMPILE_STATUS.lock().warning(detail);
}

/// Global compile status: detach from the previous block
pub fn status_detach() {
    COMPILE_STATUS.lock().detach();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }

    #[test]
    fn test_status_tracks_line_count() {
        let mut status = CompileStatus::new();
        status.error("compile failed", "line 1\nline 2");
        assert_eq!(status.last_lines, 3);
        status.success("done");
        assert_eq!(status.last_lines, 1);
        status.detach();
        assert_eq!(status.last_lines, 0);
    }
}
