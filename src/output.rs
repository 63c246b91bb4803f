//! Output formatting for the command line
//!
//! Provides colored human output, a JSON mode for scripting, and a spinner
//! while waiting on AWS.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Output mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
}

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
    /// Start time for duration calculations
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    /// Whether output is JSON
    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    fn emit_json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string(value).unwrap_or_default());
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let stars = "*".repeat(80_usize.saturating_sub(title.len() + 1));
        if self.use_color {
            println!("\n{} {}", title.bright_white().bold(), stars.bright_black());
        } else {
            println!("\n{} {}", title, stars);
        }
    }

    /// Print a region or artifact line with its state
    pub fn status(&self, subject: &str, state: &str, ok: bool) {
        if self.json_mode {
            self.emit_json(&serde_json::json!({
                "type": "status",
                "subject": subject,
                "state": state,
            }));
            return;
        }

        if self.use_color {
            let state = if ok { state.green() } else { state.yellow() };
            println!("{}: [{}]", state, subject.bright_white().bold());
        } else {
            println!("{}: [{}]", state, subject);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = serde_json::json!({
                "type": "error",
                "message": message
            });
            eprintln!("{}", serde_json::to_string(&err).unwrap_or_default());
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            let warn = serde_json::json!({
                "type": "warning",
                "message": message
            });
            eprintln!("{}", serde_json::to_string(&warn).unwrap_or_default());
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        if self.json_mode {
            self.emit_json(&serde_json::json!({
                "type": "info",
                "message": message
            }));
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print a command result: JSON of `value` in JSON mode, `summary`
    /// otherwise
    pub fn result<T: Serialize>(&self, summary: &str, value: &T) {
        if self.json_mode {
            let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            return;
        }

        let elapsed = format_duration(self.start_time.elapsed());
        if self.use_color {
            println!("\n{} {}", summary.green().bold(), format!("({})", elapsed).bright_black());
        } else {
            println!("\n{} ({})", summary, elapsed);
        }
    }

    /// Print a table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json_mode {
            let table = serde_json::json!({
                "type": "table",
                "headers": headers,
                "rows": rows
            });
            println!("{}", serde_json::to_string_pretty(&table).unwrap_or_default());
            return;
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let header_line = render_row(headers.iter().copied(), &widths);
        if self.use_color {
            println!("{}", header_line.bright_white().bold());
        } else {
            println!("{}", header_line);
        }

        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        if self.use_color {
            println!("{}", sep.join("-+-").bright_black());
        } else {
            println!("{}", sep.join("-+-"));
        }

        for row in rows {
            println!("{}", render_row(row.iter().map(String::as_str), &widths));
        }
    }

    /// Create a spinner for indeterminate progress
    pub fn create_spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.json_mode {
            return None;
        }

        let sp = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            sp.set_style(style);
        }
        sp.set_message(message.to_string());
        sp.enable_steady_tick(Duration::from_millis(100));

        Some(sp)
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            line.push_str(" | ");
        }
        match widths.get(i) {
            Some(width) => line.push_str(&format!("{:width$}", cell, width = width)),
            None => line.push_str(cell),
        }
    }
    line
}

/// Format a duration as a human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
