//! Line-per-event rendering for an interactive terminal.

use std::io::{self, IsTerminal, Stdout, Write};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use runwatch_engine::EventSink;
use runwatch_types::{Event, Status};

const RULE: &str =
    "-------------------------------------------------------------------------------------";
const HEADER: &str = "TIME     | STATUS | TYPE | BRANCH          | SHA     | NAME";
const BRANCH_WIDTH: usize = 15;
const BRANCH_KEEP: usize = 12;
const SHA_LEN: usize = 7;

/// Whether stdout should receive ANSI colors.
pub fn stdout_supports_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Writes the startup banner and the table header.
pub fn write_banner<W: Write>(
    out: &mut W,
    resource: &str,
    since: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(out, "🚀 Starting monitoring for {resource}")?;
    writeln!(out, "🕒 Monitoring events after: {}", local_time(since))?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{HEADER}")?;
    writeln!(out, "{RULE}")?;
    out.flush()
}

/// Writes the shutdown message.
pub fn write_farewell<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "🛑 Stopping monitor... state saved.")?;
    writeln!(out, "👋 Bye!")?;
    out.flush()
}

/// [`EventSink`] that prints one table row per event.
#[derive(Debug)]
pub struct TerminalSink<W> {
    out: W,
    color: bool,
}

impl TerminalSink<Stdout> {
    /// Prints to stdout, coloring only when stdout is an interactive terminal.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), stdout_supports_color())
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Renders one event as a row, without trailing newline.
    pub fn render(&self, event: &Event) -> String {
        format!(
            "{} {} [{:<4}] {:<width$} ({}) {}",
            local_time(event.timestamp()),
            self.status_cell(event.status()),
            event.entity_type().short_label(),
            branch_cell(event.branch()),
            sha_cell(event.commit_sha()),
            event.name(),
            width = BRANCH_WIDTH,
        )
    }

    fn status_cell(&self, status: &Status) -> String {
        let cell = match status {
            Status::Done => "🟢 DONE ".to_string(),
            Status::Fail => "🔴 FAIL ".to_string(),
            Status::Running => "🟡 RUN  ".to_string(),
            Status::Queued => "⚪ QUEUE".to_string(),
            Status::Skipped => "🚫 SKIP ".to_string(),
            Status::Unknown(_) => format!("🔹 {}", status.short_code()),
        };
        if !self.color {
            return cell;
        }
        match status {
            Status::Done => cell.green().to_string(),
            Status::Fail => cell.red().to_string(),
            Status::Running => cell.yellow().to_string(),
            Status::Queued => cell.white().to_string(),
            Status::Skipped => cell.bright_black().to_string(),
            Status::Unknown(_) => cell,
        }
    }
}

impl<W: Write + Send> EventSink for TerminalSink<W> {
    fn deliver(&mut self, event: &Event) {
        let line = self.render(event);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write event to terminal");
        }
    }
}

fn local_time(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn branch_cell(branch: Option<&str>) -> String {
    let branch = branch.unwrap_or("HEAD");
    if branch.chars().count() > BRANCH_WIDTH {
        let kept: String = branch.chars().take(BRANCH_KEEP).collect();
        format!("{kept}...")
    } else {
        branch.to_string()
    }
}

fn sha_cell(sha: Option<&str>) -> &str {
    match sha {
        Some(sha) if sha.len() >= SHA_LEN => sha.get(..SHA_LEN).unwrap_or("unknown"),
        _ => "unknown",
    }
}
