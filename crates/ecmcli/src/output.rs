//! Output formatting: table, JSON, YAML, plain, plus tree rendering and
//! the pager.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

pub fn bold(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_owned()
    }
}

pub fn dim(text: &str, color: bool) -> String {
    if color {
        text.dimmed().to_string()
    } else {
        text.to_owned()
    }
}

pub fn success(text: &str, color: bool) -> String {
    if color {
        text.green().to_string()
    } else {
        text.to_owned()
    }
}

pub fn failure(text: &str, color: bool) -> String {
    if color {
        text.red().to_string()
    } else {
        text.to_owned()
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<'a, T, R>(
    format: OutputFormat,
    data: &'a [T],
    to_row: impl Fn(&'a T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item views don't use `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Like [`print_output`], but long output on a terminal goes through
/// `$PAGER` (default `less -FRX`).
pub fn print_paged(output: &str, quiet: bool, no_pager: bool) {
    if quiet || output.is_empty() {
        return;
    }
    if no_pager || !io::stdout().is_terminal() || fits_terminal(output) {
        print_output(output, quiet);
        return;
    }
    let child = match spawn_pager() {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!("pager unavailable: {e}");
            print_output(output, quiet);
            return;
        }
    };
    // Once the pager runs it owns the output; never print it a second time.
    if let Err(e) = feed_pager(child, output) {
        tracing::debug!("pager failed: {e}");
    }
}

fn fits_terminal(output: &str) -> bool {
    let rows = crossterm::terminal::size().map_or(24, |(_, rows)| rows);
    output.lines().count() < usize::from(rows)
}

fn spawn_pager() -> io::Result<Child> {
    let pager = std::env::var("PAGER").unwrap_or_else(|_| "less -FRX".into());
    let mut parts = pager.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "empty PAGER"))?;
    Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn()
}

/// Write the output to the pager and wait for it to exit. The child is
/// reaped even when writing fails.
fn feed_pager(mut child: Child, output: &str) -> io::Result<ExitStatus> {
    if let Some(mut stdin) = child.stdin.take() {
        // The reader quitting early closes the pipe; that is not an error.
        match writeln!(stdin, "{output}") {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                tracing::debug!("writing to pager: {e}");
            }
            _ => {}
        }
    }
    child.wait()
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).expect("serialization should not fail")
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).expect("serialization should not fail")
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    if compact {
        render_json_compact(data)
    } else {
        render_json_pretty(data)
    }
}

/// YAML output.
pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

// ── Trees ────────────────────────────────────────────────────────────

/// A labelled node of a rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TreeNode {
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }
}

/// Render top-level nodes and their descendants with box-drawing guides.
///
/// ```text
/// Root
/// ├── A
/// │   └── A1
/// └── B
/// ```
pub fn render_tree(roots: &[TreeNode]) -> String {
    let mut lines = Vec::new();
    for root in roots {
        lines.push(root.label.clone());
        render_children(&root.children, "", &mut lines);
    }
    lines.join("\n")
}

fn render_children(children: &[TreeNode], prefix: &str, lines: &mut Vec<String>) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, guide) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines.push(format!("{prefix}{branch}{}", child.label));
        render_children(&child.children, &format!("{prefix}{guide}"), lines);
    }
}

// ── Values ───────────────────────────────────────────────────────────

/// Coarse age of a timestamp, e.g. `3days 4h`.
pub fn time_since(ts: DateTime<Utc>) -> String {
    let secs = (Utc::now() - ts).num_seconds().max(0).unsigned_abs();
    coarse_duration(Duration::from_secs(secs))
}

/// Two most significant units of a duration.
pub fn coarse_duration(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        return "0s".into();
    }
    let full = humantime::format_duration(duration).to_string();
    full.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

pub fn format_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(String::new, |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Human rate for a bytes-per-second sample, e.g. `1.2 MB/s`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    let bytes = if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
        let rounded = bytes_per_sec.round() as u64;
        rounded
    } else {
        0
    };
    format!("{}/s", bytesize::ByteSize::b(bytes))
}

/// Display form of a scalar JSON value (strings unquoted).
pub fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
