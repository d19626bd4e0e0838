//! Export progress reporting.
//!
//! Reports observable progress during `storefront export` so users see what
//! is being fetched and how many assets are left. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for an export run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportProgressEvent {
    /// Fetching the home entry and its references.
    Fetching { entry_id: String },
    /// Asset `n` of `total` is being downloaded.
    Downloading {
        n: u64,
        total: u64,
        file_name: String,
    },
    /// Writing the snapshot file.
    Writing { path: String },
}

/// Reports export progress. Implementations write to stderr (human or JSON).
pub trait ExportProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the snapshot builder.
    fn report(&self, event: ExportProgressEvent);
}

/// Human-friendly progress on stderr: "export  downloading  3 / 12 assets  A1_hero.jpg".
pub struct StderrProgress;

impl ExportProgressReporter for StderrProgress {
    fn report(&self, event: ExportProgressEvent) {
        let line = match &event {
            ExportProgressEvent::Fetching { entry_id } => {
                format!("export  fetching  {}\n", entry_id)
            }
            ExportProgressEvent::Downloading {
                n,
                total,
                file_name,
            } => format!(
                "export  downloading  {} / {} assets  {}\n",
                format_number(*n),
                format_number(*total),
                file_name
            ),
            ExportProgressEvent::Writing { path } => format!("export  writing  {}\n", path),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ExportProgressReporter for JsonProgress {
    fn report(&self, event: ExportProgressEvent) {
        let obj = match &event {
            ExportProgressEvent::Fetching { entry_id } => serde_json::json!({
                "event": "progress",
                "phase": "fetching",
                "entry": entry_id
            }),
            ExportProgressEvent::Downloading {
                n,
                total,
                file_name,
            } => serde_json::json!({
                "event": "progress",
                "phase": "downloading",
                "n": n,
                "total": total,
                "file": file_name
            }),
            ExportProgressEvent::Writing { path } => serde_json::json!({
                "event": "progress",
                "phase": "writing",
                "path": path
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ExportProgressReporter for NoProgress {
    fn report(&self, _event: ExportProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ExportProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
