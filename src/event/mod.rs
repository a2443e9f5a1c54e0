use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;

/// Severity levels used by the worker's structured log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Error,
    Warn,
    Step,
}

impl LogLevel {
    fn parse(s: &str) -> Self {
        match s {
            "success" => LogLevel::Success,
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "step" => LogLevel::Step,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Step => "step",
        };
        write!(f, "{s}")
    }
}

/// One decoded unit of worker output
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A log line; `timestamp` is empty until the supervisor stamps it
    Log {
        level: LogLevel,
        message: String,
        timestamp: String,
    },
    /// Progress update for the current job (0-100)
    Progress { value: u8, step: String },
    /// Per-video status change reported by the worker
    VideoStatus { name: String, status: String },
    /// Terminal event; emitted exactly once per job run
    Completion { success: bool, message: String },
}

/// Wire representation of one structured stdout line.
///
/// Unknown `type` values map to `Unknown` so they can be dropped without
/// failing the whole line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Log {
        #[serde(default, deserialize_with = "level_from_str")]
        level: LogLevel,
        #[serde(default)]
        message: String,
        #[serde(default)]
        timestamp: String,
    },
    Progress {
        #[serde(default)]
        value: u64,
        #[serde(default)]
        step: String,
    },
    VideoStatus {
        #[serde(default)]
        video: String,
        #[serde(default)]
        status: String,
    },
    Success {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    #[serde(other)]
    Unknown,
}

fn level_from_str<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(LogLevel::parse(&s))
}

impl WireMessage {
    fn into_event(self) -> Option<Event> {
        match self {
            WireMessage::Log {
                level,
                message,
                timestamp,
            } => Some(Event::Log {
                level,
                message,
                timestamp,
            }),
            WireMessage::Progress { value, step } => Some(Event::Progress {
                value: value.min(100) as u8,
                step,
            }),
            WireMessage::VideoStatus { video, status } => Some(Event::VideoStatus {
                name: video,
                status,
            }),
            WireMessage::Success { message, timestamp } => Some(Event::Log {
                level: LogLevel::Success,
                message: message.unwrap_or_else(|| "Success".to_string()),
                timestamp,
            }),
            WireMessage::Error { message, timestamp } => Some(Event::Log {
                level: LogLevel::Error,
                message: message.unwrap_or_else(|| "Error".to_string()),
                timestamp,
            }),
            WireMessage::Unknown => None,
        }
    }
}

/// Decode one line of worker stdout into an event.
///
/// Structured JSON objects dispatch on their `type` field; objects with an
/// unknown or missing type yield no event. Anything that is not a JSON
/// object falls back to a plain-text info log after stripping ANSI color
/// codes, or no event when nothing remains. This never fails.
pub fn decode_line(line: &str) -> Option<Event> {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) if value.is_object() => serde_json::from_value::<WireMessage>(value)
            .ok()
            .and_then(WireMessage::into_event),
        _ => fallback_log(line),
    }
}

fn ansi_pattern() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap())
}

/// Legacy plain-text path for workers that still log with ANSI colors
fn fallback_log(line: &str) -> Option<Event> {
    let clean = ansi_pattern().replace_all(line, "");
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }
    Some(Event::Log {
        level: LogLevel::Info,
        message: clean.to_string(),
        timestamp: String::new(),
    })
}
