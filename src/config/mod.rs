use std::env;
use std::path::PathBuf;

/// Configuration for the worker invocation and application behavior
#[derive(Debug, Clone)]
pub struct Config {
    /// Executable that hosts the automation controller (usually `node`)
    pub worker_executable: String,
    /// Entrypoint script passed as the worker's first argument
    pub controller_path: PathBuf,
    /// Seconds to wait for a graceful exit before force-killing on stop
    pub stop_grace_secs: u64,
    /// Upper bound on a single ffprobe invocation
    pub probe_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            worker_executable: env::var("AUTOPOST_WORKER_BIN")
                .unwrap_or_else(|_| "node".to_string()),
            controller_path: env::var("AUTOPOST_CONTROLLER")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("node_bridge/controller.js")),
            stop_grace_secs: env::var("AUTOPOST_STOP_GRACE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            probe_timeout_secs: env::var("AUTOPOST_PROBE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_executable: "node".to_string(),
            controller_path: PathBuf::from("node_bridge/controller.js"),
            stop_grace_secs: 5,
            probe_timeout_secs: 15,
        }
    }
}
