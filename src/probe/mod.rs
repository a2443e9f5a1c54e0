use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;

/// ffprobe wrapper that measures media duration in seconds.
///
/// Every failure mode (missing executable, non-zero exit, unparsable
/// output, timeout) degrades to `None`; callers classify such items as
/// UNKNOWN instead of dropping them.
pub struct DurationProbe {
    executable: String,
    timeout: Duration,
}

impl DurationProbe {
    pub fn new(config: &Config) -> Self {
        Self {
            executable: "ffprobe".to_string(),
            timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }

    /// Override the probe executable, mainly for tests
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Get the duration of a media file in seconds, or `None` if it
    /// cannot be determined
    pub async fn probe(&self, media_path: &Path) -> Option<f64> {
        let mut cmd = Command::new(&self.executable);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]);
        cmd.arg(media_path);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("ffprobe unavailable for {:?}: {}", media_path, e);
                return None;
            }
            Err(_) => {
                debug!(
                    "ffprobe timed out after {:?} for {:?}",
                    self.timeout, media_path
                );
                return None;
            }
        };

        if !output.status.success() {
            debug!(
                "ffprobe failed for {:?}: {}",
                media_path,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.trim().parse::<f64>() {
            Ok(seconds) => Some(seconds),
            Err(_) => {
                debug!(
                    "ffprobe produced unparsable duration for {:?}: {:?}",
                    media_path,
                    stdout.trim()
                );
                None
            }
        }
    }
}

impl Default for DurationProbe {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
