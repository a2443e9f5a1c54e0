use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::probe::DurationProbe;
use crate::queue::ContentQueue;

/// Command to manually mark a content folder as posted
pub struct MarkCommand {
    folder: PathBuf,
}

impl MarkCommand {
    pub fn new(folder: PathBuf) -> Self {
        Self { folder }
    }

    pub async fn execute(&self) -> Result<()> {
        if !self.folder.is_dir() {
            return Err(anyhow!(
                "Content folder does not exist: {:?}",
                self.folder
            ));
        }

        let config = Config::from_env();
        let queue = ContentQueue::new(DurationProbe::new(&config));
        queue.mark_posted(&self.folder, "manual").await?;

        info!("✅ Marked as posted: {:?}", self.folder);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::StatusMarker;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mark_writes_manual_marker() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("clip01");
        std::fs::create_dir(&folder).unwrap();

        let mark_cmd = MarkCommand::new(folder.clone());
        mark_cmd.execute().await.unwrap();

        let marker: StatusMarker = serde_json::from_str(
            &std::fs::read_to_string(folder.join("Posted").join("status.json")).unwrap(),
        )
        .unwrap();
        assert!(marker.posted);
        assert_eq!(marker.method, "manual");
    }

    #[tokio::test]
    async fn test_mark_nonexistent_folder() {
        let mark_cmd = MarkCommand::new(PathBuf::from("/nonexistent/folder"));

        assert!(mark_cmd.execute().await.is_err());
    }
}
