use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::probe::DurationProbe;
use crate::queue::{ContentQueue, PostStatus};

/// Command to scan the content root and print the posting queue
pub struct ListCommand {
    root: PathBuf,
}

impl ListCommand {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn execute(&self) -> Result<()> {
        if !self.root.exists() {
            return Err(anyhow!("Content directory does not exist: {:?}", self.root));
        }
        if !self.root.is_dir() {
            return Err(anyhow!("Path is not a directory: {:?}", self.root));
        }

        info!("🔎 Scanning content root: {:?}", self.root);

        let config = Config::from_env();
        let queue = ContentQueue::new(DurationProbe::new(&config));
        let items = queue.scan(&self.root).await;

        if items.is_empty() {
            println!("No content folders found.");
            return Ok(());
        }

        println!(
            "{:<8} {:<9} {:<9} {:<8} FOLDER",
            "TYPE", "DURATION", "STATUS", "CAPTION"
        );
        for item in &items {
            println!(
                "{:<8} {:<9} {:<9} {:<8} {}",
                item.classification.to_string(),
                item.duration_display,
                item.status.to_string(),
                if item.caption.is_empty() { "no" } else { "yes" },
                item.folder_name,
            );
        }

        let unposted = items
            .iter()
            .filter(|i| i.status == PostStatus::Unposted)
            .count();
        println!("\n{} item(s), {} unposted", items.len(), unposted);

        Ok(())
    }
}
