use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::event::{Event, LogLevel};
use crate::probe::DurationProbe;
use crate::queue::{ContentQueue, PostStatus};
use crate::supervisor::Supervisor;

/// Worker commands exposed through the CLI
pub enum WorkerAction {
    /// Post one content folder (`post-single`)
    PostSingle { folder: PathBuf },
    /// Post every eligible folder under a root (`post-all`)
    PostAll { root: PathBuf },
    /// Verify the browser-automation backend is reachable (`test-adspower`)
    TestConnection,
}

impl WorkerAction {
    fn command(&self) -> (&'static str, Vec<String>) {
        match self {
            WorkerAction::PostSingle { folder } => (
                "post-single",
                vec![folder.to_string_lossy().into_owned()],
            ),
            WorkerAction::PostAll { root } => {
                ("post-all", vec![root.to_string_lossy().into_owned()])
            }
            WorkerAction::TestConnection => ("test-adspower", Vec::new()),
        }
    }
}

/// Command that drives one worker job and streams its events to the
/// terminal
pub struct PostCommand {
    action: WorkerAction,
}

impl PostCommand {
    pub fn new(action: WorkerAction) -> Self {
        Self { action }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::from_env();
        let supervisor = Supervisor::new(config.clone());
        let mut events = supervisor.subscribe();

        let (command, args) = self.action.command();
        info!("🚀 Running worker command: {} {:?}", command, args);

        if !supervisor.start(command, &args) {
            // The spawn-failure completion is still in the channel; report it
            if let Ok(Event::Completion { message, .. }) = events.try_recv() {
                return Err(anyhow!(message));
            }
            return Err(anyhow!("Failed to start worker command"));
        }

        let progress = ProgressBar::new(100);
        progress.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
                .expect("static progress template"),
        );

        let completion = loop {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    warn!("🛑 Cancellation requested, stopping worker");
                    supervisor.stop().await;
                }
                event = events.recv() => match event {
                    Ok(Event::Completion { success, message }) => {
                        progress.finish_and_clear();
                        break (success, message);
                    }
                    Ok(event) => render_event(&progress, event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Dropped {} event(s), consumer too slow", missed);
                    }
                    Err(RecvError::Closed) => {
                        progress.finish_and_clear();
                        return Err(anyhow!("Event stream closed before completion"));
                    }
                },
            }
        };

        let (success, message) = completion;
        if !success {
            return Err(anyhow!(message));
        }
        info!("✅ {}", message);

        // A completed single post flips the item's marker and the queue is
        // re-scanned so the caller sees the updated state
        if let WorkerAction::PostSingle { folder } = &self.action {
            let queue = ContentQueue::new(DurationProbe::new(&config));
            queue.mark_posted(folder, "automatic").await?;

            if let Some(root) = folder.parent() {
                let items = queue.scan(root).await;
                let unposted = items
                    .iter()
                    .filter(|i| i.status == PostStatus::Unposted)
                    .count();
                info!("📋 Queue re-scanned: {} item(s), {} unposted", items.len(), unposted);
            }
        }

        Ok(())
    }
}

fn render_event(progress: &ProgressBar, event: Event) {
    match event {
        Event::Log { level, message, .. } => match level {
            LogLevel::Error => error!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Success => info!("✅ {}", message),
            LogLevel::Step => info!("➡️ {}", message),
            LogLevel::Info => info!("{}", message),
        },
        Event::Progress { value, step } => {
            progress.set_position(value as u64);
            progress.set_message(step);
        }
        Event::VideoStatus { name, status } => {
            info!("🎬 {}: {}", name, status);
        }
        Event::Completion { .. } => unreachable!("completion handled by caller"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_action_command_lines() {
        let (command, args) = WorkerAction::PostSingle {
            folder: PathBuf::from("/content/clip01"),
        }
        .command();
        assert_eq!(command, "post-single");
        assert_eq!(args, vec!["/content/clip01".to_string()]);

        let (command, args) = WorkerAction::PostAll {
            root: PathBuf::from("/content"),
        }
        .command();
        assert_eq!(command, "post-all");
        assert_eq!(args, vec!["/content".to_string()]);

        let (command, args) = WorkerAction::TestConnection.command();
        assert_eq!(command, "test-adspower");
        assert!(args.is_empty());
    }
}
