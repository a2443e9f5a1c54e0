use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::probe::DurationProbe;

/// File extensions that qualify a folder as a content item
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mov", "avi", "mkv", "webm", "flv"];

/// Durations strictly below this are reels; at or above, regular posts
pub const REEL_MAX_SECONDS: f64 = 90.0;

const MARKER_DIR: &str = "Posted";
const MARKER_FILE: &str = "status.json";
const CAPTION_FILE: &str = "caption.txt";

/// Content category derived from measured duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Reel,
    Post,
    Unknown,
}

impl Classification {
    /// The 90-second boundary is exclusive on the reel side: exactly 90
    /// seconds is a post.
    pub fn from_duration(duration_seconds: Option<f64>) -> Self {
        match duration_seconds {
            Some(d) if d < REEL_MAX_SECONDS => Classification::Reel,
            Some(_) => Classification::Post,
            None => Classification::Unknown,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Reel => "REEL",
            Classification::Post => "POST",
            Classification::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Whether an item has already been posted, per its marker file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Posted,
    Unposted,
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostStatus::Posted => "POSTED",
            PostStatus::Unposted => "UNPOSTED",
        };
        write!(f, "{s}")
    }
}

/// Persisted posted-state record, one per content folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMarker {
    pub posted: bool,
    pub timestamp: String,
    pub method: String,
}

/// One content folder discovered under the queue root
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub folder_name: String,
    pub folder_path: PathBuf,
    pub video_file: String,
    pub video_path: PathBuf,
    pub duration_seconds: Option<f64>,
    pub duration_display: String,
    pub classification: Classification,
    pub status: PostStatus,
    pub caption: String,
}

/// Scans a content root for postable items and maintains their posted
/// markers
pub struct ContentQueue {
    probe: DurationProbe,
}

impl ContentQueue {
    pub fn new(probe: DurationProbe) -> Self {
        Self { probe }
    }

    /// Scan the root for content folders.
    ///
    /// Returns an empty list when the root is empty or missing. Folders
    /// without a recognized video file are excluded. Results are sorted by
    /// folder name so repeated scans are deterministic regardless of the
    /// underlying directory listing order.
    pub async fn scan(&self, root: &Path) -> Vec<QueueItem> {
        if root.as_os_str().is_empty() || !root.exists() {
            return Vec::new();
        }

        let mut items = Vec::new();

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_dir() {
                continue;
            }

            let folder_path = entry.path().to_path_buf();
            let folder_name = entry.file_name().to_string_lossy().to_string();

            let Some(video_file) = find_video_file(&folder_path) else {
                debug!("No video file in {:?}, skipping", folder_path);
                continue;
            };

            let video_path = folder_path.join(&video_file);
            let duration_seconds = self.probe.probe(&video_path).await;
            let classification = Classification::from_duration(duration_seconds);
            let status = read_posted_status(&folder_path).await;
            let caption = read_caption(&folder_path).await;

            items.push(QueueItem {
                folder_name,
                video_file,
                video_path,
                duration_display: format_duration(duration_seconds),
                duration_seconds,
                classification,
                status,
                caption,
                folder_path,
            });
        }

        items
    }

    /// Write the posted marker for a folder, overwriting any prior one.
    ///
    /// The marker is written to a temp file and renamed into place so a
    /// concurrent scan never observes a half-written record.
    pub async fn mark_posted(&self, folder_path: &Path, method: &str) -> Result<()> {
        let marker_dir = folder_path.join(MARKER_DIR);
        async_fs::create_dir_all(&marker_dir)
            .await
            .with_context(|| format!("Failed to create marker directory in {folder_path:?}"))?;

        let marker = StatusMarker {
            posted: true,
            timestamp: chrono::Local::now().to_rfc3339(),
            method: method.to_string(),
        };
        let content = serde_json::to_string_pretty(&marker)?;

        let marker_path = marker_dir.join(MARKER_FILE);
        let tmp_path = marker_dir.join(format!("{MARKER_FILE}.tmp"));
        async_fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("Failed to write marker in {folder_path:?}"))?;
        async_fs::rename(&tmp_path, &marker_path)
            .await
            .with_context(|| format!("Failed to finalize marker in {folder_path:?}"))?;

        debug!("Marked as posted ({}): {:?}", method, folder_path);
        Ok(())
    }
}

/// First file in the folder whose extension is on the video allow-list,
/// case-insensitive. Entries are checked in name order.
fn find_video_file(folder_path: &Path) -> Option<String> {
    WalkDir::new(folder_path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| {
                        let ext = ext.to_string_lossy().to_lowercase();
                        VIDEO_EXTENSIONS.contains(&ext.as_str())
                    })
                    .unwrap_or(false)
        })
        .map(|entry| entry.file_name().to_string_lossy().to_string())
}

/// Format a duration as MM:SS, or "N/A" when unknown
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) => {
            let minutes = (s / 60.0) as u64;
            let secs = (s % 60.0) as u64;
            format!("{minutes:02}:{secs:02}")
        }
        None => "N/A".to_string(),
    }
}

/// POSTED only when the marker exists, parses, and says so; anything else
/// is UNPOSTED
async fn read_posted_status(folder_path: &Path) -> PostStatus {
    let marker_path = folder_path.join(MARKER_DIR).join(MARKER_FILE);

    match async_fs::read_to_string(&marker_path).await {
        Ok(content) => match serde_json::from_str::<StatusMarker>(&content) {
            Ok(marker) if marker.posted => PostStatus::Posted,
            Ok(_) => PostStatus::Unposted,
            Err(e) => {
                debug!("Malformed marker at {:?}: {}", marker_path, e);
                PostStatus::Unposted
            }
        },
        Err(_) => PostStatus::Unposted,
    }
}

async fn read_caption(folder_path: &Path) -> String {
    match async_fs::read_to_string(folder_path.join(CAPTION_FILE)).await {
        Ok(content) => content.trim().to_string(),
        Err(_) => String::new(),
    }
}
