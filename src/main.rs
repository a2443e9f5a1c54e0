//! # Autopost - Content Posting Coordinator
//!
//! A local coordinator for a browser-driven content-posting worker. It
//! supervises the worker process, decodes its JSON-per-line event protocol,
//! and maintains a folder-based content queue classified by media duration.
//!
//! ## Usage
//!
//! ```bash
//! # List the content queue under a root folder
//! autopost queue /path/to/content
//!
//! # Post a single content folder through the worker
//! autopost post /path/to/content/clip01
//!
//! # Post everything eligible
//! autopost post-all /path/to/content
//!
//! # Check the browser-automation backend
//! autopost test-connection
//!
//! # Manually mark a folder as posted
//! autopost mark-posted /path/to/content/clip01
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autopost::commands::{
    list::ListCommand,
    mark::MarkCommand,
    post::{PostCommand, WorkerAction},
};

/// Autopost - a local coordinator for content posting automation
#[derive(Parser)]
#[command(
    name = "autopost",
    about = "A local coordinator for browser-driven content posting automation",
    long_about = "Supervises an external posting worker, streams its structured event protocol, and manages a duration-classified content queue on disk.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Scan a content root and print the posting queue
    Queue {
        /// Path to the content root directory
        path: PathBuf,
    },
    /// Post a single content folder
    Post {
        /// Path to the content folder to post
        folder: PathBuf,
    },
    /// Post all eligible content folders under a root
    PostAll {
        /// Path to the content root directory
        path: PathBuf,
    },
    /// Verify the browser-automation backend is reachable
    TestConnection,
    /// Manually mark a content folder as posted
    MarkPosted {
        /// Path to the content folder
        folder: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autopost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Queue { path } => {
            info!("Starting queue command for path: {:?}", path);
            ListCommand::new(path).execute().await
        }
        Commands::Post { folder } => {
            info!("Starting post command for folder: {:?}", folder);
            PostCommand::new(WorkerAction::PostSingle { folder })
                .execute()
                .await
        }
        Commands::PostAll { path } => {
            info!("Starting post-all command for path: {:?}", path);
            PostCommand::new(WorkerAction::PostAll { root: path })
                .execute()
                .await
        }
        Commands::TestConnection => {
            info!("Starting connection test");
            PostCommand::new(WorkerAction::TestConnection).execute().await
        }
        Commands::MarkPosted { folder } => {
            info!("Starting mark-posted command for folder: {:?}", folder);
            MarkCommand::new(folder).execute().await
        }
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
