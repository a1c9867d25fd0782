//! Anchorline sync service: drains the local operation queue against the
//! content backend.

mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sync_config_and_utils::{init_logging, Config, Paths};
use sync_database::Visibility;

/// Anchorline sync command-line interface.
#[derive(Parser)]
#[command(name = "anchorline-sync")]
#[command(about = "Offline-tolerant sync for Anchorline content and charters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Base directory for runtime files (database, logs, config). Defaults to ~/.anchorline
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync coordinator until interrupted
    Run,
    /// Drain the queue once and print the summary
    SyncNow,
    /// Show pending and failed operation counts
    Status,
    /// Publish a content item
    Publish {
        /// Local content item id
        id: String,
        /// Visibility to publish at (public or unlisted)
        #[arg(long, default_value = "public", value_parser = parse_visibility)]
        visibility: Visibility,
    },
    /// Unpublish a content item
    Unpublish {
        /// Local content item id
        id: String,
    },
    /// List local content items
    List {
        /// Show recent sync operations instead
        #[arg(long)]
        operations: bool,
    },
}

fn parse_visibility(raw: &str) -> Result<Visibility, String> {
    Visibility::parse(raw).ok_or_else(|| format!("unknown visibility '{raw}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;

    init_logging(&cli.log_level, paths.sync_log_file());

    let config = Config::load(&paths)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run(config, &paths).await?,
        Commands::SyncNow => commands::sync_now(config, &paths).await?,
        Commands::Status => commands::status(config, &paths)?,
        Commands::Publish { id, visibility } => {
            commands::publish(config, &paths, &id, visibility).await?
        }
        Commands::Unpublish { id } => commands::unpublish(config, &paths, &id).await?,
        Commands::List { operations } => commands::list(config, &paths, operations)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn publish_parses_visibility() {
        let cli = Cli::try_parse_from([
            "anchorline-sync",
            "publish",
            "item-1",
            "--visibility",
            "Unlisted",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Publish { id, visibility }) => {
                assert_eq!(id, "item-1");
                assert_eq!(visibility, Visibility::Unlisted);
            }
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn unknown_visibility_is_rejected() {
        assert!(Cli::try_parse_from([
            "anchorline-sync",
            "publish",
            "item-1",
            "--visibility",
            "friends",
        ])
        .is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "anchorline-sync",
            "status",
            "--log-level",
            "debug",
            "--base-dir",
            "/tmp/anchorline",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/anchorline")));
    }
}
