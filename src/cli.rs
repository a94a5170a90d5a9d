use clap::{Parser, Subcommand};
use rk_core::{SceneId, SceneMarkerId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelkeep")]
#[command(author, version, about = "Media library manager")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate marker clips and previews that are missing
    GenerateMarkers {
        /// Only the markers of this scene
        #[arg(long, conflicts_with = "marker")]
        scene: Option<SceneId>,

        /// Only this marker
        #[arg(long)]
        marker: Option<SceneMarkerId>,

        /// Regenerate artifacts that already exist
        #[arg(long)]
        overwrite: bool,

        /// Report how many artifacts would be generated without encoding
        #[arg(long)]
        dry_run: bool,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Drop every table and recreate the schema
    ResetDb {
        /// Confirm that all data should be deleted
        #[arg(long)]
        yes: bool,
    },

    /// Display version information
    Version,
}
