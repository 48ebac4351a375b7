use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Balanced frame guidance for bird behavior detection datasets", long_about = None)]
pub struct Args {
    /// Directory for timestamped log files
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Flatten a Label Studio video export into video, track and box tables
    Import {
        /// Label Studio JSON export
        #[arg(long)]
        export: PathBuf,

        /// Directory for video_data/track_data/box_data.ndjson
        #[arg(long)]
        output: PathBuf,
    },

    /// Partition cameras and write one frame lookup table per split
    Guidance {
        /// Video table (NDJSON)
        #[arg(long)]
        videos: PathBuf,

        /// Track table (NDJSON)
        #[arg(long)]
        tracks: PathBuf,

        /// Directory for <split>_lookup.ndjson
        #[arg(long)]
        output: PathBuf,

        /// JSON config with split ratios and seed; defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overrides the config's random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write YOLO label files for every guidance target frame
    Labels {
        /// Directory holding <split>_lookup.ndjson tables
        #[arg(long)]
        guidance: PathBuf,

        /// Box table (NDJSON) from the import step
        #[arg(long)]
        boxes: PathBuf,

        /// Dataset root; files go to labels/<split>/
        #[arg(long)]
        output: PathBuf,

        /// Native video fps, when it differs from the guidance fps
        #[arg(long)]
        native_fps: Option<f64>,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
