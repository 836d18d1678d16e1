//! ClipForge CLI: build a two-track timeline and export it with ffmpeg.
//!
//! Usage:
//!   clipforge init <PATH>                  Create an empty project file
//!   clipforge import <PATH> <MEDIA>        Add a source clip to the library
//!   clipforge captions <PATH> <ID> <FILE>  Attach caption cues to a source
//!   clipforge place <PATH> <ID>            Append a source to a track
//!   clipforge trim <PATH> <ID> <IN> <OUT>  Set a placed clip's in/out points
//!   clipforge split <PATH> <ID> <AT>       Split a placed clip at a timeline time
//!   clipforge move <PATH> <ID> <START>     Reposition a placed clip
//!   clipforge remove <PATH> <ID>           Remove a placed clip (or a source)
//!   clipforge info <PATH>                  Show project information
//!   clipforge validate <PATH>              Validate sources and trims
//!   clipforge check                        Check ffmpeg and configuration
//!   clipforge export <PATH>                Export the timeline to a video file

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clipforge_project_model::Track;
use clipforge_render_engine::Resolution;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipforge",
    about = "Two-track clip editor with ffmpeg export",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TrackArg {
    Main,
    Overlay,
}

impl From<TrackArg> for Track {
    fn from(arg: TrackArg) -> Self {
        match arg {
            TrackArg::Main => Track::Main,
            TrackArg::Overlay => Track::Overlay,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Path of the project file to create
        path: PathBuf,

        /// Project name (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Import a media file into the project library
    Import {
        /// Path to the project file
        path: PathBuf,

        /// Media file to import
        media: PathBuf,

        /// Duration in seconds (e.g. from ffprobe)
        #[arg(long)]
        duration: f64,

        /// Frame width
        #[arg(long)]
        width: Option<u32>,

        /// Frame height
        #[arg(long)]
        height: Option<u32>,

        /// Video codec name
        #[arg(long)]
        codec: Option<String>,

        /// File size in bytes (read from disk when omitted)
        #[arg(long)]
        size: Option<u64>,

        /// Also append the new source to this track
        #[arg(long, value_enum)]
        place: Option<TrackArg>,

        /// Skip extracting a thumbnail frame
        #[arg(long)]
        no_thumbnail: bool,
    },

    /// Attach caption cues (JSON array of {start, end, text}) to a source
    Captions {
        /// Path to the project file
        path: PathBuf,

        /// Source clip id
        source: String,

        /// JSON caption file
        file: PathBuf,
    },

    /// Append a library source to the end of a track
    Place {
        /// Path to the project file
        path: PathBuf,

        /// Source clip id
        source: String,

        /// Target track
        #[arg(long, value_enum, default_value = "main")]
        track: TrackArg,
    },

    /// Set a placed clip's in/out points (source seconds)
    Trim {
        /// Path to the project file
        path: PathBuf,

        /// Placed clip id
        clip: String,

        /// In point
        trim_start: f64,

        /// Out point
        trim_end: f64,
    },

    /// Split a placed clip at a timeline time
    Split {
        /// Path to the project file
        path: PathBuf,

        /// Placed clip id
        clip: String,

        /// Timeline time in seconds
        at: f64,
    },

    /// Move a placed clip to a new start time and track
    Move {
        /// Path to the project file
        path: PathBuf,

        /// Placed clip id
        clip: String,

        /// New start time in seconds
        start: f64,

        /// Destination track (defaults to the clip's current track)
        #[arg(long, value_enum)]
        track: Option<TrackArg>,
    },

    /// Remove a placed clip, or a whole source with --source
    Remove {
        /// Path to the project file
        path: PathBuf,

        /// Placed clip id, or source id with --source
        id: String,

        /// Remove the library source and every placement of it
        #[arg(long)]
        source: bool,
    },

    /// Show project information
    Info {
        /// Path to the project file
        path: PathBuf,
    },

    /// Validate that sources exist and trims are in range
    Validate {
        /// Path to the project file
        path: PathBuf,
    },

    /// Check ffmpeg availability and configuration
    Check,

    /// Export the timeline to a video file
    Export {
        /// Path to the project file
        path: PathBuf,

        /// Output file path (defaults to the project path with .mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output resolution: source, 4k, 1080p, 720p, 480p or WxH
        #[arg(long, default_value = "source")]
        resolution: Resolution,

        /// Drop overlay audio from PiP composites
        #[arg(long)]
        no_overlay_audio: bool,

        /// Print the final outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = clipforge_common::AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    clipforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init { path, name } => commands::init::run(path, name),
        Commands::Import {
            path,
            media,
            duration,
            width,
            height,
            codec,
            size,
            place,
            no_thumbnail,
        } => {
            commands::import::run(
                path,
                media,
                commands::import::MediaInfo {
                    duration,
                    width,
                    height,
                    codec,
                    size,
                },
                place.map(Track::from),
                !no_thumbnail,
                &config,
            )
            .await
        }
        Commands::Captions { path, source, file } => commands::edit::captions(path, source, file),
        Commands::Place {
            path,
            source,
            track,
        } => commands::edit::place(path, source, track.into()),
        Commands::Trim {
            path,
            clip,
            trim_start,
            trim_end,
        } => commands::edit::trim(path, clip, trim_start, trim_end),
        Commands::Split { path, clip, at } => commands::edit::split(path, clip, at),
        Commands::Move {
            path,
            clip,
            start,
            track,
        } => commands::edit::move_clip(path, clip, start, track.map(Track::from)),
        Commands::Remove { path, id, source } => commands::edit::remove(path, id, source),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Check => commands::check::run(&config).await,
        Commands::Export {
            path,
            output,
            resolution,
            no_overlay_audio,
            json,
        } => commands::export::run(path, output, resolution, !no_overlay_audio, json, &config).await,
    }
}
