//! Command line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "editmark", version, about = "Publish instances and interchange exports from host snapshots")]
pub struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Sequence to work on instead of the active one
    #[arg(long, global = true)]
    pub sequence: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create shot, plate and audio instances from clips
    Create(CreateArgs),
    /// Create the project's workfile instance
    CreateWorkfile(WorkfileArgs),
    /// Create an editorial package instance for the sequence
    CreatePackage(PackageArgs),
    /// Collect instances stored in clip and project tags
    Collect(CollectArgs),
    /// Change fields of stored instances
    Update(UpdateArgs),
    /// Remove instances and their stored records
    Remove(RemoveArgs),
    /// Export the sequence as an OpenTimelineIO file
    ExportOtio(ExportOtioArgs),
    /// Write a quicktime render job for the sequence
    Render(RenderArgs),
    /// Write the default settings file
    InitSettings {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Host snapshot file, updated in place
    pub project: PathBuf,
    /// Use every clip instead of the host selection
    #[arg(long)]
    pub all: bool,
    /// Hierarchy template
    #[arg(long)]
    pub hierarchy: Option<String>,
    /// Clip name template
    #[arg(long)]
    pub clip_name: Option<String>,
    /// Keep host clip names
    #[arg(long)]
    pub no_rename: bool,
    /// Hero track enabling vertical sync
    #[arg(long)]
    pub hero_track: Option<String>,
    /// Track used for review media
    #[arg(long)]
    pub review_track: Option<String>,
    /// Plate variant, `<track_name>` for the track name
    #[arg(long)]
    pub variant: Option<String>,
    /// Create audio products
    #[arg(long)]
    pub audio: bool,
    /// Template token override, `key=value`
    #[arg(long = "token", value_parser = parse_key_value)]
    pub tokens: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct WorkfileArgs {
    pub project: PathBuf,
    /// Folder path the workfile is published to
    #[arg(long)]
    pub folder: String,
    /// Task the artist works on
    #[arg(long)]
    pub task: Option<String>,
}

#[derive(Debug, Args)]
pub struct PackageArgs {
    pub project: PathBuf,
    /// Folder path the package is published to
    #[arg(long)]
    pub folder: String,
    #[arg(long)]
    pub task: Option<String>,
    #[arg(long, default_value = "Main")]
    pub variant: String,
    /// Make the intermediate media reviewable
    #[arg(long)]
    pub review: bool,
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    pub project: PathBuf,
    /// Only clips selected in the host
    #[arg(long)]
    pub selected: bool,
    /// Add tasks, comments and effects per instance
    #[arg(long)]
    pub details: bool,
    /// Write upgraded legacy tags back to the snapshot
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub project: PathBuf,
    /// Instance id
    #[arg(long)]
    pub id: String,
    /// Field change, `key=<json>`
    #[arg(long = "set", value_parser = parse_key_value, required = true)]
    pub changes: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    pub project: PathBuf,
    /// Instance ids to remove
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ExportOtioArgs {
    pub project: PathBuf,
    /// Output `.otio` file
    pub output: PathBuf,
    /// Do not turn tags into markers
    #[arg(long)]
    pub no_tags: bool,
    /// Write image sequences as single-file references
    #[arg(long)]
    pub no_image_sequences: bool,
    /// Timeline start as `HH:MM:SS:FF`, the sequence's own by default
    #[arg(long)]
    pub start_timecode: Option<String>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    pub project: PathBuf,
    /// Movie to render
    pub output: PathBuf,
    /// Render job file for the host
    #[arg(long)]
    pub job: PathBuf,
    /// Leave audio out of the movie
    #[arg(long)]
    pub no_audio: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "editmark",
            "--sequence",
            "edit_v002",
            "create",
            "show.json",
            "--hero-track",
            "main",
            "--token",
            "episode=ep02",
        ])
        .unwrap();
        assert_eq!(cli.sequence.as_deref(), Some("edit_v002"));
        match cli.command {
            Command::Create(args) => {
                assert_eq!(args.hero_track.as_deref(), Some("main"));
                assert_eq!(args.tokens, [("episode".to_string(), "ep02".to_string())]);
                assert!(!args.all);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_package() {
        let cli = Cli::try_parse_from([
            "editmark",
            "create-package",
            "show.json",
            "--folder",
            "/shots/sq01",
            "--review",
        ])
        .unwrap();
        match cli.command {
            Command::CreatePackage(args) => {
                assert_eq!(args.folder, "/shots/sq01");
                assert_eq!(args.variant, "Main");
                assert!(args.review);
                assert!(args.task.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("a=b=c").unwrap(), ("a".into(), "b=c".into()));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
