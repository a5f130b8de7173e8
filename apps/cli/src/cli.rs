use clap::Parser;
use std::path::PathBuf;

/// Export Obsidian flashcards to Anki import files, or sync them
/// straight into Anki through AnkiConnect.
#[derive(Parser, Debug)]
#[command(name = "mdanki")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Markdown note, or a folder of notes
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Sync through AnkiConnect instead of writing import files
    #[arg(long)]
    pub sync: bool,

    /// Report what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Include notes in subfolders
    #[arg(short, long)]
    pub recursive: bool,

    /// Delete orphaned Anki notes instead of tagging them
    #[arg(long, requires = "sync")]
    pub delete_orphans: bool,

    /// Anki collection.media folder (saved for later runs)
    #[arg(long, value_name = "DIR")]
    pub anki_media: Option<PathBuf>,

    /// AnkiConnect endpoint (saved for later runs)
    #[arg(long, value_name = "URL")]
    pub ankiconnect_url: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
