//! `mdanki` command-line runner.
//!
//! Export mode writes tab-separated import files next to each note; sync
//! mode pushes cards into Anki through AnkiConnect.

pub mod ankiconnect;
pub mod cli;
pub mod config;

use anyhow::{bail, Context};
use clap::Parser;
use mdanki_core::{discover_md_files, export_note, parse_note, ExportReport, SyncEngine, SyncOptions, SyncResult};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use ankiconnect::AnkiConnectClient;
pub use cli::Cli;
pub use config::{Config, ConfigError, ConfigStore};

/// Outcome for one note file.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileReport {
    Synced(SyncResult),
    Exported {
        file_path: PathBuf,
        report: ExportReport,
    },
    Failed {
        file_path: PathBuf,
        error: String,
    },
}

/// Counts across every processed file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub files: usize,
    pub failed: usize,
    pub exported: usize,
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted_from_source: usize,
    pub deleted_from_remote: usize,
    pub errors: usize,
}

impl Totals {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut totals = Self {
            files: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match report {
                FileReport::Synced(result) => {
                    totals.new += result.new_count;
                    totals.updated += result.updated_count;
                    totals.unchanged += result.unchanged_count;
                    totals.deleted_from_source += result.deleted_from_source;
                    totals.deleted_from_remote += result.deleted_from_remote;
                    totals.errors += result.errors.len();
                }
                FileReport::Exported { report, .. } => {
                    totals.exported += report.basic_count + report.cloze_count;
                }
                FileReport::Failed { .. } => totals.failed += 1,
            }
        }
        totals
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    mode: &'static str,
    dry_run: bool,
    files: &'a [FileReport],
    totals: &'a Totals,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = ConfigStore::locate()?;
    let totals = execute(&cli, &store, &mut io::stdout().lock())?;

    if totals.failed > 0 {
        bail!("{} of {} file(s) failed", totals.failed, totals.files);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Run one invocation, writing the summary to `out`.
pub fn execute<W: Write>(cli: &Cli, store: &ConfigStore, out: &mut W) -> anyhow::Result<Totals> {
    let files = collect_targets(&cli.path, cli.recursive)?;

    let reports = if files.is_empty() {
        Vec::new()
    } else if cli.sync {
        sync_files(cli, store, &files)?
    } else {
        export_files(cli, store, &files)?
    };
    let totals = Totals::from_reports(&reports);

    if cli.json {
        let output = JsonOutput {
            mode: if cli.sync { "sync" } else { "export" },
            dry_run: cli.dry_run,
            files: &reports,
            totals: &totals,
        };
        serde_json::to_writer_pretty(&mut *out, &output)?;
        writeln!(out)?;
    } else {
        print_summary(out, &reports, &totals, cli)?;
    }

    Ok(totals)
}

fn collect_targets(path: &Path, recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        let files = discover_md_files(path, recursive)?;
        tracing::info!("found {} markdown file(s) in {}", files.len(), path.display());
        return Ok(files);
    }
    bail!("path not found: {}", path.display())
}

fn failed(file: &Path, error: impl std::fmt::Display) -> FileReport {
    tracing::warn!("{}: {}", file.display(), error);
    FileReport::Failed {
        file_path: file.to_path_buf(),
        error: error.to_string(),
    }
}

fn export_files(cli: &Cli, store: &ConfigStore, files: &[PathBuf]) -> anyhow::Result<Vec<FileReport>> {
    let media_path = store.require_media_path(cli.anki_media.as_deref())?;

    let reports = files
        .iter()
        .map(|file| {
            let exported = parse_note(file)
                .and_then(|note| export_note(&note, &media_path, cli.dry_run).map(|report| (note, report)));
            match exported {
                Ok((note, report)) => FileReport::Exported {
                    file_path: note.file_path,
                    report,
                },
                Err(e) => failed(file, e),
            }
        })
        .collect();
    Ok(reports)
}

fn sync_files(cli: &Cli, store: &ConfigStore, files: &[PathBuf]) -> anyhow::Result<Vec<FileReport>> {
    let url = store.ankiconnect_url(cli.ankiconnect_url.as_deref())?;
    let client = AnkiConnectClient::new(&url)?;
    let version = client.version().with_context(|| {
        format!(
            "cannot reach AnkiConnect at {}; is Anki running with AnkiConnect installed?",
            url
        )
    })?;
    tracing::info!("connected to AnkiConnect v{} at {}", version, url);

    let options = SyncOptions {
        preview: cli.dry_run,
        delete_orphans: cli.delete_orphans,
        fallback_media_path: store.media_path(cli.anki_media.as_deref())?,
    };
    let engine = SyncEngine::new(&client, options);

    let reports = files
        .iter()
        .map(|file| match parse_note(file).and_then(|note| engine.sync_note(&note)) {
            Ok(result) => FileReport::Synced(result),
            Err(e) => failed(file, e),
        })
        .collect();
    Ok(reports)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary<W: Write>(out: &mut W, reports: &[FileReport], totals: &Totals, cli: &Cli) -> io::Result<()> {
    if reports.is_empty() {
        writeln!(out, "No markdown files found in {}", cli.path.display())?;
        return Ok(());
    }
    if cli.dry_run {
        writeln!(out, "[dry run] nothing was changed")?;
    }

    for report in reports {
        match report {
            FileReport::Synced(result) => {
                writeln!(out, "{}", display_name(&result.file_path))?;
                writeln!(
                    out,
                    "  new: {}  updated: {}  unchanged: {}  deleted from source: {}  deleted from remote: {}  errors: {}",
                    result.new_count,
                    result.updated_count,
                    result.unchanged_count,
                    result.deleted_from_source,
                    result.deleted_from_remote,
                    result.errors.len(),
                )?;
                for error in &result.errors {
                    writeln!(out, "  error: {}", error)?;
                }
                if let Some(images) = &result.images {
                    if !images.missing.is_empty() {
                        writeln!(out, "  missing images: {}", images.missing.join(", "))?;
                    }
                }
            }
            FileReport::Exported { file_path, report } => {
                writeln!(out, "{}", display_name(file_path))?;
                writeln!(
                    out,
                    "  basic: {}  cloze: {}  images copied: {}",
                    report.basic_count,
                    report.cloze_count,
                    report.images.copied.len() + report.images.previewed.len(),
                )?;
                for file in &report.files {
                    writeln!(out, "  wrote {}", display_name(file))?;
                }
                if !report.images.missing.is_empty() {
                    writeln!(out, "  missing images: {}", report.images.missing.join(", "))?;
                }
            }
            FileReport::Failed { file_path, error } => {
                writeln!(out, "{}", display_name(file_path))?;
                writeln!(out, "  failed: {}", error)?;
            }
        }
    }

    if !cli.sync && totals.exported > 0 && !cli.dry_run {
        writeln!(
            out,
            "Import each file with Anki > File > Import, choosing the Basic or Cloze note type; map the last column to Tags when present."
        )?;
    }

    if reports.len() > 1 {
        writeln!(out, "---")?;
        if cli.sync {
            writeln!(
                out,
                "{} file(s), {} failed: new {}, updated {}, unchanged {}, deleted from source {}, deleted from remote {}, errors {}",
                totals.files,
                totals.failed,
                totals.new,
                totals.updated,
                totals.unchanged,
                totals.deleted_from_source,
                totals.deleted_from_remote,
                totals.errors,
            )?;
        } else {
            writeln!(
                out,
                "{} file(s), {} failed: {} card(s) exported",
                totals.files, totals.failed, totals.exported
            )?;
        }
    }
    Ok(())
}
