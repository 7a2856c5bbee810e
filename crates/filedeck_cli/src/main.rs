//! `filedeck` command line: a thin front-end over `filedeck_io_fs` that
//! stands in for the desktop bridge. Progress is written to stdout as one
//! JSON event per line.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filedeck_io_fs::{
    BatchCopier, C_EVENT_COPY_PROGRESS, CopyProgress, N_PACING_DELAY_MS_UI, SpecCopyOptions,
    home_dir, list_directory,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "filedeck", version, about = "List directories and copy files with progress")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one level of a directory as JSON.
    List {
        /// Directory (or file) to list; defaults to the home directory.
        path: Option<PathBuf>,
    },
    /// Print the home directory.
    Home,
    /// Copy files and directories into a destination directory.
    Copy {
        /// Destination directory; must already exist.
        #[arg(short, long)]
        dest: PathBuf,
        /// Dereference symlinks found inside copied directories.
        #[arg(long)]
        follow_symlinks: bool,
        /// Delay after each copied item, in milliseconds.
        #[arg(long, default_value_t = N_PACING_DELAY_MS_UI)]
        pacing_ms: u64,
        /// Items of at least this many bytes skip the pacing delay.
        #[arg(long)]
        pacing_skip_bytes: Option<u64>,
        /// Files and directories to copy, in order.
        #[arg(required = true)]
        items: Vec<PathBuf>,
    },
}

#[derive(Serialize)]
struct EventLine<'a> {
    event: &'a str,
    payload: &'a CopyProgress,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::List { path } => {
            let path = match path {
                Some(v) => v,
                None => home_dir().context("Failed to resolve home directory")?,
            };
            let node_root = list_directory(&path)
                .with_context(|| format!("Failed to list {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&node_root)?);
        }
        Command::Home => {
            let path = home_dir().context("Failed to resolve home directory")?;
            println!("{}", path.display());
        }
        Command::Copy {
            dest,
            follow_symlinks,
            pacing_ms,
            pacing_skip_bytes,
            items,
        } => {
            let spec_cp_options = SpecCopyOptions {
                follow_symlinks,
                pacing_delay_ms: pacing_ms,
                pacing_skip_bytes,
            };
            let sink = |progress: &CopyProgress| {
                let line = EventLine {
                    event: C_EVENT_COPY_PROGRESS,
                    payload: progress,
                };
                if let Ok(txt) = serde_json::to_string(&line) {
                    let mut stdout = std::io::stdout().lock();
                    let _ = writeln!(stdout, "{txt}");
                    let _ = stdout.flush();
                }
            };
            let report = BatchCopier::new(&sink)
                .with_pacer(spec_cp_options.build_pacer())
                .with_options(spec_cp_options)
                .copy_batch(&items, &dest)
                .with_context(|| format!("Failed to copy into {}", dest.display()))?;
            tracing::info!("{report}");
        }
    }
    Ok(())
}
