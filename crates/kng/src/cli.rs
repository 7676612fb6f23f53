//! Command-line interface.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kng_core::dedup::COMPLETED_FILE_NAME;
use kng_core::{CompletedNotebooks, Config, denormalize};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "kng", version)]
#[command(about = "Grab Kindle notes from your mailbox")]
pub struct Cli {
    /// Configuration file, defaults to ~/kng-config.yaml
    #[arg(long, global = true, env = "KNG_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Harvest new notebooks from the mailbox
    Run {
        /// Mail service preset (gmail, outlook, yahoo, icloud, fastmail)
        #[arg(short, long)]
        service: Option<String>,
    },

    /// List notebooks that have already been harvested
    List,

    /// Create the data directory and completed-notebooks file
    Setup,
}

impl Cli {
    /// Runs the selected command, printing user-facing output to `out`.
    pub async fn execute(self, out: &mut impl Write) -> Result<()> {
        let mut config = Config::load(self.config.as_deref()).context("loading configuration")?;

        match self.command {
            Command::Run { service } => {
                if let Some(service) = service {
                    config.service = service;
                }
                let summary = kng_core::run(&config).await?;
                info!(
                    written = summary.written,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "done"
                );
                Ok(())
            }
            Command::List => list(&config, out),
            Command::Setup => setup(&config.data_dir()?, out),
        }
    }
}

fn list(config: &Config, out: &mut impl Write) -> Result<()> {
    let completed = CompletedNotebooks::load(config.completed_path()?)?;
    writeln!(out, "Completed books are:")?;
    for (n, key) in completed.iter().enumerate() {
        writeln!(out, " {}: {}", n + 1, denormalize(key.as_str()))?;
    }
    Ok(())
}

fn setup(dir: &Path, out: &mut impl Write) -> Result<()> {
    let file = dir.join(COMPLETED_FILE_NAME);
    let dir_existed = dir.is_dir();
    let file_existed = file.is_file();

    if dir_existed {
        writeln!(out, "{} directory exists", dir.display())?;
    } else {
        writeln!(out, "Creating '{}'", dir.display())?;
    }
    if file_existed {
        writeln!(out, "{} file exists", file.display())?;
    } else {
        writeln!(out, "Creating '{COMPLETED_FILE_NAME}' in '{}'", dir.display())?;
    }

    CompletedNotebooks::initialize(dir)
        .with_context(|| format!("setting up {}", dir.display()))?;

    if dir_existed && file_existed {
        writeln!(out, "No required actions")?;
    } else {
        writeln!(out, "Setup complete, you can now run `kng run`")?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    fn config(dir: &Path) -> Config {
        Config {
            data_dir: Some(dir.to_path_buf()),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_run_service() {
        let cli = Cli::try_parse_from(["kng", "run", "-s", "outlook"]).unwrap();
        assert!(matches!(cli.command, Command::Run { service: Some(s) } if s == "outlook"));

        let cli = Cli::try_parse_from(["kng", "list", "--config", "/tmp/c.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn test_setup_then_again() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("kindle-notes");

        let mut out = Vec::new();
        setup(&dir, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Creating 'completed-notebooks.yaml'"));
        assert!(text.ends_with("Setup complete, you can now run `kng run`\n"));
        assert_eq!(fs::read_to_string(dir.join(COMPLETED_FILE_NAME)).unwrap(), "");

        let mut out = Vec::new();
        setup(&dir, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("directory exists"));
        assert!(text.ends_with("No required actions\n"));
    }

    #[test]
    fn test_list_denormalizes() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join(COMPLETED_FILE_NAME),
            "some-book: true\nother-book-notebook: true\n",
        )
        .unwrap();

        let mut out = Vec::new();
        list(&config(root.path()), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Completed books are:\n 1: other book\n 2: some book\n"
        );
    }

    #[test]
    fn test_list_without_setup() {
        let root = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = list(&config(&root.path().join("missing")), &mut out).unwrap_err();
        assert!(err.to_string().contains("kng setup"));
    }
}
