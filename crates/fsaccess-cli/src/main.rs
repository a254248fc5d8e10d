//! fsaccess command-line client.
//!
//! Drives the handle API against configured roots.
//!
//! Usage:
//!   # Serve one directory as root "local"
//!   fsaccess --root ./sandbox ls
//!   fsaccess --root ./sandbox mkdir notes/2024
//!   echo hello | fsaccess --root ./sandbox write notes/2024/today.txt
//!
//!   # Roots and permissions from a config file
//!   fsaccess --config fsaccess.toml cat scratch:draft.md
//!
//! Paths are `[ROOT:]a/b/c`. Without a root prefix the first configured root
//! is used.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fsaccess_core::{
    CreateWritableOptions, FileSystem, FileSystemConfig, FileSystemDirectoryHandle,
    FileSystemFileHandle, GetDirectoryOptions, GetFileOptions, HandleKind, RemoveOptions,
    WriteCommand,
};

/// Root id used for `--root`.
const LOCAL_ROOT: &str = "local";

/// Origin-scoped file system access from the command line.
#[derive(Parser, Debug)]
#[command(name = "fsaccess")]
#[command(about = "Browse and edit fsaccess roots")]
struct Args {
    /// TOML config describing roots and permissions
    #[arg(short, long, conflicts_with = "root")]
    config: Option<PathBuf>,

    /// Serve this directory as the root "local"
    #[arg(short, long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Print a file to stdout
    Cat { path: String },
    /// Write stdin to a file, creating it if needed
    Write {
        path: String,
        /// Keep existing contents and append
        #[arg(short, long)]
        append: bool,
    },
    /// Create a directory and any missing parents
    Mkdir { path: String },
    /// Create an empty file if it does not exist
    Touch { path: String },
    /// Remove a file or directory
    Rm {
        path: String,
        /// Remove directories with their contents
        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the path of DESCENDANT relative to ANCESTOR
    Resolve { ancestor: String, descendant: String },
    /// List configured roots
    Roots,
}

/// A parsed `[ROOT:]a/b/c` argument.
#[derive(Debug)]
struct Target {
    root: String,
    segments: Vec<String>,
}

impl Target {
    fn parse(arg: &str, default_root: &str) -> Self {
        let (root, path) = match arg.split_once(':') {
            Some((root, path)) if !root.is_empty() => (root.to_string(), path),
            _ => (default_root.to_string(), arg),
        };
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { root, segments }
    }

    /// Parent segments and final name; errors on a bare root.
    fn split_last(&self) -> Result<(&[String], &str)> {
        match self.segments.split_last() {
            Some((name, parents)) => Ok((parents, name.as_str())),
            None => bail!("{}: path names a root, not an entry", self.root),
        }
    }
}

async fn walk(
    fs: &FileSystem,
    root: &str,
    segments: &[String],
    create: bool,
) -> Result<FileSystemDirectoryHandle> {
    let mut dir = fs.root_directory(root);
    for segment in segments {
        dir = dir
            .get_directory_handle(segment, GetDirectoryOptions { create })
            .await
            .with_context(|| format!("opening directory {segment:?}"))?;
    }
    Ok(dir)
}

async fn file_at(fs: &FileSystem, target: &Target, create: bool) -> Result<FileSystemFileHandle> {
    let (parents, name) = target.split_last()?;
    let dir = walk(fs, &target.root, parents, false).await?;
    Ok(dir
        .get_file_handle(name, GetFileOptions { create })
        .await
        .with_context(|| format!("opening file {name:?}"))?)
}

async fn ls(fs: &FileSystem, target: &Target) -> Result<()> {
    let dir = walk(fs, &target.root, &target.segments, false).await?;
    let mut entries = dir.entries().collect().await?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut out = std::io::stdout().lock();
    for (name, handle) in entries {
        match handle.kind() {
            HandleKind::Directory => writeln!(out, "{name}/")?,
            HandleKind::File => writeln!(out, "{name}")?,
        }
    }
    Ok(())
}

async fn cat(fs: &FileSystem, target: &Target) -> Result<()> {
    let file = file_at(fs, target, false).await?.get_file().await?;
    let bytes = file.bytes().await?;
    std::io::stdout().lock().write_all(&bytes)?;
    Ok(())
}

async fn write(fs: &FileSystem, target: &Target, append: bool) -> Result<()> {
    let mut data = Vec::new();
    std::io::stdin()
        .read_to_end(&mut data)
        .context("reading stdin")?;

    let handle = file_at(fs, target, true).await?;
    let mut stream = handle
        .create_writable(CreateWritableOptions {
            keep_existing_data: append,
        })
        .await?;
    if append {
        let end = stream.len();
        stream.seek(end).await?;
    }
    let len = data.len();
    stream.write(WriteCommand::from(data)).await?;
    stream.close().await?;
    tracing::info!(root = %target.root, bytes = len, append, "wrote file");
    Ok(())
}

async fn rm(fs: &FileSystem, target: &Target, recursive: bool) -> Result<()> {
    let (parents, name) = target.split_last()?;
    let dir = walk(fs, &target.root, parents, false).await?;
    dir.remove_entry(name, RemoveOptions { recursive })
        .await
        .with_context(|| format!("removing {name:?}"))?;
    Ok(())
}

async fn resolve(fs: &FileSystem, ancestor: &Target, descendant: &Target) -> Result<()> {
    let ancestor = walk(fs, &ancestor.root, &ancestor.segments, false).await?;
    let (parents, name) = descendant.split_last()?;
    let parent = walk(fs, &descendant.root, parents, false).await?;
    let child = match parent.get_file_handle(name, GetFileOptions::default()).await {
        Ok(file) => file.as_handle().clone(),
        Err(_) => parent
            .get_directory_handle(name, GetDirectoryOptions::default())
            .await
            .with_context(|| format!("opening {name:?}"))?
            .as_handle()
            .clone(),
    };
    match ancestor.resolve(&child).await? {
        Some(path) => println!("{}", path.join("/")),
        None => bail!("not a descendant"),
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<FileSystemConfig> {
    match (&args.config, &args.root) {
        (Some(path), _) => FileSystemConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        (None, Some(dir)) => {
            let config = FileSystemConfig::single_local(LOCAL_ROOT, dir);
            config.validate()?;
            Ok(config)
        }
        (None, None) => Err(anyhow!("one of --config or --root is required")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let default_root = config
        .roots
        .first()
        .map(|r| r.id.clone())
        .ok_or_else(|| anyhow!("no roots configured"))?;
    let fs = config.build()?;
    tracing::debug!(?fs, "file system ready");

    let target = |arg: &str| Target::parse(arg, &default_root);
    match &args.command {
        Command::Ls { path } => ls(&fs, &target(path)).await,
        Command::Cat { path } => cat(&fs, &target(path)).await,
        Command::Write { path, append } => write(&fs, &target(path), *append).await,
        Command::Mkdir { path } => {
            let t = target(path);
            walk(&fs, &t.root, &t.segments, true).await.map(|_| ())
        }
        Command::Touch { path } => file_at(&fs, &target(path), true).await.map(|_| ()),
        Command::Rm { path, recursive } => rm(&fs, &target(path), *recursive).await,
        Command::Resolve {
            ancestor,
            descendant,
        } => resolve(&fs, &target(ancestor), &target(descendant)).await,
        Command::Roots => {
            for root in &config.roots {
                let mut flags = Vec::new();
                if root.bucket {
                    flags.push("bucket");
                }
                if root.read_only {
                    flags.push("read-only");
                }
                match &root.path {
                    Some(path) => println!("{}\t{}\t{}\t{}", root.id, root.backend, path.display(), flags.join(",")),
                    None => println!("{}\t{}\t-\t{}", root.id, root.backend, flags.join(",")),
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_default_root() {
        let t = Target::parse("a/b//c/", "local");
        assert_eq!(t.root, "local");
        assert_eq!(t.segments, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_target_explicit_root() {
        let t = Target::parse("scratch:notes/x.md", "local");
        assert_eq!(t.root, "scratch");
        assert_eq!(t.segments, vec!["notes", "x.md"]);
        assert_eq!(t.split_last().unwrap().1, "x.md");
    }

    #[test]
    fn test_target_bare_root() {
        let t = Target::parse("scratch:", "local");
        assert!(t.segments.is_empty());
        assert!(t.split_last().is_err());
    }

    #[tokio::test]
    async fn test_mkdir_touch_ls_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = FileSystemConfig::single_local(LOCAL_ROOT, dir.path());
        let fs = config.build().unwrap();

        let nested = Target::parse("a/b", LOCAL_ROOT);
        walk(&fs, &nested.root, &nested.segments, true).await.unwrap();
        file_at(&fs, &Target::parse("a/b/f.txt", LOCAL_ROOT), true)
            .await
            .unwrap();

        assert!(dir.path().join("a/b/f.txt").is_file());
        rm(&fs, &Target::parse("a", LOCAL_ROOT), true).await.unwrap();
        assert!(!dir.path().join("a").exists());
    }
}
