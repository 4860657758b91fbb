//! Source-tree providers
//!
//! The indexer reads the component library from a directory on disk. A
//! provider makes sure that directory exists before a build: the local
//! provider only checks for it, the git provider clones or updates it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::SourceConfig;

/// Where the library source tree comes from
#[async_trait]
pub trait SourceTree: Send + Sync {
    /// Make the tree available, fetching or updating it if needed.
    ///
    /// Returns `false` when the tree cannot be made available.
    async fn ensure_available(&self, cancel: &CancellationToken) -> Result<bool>;

    /// Root directory of the tree
    fn root_path(&self) -> &Path;

    /// Whether the tree is usable right now
    fn is_available(&self) -> bool;
}

/// A source tree that already exists on disk
#[derive(Debug, Clone)]
pub struct LocalSourceTree {
    root: PathBuf,
}

impl LocalSourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SourceTree for LocalSourceTree {
    async fn ensure_available(&self, _cancel: &CancellationToken) -> Result<bool> {
        Ok(self.is_available())
    }

    fn root_path(&self) -> &Path {
        &self.root
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }
}

/// A source tree cloned from (and kept in sync with) a git remote
#[derive(Debug)]
pub struct GitSourceTree {
    root: PathBuf,
    url: String,
    branch: Option<String>,
    synced: AtomicBool,
}

impl GitSourceTree {
    pub fn new(root: impl Into<PathBuf>, url: impl Into<String>, branch: Option<String>) -> Self {
        Self {
            root: root.into(),
            url: url.into(),
            branch,
            synced: AtomicBool::new(false),
        }
    }

    fn clone_args(&self) -> Vec<String> {
        let mut args = vec!["clone".to_string(), "--depth".to_string(), "1".to_string()];
        if let Some(branch) = &self.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        args.push(self.url.clone());
        args.push(self.root.to_string_lossy().to_string());
        args
    }

    /// Run git, killing it and waiting for it to exit if `cancel` fires first.
    /// Nothing is spawned when `cancel` has already fired.
    async fn run_git(&self, args: &[String], cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            anyhow::bail!("git {} cancelled", args[0]);
        }

        log::debug!("Running git {}", args.join(" "));
        let mut child = Command::new("git")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to execute git")?;

        let mut stderr_pipe = child.stderr.take();
        let read_stderr = async {
            let mut text = String::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut text).await;
            }
            text
        };

        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            done = async { tokio::join!(child.wait(), read_stderr) } => Some(done),
        };

        let Some((status, stderr)) = finished else {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to stop git {}: {}", args[0], e);
            }
            anyhow::bail!("git {} cancelled", args[0]);
        };

        let status = status.context("Failed to wait for git")?;
        if !status.success() {
            anyhow::bail!("git {} failed: {}", args[0], stderr.trim());
        }
        Ok(())
    }

    /// Remove whatever a failed or cancelled clone left behind, so the next
    /// attempt clones again instead of treating it as a stale checkout
    async fn discard_partial_clone(&self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => log::debug!("Removed partial clone at {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove partial clone at {}: {}", self.root.display(), e),
        }
    }
}

#[async_trait]
impl SourceTree for GitSourceTree {
    async fn ensure_available(&self, cancel: &CancellationToken) -> Result<bool> {
        if self.synced.load(Ordering::Acquire) && self.is_available() {
            return Ok(true);
        }

        if self.root.join(".git").exists() {
            let args = vec![
                "-C".to_string(),
                self.root.to_string_lossy().to_string(),
                "pull".to_string(),
                "--ff-only".to_string(),
            ];
            // A stale checkout is still usable
            if let Err(e) = self.run_git(&args, cancel).await {
                if cancel.is_cancelled() {
                    return Err(e);
                }
                log::warn!("Could not update {}: {:#}", self.root.display(), e);
            }
        } else {
            if self.root.exists() {
                log::warn!(
                    "{} exists but is not a git checkout, using it as is",
                    self.root.display()
                );
                return Ok(self.is_available());
            }
            if let Some(parent) = self.root.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            log::info!("Cloning {} into {}", self.url, self.root.display());
            if let Err(e) = self.run_git(&self.clone_args(), cancel).await {
                self.discard_partial_clone().await;
                return Err(e);
            }
        }

        self.synced.store(true, Ordering::Release);
        Ok(self.is_available())
    }

    fn root_path(&self) -> &Path {
        &self.root
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }
}

/// Pick the provider for a source config
pub fn from_config(config: &SourceConfig) -> Box<dyn SourceTree> {
    match &config.repository_url {
        Some(url) => Box::new(GitSourceTree::new(&config.root, url, config.branch.clone())),
        None => Box::new(LocalSourceTree::new(&config.root)),
    }
}
