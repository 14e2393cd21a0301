//! The `new` command from start to finish.
//!
//! Stages run strictly one after another and the first failure aborts the
//! rest. The only shared state is the target directory and the temporary
//! archive in the working directory; two runs against the same target at
//! the same time will race and the result is undefined.

use crate::download::{download_archive, http_client, resolve_url, TempArchive};
use crate::error::{InstallerError, Result};
use crate::extract::extract_archive;
use crate::install::{InstallPlan, Installer};
use crate::merge::merge_up;
use crate::types::InstallOptions;
use console::style;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub const READY_MESSAGE: &str = "Application ready! Build something amazing.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    VerifyTargetAbsent,
    ResolveVersion,
    Fetch,
    Extract,
    Merge,
    Cleanup,
    Install,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::VerifyTargetAbsent => "verify-target-absent",
            Stage::ResolveVersion => "resolve-version",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Merge => "merge",
            Stage::Cleanup => "cleanup",
            Stage::Install => "install",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

fn enter(stage: Stage) {
    tracing::debug!("Stage: {}", stage);
}

pub struct Pipeline {
    options: InstallOptions,
    plan: InstallPlan,
}

impl Pipeline {
    pub fn new(options: InstallOptions, plan: InstallPlan) -> Self {
        Self { options, plan }
    }

    /// Scaffold the application, writing progress and installer output to
    /// `out`.
    pub async fn run(&self, out: &mut dyn Write) -> Result<()> {
        let options = &self.options;

        enter(Stage::VerifyTargetAbsent);
        verify_target_absent(&options.target_dir, &options.working_dir)?;

        say(out, style("Crafting application...").green())?;

        let client = http_client(&options.settings)?;

        enter(Stage::ResolveVersion);
        let url = resolve_url(&client, options.channel, &options.settings).await?;
        tracing::info!("Using the {} release from {}", options.channel, url);

        enter(Stage::Fetch);
        let archive = download_archive(&client, &url, &options.working_dir).await?;

        let unpacked = self.unpack(&archive);

        enter(Stage::Cleanup);
        archive.cleanup();
        unpacked?;

        enter(Stage::Install);
        Installer::new(options.allow_tty)
            .run(&self.plan, &options.target_dir, out)
            .await?;

        enter(Stage::Done);
        say(out, style(READY_MESSAGE).yellow())?;
        Ok(())
    }

    fn unpack(&self, archive: &TempArchive) -> Result<()> {
        enter(Stage::Extract);
        let tree = extract_archive(
            archive.path(),
            &self.options.target_dir,
            &self.options.settings.wrapper_dir,
        )?;

        enter(Stage::Merge);
        merge_up(&tree.root, &tree.wrapper)
    }
}

fn say(out: &mut dyn Write, message: impl fmt::Display) -> Result<()> {
    writeln!(out, "{}", message).map_err(InstallerError::Output)
}

/// Refuse to scaffold over an existing file or non-empty directory.
///
/// The working directory itself is always accepted so an application can
/// be created in place.
pub fn verify_target_absent(target: &Path, working_dir: &Path) -> Result<()> {
    if is_same_dir(target, working_dir) {
        return Ok(());
    }

    let metadata = match fs::metadata(target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(InstallerError::io(target, e)),
    };

    if metadata.is_dir() {
        let mut entries = fs::read_dir(target).map_err(|e| InstallerError::io(target, e))?;
        if entries.next().is_none() {
            tracing::debug!("{} exists but is empty", target.display());
            return Ok(());
        }
    }

    Err(InstallerError::AlreadyExists(target.to_path_buf()))
}

fn is_same_dir(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
