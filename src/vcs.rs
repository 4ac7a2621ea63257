//! VCS gateway -- commit hash, commit message, dirty-tree check via git.

use crate::process;
use anyhow::{bail, Result};

pub trait Vcs {
    /// Hash of the commit currently checked out.
    fn head_commit(&self) -> Result<String>;

    /// Subject + body of the latest commit, used as the default run
    /// description.
    fn last_message(&self) -> Result<String>;

    /// Whether the working tree has uncommitted changes. The signal is
    /// `git status --porcelain` printing anything, not its exit code.
    fn is_dirty(&self) -> Result<bool>;
}

pub struct GitCli;

impl Vcs for GitCli {
    fn head_commit(&self) -> Result<String> {
        let exec = process::run_capture("git", &["rev-parse", "HEAD"])?;
        if !exec.success() {
            bail!("git rev-parse HEAD failed (exit {})", exec.code());
        }
        Ok(exec.stdout.trim().to_string())
    }

    fn last_message(&self) -> Result<String> {
        let exec = process::run_capture("git", &["log", "-1", "--pretty=%B"])?;
        if !exec.success() {
            bail!("git log failed (exit {})", exec.code());
        }
        Ok(exec.stdout.trim().to_string())
    }

    fn is_dirty(&self) -> Result<bool> {
        let exec = process::run_capture("git", &["status", "--porcelain"])?;
        if !exec.success() {
            bail!("git status failed (exit {})", exec.code());
        }
        Ok(!exec.stdout.trim().is_empty())
    }
}
