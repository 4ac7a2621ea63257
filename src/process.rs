//! Process gateway -- run external commands, capturing or streaming stdout.

use anyhow::{Context, Result};
use std::process::{Command, ExitStatus, Stdio};

/// Outcome of a captured command: exit status plus whatever it printed.
///
/// A non-zero status is not an error at this layer -- callers decide.
/// Image builds treat non-zero as fatal; `git status` keys off stdout
/// non-emptiness instead.
#[derive(Debug)]
pub struct Exec {
    pub status: ExitStatus,
    pub stdout: String,
}

impl Exec {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 when the process was killed by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Run a command with stdout captured and stderr passed through to the
/// terminal. Failing to spawn at all (binary missing) is an error.
pub fn run_capture<S: AsRef<std::ffi::OsStr>>(program: &str, args: &[S]) -> Result<Exec> {
    tracing::debug!(%program, "spawning (captured)");
    let out = Command::new(program)
        .args(args)
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("failed to launch '{}' (is it installed?)", program))?;

    Ok(Exec {
        status: out.status,
        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
    })
}

/// Run a command with all stdio inherited, for live output such as image
/// builds or `logs -f`. Blocks until the child exits.
pub fn run_streamed<S: AsRef<std::ffi::OsStr>>(program: &str, args: &[S]) -> Result<ExitStatus> {
    tracing::debug!(%program, "spawning (streamed)");
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to launch '{}' (is it installed?)", program))?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_reads_stdout() {
        let exec = run_capture("echo", &["hello"]).unwrap();
        assert!(exec.success());
        assert_eq!(exec.stdout.trim(), "hello");
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let exec = run_capture("false", &[] as &[&str]).unwrap();
        assert!(!exec.success());
        assert_ne!(exec.code(), 0);
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let err = run_capture("definitely-not-a-real-binary-xyz", &[] as &[&str]).unwrap_err();
        assert!(err.to_string().contains("is it installed?"));
    }
}
