//! Docker CLI wrapper -- build, run, kill, volume and ps plumbing.

use super::{ContainerRuntime, LaunchSpec, RuntimeError};
use crate::process;
use std::collections::HashSet;
use std::path::Path;

/// Production runtime gateway: shells out to the `docker` binary.
pub struct DockerCli {
    bin: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            bin: "docker".to_string(),
        }
    }
}

impl DockerCli {
    pub fn with_binary(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

/// Pull the image digest out of `docker build -q` output. The digest is the
/// last non-empty stdout line and carries a `sha256:` prefix.
fn parse_digest(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.contains("sha256:"))
        .map(|line| line.to_string())
}

impl ContainerRuntime for DockerCli {
    fn build(&self, dockerfile: &Path, context: &Path, tag: &str) -> Result<String, RuntimeError> {
        let args = [
            "build".to_string(),
            "-q".to_string(),
            "-t".to_string(),
            tag.to_string(),
            "-f".to_string(),
            dockerfile.display().to_string(),
            context.display().to_string(),
        ];
        let exec = process::run_capture(&self.bin, &args)?;
        if !exec.success() {
            return Err(RuntimeError::BuildFailed { code: exec.code() });
        }
        parse_digest(&exec.stdout).ok_or(RuntimeError::DigestMissing)
    }

    fn launch(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "-v".to_string(),
            format!("{}:{}", spec.volume, spec.mount_path),
        ];
        if let Some(label) = &spec.label {
            args.push("--label".to_string());
            args.push(label.clone());
        }
        args.extend(spec.run_args.iter().cloned());
        args.push(spec.image.clone());
        args.extend(spec.config_args.iter().cloned());

        let exec = process::run_capture(&self.bin, &args)?;
        if !exec.success() {
            return Err(RuntimeError::LaunchFailed {
                name: spec.name.clone(),
                code: exec.code(),
            });
        }
        Ok(exec.stdout.trim().to_string())
    }

    fn kill(&self, ids: &[String]) -> Result<(), RuntimeError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut args = vec!["kill".to_string()];
        args.extend(ids.iter().cloned());
        let exec = process::run_capture(&self.bin, &args)?;
        if !exec.success() {
            return Err(RuntimeError::CommandFailed {
                command: "docker kill".to_string(),
                code: exec.code(),
            });
        }
        Ok(())
    }

    fn remove_volumes(&self, names: &[String]) -> Result<(), RuntimeError> {
        if names.is_empty() {
            return Ok(());
        }
        let mut args = vec!["volume".to_string(), "rm".to_string()];
        args.extend(names.iter().cloned());
        let exec = process::run_capture(&self.bin, &args)?;
        if !exec.success() {
            return Err(RuntimeError::CommandFailed {
                command: "docker volume rm".to_string(),
                code: exec.code(),
            });
        }
        Ok(())
    }

    fn running_ids(&self, label: Option<&str>) -> Result<Vec<String>, RuntimeError> {
        let mut args = vec![
            "ps".to_string(),
            "--no-trunc".to_string(),
            "-q".to_string(),
        ];
        if let Some(label) = label {
            args.push("--filter".to_string());
            args.push(format!("label={}", label));
        }
        let exec = process::run_capture(&self.bin, &args)?;
        if !exec.success() {
            return Err(RuntimeError::CommandFailed {
                command: "docker ps".to_string(),
                code: exec.code(),
            });
        }
        Ok(exec
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn volume_names(&self) -> Result<HashSet<String>, RuntimeError> {
        let exec = process::run_capture(&self.bin, &["volume", "ls", "-q"])?;
        if !exec.success() {
            return Err(RuntimeError::CommandFailed {
                command: "docker volume ls".to_string(),
                code: exec.code(),
            });
        }
        Ok(exec
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn logs(&self, id: &str, follow: bool) -> Result<(), RuntimeError> {
        let mut args = vec!["logs".to_string()];
        if follow {
            args.push("-f".to_string());
        }
        args.push(id.to_string());
        let status = process::run_streamed(&self.bin, &args)?;
        if !status.success() {
            return Err(RuntimeError::CommandFailed {
                command: "docker logs".to_string(),
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}
