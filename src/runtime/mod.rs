//! Container runtime gateway -- docker invoked as an opaque subprocess.

pub mod docker;
pub mod live;

pub use docker::DockerCli;

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("image build failed with exit code {code}")]
    BuildFailed { code: i32 },

    #[error("no image digest found in build output")]
    DigestMissing,

    #[error("launch of container '{name}' failed with exit code {code}")]
    LaunchFailed { name: String, code: i32 },

    #[error("'{command}' failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}

/// Everything needed to start one detached container.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Explicit container name; doubles as the run name.
    pub name: String,
    pub image: String,
    pub volume: String,
    /// Mount point for `volume` inside the container.
    pub mount_path: String,
    /// Label used to scope later "active" lookups, if any.
    pub label: Option<String>,
    /// Extra docker-run arguments supplied by the user.
    pub run_args: Vec<String>,
    /// Templated config, passed as trailing arguments.
    pub config_args: Vec<String>,
}

/// The seam between the pipelines and the container runtime. The production
/// implementation shells out to the docker CLI; tests substitute a fake.
pub trait ContainerRuntime {
    /// Build an image and return its content digest. Non-zero exit or an
    /// unparseable digest is fatal.
    fn build(&self, dockerfile: &Path, context: &Path, tag: &str) -> Result<String, RuntimeError>;

    /// Start one detached container, returning the id the runtime reports.
    fn launch(&self, spec: &LaunchSpec) -> Result<String, RuntimeError>;

    /// Stop containers. Callers on teardown paths treat failure as
    /// best-effort.
    fn kill(&self, ids: &[String]) -> Result<(), RuntimeError>;

    /// Remove named volumes. Best-effort on teardown paths.
    fn remove_volumes(&self, names: &[String]) -> Result<(), RuntimeError>;

    /// Ids of currently running containers, optionally filtered by label.
    fn running_ids(&self, label: Option<&str>) -> Result<Vec<String>, RuntimeError>;

    /// Names of volumes the runtime currently knows about.
    fn volume_names(&self) -> Result<HashSet<String>, RuntimeError>;

    /// Stream a container's logs to the terminal.
    fn logs(&self, id: &str, follow: bool) -> Result<(), RuntimeError>;
}
