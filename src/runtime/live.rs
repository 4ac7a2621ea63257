//! Live container resolver -- match registry rows against running containers.

use super::{ContainerRuntime, RuntimeError};
use std::collections::HashSet;

/// A snapshot of the runtime's currently running container ids. Never
/// cached across operations; each pipeline step that needs liveness takes a
/// fresh snapshot.
#[derive(Debug, Clone)]
pub struct LiveState {
    ids: Vec<String>,
}

impl LiveState {
    pub fn snapshot(
        runtime: &dyn ContainerRuntime,
        label: Option<&str>,
    ) -> Result<Self, RuntimeError> {
        Ok(Self {
            ids: runtime.running_ids(label)?,
        })
    }

    #[cfg(test)]
    pub fn from_ids(ids: Vec<String>) -> Self {
        Self { ids }
    }

    /// A registry row is active iff its stored container id prefix-matches a
    /// running id. Prefix matching goes both ways: the registry may hold a
    /// short id while the runtime reports a long one, or vice versa.
    pub fn is_live(&self, container_id: &str) -> bool {
        if container_id.is_empty() {
            return false;
        }
        self.ids
            .iter()
            .any(|live| live.starts_with(container_id) || container_id.starts_with(live.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Candidate volume names that the runtime actually knows about. Removing a
/// non-existent volume is not an error, but skipping it keeps the removal
/// prompt accurate.
pub fn existing_volumes(
    runtime: &dyn ContainerRuntime,
    candidates: &[String],
) -> Result<Vec<String>, RuntimeError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let present: HashSet<String> = runtime.volume_names()?;
    Ok(candidates
        .iter()
        .filter(|c| present.contains(*c))
        .cloned()
        .collect())
}
