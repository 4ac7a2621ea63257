//! Provisioning pipeline -- build an image, launch a batch of containers,
//! commit the batch to the registry all-or-nothing.

pub mod config;

pub use config::{ConfigTuple, NewMethod};

use crate::context::{Confirmation, Ctx};
use crate::registry::{PartialRunRecord, Registry};
use crate::runtime::live::{existing_volumes, LiveState};
use crate::runtime::{ContainerRuntime, LaunchSpec};
use crate::vcs::Vcs;
use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;

/// Everything `new` needs, resolved from the CLI before the pipeline runs.
#[derive(Debug, Clone)]
pub struct NewSpec {
    /// Base run name; suffixed with an index when multiple configs are
    /// generated.
    pub name: String,
    pub description: Option<String>,
    /// Image tag to build and launch.
    pub image: String,
    pub build_context: PathBuf,
    pub dockerfile: PathBuf,
    /// Extra docker-run arguments passed through verbatim.
    pub run_args: Vec<String>,
    /// Explicit host volume name; defaults to the run name per tuple.
    pub volume: Option<String>,
    /// Mount point for the volume inside the container.
    pub mount_path: String,
    /// Label attached to launched containers and used to scope "active"
    /// lookups.
    pub kill_label: Option<String>,
    pub follow: bool,
    pub method: NewMethod,
}

/// Compensating actions for a batch in flight. Tracks what this invocation
/// has created; on drop, anything still armed is killed and its volumes
/// removed, best-effort. Runs from prior invocations are never touched.
struct BatchGuard<'a> {
    runtime: &'a dyn ContainerRuntime,
    containers: Vec<String>,
    volumes: Vec<String>,
    armed: bool,
}

impl<'a> BatchGuard<'a> {
    fn new(runtime: &'a dyn ContainerRuntime) -> Self {
        Self {
            runtime,
            containers: Vec::new(),
            volumes: Vec::new(),
            armed: true,
        }
    }

    fn track(&mut self, container_id: String, volume: String) {
        self.containers.push(container_id);
        self.volumes.push(volume);
    }

    /// The batch committed; nothing to unwind.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed || self.containers.is_empty() {
            return;
        }
        tracing::warn!(
            containers = self.containers.len(),
            "provisioning failed, rolling back batch"
        );
        if let Err(e) = self.runtime.kill(&self.containers) {
            tracing::warn!(error = %e, "rollback kill failed");
        }
        if let Err(e) = self.runtime.remove_volumes(&self.volumes) {
            tracing::warn!(error = %e, "rollback volume removal failed");
        }
    }
}

/// Run the `new` pipeline. Declined confirmations abort cleanly (exit 0, no
/// side effects beyond read-only pre-flight queries); any fatal step after
/// launch begins unwinds the whole batch.
pub fn provision(
    ctx: &Ctx,
    registry: &Registry,
    runtime: &dyn ContainerRuntime,
    vcs: &dyn Vcs,
    spec: &NewSpec,
) -> Result<()> {
    // Step 1: config materialization.
    let tuples = config::materialize(&spec.method, &spec.name, spec.volume.as_deref())?;
    let names: Vec<String> = tuples.iter().map(|t| t.name.clone()).collect();
    let mut volumes: Vec<String> = tuples.iter().map(|t| t.volume.clone()).collect();
    volumes.dedup();

    tracing::info!(batch = names.len(), image = %spec.image, "provisioning batch");

    // Step 2: pre-flight checks.
    if vcs.is_dirty()? {
        println!("Warning: working tree has uncommitted changes.");
        if !ctx.confirm(&Confirmation::new("Provision from a dirty tree?"))? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let existing = registry.find_by_names(&names)?;
    if !existing.is_empty() {
        let listed: Vec<&str> = existing.iter().map(|h| h.name.as_str()).collect();
        if !ctx.confirm(&Confirmation::new(format!(
            "Overwrite the following runs? {}",
            listed.join(" ")
        )))? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let snapshot = LiveState::snapshot(runtime, spec.kill_label.as_deref())?;
    let any_live = existing.iter().any(|h| snapshot.is_live(&h.container_id));
    if any_live {
        // Active containers may have changed since the first snapshot;
        // refresh immediately before the kill to narrow the race.
        let fresh = LiveState::snapshot(runtime, spec.kill_label.as_deref())?;
        let ids: Vec<String> = existing
            .iter()
            .filter(|h| fresh.is_live(&h.container_id))
            .map(|h| h.container_id.clone())
            .collect();
        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "killing live containers under reused names");
            if let Err(e) = runtime.kill(&ids) {
                tracing::warn!(error = %e, "kill of reused-name containers failed");
            }
        }
    }

    for (other, vol) in registry.find_by_volumes(&volumes)? {
        if !names.contains(&other) {
            println!("Warning: volume '{}' is already used by run '{}'.", vol, other);
        }
    }

    let present = existing_volumes(runtime, &volumes)?;
    if !present.is_empty() {
        if !ctx.confirm(&Confirmation::new(format!(
            "Remove existing volumes? {}",
            present.join(" ")
        )))? {
            println!("Aborted.");
            return Ok(());
        }
        runtime.remove_volumes(&present)?;
    }

    // Step 3: image build. Fatal before anything launches.
    println!("Building {}...", spec.image);
    let image_id = runtime.build(&spec.dockerfile, &spec.build_context, &spec.image)?;
    tracing::info!(%image_id, "image built");

    // Step 4: commit metadata.
    let commit = vcs.head_commit()?;
    let description = match &spec.description {
        Some(d) => d.clone(),
        None => vcs.last_message()?,
    };

    // Steps 5-7: template, launch, commit -- bracketed by the rollback guard.
    let created_at = Utc::now();
    let mut guard = BatchGuard::new(runtime);
    let mut records = Vec::with_capacity(tuples.len());

    for tuple in &tuples {
        let templated = tuple
            .config
            .as_ref()
            .map(|c| config::apply_tokens(c, &tuple.name, &commit));

        let partial = PartialRunRecord {
            name: tuple.name.clone(),
            commit_hash: commit.clone(),
            config: templated.clone(),
            config_script: tuple.script.clone(),
            image_id: image_id.clone(),
            volume: tuple.volume.clone(),
            description: description.clone(),
            created_at,
        };

        let launch = LaunchSpec {
            name: tuple.name.clone(),
            image: spec.image.clone(),
            volume: tuple.volume.clone(),
            mount_path: spec.mount_path.clone(),
            label: spec.kill_label.clone(),
            run_args: spec.run_args.clone(),
            config_args: templated
                .as_deref()
                .map(|c| c.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        };

        let container_id = runtime.launch(&launch)?;
        tracing::info!(name = %tuple.name, %container_id, "container launched");
        guard.track(container_id.clone(), tuple.volume.clone());
        records.push(partial.complete(container_id));
    }

    registry.upsert_all(&records)?;
    guard.disarm();

    for rec in &records {
        println!("Provisioned run '{}' ({})", rec.name, &rec.container_id);
    }

    if spec.follow {
        let first = &records[0];
        if let Err(e) = runtime.logs(&first.container_id, true) {
            tracing::warn!(error = %e, "log follow ended");
        }
    } else {
        println!("Follow logs with: docker logs -f {}", records[0].name);
    }

    Ok(())
}
