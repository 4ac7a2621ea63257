//! Termination pipeline -- resolve a name pattern against the registry and
//! live container state, then kill and clean up.

use crate::context::{Confirmation, Ctx};
use crate::registry::Registry;
use crate::runtime::live::{existing_volumes, LiveState};
use crate::runtime::ContainerRuntime;
use anyhow::Result;

/// `kill` stops containers and leaves the registry alone; `remove` also
/// removes volumes and deletes the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
    Kill,
    Remove,
}

/// Run the `rm`/`kill` pipeline. An empty match set is a successful no-op;
/// runtime-side teardown is best-effort, and rows are only deleted after the
/// teardown for them has been attempted.
pub fn teardown(
    ctx: &Ctx,
    registry: &Registry,
    runtime: &dyn ContainerRuntime,
    pattern: Option<&str>,
    active_only: bool,
    mode: TeardownMode,
) -> Result<()> {
    // No pattern means all runs; for `rm` that gets its own confirmation.
    if pattern.is_none() && mode == TeardownMode::Remove {
        if !ctx.confirm(&Confirmation::new("No pattern given. Remove ALL runs?"))? {
            println!("Aborted.");
            return Ok(());
        }
    }
    let pattern = pattern.unwrap_or("%");

    let mut rows = registry.find_by_name_pattern(pattern)?;

    if active_only {
        let live = LiveState::snapshot(runtime, None)?;
        rows.retain(|r| live.is_live(&r.container_id));
    }

    if rows.is_empty() {
        println!("No runs match pattern {}", pattern);
        return Ok(());
    }

    let names: Vec<String> = rows.iter().map(|r| r.name.clone()).collect();
    let verb = match mode {
        TeardownMode::Kill => "Kill",
        TeardownMode::Remove => "Remove",
    };
    if !ctx.confirm(&Confirmation::new(format!(
        "{} the following runs? {}",
        verb,
        names.join(" ")
    )))? {
        println!("Aborted.");
        return Ok(());
    }

    let ids: Vec<String> = rows.iter().map(|r| r.container_id.clone()).collect();
    if let Err(e) = runtime.kill(&ids) {
        // Containers may have exited on their own; teardown keeps going.
        tracing::warn!(error = %e, "container kill failed");
    }

    if mode == TeardownMode::Remove {
        let mut volumes: Vec<String> = rows.iter().map(|r| r.volume.clone()).collect();
        volumes.sort();
        volumes.dedup();
        let present = existing_volumes(runtime, &volumes)?;
        if !present.is_empty() {
            if let Err(e) = runtime.remove_volumes(&present) {
                tracing::warn!(error = %e, "volume removal failed");
            }
        }

        // Rows go last: on a partial failure above, the registry still
        // records what needs cleanup.
        registry.delete_by_names(&names)?;
    }

    for name in &names {
        match mode {
            TeardownMode::Kill => println!("Killed run '{}'", name),
            TeardownMode::Remove => println!("Removed run '{}'", name),
        }
    }

    Ok(())
}
