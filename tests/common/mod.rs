//! Shared fakes for pipeline tests: an in-memory container runtime and VCS.

// Each test binary uses a different subset of this module.
#![allow(dead_code)]

use anyhow::Result;
use runctl::context::{AutoYes, Confirm, Confirmation, Ctx};
use runctl::registry::Registry;
use runctl::runtime::{ContainerRuntime, LaunchSpec, RuntimeError};
use runctl::storage::{open_memory_pool, Pool};
use runctl::vcs::Vcs;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeState {
    pub running: Vec<String>,
    pub volumes: HashSet<String>,
    pub launches: Vec<LaunchSpec>,
    pub launched_ids: Vec<String>,
    pub killed: Vec<String>,
    pub removed_volumes: Vec<String>,
    /// Fail the nth launch of this fake's lifetime (0-based).
    pub fail_launch_at: Option<usize>,
    pub builds: usize,
}

/// In-memory stand-in for the docker gateway. Launch hands out
/// deterministic ids and registers them as running; kill/volume-remove
/// record what they were asked to do.
#[derive(Default)]
pub struct FakeRuntime {
    pub state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn with_running(ids: &[&str]) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().running = ids.iter().map(|s| s.to_string()).collect();
        fake
    }
}

impl ContainerRuntime for FakeRuntime {
    fn build(&self, _dockerfile: &Path, _context: &Path, _tag: &str) -> Result<String, RuntimeError> {
        let mut st = self.state.lock().unwrap();
        st.builds += 1;
        Ok("sha256:fakeimage".to_string())
    }

    fn launch(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        let mut st = self.state.lock().unwrap();
        let n = st.launches.len();
        if st.fail_launch_at == Some(n) {
            return Err(RuntimeError::LaunchFailed {
                name: spec.name.clone(),
                code: 125,
            });
        }
        let id = format!("{}-container-{}", spec.name, n);
        st.launches.push(spec.clone());
        st.launched_ids.push(id.clone());
        st.running.push(id.clone());
        st.volumes.insert(spec.volume.clone());
        Ok(id)
    }

    fn kill(&self, ids: &[String]) -> Result<(), RuntimeError> {
        let mut st = self.state.lock().unwrap();
        for id in ids {
            st.killed.push(id.clone());
            st.running.retain(|r| r != id);
        }
        Ok(())
    }

    fn remove_volumes(&self, names: &[String]) -> Result<(), RuntimeError> {
        let mut st = self.state.lock().unwrap();
        for name in names {
            st.removed_volumes.push(name.clone());
            st.volumes.remove(name);
        }
        Ok(())
    }

    fn running_ids(&self, _label: Option<&str>) -> Result<Vec<String>, RuntimeError> {
        Ok(self.state.lock().unwrap().running.clone())
    }

    fn volume_names(&self) -> Result<HashSet<String>, RuntimeError> {
        Ok(self.state.lock().unwrap().volumes.clone())
    }

    fn logs(&self, _id: &str, _follow: bool) -> Result<(), RuntimeError> {
        Ok(())
    }
}

pub struct FakeVcs {
    pub dirty: bool,
}

impl Vcs for FakeVcs {
    fn head_commit(&self) -> Result<String> {
        Ok("abc123".to_string())
    }

    fn last_message(&self) -> Result<String> {
        Ok("latest commit message".to_string())
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(self.dirty)
    }
}

pub struct Decline;

impl Confirm for Decline {
    fn resolve(&self, _request: &Confirmation) -> Result<bool> {
        Ok(false)
    }
}

pub fn ctx_yes() -> (Ctx, Registry) {
    let pool: Pool = open_memory_pool().unwrap();
    let ctx = Ctx::new(pool, Box::new(AutoYes));
    let registry = Registry::new(ctx.pool.clone());
    (ctx, registry)
}

pub fn ctx_no() -> (Ctx, Registry) {
    let pool: Pool = open_memory_pool().unwrap();
    let ctx = Ctx::new(pool, Box::new(Decline));
    let registry = Registry::new(ctx.pool.clone());
    (ctx, registry)
}
