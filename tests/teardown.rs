//! Termination pipeline tests -- idempotency, active filtering, kill vs rm.

mod common;

use chrono::Utc;
use common::{ctx_no, ctx_yes, FakeRuntime};
use runctl::registry::{Registry, RunRecord};
use runctl::teardown::{teardown, TeardownMode};

fn seed(registry: &Registry, name: &str, container: &str, volume: &str) {
    registry
        .upsert_all(&[RunRecord {
            name: name.to_string(),
            commit_hash: "abc123".to_string(),
            config: None,
            config_script: None,
            image_id: "sha256:img".to_string(),
            container_id: container.to_string(),
            volume: volume.to_string(),
            description: "seeded".to_string(),
            created_at: Utc::now(),
        }])
        .unwrap();
}

#[test]
fn test_rm_empty_match_is_noop_twice() {
    let (ctx, registry) = ctx_yes();
    let runtime = FakeRuntime::default();

    teardown(&ctx, &registry, &runtime, Some("exp%"), false, TeardownMode::Remove).unwrap();
    teardown(&ctx, &registry, &runtime, Some("exp%"), false, TeardownMode::Remove).unwrap();

    let st = runtime.state.lock().unwrap();
    assert!(st.killed.is_empty());
    assert!(st.removed_volumes.is_empty());
}

#[test]
fn test_rm_kills_removes_volumes_and_deletes_rows() {
    let (ctx, registry) = ctx_yes();
    let runtime = FakeRuntime::with_running(&["c-exp0", "c-exp1"]);
    {
        let mut st = runtime.state.lock().unwrap();
        st.volumes.insert("exp0".to_string());
        st.volumes.insert("exp1".to_string());
    }
    seed(&registry, "exp0", "c-exp0", "exp0");
    seed(&registry, "exp1", "c-exp1", "exp1");
    seed(&registry, "other", "c-other", "other");

    teardown(&ctx, &registry, &runtime, Some("exp%"), false, TeardownMode::Remove).unwrap();

    assert!(registry.find_by_name_pattern("exp%").unwrap().is_empty());
    assert_eq!(registry.find_by_name_pattern("other").unwrap().len(), 1);

    let st = runtime.state.lock().unwrap();
    assert_eq!(st.killed, vec!["c-exp0".to_string(), "c-exp1".to_string()]);
    assert_eq!(
        st.removed_volumes,
        vec!["exp0".to_string(), "exp1".to_string()]
    );
}

#[test]
fn test_kill_leaves_registry_rows() {
    let (ctx, registry) = ctx_yes();
    let runtime = FakeRuntime::with_running(&["c-exp"]);
    seed(&registry, "exp", "c-exp", "exp");

    teardown(&ctx, &registry, &runtime, Some("exp"), false, TeardownMode::Kill).unwrap();

    assert_eq!(registry.find_by_name_pattern("exp").unwrap().len(), 1);
    let st = runtime.state.lock().unwrap();
    assert_eq!(st.killed, vec!["c-exp".to_string()]);
    assert!(st.removed_volumes.is_empty());
}

#[test]
fn test_active_filter_selects_prefix_matched_rows_only() {
    let (ctx, registry) = ctx_yes();
    // The runtime reports a long id; the registry stored a short prefix.
    let runtime = FakeRuntime::with_running(&[
        "3f9a0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b",
    ]);
    seed(&registry, "exp0", "3f9a0c1d2e3f", "exp0");
    seed(&registry, "exp1", "dead00000000", "exp1");

    teardown(&ctx, &registry, &runtime, Some("exp%"), true, TeardownMode::Remove).unwrap();

    // Only the live row was selected and removed.
    let remaining = registry.find_by_name_pattern("exp%").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "exp1");

    let st = runtime.state.lock().unwrap();
    assert_eq!(st.killed, vec!["3f9a0c1d2e3f".to_string()]);
}

#[test]
fn test_active_filter_with_no_live_containers_is_noop() {
    let (ctx, registry) = ctx_yes();
    let runtime = FakeRuntime::default();
    seed(&registry, "exp", "c-exp", "exp");

    teardown(&ctx, &registry, &runtime, Some("exp%"), true, TeardownMode::Remove).unwrap();

    // Nothing live, so the row stays and nothing was killed.
    assert_eq!(registry.find_by_name_pattern("exp").unwrap().len(), 1);
    assert!(runtime.state.lock().unwrap().killed.is_empty());
}

#[test]
fn test_decline_leaves_everything_in_place() {
    let (ctx, registry) = ctx_no();
    let runtime = FakeRuntime::with_running(&["c-exp"]);
    seed(&registry, "exp", "c-exp", "exp");

    teardown(&ctx, &registry, &runtime, Some("exp"), false, TeardownMode::Remove).unwrap();

    assert_eq!(registry.find_by_name_pattern("exp").unwrap().len(), 1);
    let st = runtime.state.lock().unwrap();
    assert!(st.killed.is_empty());
    assert!(st.removed_volumes.is_empty());
}

#[test]
fn test_rm_without_pattern_requires_extra_confirmation() {
    let (ctx, registry) = ctx_no();
    let runtime = FakeRuntime::with_running(&["c-exp"]);
    seed(&registry, "exp", "c-exp", "exp");

    // Declining the "remove ALL" confirmation aborts before any matching.
    teardown(&ctx, &registry, &runtime, None, false, TeardownMode::Remove).unwrap();

    assert_eq!(registry.find_by_name_pattern("%").unwrap().len(), 1);
    assert!(runtime.state.lock().unwrap().killed.is_empty());
}
