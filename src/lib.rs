//! runctl -- provision, inspect, and tear down containerized experiment runs.
//!
//! This crate provides the core library for the run lifecycle: a persistent
//! registry of runs, gateways to the container runtime and VCS, and the
//! provisioning/termination pipelines with all-or-nothing semantics.

pub mod context;
pub mod lookup;
pub mod process;
pub mod provision;
pub mod registry;
pub mod runtime;
pub mod storage;
pub mod teardown;
pub mod vcs;
