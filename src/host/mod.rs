// src/host/mod.rs — Code-execution host port
//
// The editor's scripting surface (object creation, transforms, modifiers)
// is entirely out of scope. Only the execution/error-reporting, render
// capture, and scene introspection contracts cross this boundary.

pub mod bridge;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::core::types::ObjectRecord;
use crate::infra::errors::{ExecError, SceneForgeError};

#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Run a (sanitized) script in the host's isolated namespace.
    /// Failures come back classified, never as opaque strings.
    async fn run(&self, code: &str) -> Result<(), ExecError>;

    /// Capture the fixed set of labeled canonical views of the current
    /// scene state. Call after `refresh_view`.
    async fn capture(&self) -> Result<Vec<PathBuf>, SceneForgeError>;

    /// Update the viewport so captures observe the latest scene mutation.
    async fn refresh_view(&self) -> Result<(), SceneForgeError>;

    /// Enumerate the scene for prompt grounding.
    async fn describe_scene(&self) -> Result<Vec<ObjectRecord>, SceneForgeError>;
}
