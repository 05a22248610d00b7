// src/lib.rs — Library root for SceneForge

pub mod cli;
pub mod core;
pub mod evaluator;
pub mod host;
pub mod infra;
pub mod provider;
pub mod retrieval;
