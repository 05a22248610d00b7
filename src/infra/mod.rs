// src/infra/mod.rs — Infrastructure: errors, config, logging, artifacts

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod logger;
