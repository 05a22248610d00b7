// src/core/mod.rs — Core generation pipeline

pub mod composer;
pub mod consolidator;
pub mod decomposer;
pub mod executor;
pub mod optimizer;
pub mod pipeline;
pub mod prompts;
pub mod rewriter;
pub mod sanitizer;
pub mod session;
pub mod stylist;
pub mod synthesizer;
pub mod types;
