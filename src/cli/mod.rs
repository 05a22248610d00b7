// src/cli/mod.rs — Command-line interface

pub mod run;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sceneforge", version, about = "Turn a text request into a 3D scene")]
pub struct Cli {
    /// Path to a config.toml (default: ~/.sceneforge/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a scene from a natural-language request
    Run {
        /// The scene request, e.g. "a cozy study with a desk and a lamp"
        request: String,

        /// Override pipeline.max_iterations from config
        #[arg(long)]
        max_iterations: Option<u8>,

        /// Skip the material styling stage
        #[arg(long)]
        no_materials: bool,
    },

    /// Print the effective configuration
    Config,
}
