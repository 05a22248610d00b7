// src/main.rs — SceneForge entry point

use clap::Parser;

use sceneforge::cli::{run, Cli, Commands};
use sceneforge::infra::config::Config;
use sceneforge::infra::logger;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Run {
            request,
            max_iterations,
            no_materials,
        } => run::run_pipeline(&config, &request, max_iterations, no_materials).await,
        Commands::Config => {
            match toml::to_string_pretty(&config) {
                Ok(text) => {
                    println!("{text}");
                    0
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
    };

    std::process::exit(code);
}

fn load_config(cli: &Cli) -> Result<Config, sceneforge::infra::errors::SceneForgeError> {
    if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))
    } else {
        Config::load()
    }
}
