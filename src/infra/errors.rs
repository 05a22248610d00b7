// src/infra/errors.rs — Error types for SceneForge

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneForgeError {
    // Collaborator errors
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Retrieval query against '{corpus}' failed: {message}")]
    Retrieval { corpus: String, message: String },

    #[error("Host bridge error: {0}")]
    HostBridge(String),

    // Generated-code execution (classified by the host)
    #[error("{0}")]
    Execution(#[from] ExecError),

    // Parse errors
    #[error("Could not extract JSON from model response: {0}")]
    JsonExtract(#[from] JsonExtractError),

    #[error("Scene decomposition produced no usable scene: {0}")]
    Decomposition(String),

    #[error("Suggestion consolidation response could not be parsed: {0}")]
    Consolidation(String),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SceneForgeError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SceneForgeError::Provider {
                retriable: true,
                ..
            }
        )
    }
}

/// A classified failure from executing generated code on the host.
///
/// The display text of this error is exactly what the corrective
/// regeneration prompt embeds, so it carries line numbers and tracebacks
/// rather than a terse summary.
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: u32, message: String },

    #[error("Indentation error on line {line}: {message}")]
    Indentation { line: u32, message: String },

    #[error("Runtime error ({kind}): {message}\n{traceback}")]
    Runtime {
        kind: String,
        message: String,
        traceback: String,
    },
}

/// Typed failure from `extract_json`. Total JSON extraction never panics;
/// it returns this instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonExtractError {
    #[error("no JSON object found in text")]
    NotFound,

    #[error("candidate JSON span failed to parse: {0}")]
    Malformed(String),
}
