// src/core/executor.rs — Generated-code execution boundary

use std::sync::Arc;

use super::sanitizer;
use crate::host::ScriptHost;
use crate::infra::errors::ExecError;

/// Executes sanitized generated code against the host scripting surface.
///
/// Two modes: `execute` surfaces the classified error to the caller (the
/// synthesizer embeds its display text in the corrective prompt), and
/// `execute_soft` reports failure as a return value so terminal stages can
/// log and move on.
pub struct CodeExecutor {
    host: Arc<dyn ScriptHost>,
}

impl CodeExecutor {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self { host }
    }

    /// Sanitize and run. The classified error carries line numbers /
    /// tracebacks exactly as the host reported them.
    pub async fn execute(&self, code: &str) -> Result<(), ExecError> {
        let clean = sanitizer::sanitize_code(code);
        self.host.run(&clean).await
    }

    /// Soft execution: never propagates. Returns the error text on
    /// failure, `None` on success.
    pub async fn execute_soft(&self, code: &str) -> Option<String> {
        match self.execute(code).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Soft execution failed: {e}");
                Some(e.to_string())
            }
        }
    }
}
