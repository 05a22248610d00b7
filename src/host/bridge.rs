// src/host/bridge.rs — HTTP bridge to the editor add-on

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use super::ScriptHost;
use crate::core::types::ObjectRecord;
use crate::infra::errors::{ExecError, SceneForgeError};

/// Client for the editor-side bridge server: `POST /execute`,
/// `POST /capture`, `POST /refresh`, `GET /scene`.
pub struct HostBridge {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

/// Wire shape of a classified execution failure from the bridge.
#[derive(Debug, Deserialize)]
struct WireExecError {
    kind: String,
    message: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    traceback: String,
}

impl WireExecError {
    fn classify(self) -> ExecError {
        match self.kind.as_str() {
            "SyntaxError" => ExecError::Syntax {
                line: self.line,
                message: self.message,
            },
            "IndentationError" | "TabError" => ExecError::Indentation {
                line: self.line,
                message: self.message,
            },
            other => ExecError::Runtime {
                kind: other.to_string(),
                message: self.message,
                traceback: self.traceback,
            },
        }
    }
}

impl HostBridge {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn bridge_err(e: impl std::fmt::Display) -> SceneForgeError {
        SceneForgeError::HostBridge(e.to_string())
    }
}

#[async_trait]
impl ScriptHost for HostBridge {
    async fn run(&self, code: &str) -> Result<(), ExecError> {
        let response = self
            .client
            .post(format!("{}/execute", self.endpoint))
            .timeout(self.timeout)
            .json(&json!({"code": code}))
            .send()
            .await
            .map_err(|e| ExecError::Runtime {
                kind: "BridgeError".into(),
                message: format!("bridge request failed: {e}"),
                traceback: String::new(),
            })?;

        if response.status().is_success() {
            return Ok(());
        }

        // The bridge reports script failures as a structured body; if the
        // body itself is unreadable, fall back to a generic runtime error.
        match response.json::<WireExecError>().await {
            Ok(wire) => Err(wire.classify()),
            Err(e) => Err(ExecError::Runtime {
                kind: "BridgeError".into(),
                message: format!("unclassified host failure: {e}"),
                traceback: String::new(),
            }),
        }
    }

    async fn capture(&self) -> Result<Vec<PathBuf>, SceneForgeError> {
        #[derive(Deserialize)]
        struct CaptureResponse {
            images: Vec<PathBuf>,
        }

        let response = self
            .client
            .post(format!("{}/capture", self.endpoint))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::bridge_err)?
            .error_for_status()
            .map_err(Self::bridge_err)?;

        let parsed: CaptureResponse = response.json().await.map_err(Self::bridge_err)?;
        Ok(parsed.images)
    }

    async fn refresh_view(&self) -> Result<(), SceneForgeError> {
        self.client
            .post(format!("{}/refresh", self.endpoint))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::bridge_err)?
            .error_for_status()
            .map_err(Self::bridge_err)?;
        Ok(())
    }

    async fn describe_scene(&self) -> Result<Vec<ObjectRecord>, SceneForgeError> {
        let response = self
            .client
            .get(format!("{}/scene", self.endpoint))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::bridge_err)?
            .error_for_status()
            .map_err(Self::bridge_err)?;

        response.json().await.map_err(Self::bridge_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_syntax() {
        let wire = WireExecError {
            kind: "SyntaxError".into(),
            message: "invalid syntax".into(),
            line: 7,
            traceback: String::new(),
        };
        assert!(matches!(wire.classify(), ExecError::Syntax { line: 7, .. }));
    }

    #[test]
    fn test_classify_indentation_variants() {
        for kind in ["IndentationError", "TabError"] {
            let wire = WireExecError {
                kind: kind.into(),
                message: "unexpected indent".into(),
                line: 3,
                traceback: String::new(),
            };
            assert!(matches!(wire.classify(), ExecError::Indentation { .. }));
        }
    }

    #[test]
    fn test_classify_runtime_keeps_type_name() {
        let wire = WireExecError {
            kind: "KeyError".into(),
            message: "'legs'".into(),
            line: 0,
            traceback: "Traceback...".into(),
        };
        match wire.classify() {
            ExecError::Runtime { kind, traceback, .. } => {
                assert_eq!(kind, "KeyError");
                assert!(traceback.starts_with("Traceback"));
            }
            other => panic!("expected runtime error, got {other:?}"),
        }
    }
}
