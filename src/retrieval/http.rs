// src/retrieval/http.rs — HTTP client for the retrieval service

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Corpus, DocRetriever};
use crate::infra::errors::SceneForgeError;

/// Client for a retrieval service exposing `POST /query` per corpus.
///
/// A miss is not an error: the service (and this client, on an empty
/// result) answers with the corpus sentinel string.
pub struct HttpRetriever {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRetriever {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl DocRetriever for HttpRetriever {
    async fn query(&self, corpus: Corpus, text: &str) -> Result<String, SceneForgeError> {
        let response = self
            .client
            .post(format!("{}/query", self.endpoint))
            .timeout(self.timeout)
            .json(&json!({"corpus": corpus.as_str(), "text": text}))
            .send()
            .await
            .map_err(|e| SceneForgeError::Retrieval {
                corpus: corpus.as_str().into(),
                message: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SceneForgeError::Retrieval {
                corpus: corpus.as_str().into(),
                message: format!("HTTP {status}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| SceneForgeError::Retrieval {
            corpus: corpus.as_str().into(),
            message: format!("bad response body: {e}"),
        })?;

        // {"documents": ["...", ...]} — empty means a miss, answered with
        // the sentinel rather than an error.
        let docs: Vec<&str> = body["documents"]
            .as_array()
            .map(|a| a.iter().filter_map(|d| d.as_str()).collect())
            .unwrap_or_default();

        if docs.is_empty() {
            Ok(corpus.sentinel())
        } else {
            Ok(docs.join("\n\n---\n\n"))
        }
    }
}
