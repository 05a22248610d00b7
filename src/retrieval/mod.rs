// src/retrieval/mod.rs — Documentation retrieval port

pub mod http;

use async_trait::async_trait;

use crate::infra::errors::SceneForgeError;

/// The four independently indexed documentation corpora.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    Generation,
    Modification,
    Component,
    Material,
}

impl Corpus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Corpus::Generation => "generation",
            Corpus::Modification => "modification",
            Corpus::Component => "component",
            Corpus::Material => "material",
        }
    }

    /// The fixed placeholder returned when nothing matches. Callers must
    /// treat this as valid, non-fatal content — not an error.
    pub fn sentinel(&self) -> String {
        format!("No relevant {} information found.", self.as_str())
    }
}

/// Query contract for the retrieval backends. Index construction and
/// querying internals are out of scope; only this surface matters.
#[async_trait]
pub trait DocRetriever: Send + Sync {
    async fn query(&self, corpus: Corpus, text: &str) -> Result<String, SceneForgeError>;
}

/// Retriever used when no retrieval service is configured: every query
/// answers with the corpus sentinel.
pub struct DisabledRetriever;

#[async_trait]
impl DocRetriever for DisabledRetriever {
    async fn query(&self, corpus: Corpus, _text: &str) -> Result<String, SceneForgeError> {
        Ok(corpus.sentinel())
    }
}
