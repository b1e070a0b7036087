//! Short descriptions for recognized objects
//!
//! Used when answering "what is in my hand": the detected label is looked up
//! in the `DuckDuckGo` instant-answer API and its abstract is appended to the
//! spoken sentence.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::KnowledgeConfig;
use crate::{Error, Result};

/// Looks up a description for an object label
#[async_trait]
pub trait DescriptionLookup: Send + Sync {
    /// Fetch a description
    ///
    /// # Errors
    ///
    /// Returns error if the lookup service cannot be reached or answers garbage
    ///
    /// `Ok(None)` means the service answered but has nothing to say.
    async fn lookup(&self, label: &str) -> Result<Option<String>>;
}

/// Instant-answer response; only the abstract is used
#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
}

/// `DuckDuckGo` instant-answer client
pub struct DuckDuckGo {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGo {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Knowledge(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Build the client when lookups are enabled
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &KnowledgeConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        Self::new(config.endpoint.clone(), config.request_timeout).map(Some)
    }
}

#[async_trait]
impl DescriptionLookup for DuckDuckGo {
    async fn lookup(&self, label: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", label), ("format", "json"), ("no_html", "1")])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let description = parse_abstract(&body)?;

        tracing::debug!(label, found = description.is_some(), "description lookup");
        Ok(description)
    }
}

/// Extract the abstract from an instant-answer body
///
/// # Errors
///
/// Returns error if the body is not an instant-answer JSON object
pub fn parse_abstract(body: &str) -> Result<Option<String>> {
    let answer: InstantAnswer = serde_json::from_str(body)?;
    let text = answer.abstract_text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
