use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Applied to every request; a timed-out exchange surfaces as a transport
/// failure like any other.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct RagRequest {
    query: String,
}

#[derive(Deserialize)]
struct RagResponse {
    answer: Option<String>,
}

/// Client for the RAG question-answering endpoint.
///
/// One call per question, no streaming. The bearer token is supplied at
/// construction and attached to every request.
#[derive(Clone)]
pub struct RagClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RagClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Ask one question. Returns the `answer` field of the response, or
    /// `None` when the service replied without one.
    pub async fn ask(&self, query: &str) -> Result<Option<String>> {
        let url = format!("{}/api/rag/query", self.base_url);

        let request = RagRequest {
            query: query.to_string(),
        };

        debug!(%url, "sending query to answer service");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "answer service request failed with status: {}",
                response.status()
            ));
        }

        let rag_response: RagResponse = response.json().await?;
        debug!(has_answer = rag_response.answer.is_some(), "answer service responded");

        Ok(rag_response.answer)
    }
}
