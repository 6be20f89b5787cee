//! Thin client for the external RAG recommendation service.

use pillsure_core::PillsureError;
use serde::{Deserialize, Serialize};

/// One scored hit returned by the RAG service. `medicine_id` arrives as a
/// string and is joined against the catalog by the handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagHit {
    pub medicine_id: String,
    pub medicine_name: String,
    pub score: f64,
    #[serde(default)]
    pub drug_category: Option<String>,
    #[serde(default)]
    pub prescription_required: bool,
    #[serde(default)]
    pub context_used: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub rewritten_query: String,
    pub result: Option<RagHit>,
    #[serde(default)]
    pub suggestions: Vec<RagHit>,
    #[serde(default)]
    pub latency_ms: f64,
}

#[derive(Serialize)]
struct RagRequest<'a> {
    question: &'a str,
}

pub struct RagClient {
    http: reqwest::Client,
    base_url: String,
}

impl RagClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// POST `{question}` to `/recommend` and parse the scored hits.
    pub async fn recommend(&self, question: &str) -> Result<RagResponse, PillsureError> {
        let url = format!("{}/recommend", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&RagRequest { question })
            .send()
            .await
            .map_err(|e| PillsureError::Upstream(format!("RAG request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PillsureError::Upstream(format!(
                "RAG API request failed: {} - {}",
                status, body
            )));
        }

        response
            .json::<RagResponse>()
            .await
            .map_err(|e| PillsureError::Upstream(format!("Invalid RAG response: {}", e)))
    }
}
