//! Symptom-based medicine recommendation: a thin proxy over the external
//! RAG service that joins its hits against the catalog and logs the query.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use pillsure_core::{ApiEnvelope, PillsureError, model::Medicine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::success_with_message;
use crate::AppState;
use crate::error::ApiResult;
use crate::rag::RagHit;

const MIN_QUERY_LEN: usize = 3;
const MAX_QUERY_LEN: usize = 500;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: Option<String>,
}

/// Catalog row decorated with the RAG score that surfaced it.
#[derive(Debug, Serialize)]
pub struct ScoredMedicine {
    #[serde(flatten)]
    pub medicine: Medicine,
    #[serde(rename = "ragScore")]
    pub rag_score: f64,
    #[serde(rename = "contextUsed")]
    pub context_used: String,
}

/// Field names mirror the upstream service's response.
#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub rewritten_query: String,
    pub result: Option<ScoredMedicine>,
    pub suggestions: Vec<ScoredMedicine>,
    pub latency_ms: f64,
}

fn join_hit(hit: &RagHit, catalog: &HashMap<i64, Medicine>) -> Option<ScoredMedicine> {
    let id: i64 = hit.medicine_id.parse().ok()?;
    catalog.get(&id).map(|medicine| ScoredMedicine {
        medicine: medicine.clone(),
        rag_score: hit.score,
        context_used: hit.context_used.clone(),
    })
}

/// POST /api/rag/recommend
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecommendRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Recommendation>>)> {
    let query = body.query.as_deref().unwrap_or("").trim().to_string();
    if query.is_empty() {
        return Err(PillsureError::BadRequest(
            "Query is required and must be a non-empty string".to_string(),
        )
        .into());
    }
    if query.len() < MIN_QUERY_LEN {
        return Err(PillsureError::BadRequest(format!(
            "Query must be at least {} characters long",
            MIN_QUERY_LEN
        ))
        .into());
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(PillsureError::BadRequest(format!(
            "Query must be less than {} characters",
            MAX_QUERY_LEN
        ))
        .into());
    }

    let rag = state.rag.recommend(&query).await?;

    // Join the scored hits against the catalog.
    let mut ids: Vec<i64> = Vec::new();
    if let Some(hit) = &rag.result
        && let Ok(id) = hit.medicine_id.parse()
    {
        ids.push(id);
    }
    for hit in &rag.suggestions {
        if let Ok(id) = hit.medicine_id.parse() {
            ids.push(id);
        }
    }
    let catalog: HashMap<i64, Medicine> = state
        .db
        .medicines_by_ids(&ids)?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let result = rag.result.as_ref().and_then(|hit| join_hit(hit, &catalog));
    let suggestions: Vec<ScoredMedicine> = rag
        .suggestions
        .iter()
        .filter_map(|hit| join_hit(hit, &catalog))
        .collect();

    // Database-logging side effect; never fails the request.
    let retrieved = serde_json::to_value(&rag.suggestions).ok();
    if let Err(e) = state.db.insert_rag_query(
        &query,
        Some(&rag.rewritten_query),
        retrieved.as_ref(),
        Utc::now(),
    ) {
        tracing::warn!("failed to log recommendation query: {}", e);
    }

    Ok(success_with_message(
        Recommendation {
            rewritten_query: rag.rewritten_query,
            result,
            suggestions,
            latency_ms: rag.latency_ms,
        },
        "Medicine recommendations retrieved successfully",
    ))
}
