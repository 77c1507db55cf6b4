//! Reassignment API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use super::{committed, error, success, ApiResult};
use crate::errors::AppError;
use crate::reassignment::{Outcome, Proposal, Resolution};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRequest {
    pub membership_id: String,
    pub target_team_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub outcome: Outcome,
}

/// POST /api/reassignments - Drop a membership onto another team.
///
/// Uses the cached teams, the same state the operator dragged from. A drop
/// back onto the source team yields `data: null`.
pub async fn propose_reassignment(
    State(state): State<AppState>,
    Json(request): Json<ProposeRequest>,
) -> ApiResult<Option<Proposal>> {
    let snapshot = state.cache.snapshot();

    match state
        .reassignment
        .propose(
            &snapshot.teams,
            &request.membership_id,
            &request.target_team_id,
        )
        .await
    {
        Ok(proposal) => success(proposal, snapshot.revision_id),
        Err(e) => error(e, snapshot.revision_id),
    }
}

/// GET /api/reassignments/:id - A proposal still awaiting a decision.
pub async fn get_reassignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Proposal> {
    let revision_id = state.cache.snapshot().revision_id;

    match state.reassignment.pending(&id).await {
        Some(proposal) => success(proposal, revision_id),
        None => error(
            AppError::NotFound(format!("Proposal {} not pending", id)),
            revision_id,
        ),
    }
}

/// POST /api/reassignments/:id/resolve - Apply move or share.
pub async fn resolve_reassignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Resolution> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.reassignment.resolve(&id, request.outcome).await;
    committed(&state, revision_id, result).await
}

/// DELETE /api/reassignments/:id - Cancel a pending proposal.
pub async fn cancel_reassignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Proposal> {
    let revision_id = state.cache.snapshot().revision_id;

    match state.reassignment.cancel(&id).await {
        Ok(proposal) => success(proposal, revision_id),
        Err(e) => error(e, revision_id),
    }
}
