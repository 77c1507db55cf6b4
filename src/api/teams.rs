//! Team and membership API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{committed, error, require_name, ApiResult};
use crate::errors::AppError;
use crate::membership::ensure_supervisor;
use crate::models::{
    AddMemberRequest, CreateTeamRequest, MemberRecord, Team, TransferSupervisorRequest,
    UpdateTeamRequest,
};
use crate::AppState;

/// POST /api/teams - Create an empty team under a supervisor.
pub async fn create_team(
    State(state): State<AppState>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<Team> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_name(&request.name, "Team") {
        return error(e, revision_id);
    }
    if let Err(e) = ensure_supervisor(&*state.repo, &request.supervisor_id).await {
        return error(e, revision_id);
    }

    let result = state.repo.create_team(&request).await;
    committed(&state, revision_id, result).await
}

/// PUT /api/teams/:id - Rename a team or change its supervisor.
pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTeamRequest>,
) -> ApiResult<Team> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Some(name) = &request.name {
        if let Err(e) = require_name(name, "Team") {
            return error(e, revision_id);
        }
    }
    if let Some(supervisor_id) = &request.supervisor_id {
        if let Err(e) = ensure_supervisor(&*state.repo, supervisor_id).await {
            return error(e, revision_id);
        }
    }

    let result = state.repo.update_team(&id, &request).await;
    committed(&state, revision_id, result).await
}

/// DELETE /api/teams/:id - Delete a team and its membership records.
pub async fn delete_team(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.delete_team(&id).await;
    committed(&state, revision_id, result).await
}

/// PUT /api/teams/:id/supervisor - Hand the team to another manager.
pub async fn transfer_supervisor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TransferSupervisorRequest>,
) -> ApiResult<Team> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state
        .membership
        .transfer_supervisor(&id, &request.supervisor_id)
        .await;
    committed(&state, revision_id, result).await
}

/// POST /api/teams/:id/members - Add an employee to a team.
///
/// An employee already in the team is reported as an `ALREADY_MEMBER`
/// warning and nothing is written.
pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<MemberRecord> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.employee_id.trim().is_empty() {
        return error(
            AppError::Validation("employeeId is required".to_string()),
            revision_id,
        );
    }

    let result = state
        .membership
        .add_member(&id, &request.employee_id)
        .await
        .and_then(|outcome| outcome.into_result(&id, &request.employee_id));
    committed(&state, revision_id, result).await
}

/// DELETE /api/teams/:id/members/:membershipId - Remove one membership record.
pub async fn remove_member(
    State(state): State<AppState>,
    Path((id, membership_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state
        .membership
        .remove_member(&id, &membership_id)
        .await
        .map(|_| ());
    committed(&state, revision_id, result).await
}
