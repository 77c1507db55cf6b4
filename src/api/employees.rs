//! Employee API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{committed, error, require_name, ApiResult};
use crate::models::{CreateEmployeeRequest, Employee, UpdateEmployeeRequest};
use crate::AppState;

/// POST /api/employees - Register a new employee.
pub async fn create_employee(
    State(state): State<AppState>,
    Json(request): Json<CreateEmployeeRequest>,
) -> ApiResult<Employee> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_name(&request.name, "Employee") {
        return error(e, revision_id);
    }

    let result = state.repo.create_employee(&request).await;
    committed(&state, revision_id, result).await
}

/// PUT /api/employees/:id - Edit an employee.
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEmployeeRequest>,
) -> ApiResult<Employee> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Some(name) = &request.name {
        if let Err(e) = require_name(name, "Employee") {
            return error(e, revision_id);
        }
    }

    let result = state.repo.update_employee(&id, &request).await;
    committed(&state, revision_id, result).await
}

/// POST /api/employees/:id/archive - Soft delete an employee.
pub async fn archive_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Employee> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.archive_employee(&id).await;
    committed(&state, revision_id, result).await
}

/// DELETE /api/employees/:id - Hard delete an employee.
pub async fn delete_employee(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.delete_employee(&id).await;
    committed(&state, revision_id, result).await
}
