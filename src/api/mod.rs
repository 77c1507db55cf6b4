//! REST API module.
//!
//! Mutations go through the entity store, the membership manager or the
//! reassignment coordinator. Reads are computed from the reactive store only.

mod employees;
mod reassignments;
mod teams;
mod views;

pub use employees::*;
pub use reassignments::*;
pub use teams::*;
pub use views::*;

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{AppError, AppErrorWithRevision};
use crate::AppState;

/// Longest a mutation response waits for its snapshot to reach the cache.
const CACHE_SYNC_TIMEOUT: Duration = Duration::from_secs(2);

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Finish a mutation. On success the response is held until the reactive
/// store has applied every collection snapshot published so far, so a
/// follow-up read sees the write even when the other collection has moved
/// on meanwhile. Errors report whatever revision the store is at now, since
/// a partial failure may have committed some steps.
pub(crate) async fn committed<T: Serialize>(
    state: &AppState,
    revision_before: i64,
    result: Result<T, AppError>,
) -> ApiResult<T> {
    let revision_id = state
        .repo
        .get_revision_id()
        .await
        .unwrap_or(revision_before);

    match result {
        Ok(data) => {
            let published = state.repo.published_revisions();
            let synced = tokio::time::timeout(
                CACHE_SYNC_TIMEOUT,
                state.cache.wait_for_revisions(published),
            )
            .await;
            if synced.is_err() {
                tracing::warn!(
                    employees = published.employees,
                    teams = published.teams,
                    "Cache did not catch up before responding"
                );
            }
            success(data, revision_id)
        }
        Err(e) => {
            if !e.is_warning() {
                tracing::debug!(code = e.error_code(), "Mutation failed: {}", e.message());
            }
            error(e, revision_id)
        }
    }
}

/// Reject blank names before anything is written.
pub(crate) fn require_name(name: &str, what: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(format!("{} name is required", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_name_rejects_blank() {
        assert!(require_name("Alpha", "Team").is_ok());
        match require_name("   ", "Team") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Team name is required"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_success_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::new(vec![1, 2], 4)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["revisionId"], 4);
        assert_eq!(body["data"][1], 2);
    }
}
