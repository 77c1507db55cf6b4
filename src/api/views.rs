//! Read endpoints. Everything here is computed from the reactive store.

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Employee, OrgSnapshot, RevisionInfo, Team};
use crate::views::{
    self, AgentRow, AssignmentsView, CandidateView, DirectoryRow, DirectorySortKey, Page,
    SearchResults, SearchSortField, SortOrder, SummaryCounts, SupervisorView, TeamMemberView,
    TeamSummary, PAGE_SIZE,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgChartQuery {
    /// Comma-separated manager ids; empty shows every manager.
    #[serde(default)]
    pub selected: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryQuery {
    #[serde(default)]
    pub q: String,
    pub sort: Option<DirectorySortKey>,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub sort_by: SearchSortField,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersQuery {
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatesQuery {
    #[serde(default)]
    pub q: String,
}

fn find_team<'a>(snapshot: &'a OrgSnapshot, id: &str) -> Result<&'a Team, AppError> {
    snapshot
        .teams
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
}

fn find_active_employee<'a>(snapshot: &'a OrgSnapshot, id: &str) -> Result<&'a Employee, AppError> {
    snapshot
        .employees
        .iter()
        .find(|e| e.id == id && e.is_active())
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))
}

/// GET /api/snapshot/revision - Revision the cache has applied.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let info = state.cache.revision_info();
    let revision_id = info.revision_id;
    success(info, revision_id)
}

/// GET /api/views/summary - Headline counts.
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<SummaryCounts> {
    let snapshot = state.cache.snapshot();
    let counts = views::summary_counts(&snapshot.employees, &snapshot.teams);
    success(counts, snapshot.revision_id)
}

/// GET /api/views/org-chart?selected=a,b - Managers with their teams.
pub async fn get_org_chart(
    State(state): State<AppState>,
    Query(query): Query<OrgChartQuery>,
) -> ApiResult<Vec<SupervisorView>> {
    let snapshot = state.cache.snapshot();
    let selected: Vec<String> = query
        .selected
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let chart = views::org_chart(&snapshot.employees, &snapshot.teams, &selected);
    success(chart, snapshot.revision_id)
}

/// GET /api/views/directory - Filterable, sortable employee list.
pub async fn get_directory(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<Vec<DirectoryRow>> {
    let snapshot = state.cache.snapshot();
    let rows = views::directory(
        &snapshot.employees,
        &query.q,
        query.sort,
        query.order,
        views::today(),
    );
    success(rows, snapshot.revision_id)
}

/// GET /api/views/search - Unified agent and team search.
pub async fn get_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<SearchResults> {
    let snapshot = state.cache.snapshot();
    let results = views::unified_search(
        &snapshot.employees,
        &snapshot.teams,
        &query.q,
        query.sort_by,
        query.order,
    );
    success(results, snapshot.revision_id)
}

/// GET /api/views/agents - Paged agent roster.
pub async fn get_agent_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<AgentRow>> {
    let snapshot = state.cache.snapshot();
    let page = views::agent_page(
        &snapshot.employees,
        &snapshot.teams,
        &query.q,
        query.page,
        PAGE_SIZE,
    );
    success(page, snapshot.revision_id)
}

/// GET /api/views/teams - Paged team roster.
pub async fn get_team_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<TeamSummary>> {
    let snapshot = state.cache.snapshot();
    let page = views::team_page(
        &snapshot.employees,
        &snapshot.teams,
        &query.q,
        query.page,
        PAGE_SIZE,
    );
    success(page, snapshot.revision_id)
}

/// GET /api/views/teams/:id/members - Resolved members of one team.
pub async fn get_team_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MembersQuery>,
) -> ApiResult<Vec<TeamMemberView>> {
    let snapshot = state.cache.snapshot();

    match find_team(&snapshot, &id) {
        Ok(team) => success(
            views::team_members(team, &snapshot.employees, query.order),
            snapshot.revision_id,
        ),
        Err(e) => error(e, snapshot.revision_id),
    }
}

/// GET /api/views/teams/:id/candidates - Agents for the add-member picker.
pub async fn get_roster_candidates(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CandidatesQuery>,
) -> ApiResult<Vec<CandidateView>> {
    let snapshot = state.cache.snapshot();

    match find_team(&snapshot, &id) {
        Ok(team) => success(
            views::roster_candidates(team, &snapshot.employees, &query.q),
            snapshot.revision_id,
        ),
        Err(e) => error(e, snapshot.revision_id),
    }
}

/// GET /api/views/teams/:id/transfer-candidates - Managers the team can go to.
pub async fn get_transfer_candidates(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<CandidateView>> {
    let snapshot = state.cache.snapshot();

    match find_team(&snapshot, &id) {
        Ok(team) => success(
            views::transfer_candidates(team, &snapshot.employees),
            snapshot.revision_id,
        ),
        Err(e) => error(e, snapshot.revision_id),
    }
}

/// GET /api/views/supervisors/:id - One manager's teams and agent count.
pub async fn get_supervisor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SupervisorView> {
    let snapshot = state.cache.snapshot();

    let supervisor = match find_active_employee(&snapshot, &id) {
        Ok(employee) if employee.position.can_supervise() => employee,
        Ok(employee) => {
            return error(
                AppError::Validation(format!("{} is not a supervisor", employee.name)),
                snapshot.revision_id,
            )
        }
        Err(e) => return error(e, snapshot.revision_id),
    };

    let view = views::supervisor_view(supervisor, &snapshot.employees, &snapshot.teams);
    success(view, snapshot.revision_id)
}

/// GET /api/views/employees/:id/assignments - Teams and supervisors of one employee.
pub async fn get_assignments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AssignmentsView> {
    let snapshot = state.cache.snapshot();

    if let Err(e) = find_active_employee(&snapshot, &id) {
        return error(e, snapshot.revision_id);
    }

    let view = views::assignments(&id, &snapshot.employees, &snapshot.teams);
    success(view, snapshot.revision_id)
}
