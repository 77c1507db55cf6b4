//! Team, supervisor and assignment projections.

use std::collections::HashSet;

use serde::Serialize;

use super::{active_index, cmp_names, contains_folded, paginate, EmployeeRef, Page, SortOrder};
use crate::models::{Employee, Position, Team};

/// Most entries shown in the add-agent picker.
pub const ROSTER_PICKER_LIMIT: usize = 20;

/// A resolved member of one team.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberView {
    pub membership_id: String,
    pub employee_id: String,
    pub name: String,
    pub position: Position,
}

/// A team with its supervisor resolved and its agent count.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: String,
    pub name: String,
    pub supervisor_id: String,
    pub supervisor_name: Option<String>,
    pub agent_count: usize,
}

/// A manager with the teams they supervise.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorView {
    pub supervisor: EmployeeRef,
    pub teams: Vec<TeamSummary>,
    pub team_count: usize,
    pub agent_count: usize,
}

/// Where one employee is assigned.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentsView {
    pub employee_id: String,
    pub teams: Vec<TeamSummary>,
    pub supervisors: Vec<EmployeeRef>,
}

/// Headline counts for the summary cards.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub supervisors: usize,
    pub team_leads: usize,
    pub agents: usize,
    pub teams: usize,
}

/// A selectable employee in a picker, flagged when already chosen.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub selected: bool,
}

/// Agent row on the paged agent roster.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentRow {
    pub id: String,
    pub name: String,
    pub teams: Vec<String>,
}

/// Members of `team`, resolved against active employees and sorted by name.
/// Records pointing at archived or unknown employees are dropped.
pub fn team_members(
    team: &Team,
    employees: &[Employee],
    order: SortOrder,
) -> Vec<TeamMemberView> {
    let index = active_index(employees);

    let mut members: Vec<TeamMemberView> = team
        .member_records
        .iter()
        .filter_map(|record| {
            index
                .get(record.employee_id.as_str())
                .map(|employee| TeamMemberView {
                    membership_id: record.membership_id.clone(),
                    employee_id: employee.id.clone(),
                    name: employee.name.clone(),
                    position: employee.position,
                })
        })
        .collect();

    members.sort_by(|a, b| order.apply(cmp_names(&a.name, &b.name)));
    members
}

pub fn summarize_team(team: &Team, employees: &[Employee]) -> TeamSummary {
    let supervisor_name = employees
        .iter()
        .find(|e| e.is_active() && e.id == team.supervisor_id)
        .map(|e| e.name.clone());

    TeamSummary {
        id: team.id.clone(),
        name: team.name.clone(),
        supervisor_id: team.supervisor_id.clone(),
        supervisor_name,
        agent_count: team.agent_count(),
    }
}

/// Teams owned by `supervisor_id`, by name.
pub fn supervisor_teams<'a>(supervisor_id: &str, teams: &'a [Team]) -> Vec<&'a Team> {
    let mut owned: Vec<&Team> = teams
        .iter()
        .filter(|t| t.supervisor_id == supervisor_id)
        .collect();
    owned.sort_by(|a, b| cmp_names(&a.name, &b.name));
    owned
}

/// Sum of membership records across every team `supervisor_id` owns.
pub fn supervisor_agent_count(supervisor_id: &str, teams: &[Team]) -> usize {
    teams
        .iter()
        .filter(|t| t.supervisor_id == supervisor_id)
        .map(Team::agent_count)
        .sum()
}

pub fn supervisor_view(
    supervisor: &Employee,
    employees: &[Employee],
    teams: &[Team],
) -> SupervisorView {
    let owned: Vec<TeamSummary> = supervisor_teams(&supervisor.id, teams)
        .into_iter()
        .map(|t| summarize_team(t, employees))
        .collect();

    SupervisorView {
        supervisor: supervisor.into(),
        team_count: owned.len(),
        agent_count: owned.iter().map(|t| t.agent_count).sum(),
        teams: owned,
    }
}

/// Teams holding a record for `employee_id`, in collection order.
pub fn assigned_teams<'a>(employee_id: &str, teams: &'a [Team]) -> Vec<&'a Team> {
    teams.iter().filter(|t| t.has_employee(employee_id)).collect()
}

/// Supervisors of the employee's teams, deduplicated, in first-seen order.
/// Supervisors that do not resolve to an active employee are skipped.
pub fn assigned_supervisors<'a>(
    employee_id: &str,
    teams: &[Team],
    employees: &'a [Employee],
) -> Vec<&'a Employee> {
    let index = active_index(employees);
    let mut seen = HashSet::new();

    assigned_teams(employee_id, teams)
        .into_iter()
        .filter(|t| !t.supervisor_id.is_empty())
        .filter(|t| seen.insert(t.supervisor_id.as_str()))
        .filter_map(|t| index.get(t.supervisor_id.as_str()).copied())
        .collect()
}

pub fn assignments(employee_id: &str, employees: &[Employee], teams: &[Team]) -> AssignmentsView {
    AssignmentsView {
        employee_id: employee_id.to_string(),
        teams: assigned_teams(employee_id, teams)
            .into_iter()
            .map(|t| summarize_team(t, employees))
            .collect(),
        supervisors: assigned_supervisors(employee_id, teams, employees)
            .into_iter()
            .map(EmployeeRef::from)
            .collect(),
    }
}

/// Active managers ordered by total agent count, fewest first; ties keep
/// name order. An empty `selected` list shows every manager.
pub fn org_chart(
    employees: &[Employee],
    teams: &[Team],
    selected: &[String],
) -> Vec<SupervisorView> {
    let mut managers: Vec<&Employee> = employees
        .iter()
        .filter(|e| e.is_active() && e.position.can_supervise())
        .collect();
    managers.sort_by(|a, b| cmp_names(&a.name, &b.name));
    managers.sort_by_key(|m| supervisor_agent_count(&m.id, teams));

    managers
        .into_iter()
        .filter(|m| selected.is_empty() || selected.contains(&m.id))
        .map(|m| supervisor_view(m, employees, teams))
        .collect()
}

pub fn summary_counts(employees: &[Employee], teams: &[Team]) -> SummaryCounts {
    let mut counts = SummaryCounts {
        teams: teams.len(),
        ..Default::default()
    };
    for employee in employees.iter().filter(|e| e.is_active()) {
        match employee.position {
            Position::Supervisor => counts.supervisors += 1,
            Position::TeamLead => counts.team_leads += 1,
            Position::Agent => counts.agents += 1,
        }
    }
    counts
}

/// Agents that can be added to `team`, name-filtered and capped.
pub fn roster_candidates(team: &Team, employees: &[Employee], query: &str) -> Vec<CandidateView> {
    let needle = query.to_lowercase();
    let mut agents: Vec<&Employee> = employees
        .iter()
        .filter(|e| e.is_active() && e.position == Position::Agent)
        .filter(|e| contains_folded(&e.name, &needle))
        .collect();
    agents.sort_by(|a, b| cmp_names(&a.name, &b.name));

    agents
        .into_iter()
        .take(ROSTER_PICKER_LIMIT)
        .map(|e| CandidateView {
            id: e.id.clone(),
            name: e.name.clone(),
            position: e.position,
            selected: team.has_employee(&e.id),
        })
        .collect()
}

/// Managers the team can be handed to; the current one is flagged.
pub fn transfer_candidates(team: &Team, employees: &[Employee]) -> Vec<CandidateView> {
    let mut managers: Vec<&Employee> = employees
        .iter()
        .filter(|e| e.is_active() && e.position.can_supervise())
        .collect();
    managers.sort_by(|a, b| cmp_names(&a.name, &b.name));

    managers
        .into_iter()
        .map(|e| CandidateView {
            id: e.id.clone(),
            name: e.name.clone(),
            position: e.position,
            selected: e.id == team.supervisor_id,
        })
        .collect()
}

/// Name-filtered, paginated agent roster.
pub fn agent_page(
    employees: &[Employee],
    teams: &[Team],
    query: &str,
    page: usize,
    page_size: usize,
) -> Page<AgentRow> {
    let needle = query.trim().to_lowercase();
    let mut agents: Vec<&Employee> = employees
        .iter()
        .filter(|e| e.is_active() && e.position == Position::Agent)
        .filter(|e| needle.is_empty() || contains_folded(&e.name, &needle))
        .collect();
    agents.sort_by(|a, b| cmp_names(&a.name, &b.name));

    let rows = agents
        .into_iter()
        .map(|e| AgentRow {
            id: e.id.clone(),
            name: e.name.clone(),
            teams: assigned_teams(&e.id, teams)
                .into_iter()
                .map(|t| t.name.clone())
                .collect(),
        })
        .collect();

    paginate(rows, page, page_size)
}

/// Name-filtered, paginated team roster.
pub fn team_page(
    employees: &[Employee],
    teams: &[Team],
    query: &str,
    page: usize,
    page_size: usize,
) -> Page<TeamSummary> {
    let needle = query.trim().to_lowercase();
    let mut matching: Vec<&Team> = teams
        .iter()
        .filter(|t| needle.is_empty() || contains_folded(&t.name, &needle))
        .collect();
    matching.sort_by(|a, b| cmp_names(&a.name, &b.name));

    let rows = matching
        .into_iter()
        .map(|t| summarize_team(t, employees))
        .collect();

    paginate(rows, page, page_size)
}
