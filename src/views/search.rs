//! Unified agent/team search and the employee directory.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    assigned_supervisors, assigned_teams, cmp_names, contains_folded, format_tenure,
    summarize_team, tenure_months, SortOrder,
};
use crate::models::{Employee, EmploymentStatus, Position, Team};

/// Most agents (and, outside team mode, teams) a search shows.
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// A query containing this word lists every team.
const TEAM_MODE_KEYWORD: &str = "team";

/// One row of the unified search list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SearchItem {
    #[serde(rename_all = "camelCase")]
    Agent {
        id: String,
        name: String,
        teams: Vec<String>,
        supervisors: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Team {
        id: String,
        name: String,
        supervisor_id: String,
        supervisor_name: Option<String>,
        agent_count: usize,
    },
}

impl SearchItem {
    pub fn name(&self) -> &str {
        match self {
            SearchItem::Agent { name, .. } | SearchItem::Team { name, .. } => name,
        }
    }

    /// Sort key for `field`. Agents have no supervisor key.
    fn sort_key(&self, field: SearchSortField) -> String {
        match (field, self) {
            (SearchSortField::Name, item) => item.name().to_lowercase(),
            (SearchSortField::Supervisor, SearchItem::Team { supervisor_name, .. }) => {
                supervisor_name.as_deref().unwrap_or_default().to_lowercase()
            }
            (SearchSortField::Supervisor, SearchItem::Agent { .. }) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchSortField {
    #[default]
    Name,
    Supervisor,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    /// The query asked for every team.
    pub team_mode: bool,
    /// Teams matched before any cap.
    pub total_teams: usize,
    pub items: Vec<SearchItem>,
}

/// Case-insensitive name search over active employees and teams.
///
/// A blank query returns nothing. Matches are capped at
/// [`SEARCH_RESULT_LIMIT`] per kind, except that a query containing "team"
/// returns every team regardless of name.
pub fn unified_search(
    employees: &[Employee],
    teams: &[Team],
    query: &str,
    field: SearchSortField,
    order: SortOrder,
) -> SearchResults {
    if query.trim().is_empty() {
        return SearchResults {
            team_mode: false,
            total_teams: 0,
            items: Vec::new(),
        };
    }

    let needle = query.to_lowercase();
    let team_mode = needle.contains(TEAM_MODE_KEYWORD);

    let agents = employees
        .iter()
        .filter(|e| e.is_active() && contains_folded(&e.name, &needle))
        .take(SEARCH_RESULT_LIMIT)
        .map(|e| SearchItem::Agent {
            id: e.id.clone(),
            name: e.name.clone(),
            teams: assigned_teams(&e.id, teams)
                .into_iter()
                .map(|t| t.name.clone())
                .collect(),
            supervisors: assigned_supervisors(&e.id, teams, employees)
                .into_iter()
                .map(|s| s.name.clone())
                .collect(),
        });

    let matched_teams: Vec<&Team> = teams
        .iter()
        .filter(|t| team_mode || contains_folded(&t.name, &needle))
        .collect();
    let total_teams = matched_teams.len();
    let shown_teams = if team_mode {
        total_teams
    } else {
        SEARCH_RESULT_LIMIT
    };

    let team_items = matched_teams.into_iter().take(shown_teams).map(|t| {
        let summary = summarize_team(t, employees);
        SearchItem::Team {
            id: summary.id,
            name: summary.name,
            supervisor_id: summary.supervisor_id,
            supervisor_name: summary.supervisor_name,
            agent_count: summary.agent_count,
        }
    });

    // Stable in both directions: ties keep collection order
    let mut keyed: Vec<(String, SearchItem)> = agents
        .chain(team_items)
        .map(|item| (item.sort_key(field), item))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| order.apply(a.cmp(b)));
    let items = keyed.into_iter().map(|(_, item)| item).collect();

    SearchResults {
        team_mode,
        total_teams,
        items,
    }
}

/// Column the directory is sorted by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DirectorySortKey {
    Name,
    Position,
    DateHired,
    Tenure,
    Contact,
    Email,
    Status,
}

/// One directory row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRow {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub date_hired: NaiveDate,
    pub tenure_months: u32,
    pub tenure: String,
    pub contact: String,
    pub email: String,
    pub status: EmploymentStatus,
}

/// Active employees matching `query` in name, position, contact or email,
/// optionally sorted by one column. Unsorted rows keep collection order.
pub fn directory(
    employees: &[Employee],
    query: &str,
    sort: Option<DirectorySortKey>,
    order: SortOrder,
    today: NaiveDate,
) -> Vec<DirectoryRow> {
    let needle = query.to_lowercase();

    let mut rows: Vec<DirectoryRow> = employees
        .iter()
        .filter(|e| e.is_active())
        .filter(|e| {
            [
                e.name.as_str(),
                e.position.as_str(),
                e.contact.as_str(),
                e.email.as_str(),
            ]
            .iter()
            .any(|field| contains_folded(field, &needle))
        })
        .map(|e| {
            let months = tenure_months(e.date_hired, today);
            DirectoryRow {
                id: e.id.clone(),
                name: e.name.clone(),
                position: e.position,
                date_hired: e.date_hired,
                tenure_months: months,
                tenure: format_tenure(months),
                contact: e.contact.clone(),
                email: e.email.clone(),
                status: e.status,
            }
        })
        .collect();

    if let Some(key) = sort {
        rows.sort_by(|a, b| order.apply(compare_rows(a, b, key)));
    }
    rows
}

fn compare_rows(a: &DirectoryRow, b: &DirectoryRow, key: DirectorySortKey) -> Ordering {
    match key {
        DirectorySortKey::Name => cmp_names(&a.name, &b.name),
        DirectorySortKey::Position => cmp_names(a.position.as_str(), b.position.as_str()),
        DirectorySortKey::DateHired => a.date_hired.cmp(&b.date_hired),
        DirectorySortKey::Tenure => a.tenure_months.cmp(&b.tenure_months),
        DirectorySortKey::Contact => cmp_names(&a.contact, &b.contact),
        DirectorySortKey::Email => cmp_names(&a.email, &b.email),
        DirectorySortKey::Status => cmp_names(a.status.as_str(), b.status.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fixtures::{employee, team};

    fn teams(n: usize) -> Vec<Team> {
        (0..n)
            .map(|i| team(&format!("t{}", i), &format!("Squad {}", i), "s1", &[]))
            .collect()
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let results = unified_search(&[], &teams(3), "   ", SearchSortField::Name, SortOrder::Asc);
        assert!(results.items.is_empty());
        assert!(!results.team_mode);
    }

    #[test]
    fn test_team_keyword_returns_every_team() {
        let all = teams(8);
        let results = unified_search(&[], &all, "team", SearchSortField::Name, SortOrder::Asc);

        assert!(results.team_mode);
        assert_eq!(results.total_teams, 8);
        assert_eq!(results.items.len(), 8);
    }

    #[test]
    fn test_team_name_match_is_case_insensitive() {
        let all = vec![
            team("t1", "teamalpha", "s1", &[]),
            team("t2", "Bravo", "s1", &[]),
        ];
        let results = unified_search(&[], &all, "TeamAlpha", SearchSortField::Name, SortOrder::Asc);
        assert!(results.items.iter().any(|i| i.name() == "teamalpha"));

        let results = unified_search(&[], &all, "ALP", SearchSortField::Name, SortOrder::Asc);
        assert_eq!(results.items.len(), 1);
        assert_eq!(results.items[0].name(), "teamalpha");
    }

    #[test]
    fn test_non_team_query_caps_results() {
        let employees: Vec<Employee> = (0..9)
            .map(|i| employee(&format!("a{}", i), &format!("Sam {}", i), Position::Agent))
            .collect();
        let all: Vec<Team> = (0..9)
            .map(|i| team(&format!("t{}", i), &format!("Sam squad {}", i), "s1", &[]))
            .collect();

        let results = unified_search(&employees, &all, "sam", SearchSortField::Name, SortOrder::Asc);
        let agents = results
            .items
            .iter()
            .filter(|i| matches!(i, SearchItem::Agent { .. }))
            .count();
        assert_eq!(agents, SEARCH_RESULT_LIMIT);
        assert_eq!(results.items.len(), 2 * SEARCH_RESULT_LIMIT);
        assert_eq!(results.total_teams, 9);
    }

    #[test]
    fn test_agent_rows_carry_assignments() {
        let employees = vec![
            employee("s1", "Sam", Position::Supervisor),
            employee("a1", "Ana", Position::Agent),
        ];
        let all = vec![
            team("t1", "Alpha", "s1", &["a1"]),
            team("t2", "Bravo", "s1", &["a1"]),
        ];

        let results = unified_search(&employees, &all, "ana", SearchSortField::Name, SortOrder::Asc);
        match &results.items[0] {
            SearchItem::Agent {
                teams, supervisors, ..
            } => {
                assert_eq!(teams, &vec!["Alpha".to_string(), "Bravo".to_string()]);
                assert_eq!(supervisors, &vec!["Sam".to_string()]);
            }
            other => panic!("expected agent, got {:?}", other),
        }
    }

    #[test]
    fn test_sort_by_supervisor_descending() {
        let employees = vec![
            employee("s1", "Zed", Position::Supervisor),
            employee("s2", "Amy", Position::Supervisor),
        ];
        let all = vec![
            team("t1", "Alpha", "s1", &[]),
            team("t2", "Bravo", "s2", &[]),
        ];

        let results = unified_search(
            &employees,
            &all,
            "teams",
            SearchSortField::Supervisor,
            SortOrder::Desc,
        );
        let names: Vec<&str> = results.items.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo"]);
    }

    #[test]
    fn test_descending_sort_keeps_tied_rows_in_order() {
        let employees = vec![
            employee("a1", "Sam One", Position::Agent),
            employee("a2", "Sam Two", Position::Agent),
            employee("s1", "Zed", Position::Supervisor),
        ];
        let all = vec![team("t1", "Sam squad", "s1", &[])];

        let names = |order| {
            unified_search(&employees, &all, "sam", SearchSortField::Supervisor, order)
                .items
                .iter()
                .map(|i| i.name().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(names(SortOrder::Asc), vec!["Sam One", "Sam Two", "Sam squad"]);
        assert_eq!(names(SortOrder::Desc), vec!["Sam squad", "Sam One", "Sam Two"]);
    }

    #[test]
    fn test_item_serializes_with_kind_tag() {
        let item = SearchItem::Team {
            id: "t1".to_string(),
            name: "Alpha".to_string(),
            supervisor_id: "s1".to_string(),
            supervisor_name: None,
            agent_count: 2,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["kind"], "team");
        assert_eq!(value["agentCount"], 2);
    }

    #[test]
    fn test_directory_filters_and_sorts() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut old = employee("e1", "Old Timer", Position::Agent);
        old.date_hired = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        old.email = "old@example.com".to_string();
        let mut new = employee("e2", "New Hire", Position::TeamLead);
        new.date_hired = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut gone = employee("e3", "Gone Person", Position::Agent);
        gone.archived = true;
        let employees = vec![old, new, gone];

        let rows = directory(&employees, "", Some(DirectorySortKey::Tenure), SortOrder::Asc, today);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
        assert_eq!(rows[0].tenure, "3 mo.");
        assert_eq!(rows[1].tenure, "5 yr. 5 mo.");

        let by_email = directory(&employees, "EXAMPLE", None, SortOrder::Asc, today);
        assert_eq!(by_email.len(), 1);

        let by_position = directory(&employees, "team lead", None, SortOrder::Asc, today);
        assert_eq!(by_position[0].id, "e2");
    }
}
