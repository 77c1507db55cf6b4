//! Employee model and the request bodies that create or edit one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Job position held by an employee.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Position {
    Agent,
    #[serde(rename = "Team Lead")]
    TeamLead,
    Supervisor,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Agent => "Agent",
            Position::TeamLead => "Team Lead",
            Position::Supervisor => "Supervisor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Agent" => Some(Position::Agent),
            "Team Lead" => Some(Position::TeamLead),
            "Supervisor" => Some(Position::Supervisor),
            _ => None,
        }
    }

    /// Supervisors and team leads may own teams.
    pub fn can_supervise(&self) -> bool {
        matches!(self, Position::TeamLead | Position::Supervisor)
    }
}

/// Employment status shown in the directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EmploymentStatus {
    #[default]
    Active,
    Resigned,
    Terminated,
    Suspended,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Active => "Active",
            EmploymentStatus::Resigned => "Resigned",
            EmploymentStatus::Terminated => "Terminated",
            EmploymentStatus::Suspended => "Suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(EmploymentStatus::Active),
            "Resigned" => Some(EmploymentStatus::Resigned),
            "Terminated" => Some(EmploymentStatus::Terminated),
            "Suspended" => Some(EmploymentStatus::Suspended),
            _ => None,
        }
    }
}

/// A registered employee.
///
/// Deleting from the roster sets `archived`; the row stays so that old
/// membership records can still point at it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub date_hired: NaiveDate,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: EmploymentStatus,
    #[serde(default)]
    pub archived: bool,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        !self.archived
    }
}

/// Request body for registering a new employee.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub position: Position,
    pub date_hired: NaiveDate,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: EmploymentStatus,
}

/// Field-by-field edit of an existing employee.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub date_hired: Option<NaiveDate>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<EmploymentStatus>,
    #[serde(default)]
    pub archived: Option<bool>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_wire_names() {
        assert_eq!(
            serde_json::to_string(&Position::TeamLead).unwrap(),
            "\"Team Lead\""
        );
        let parsed: Position = serde_json::from_str("\"Supervisor\"").unwrap();
        assert_eq!(parsed, Position::Supervisor);
        assert_eq!(Position::parse("Team Lead"), Some(Position::TeamLead));
        assert_eq!(Position::parse("Manager"), None);
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateEmployeeRequest = serde_json::from_value(serde_json::json!({
            "name": "Ana Reyes",
            "position": "Agent",
            "dateHired": "2023-04-15"
        }))
        .unwrap();

        assert_eq!(request.status, EmploymentStatus::Active);
        assert_eq!(request.contact, "");
        assert_eq!(
            request.date_hired,
            NaiveDate::from_ymd_opt(2023, 4, 15).unwrap()
        );
    }
}
