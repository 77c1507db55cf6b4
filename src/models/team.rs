//! Team model with its embedded membership records.

use serde::{Deserialize, Serialize};

/// One (team, employee) pairing.
///
/// `membership_id` identifies a single add event; an employee who leaves and
/// rejoins gets a fresh id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub membership_id: String,
    pub employee_id: String,
}

/// A team owned by a supervisor or team lead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub supervisor_id: String,
    #[serde(default)]
    pub member_records: Vec<MemberRecord>,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Team {
    pub fn has_employee(&self, employee_id: &str) -> bool {
        self.member_records
            .iter()
            .any(|r| r.employee_id == employee_id)
    }

    pub fn find_record(&self, membership_id: &str) -> Option<&MemberRecord> {
        self.member_records
            .iter()
            .find(|r| r.membership_id == membership_id)
    }

    pub fn agent_count(&self) -> usize {
        self.member_records.len()
    }
}

/// Request body for creating a team. Teams always start empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
    pub supervisor_id: String,
}

/// Request body for renaming a team or changing its supervisor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub supervisor_id: Option<String>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for adding an employee to a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub employee_id: String,
}

/// Request body for handing a team to another supervisor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSupervisorRequest {
    pub supervisor_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_wire_shape() {
        let team: Team = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "name": "Alpha",
            "supervisorId": "s1",
            "memberRecords": [{ "membershipId": "t1_e1_1700000000000", "employeeId": "e1" }],
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(team.has_employee("e1"));
        assert!(!team.has_employee("e2"));
        assert_eq!(
            team.find_record("t1_e1_1700000000000").map(|r| r.employee_id.as_str()),
            Some("e1")
        );
        assert_eq!(team.agent_count(), 1);
        assert_eq!(team.version, 0);
    }
}
