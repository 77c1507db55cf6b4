//! Membership manager: add, remove and supervisor transfer on teams.
//!
//! Every operation reads the team and then issues a single array-union /
//! array-remove write. The read and the write are not one transaction, so
//! two concurrent adds of the same employee to the same team can both pass
//! the duplicate check and both land. That window is accepted; views
//! recompute from whatever the next snapshot says.

use std::sync::Arc;

use chrono::Utc;

use crate::errors::AppError;
use crate::models::{Employee, MemberRecord, Team};
use crate::store::MembershipStore;

/// Result of an add that did not fail at the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(MemberRecord),
    /// Employee already had a record in the team; nothing was written.
    AlreadyMember,
}

impl AddOutcome {
    pub fn membership_id(&self) -> Option<&str> {
        match self {
            AddOutcome::Added(record) => Some(&record.membership_id),
            AddOutcome::AlreadyMember => None,
        }
    }

    /// Surface the duplicate as a validation rejection.
    pub fn into_result(self, team_id: &str, employee_id: &str) -> Result<MemberRecord, AppError> {
        match self {
            AddOutcome::Added(record) => Ok(record),
            AddOutcome::AlreadyMember => Err(AppError::AlreadyMember {
                team_id: team_id.to_string(),
                employee_id: employee_id.to_string(),
            }),
        }
    }
}

/// `{teamId}_{employeeId}_{creationEpochMillis}`
pub fn membership_id(team_id: &str, employee_id: &str, epoch_millis: i64) -> String {
    format!("{}_{}_{}", team_id, employee_id, epoch_millis)
}

/// Owns every write to team membership.
#[derive(Clone)]
pub struct MembershipManager {
    store: Arc<dyn MembershipStore>,
}

impl MembershipManager {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    async fn require_team(&self, team_id: &str) -> Result<Team, AppError> {
        self.store
            .get_team(team_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", team_id)))
    }

    /// Add `employee_id` to the team unless it already has a record there.
    pub async fn add_member(&self, team_id: &str, employee_id: &str) -> Result<AddOutcome, AppError> {
        let team = self.require_team(team_id).await?;

        if team.has_employee(employee_id) {
            tracing::debug!(team_id, employee_id, "Employee already in team");
            return Ok(AddOutcome::AlreadyMember);
        }

        let employee = self
            .store
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;
        if employee.archived {
            return Err(AppError::Validation(format!(
                "Employee {} is archived",
                employee.name
            )));
        }

        let record = MemberRecord {
            membership_id: fresh_membership_id(&team, employee_id),
            employee_id: employee_id.to_string(),
        };

        self.store.union_member_record(team_id, &record).await?;
        tracing::debug!(team_id, membership_id = %record.membership_id, "Added member");

        Ok(AddOutcome::Added(record))
    }

    /// Remove the record with exactly this membership id. Removing a record
    /// that is already gone succeeds without writing. Returns whether this
    /// call removed the record.
    pub async fn remove_member(
        &self,
        team_id: &str,
        membership_id: &str,
    ) -> Result<bool, AppError> {
        let team = self.require_team(team_id).await?;

        let Some(record) = team.find_record(membership_id) else {
            tracing::debug!(team_id, membership_id, "Membership already absent");
            return Ok(false);
        };

        let removed = self.store.remove_member_record(team_id, record).await?;
        tracing::debug!(team_id, membership_id, removed, "Removed member");
        Ok(removed)
    }

    /// Hand the team to another supervisor. Membership is unchanged.
    pub async fn transfer_supervisor(
        &self,
        team_id: &str,
        new_supervisor_id: &str,
    ) -> Result<Team, AppError> {
        self.require_team(team_id).await?;
        ensure_supervisor(self.store.as_ref(), new_supervisor_id).await?;

        let team = self.store.set_supervisor(team_id, new_supervisor_id).await?;
        tracing::info!(team_id, supervisor_id = new_supervisor_id, "Transferred team");
        Ok(team)
    }
}

/// The employee exists, is not archived, and holds a position that can own teams.
pub async fn ensure_supervisor(
    store: &dyn MembershipStore,
    supervisor_id: &str,
) -> Result<Employee, AppError> {
    let supervisor = store
        .get_employee(supervisor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", supervisor_id)))?;

    if supervisor.archived {
        return Err(AppError::Validation(format!(
            "{} is archived and cannot supervise a team",
            supervisor.name
        )));
    }
    if !supervisor.position.can_supervise() {
        return Err(AppError::Validation(format!(
            "{} is an {} and cannot supervise a team",
            supervisor.name,
            supervisor.position.as_str()
        )));
    }

    Ok(supervisor)
}

// Bump the timestamp past any id already in the team so an id is never reused
// within one snapshot, even for adds in the same millisecond.
fn fresh_membership_id(team: &Team, employee_id: &str) -> String {
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let candidate = membership_id(&team.id, employee_id, millis);
        if team.find_record(&candidate).is_none() {
            return candidate;
        }
        millis += 1;
    }
}
