//! Drag-initiated reassignment of a membership from one team to another.
//!
//! A drop produces a pending proposal. The operator then either cancels it or
//! resolves it as a move or a share. Resolution takes the proposal out of the
//! pending table before touching the store, so exactly one outcome fires and a
//! started resolution cannot be cancelled.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::membership::{AddOutcome, MembershipManager};
use crate::models::Team;

/// The operator's choice for a pending proposal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Leave the source team, join the target team.
    Move,
    /// Join the target team and stay in the source team.
    Share,
}

/// A computed but not yet applied reassignment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub proposal_id: String,
    pub membership_id: String,
    pub employee_id: String,
    pub source_team_id: String,
    pub target_team_id: String,
}

/// What a committed resolution wrote.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub proposal: Proposal,
    pub outcome: Outcome,
    /// New membership id in the target team, absent when it already held the employee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_membership_id: Option<String>,
    /// Source membership removed by a move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_membership_id: Option<String>,
}

/// Tracks pending proposals and applies resolved ones.
#[derive(Clone)]
pub struct ReassignmentCoordinator {
    manager: MembershipManager,
    pending: Arc<Mutex<HashMap<String, Proposal>>>,
}

impl ReassignmentCoordinator {
    pub fn new(manager: MembershipManager) -> Self {
        Self {
            manager,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Turn a drop of `membership_id` onto `target_team_id` into a pending
    /// proposal, using the operator's current view of the teams. Returns
    /// `None` when the drop landed on the team the membership came from.
    pub async fn propose(
        &self,
        teams: &[Team],
        membership_id: &str,
        target_team_id: &str,
    ) -> Result<Option<Proposal>, AppError> {
        let (source, record) = teams
            .iter()
            .find_map(|t| t.find_record(membership_id).map(|r| (t, r)))
            .ok_or_else(|| {
                AppError::NotFound(format!("Membership {} not found", membership_id))
            })?;

        if source.id == target_team_id {
            tracing::debug!(membership_id, "Dropped on source team, ignoring");
            return Ok(None);
        }
        if !teams.iter().any(|t| t.id == target_team_id) {
            return Err(AppError::NotFound(format!(
                "Team {} not found",
                target_team_id
            )));
        }

        let proposal = Proposal {
            proposal_id: uuid::Uuid::new_v4().to_string(),
            membership_id: record.membership_id.clone(),
            employee_id: record.employee_id.clone(),
            source_team_id: source.id.clone(),
            target_team_id: target_team_id.to_string(),
        };

        self.pending
            .lock()
            .await
            .insert(proposal.proposal_id.clone(), proposal.clone());

        Ok(Some(proposal))
    }

    pub async fn pending(&self, proposal_id: &str) -> Option<Proposal> {
        self.pending.lock().await.get(proposal_id).cloned()
    }

    /// Abandon a pending proposal. Nothing is written.
    pub async fn cancel(&self, proposal_id: &str) -> Result<Proposal, AppError> {
        self.pending
            .lock()
            .await
            .remove(proposal_id)
            .ok_or_else(|| AppError::NotFound(format!("Proposal {} not pending", proposal_id)))
    }

    /// Apply the chosen outcome. Runs to completion once started.
    pub async fn resolve(&self, proposal_id: &str, outcome: Outcome) -> Result<Resolution, AppError> {
        let proposal = self.cancel(proposal_id).await?;

        let resolution = match outcome {
            Outcome::Move => self.apply_move(proposal).await?,
            Outcome::Share => self.apply_share(proposal).await?,
        };

        tracing::info!(
            employee_id = %resolution.proposal.employee_id,
            source = %resolution.proposal.source_team_id,
            target = %resolution.proposal.target_team_id,
            outcome = ?outcome,
            "Reassignment committed"
        );
        Ok(resolution)
    }

    // Add first, then remove: a failure can leave the employee on two teams
    // but never on none.
    async fn apply_move(&self, proposal: Proposal) -> Result<Resolution, AppError> {
        let added = self
            .manager
            .add_member(&proposal.target_team_id, &proposal.employee_id)
            .await?;
        let added_membership_id = added.membership_id().map(str::to_string);

        let removed = match self
            .manager
            .remove_member(&proposal.source_team_id, &proposal.membership_id)
            .await
        {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(
                    employee_id = %proposal.employee_id,
                    source = %proposal.source_team_id,
                    target = %proposal.target_team_id,
                    "Move left employee in both teams: {}",
                    e
                );
                let committed = match &added {
                    AddOutcome::Added(record) => vec![format!("add:{}", record.membership_id)],
                    AddOutcome::AlreadyMember => Vec::new(),
                };
                return Err(AppError::PartialFailure {
                    message: format!(
                        "Employee joined team {} but could not be removed from team {}: {}",
                        proposal.target_team_id,
                        proposal.source_team_id,
                        e.message()
                    ),
                    committed,
                });
            }
        };

        Ok(Resolution {
            removed_membership_id: removed.then(|| proposal.membership_id.clone()),
            added_membership_id,
            proposal,
            outcome: Outcome::Move,
        })
    }

    async fn apply_share(&self, proposal: Proposal) -> Result<Resolution, AppError> {
        let record = self
            .manager
            .add_member(&proposal.target_team_id, &proposal.employee_id)
            .await?
            .into_result(&proposal.target_team_id, &proposal.employee_id)?;

        Ok(Resolution {
            added_membership_id: Some(record.membership_id),
            removed_membership_id: None,
            proposal,
            outcome: Outcome::Share,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::membership::tests::Fixture;
    use crate::models::{Employee, MemberRecord, Position};
    use crate::store::{MembershipStore, Repository};

    /// Delegates to a real repository but can be told to fail array writes.
    struct FlakyStore {
        inner: Repository,
        fail_union: AtomicBool,
        fail_remove: AtomicBool,
    }

    #[async_trait]
    impl MembershipStore for FlakyStore {
        async fn get_team(&self, team_id: &str) -> Result<Option<Team>, AppError> {
            self.inner.get_team(team_id).await
        }

        async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, AppError> {
            self.inner.get_employee(employee_id).await
        }

        async fn union_member_record(
            &self,
            team_id: &str,
            record: &MemberRecord,
        ) -> Result<bool, AppError> {
            if self.fail_union.load(Ordering::SeqCst) {
                return Err(AppError::Store("connection lost".to_string()));
            }
            self.inner.union_member_record(team_id, record).await
        }

        async fn remove_member_record(
            &self,
            team_id: &str,
            record: &MemberRecord,
        ) -> Result<bool, AppError> {
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(AppError::Store("connection lost".to_string()));
            }
            self.inner.remove_member_record(team_id, record).await
        }

        async fn set_supervisor(
            &self,
            team_id: &str,
            supervisor_id: &str,
        ) -> Result<Team, AppError> {
            MembershipStore::set_supervisor(&self.inner, team_id, supervisor_id).await
        }
    }

    struct Setup {
        fx: Fixture,
        coordinator: ReassignmentCoordinator,
        agent: String,
        team_a: String,
        team_b: String,
        membership_id: String,
    }

    async fn setup() -> Setup {
        let fx = Fixture::new().await;
        let sup = fx.employee("Sam Lead", Position::Supervisor).await;
        let agent = fx.employee("Ana Reyes", Position::Agent).await;
        let team_a = fx.team("Alpha", &sup).await;
        let team_b = fx.team("Bravo", &sup).await;
        let membership_id = fx
            .manager
            .add_member(&team_a, &agent)
            .await
            .unwrap()
            .membership_id()
            .unwrap()
            .to_string();
        let coordinator = ReassignmentCoordinator::new(fx.manager.clone());
        Setup {
            fx,
            coordinator,
            agent,
            team_a,
            team_b,
            membership_id,
        }
    }

    async fn teams(s: &Setup) -> Vec<Team> {
        let mut teams = Vec::new();
        for id in [&s.team_a, &s.team_b] {
            teams.push(s.fx.repo.get_team(id).await.unwrap().unwrap());
        }
        teams
    }

    #[tokio::test]
    async fn test_drop_on_same_team_is_ignored() {
        let s = setup().await;
        let proposal = s
            .coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_a)
            .await
            .unwrap();
        assert!(proposal.is_none());
    }

    #[tokio::test]
    async fn test_move_outcome() {
        let s = setup().await;
        let proposal = s
            .coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(proposal.source_team_id, s.team_a);
        assert_eq!(proposal.employee_id, s.agent);

        let resolution = s
            .coordinator
            .resolve(&proposal.proposal_id, Outcome::Move)
            .await
            .unwrap();
        assert_eq!(
            resolution.removed_membership_id.as_deref(),
            Some(s.membership_id.as_str())
        );

        let a = s.fx.records(&s.team_a).await;
        let b = s.fx.records(&s.team_b).await;
        assert!(a.iter().all(|r| r.employee_id != s.agent));
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].employee_id, s.agent);
    }

    #[tokio::test]
    async fn test_share_outcome() {
        let s = setup().await;
        let proposal = s
            .coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();

        let resolution = s
            .coordinator
            .resolve(&proposal.proposal_id, Outcome::Share)
            .await
            .unwrap();

        let a = s.fx.records(&s.team_a).await;
        let b = s.fx.records(&s.team_b).await;
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_ne!(a[0].membership_id, b[0].membership_id);
        assert_eq!(resolution.added_membership_id, Some(b[0].membership_id.clone()));
    }

    #[tokio::test]
    async fn test_share_into_team_already_holding_employee() {
        let s = setup().await;
        s.fx.manager.add_member(&s.team_b, &s.agent).await.unwrap();
        let proposal = s
            .coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();

        let err = s
            .coordinator
            .resolve(&proposal.proposal_id, Outcome::Share)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyMember { .. }));
        assert_eq!(s.fx.records(&s.team_b).await.len(), 1);
    }

    #[tokio::test]
    async fn test_move_into_team_already_holding_employee() {
        let s = setup().await;
        s.fx.manager.add_member(&s.team_b, &s.agent).await.unwrap();
        let proposal = s
            .coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();

        let resolution = s
            .coordinator
            .resolve(&proposal.proposal_id, Outcome::Move)
            .await
            .unwrap();
        assert!(resolution.added_membership_id.is_none());
        assert!(s.fx.records(&s.team_a).await.is_empty());
        assert_eq!(s.fx.records(&s.team_b).await.len(), 1);
    }

    #[tokio::test]
    async fn test_move_after_source_record_already_removed() {
        let s = setup().await;
        let proposal = s
            .coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();
        s.fx.manager
            .remove_member(&s.team_a, &s.membership_id)
            .await
            .unwrap();

        let resolution = s
            .coordinator
            .resolve(&proposal.proposal_id, Outcome::Move)
            .await
            .unwrap();
        assert!(resolution.removed_membership_id.is_none());
        assert!(resolution.added_membership_id.is_some());
        assert!(s.fx.records(&s.team_a).await.is_empty());
        assert_eq!(s.fx.records(&s.team_b).await.len(), 1);
    }

    #[tokio::test]
    async fn test_proposal_resolves_once_and_cancel_is_clean() {
        let s = setup().await;
        let current = teams(&s).await;

        let proposal = s
            .coordinator
            .propose(&current, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();
        s.coordinator
            .resolve(&proposal.proposal_id, Outcome::Share)
            .await
            .unwrap();
        let err = s
            .coordinator
            .resolve(&proposal.proposal_id, Outcome::Move)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let before = s.fx.records(&s.team_a).await;
        let proposal = s
            .coordinator
            .propose(&current, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();
        assert!(s.coordinator.pending(&proposal.proposal_id).await.is_some());
        s.coordinator.cancel(&proposal.proposal_id).await.unwrap();
        assert!(s.coordinator.pending(&proposal.proposal_id).await.is_none());
        assert_eq!(s.fx.records(&s.team_a).await, before);
    }

    #[tokio::test]
    async fn test_move_add_failure_removes_nothing() {
        let s = setup().await;
        let flaky = Arc::new(FlakyStore {
            inner: s.fx.repo.clone(),
            fail_union: AtomicBool::new(true),
            fail_remove: AtomicBool::new(false),
        });
        let coordinator = ReassignmentCoordinator::new(MembershipManager::new(flaky));

        let proposal = coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();
        let err = coordinator
            .resolve(&proposal.proposal_id, Outcome::Move)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(s.fx.records(&s.team_a).await.len(), 1);
        assert!(s.fx.records(&s.team_b).await.is_empty());
    }

    #[tokio::test]
    async fn test_move_remove_failure_leaves_employee_in_both() {
        let s = setup().await;
        let flaky = Arc::new(FlakyStore {
            inner: s.fx.repo.clone(),
            fail_union: AtomicBool::new(false),
            fail_remove: AtomicBool::new(true),
        });
        let coordinator = ReassignmentCoordinator::new(MembershipManager::new(flaky));

        let proposal = coordinator
            .propose(&teams(&s).await, &s.membership_id, &s.team_b)
            .await
            .unwrap()
            .unwrap();
        let err = coordinator
            .resolve(&proposal.proposal_id, Outcome::Move)
            .await
            .unwrap_err();

        match err {
            AppError::PartialFailure { committed, .. } => assert_eq!(committed.len(), 1),
            other => panic!("expected partial failure, got {:?}", other),
        }
        assert_eq!(s.fx.records(&s.team_a).await.len(), 1);
        assert_eq!(s.fx.records(&s.team_b).await.len(), 1);
    }
}
