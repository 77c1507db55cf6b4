//! SQLite repository for the employee and team collections.
//!
//! Uses prepared statements; membership array edits run as single statements
//! so each one is atomic on its own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::watch;

use super::{subscribe_to, CollectionRevisions, CollectionSnapshot, MembershipStore, Subscription};
use crate::errors::AppError;
use crate::models::{
    CreateEmployeeRequest, CreateTeamRequest, Employee, EmploymentStatus, MemberRecord, Position,
    Team, UpdateEmployeeRequest, UpdateTeamRequest,
};

const EMPLOYEE_COLUMNS: &str =
    "id, name, position, date_hired, contact, email, status, archived, updated_at, version";
const TEAM_COLUMNS: &str = "id, name, supervisor_id, member_records, updated_at, version";

/// Canonical store for both collections, with a push channel per collection.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    employees_tx: Arc<watch::Sender<CollectionSnapshot<Employee>>>,
    teams_tx: Arc<watch::Sender<CollectionSnapshot<Team>>>,
}

impl Repository {
    /// Wrap a migrated pool and seed both channels with the current rows.
    pub async fn open(pool: SqlitePool) -> Result<Self, AppError> {
        let revision_id = fetch_revision_id(&pool).await?;
        let employees = fetch_employees(&pool).await?;
        let teams = fetch_teams(&pool).await?;

        let (employees_tx, _) = watch::channel(CollectionSnapshot {
            revision_id,
            records: Arc::new(employees),
        });
        let (teams_tx, _) = watch::channel(CollectionSnapshot {
            revision_id,
            records: Arc::new(teams),
        });

        Ok(Self {
            pool,
            employees_tx: Arc::new(employees_tx),
            teams_tx: Arc::new(teams_tx),
        })
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        fetch_revision_id(&self.pool).await
    }

    /// Increment the revision ID and return the new value.
    async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(
            "UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1 RETURNING revision_id",
        )
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("revision_id"))
    }

    // ==================== SUBSCRIPTIONS ====================

    /// Revisions last pushed on each channel. Writes publish before they
    /// return, so this covers every write that has completed.
    pub fn published_revisions(&self) -> CollectionRevisions {
        CollectionRevisions {
            employees: self.employees_tx.borrow().revision_id,
            teams: self.teams_tx.borrow().revision_id,
        }
    }

    /// Receive the full employee collection now and after every change.
    pub fn subscribe_employees<F>(&self, on_snapshot: F) -> Subscription
    where
        F: Fn(CollectionSnapshot<Employee>) + Send + 'static,
    {
        subscribe_to(self.employees_tx.subscribe(), on_snapshot)
    }

    /// Receive the full team collection now and after every change.
    pub fn subscribe_teams<F>(&self, on_snapshot: F) -> Subscription
    where
        F: Fn(CollectionSnapshot<Team>) + Send + 'static,
    {
        subscribe_to(self.teams_tx.subscribe(), on_snapshot)
    }

    async fn publish_employees(&self, revision_id: i64) {
        match fetch_employees(&self.pool).await {
            Ok(employees) => {
                tracing::debug!(revision_id, count = employees.len(), "Publishing employees");
                publish_newer(&self.employees_tx, revision_id, employees);
            }
            // The write itself committed; the next successful publish catches up.
            Err(e) => tracing::warn!("Failed to republish employees: {}", e),
        }
    }

    async fn publish_teams(&self, revision_id: i64) {
        match fetch_teams(&self.pool).await {
            Ok(teams) => {
                tracing::debug!(revision_id, count = teams.len(), "Publishing teams");
                publish_newer(&self.teams_tx, revision_id, teams);
            }
            Err(e) => tracing::warn!("Failed to republish teams: {}", e),
        }
    }

    // ==================== EMPLOYEE OPERATIONS ====================

    /// Get an employee by ID.
    pub async fn get_employee(&self, id: &str) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE id = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(employee_from_row).transpose()
    }

    /// Register a new employee.
    pub async fn create_employee(
        &self,
        request: &CreateEmployeeRequest,
    ) -> Result<Employee, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO employees (id, name, position, date_hired, contact, email, status, archived, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, 1)"
        )
        .bind(&id)
        .bind(&request.name)
        .bind(request.position.as_str())
        .bind(request.date_hired.to_string())
        .bind(&request.contact)
        .bind(&request.email)
        .bind(request.status.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let revision_id = self.increment_revision().await?;
        self.publish_employees(revision_id).await;

        Ok(Employee {
            id,
            name: request.name.clone(),
            position: request.position,
            date_hired: request.date_hired,
            contact: request.contact.clone(),
            email: request.email.clone(),
            status: request.status,
            archived: false,
            updated_at: now,
            version: 1,
        })
    }

    /// Update an employee with optimistic concurrency control.
    pub async fn update_employee(
        &self,
        id: &str,
        request: &UpdateEmployeeRequest,
    ) -> Result<Employee, AppError> {
        let existing = self
            .get_employee(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;

        check_expected_version(request.expected_version, existing.version)?;

        let now = Utc::now().to_rfc3339();
        let updated = Employee {
            id: existing.id.clone(),
            name: request.name.clone().unwrap_or(existing.name),
            position: request.position.unwrap_or(existing.position),
            date_hired: request.date_hired.unwrap_or(existing.date_hired),
            contact: request.contact.clone().unwrap_or(existing.contact),
            email: request.email.clone().unwrap_or(existing.email),
            status: request.status.unwrap_or(existing.status),
            archived: request.archived.unwrap_or(existing.archived),
            updated_at: now,
            version: existing.version + 1,
        };

        // Conditional UPDATE so a write that slipped in after our read is not clobbered
        let result = sqlx::query(
            "UPDATE employees SET name = ?, position = ?, date_hired = ?, contact = ?, email = ?, status = ?, archived = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&updated.name)
        .bind(updated.position.as_str())
        .bind(updated.date_hired.to_string())
        .bind(&updated.contact)
        .bind(&updated.email)
        .bind(updated.status.as_str())
        .bind(updated.archived as i32)
        .bind(&updated.updated_at)
        .bind(updated.version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_employee(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|e| e.version).unwrap_or(0),
            });
        }

        let revision_id = self.increment_revision().await?;
        self.publish_employees(revision_id).await;

        Ok(updated)
    }

    /// Soft delete: the employee leaves every active view but stays resolvable.
    pub async fn archive_employee(&self, id: &str) -> Result<Employee, AppError> {
        self.update_employee(
            id,
            &UpdateEmployeeRequest {
                archived: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Hard delete an employee row.
    pub async fn delete_employee(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Employee {} not found", id)));
        }

        let revision_id = self.increment_revision().await?;
        self.publish_employees(revision_id).await;
        Ok(())
    }

    // ==================== TEAM OPERATIONS ====================

    /// Get a team by ID.
    pub async fn get_team(&self, id: &str) -> Result<Option<Team>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM teams WHERE id = ?", TEAM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(team_from_row).transpose()
    }

    /// Create a team with no members.
    pub async fn create_team(&self, request: &CreateTeamRequest) -> Result<Team, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO teams (id, name, supervisor_id, member_records, updated_at, version) VALUES (?, ?, ?, '[]', ?, 1)"
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.supervisor_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let revision_id = self.increment_revision().await?;
        self.publish_teams(revision_id).await;

        Ok(Team {
            id,
            name: request.name.clone(),
            supervisor_id: request.supervisor_id.clone(),
            member_records: Vec::new(),
            updated_at: now,
            version: 1,
        })
    }

    /// Rename a team or change its supervisor. Membership is never touched here.
    pub async fn update_team(&self, id: &str, request: &UpdateTeamRequest) -> Result<Team, AppError> {
        let existing = self
            .get_team(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))?;

        check_expected_version(request.expected_version, existing.version)?;

        let now = Utc::now().to_rfc3339();
        let name = request.name.clone().unwrap_or(existing.name);
        let supervisor_id = request
            .supervisor_id
            .clone()
            .unwrap_or(existing.supervisor_id);

        let result = sqlx::query(
            "UPDATE teams SET name = ?, supervisor_id = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?"
        )
        .bind(&name)
        .bind(&supervisor_id)
        .bind(&now)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_team(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|t| t.version).unwrap_or(0),
            });
        }

        let revision_id = self.increment_revision().await?;
        self.publish_teams(revision_id).await;

        // Re-read: a membership edit may have landed since `existing` was fetched
        self.get_team(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
    }

    /// Delete a team together with all of its membership records.
    pub async fn delete_team(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Team {} not found", id)));
        }

        let revision_id = self.increment_revision().await?;
        self.publish_teams(revision_id).await;
        Ok(())
    }

    async fn team_exists(&self, id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Append a membership record unless an identical element is already present.
    pub async fn union_member_record(
        &self,
        team_id: &str,
        record: &MemberRecord,
    ) -> Result<bool, AppError> {
        let now = Utc::now().to_rfc3339();
        let element = serde_json::to_string(record)?;

        let result = sqlx::query(
            r#"UPDATE teams
               SET member_records = json_insert(member_records, '$[#]', json(?)),
                   updated_at = ?, version = version + 1
               WHERE id = ? AND NOT EXISTS (
                   SELECT 1 FROM json_each(teams.member_records)
                   WHERE json_extract(value, '$.membershipId') = ?
                     AND json_extract(value, '$.employeeId') = ?
               )"#,
        )
        .bind(&element)
        .bind(&now)
        .bind(team_id)
        .bind(&record.membership_id)
        .bind(&record.employee_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if !self.team_exists(team_id).await? {
                return Err(AppError::NotFound(format!("Team {} not found", team_id)));
            }
            return Ok(false);
        }

        let revision_id = self.increment_revision().await?;
        self.publish_teams(revision_id).await;
        Ok(true)
    }

    /// Remove every membership element equal to `record`. Removing an absent
    /// element is not an error.
    pub async fn remove_member_record(
        &self,
        team_id: &str,
        record: &MemberRecord,
    ) -> Result<bool, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"UPDATE teams
               SET member_records = (
                       SELECT json_group_array(json(value)) FROM json_each(teams.member_records)
                       WHERE NOT (json_extract(value, '$.membershipId') = ?1
                              AND json_extract(value, '$.employeeId') = ?2)
                   ),
                   updated_at = ?3, version = version + 1
               WHERE id = ?4 AND EXISTS (
                   SELECT 1 FROM json_each(teams.member_records)
                   WHERE json_extract(value, '$.membershipId') = ?1
                     AND json_extract(value, '$.employeeId') = ?2
               )"#,
        )
        .bind(&record.membership_id)
        .bind(&record.employee_id)
        .bind(&now)
        .bind(team_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if !self.team_exists(team_id).await? {
                return Err(AppError::NotFound(format!("Team {} not found", team_id)));
            }
            return Ok(false);
        }

        let revision_id = self.increment_revision().await?;
        self.publish_teams(revision_id).await;
        Ok(true)
    }
}

#[async_trait]
impl MembershipStore for Repository {
    async fn get_team(&self, team_id: &str) -> Result<Option<Team>, AppError> {
        Repository::get_team(self, team_id).await
    }

    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, AppError> {
        Repository::get_employee(self, employee_id).await
    }

    async fn union_member_record(
        &self,
        team_id: &str,
        record: &MemberRecord,
    ) -> Result<bool, AppError> {
        Repository::union_member_record(self, team_id, record).await
    }

    async fn remove_member_record(
        &self,
        team_id: &str,
        record: &MemberRecord,
    ) -> Result<bool, AppError> {
        Repository::remove_member_record(self, team_id, record).await
    }

    async fn set_supervisor(&self, team_id: &str, supervisor_id: &str) -> Result<Team, AppError> {
        self.update_team(
            team_id,
            &UpdateTeamRequest {
                supervisor_id: Some(supervisor_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }
}

// Concurrent writers may finish their re-reads out of order; the channel
// only ever moves forward.
fn publish_newer<T>(
    tx: &watch::Sender<CollectionSnapshot<T>>,
    revision_id: i64,
    records: Vec<T>,
) {
    tx.send_if_modified(|current| {
        if current.revision_id > revision_id {
            return false;
        }
        *current = CollectionSnapshot {
            revision_id,
            records: Arc::new(records),
        };
        true
    });
}

fn check_expected_version(expected: Option<i64>, current: i64) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict {
            message: format!(
                "Version mismatch: expected {}, current {}",
                expected, current
            ),
            current_version: current,
        }),
        _ => Ok(()),
    }
}

async fn fetch_revision_id(pool: &SqlitePool) -> Result<i64, AppError> {
    let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
        .fetch_one(pool)
        .await?;
    Ok(row.get("revision_id"))
}

async fn fetch_employees(pool: &SqlitePool) -> Result<Vec<Employee>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM employees ORDER BY name COLLATE NOCASE",
        EMPLOYEE_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(employee_from_row).collect()
}

async fn fetch_teams(pool: &SqlitePool) -> Result<Vec<Team>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM teams ORDER BY name COLLATE NOCASE",
        TEAM_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(team_from_row).collect()
}

// Helper functions for row conversion

fn employee_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Employee, AppError> {
    let id: String = row.get("id");
    let position_str: String = row.get("position");
    let date_str: String = row.get("date_hired");
    let status_str: String = row.get("status");
    let archived: i32 = row.get("archived");

    let position = Position::parse(&position_str).ok_or_else(|| {
        AppError::Internal(format!("Employee {} has unknown position {:?}", id, position_str))
    })?;
    let date_hired = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        AppError::Internal(format!("Employee {} has bad hire date {:?}: {}", id, date_str, e))
    })?;
    let status = EmploymentStatus::parse(&status_str).unwrap_or_default();

    Ok(Employee {
        id,
        name: row.get("name"),
        position,
        date_hired,
        contact: row.get("contact"),
        email: row.get("email"),
        status,
        archived: archived != 0,
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

fn team_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Team, AppError> {
    let id: String = row.get("id");
    let records_str: String = row.get("member_records");
    let member_records: Vec<MemberRecord> = serde_json::from_str(&records_str).map_err(|e| {
        AppError::Internal(format!("Team {} has malformed member records: {}", id, e))
    })?;

    Ok(Team {
        id,
        name: row.get("name"),
        supervisor_id: row.get("supervisor_id"),
        member_records,
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_database;
    use tempfile::TempDir;

    async fn open_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        (Repository::open(pool).await.unwrap(), temp_dir)
    }

    fn agent(name: &str) -> CreateEmployeeRequest {
        CreateEmployeeRequest {
            name: name.to_string(),
            position: Position::Agent,
            date_hired: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            contact: String::new(),
            email: String::new(),
            status: EmploymentStatus::Active,
        }
    }

    fn record(membership_id: &str, employee_id: &str) -> MemberRecord {
        MemberRecord {
            membership_id: membership_id.to_string(),
            employee_id: employee_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_employee_round_trip_and_archive() {
        let (repo, _dir) = open_repo().await;

        let created = repo.create_employee(&agent("Bea Cruz")).await.unwrap();
        let fetched = repo.get_employee(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        let archived = repo.archive_employee(&created.id).await.unwrap();
        assert!(archived.archived);
        assert_eq!(archived.version, 2);

        // Soft delete keeps the row resolvable
        assert!(repo.get_employee(&created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_employee_version_conflict() {
        let (repo, _dir) = open_repo().await;
        let created = repo.create_employee(&agent("Carl Diaz")).await.unwrap();

        let err = repo
            .update_employee(
                &created.id,
                &UpdateEmployeeRequest {
                    name: Some("Carlos Diaz".to_string()),
                    expected_version: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { current_version: 1, .. }));
    }

    #[tokio::test]
    async fn test_union_and_remove_member_record() {
        let (repo, _dir) = open_repo().await;
        let team = repo
            .create_team(&CreateTeamRequest {
                name: "Alpha".to_string(),
                supervisor_id: "sup-1".to_string(),
            })
            .await
            .unwrap();
        assert!(team.member_records.is_empty());

        let r1 = record("m1", "e1");
        let r2 = record("m2", "e2");
        assert!(repo.union_member_record(&team.id, &r1).await.unwrap());
        assert!(repo.union_member_record(&team.id, &r2).await.unwrap());
        // Equal element already present
        assert!(!repo.union_member_record(&team.id, &r1).await.unwrap());

        let stored = repo.get_team(&team.id).await.unwrap().unwrap();
        assert_eq!(stored.member_records, vec![r1.clone(), r2.clone()]);

        assert!(repo.remove_member_record(&team.id, &r1).await.unwrap());
        assert!(!repo.remove_member_record(&team.id, &r1).await.unwrap());

        let stored = repo.get_team(&team.id).await.unwrap().unwrap();
        assert_eq!(stored.member_records, vec![r2]);
    }

    #[tokio::test]
    async fn test_member_record_on_missing_team() {
        let (repo, _dir) = open_repo().await;
        let err = repo
            .union_member_record("nope", &record("m1", "e1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_team_keeps_membership() {
        let (repo, _dir) = open_repo().await;
        let team = repo
            .create_team(&CreateTeamRequest {
                name: "Alpha".to_string(),
                supervisor_id: "sup-1".to_string(),
            })
            .await
            .unwrap();
        repo.union_member_record(&team.id, &record("m1", "e1"))
            .await
            .unwrap();

        let updated = MembershipStore::set_supervisor(&repo, &team.id, "sup-2")
            .await
            .unwrap();
        assert_eq!(updated.supervisor_id, "sup-2");
        assert_eq!(updated.member_records.len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_receives_full_collection() {
        let (repo, _dir) = open_repo().await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let subscription = repo.subscribe_employees(move |snapshot| {
            let _ = tx.send(snapshot);
        });

        let initial = rx.recv().await.unwrap();
        assert!(initial.records.is_empty());

        repo.create_employee(&agent("Dana Evans")).await.unwrap();
        let next = rx.recv().await.unwrap();
        assert_eq!(next.records.len(), 1);
        assert!(next.revision_id > initial.revision_id);

        subscription.unsubscribe();
        repo.create_employee(&agent("Eli Fox")).await.unwrap();
        // Sender side of the mpsc was dropped with the aborted task
        assert!(rx.recv().await.is_none());
    }
}
