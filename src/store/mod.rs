//! Entity store adapter.
//!
//! SQLite is the canonical store for employees and teams. Every committed
//! write republishes the whole affected collection to its subscribers; the
//! rest of the process only learns about state changes through those pushes.

mod repository;

pub use repository::*;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::models::{Employee, MemberRecord, Team};

/// Full contents of one collection as of `revision_id`.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<T> {
    pub revision_id: i64,
    pub records: Arc<Vec<T>>,
}

/// Latest revision published for each collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionRevisions {
    pub employees: i64,
    pub teams: i64,
}

impl CollectionRevisions {
    /// Every collection is at least as new as in `target`.
    pub fn covers(&self, target: &CollectionRevisions) -> bool {
        self.employees >= target.employees && self.teams >= target.teams
    }
}

/// Handle for a live collection subscription. Dropping it stops delivery.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Deliver the current snapshot, then every later one, until unsubscribed
/// or the store goes away.
pub(crate) fn subscribe_to<T, F>(
    mut rx: watch::Receiver<CollectionSnapshot<T>>,
    on_snapshot: F,
) -> Subscription
where
    T: Clone + Send + Sync + 'static,
    F: Fn(CollectionSnapshot<T>) + Send + 'static,
{
    let handle = tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            on_snapshot(snapshot);
            if rx.changed().await.is_err() {
                break;
            }
        }
    });
    Subscription { handle }
}

/// The store operations membership mutations are built from.
///
/// Each call is atomic at the store; sequences of calls are not.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn get_team(&self, team_id: &str) -> Result<Option<Team>, AppError>;

    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, AppError>;

    /// Array-union: append `record` unless an equal element is present.
    /// Returns whether the team changed.
    async fn union_member_record(
        &self,
        team_id: &str,
        record: &MemberRecord,
    ) -> Result<bool, AppError>;

    /// Array-remove: drop every element equal to `record`.
    /// Returns whether the team changed.
    async fn remove_member_record(
        &self,
        team_id: &str,
        record: &MemberRecord,
    ) -> Result<bool, AppError>;

    async fn set_supervisor(&self, team_id: &str, supervisor_id: &str) -> Result<Team, AppError>;
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            position TEXT NOT NULL,
            date_hired TEXT NOT NULL,
            contact TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'Active',
            archived INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // member_records holds a JSON array of {membershipId, employeeId}
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            supervisor_id TEXT NOT NULL,
            member_records TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_employees_name ON employees(name);
        CREATE INDEX IF NOT EXISTS idx_employees_archived ON employees(archived);
        CREATE INDEX IF NOT EXISTS idx_teams_supervisor ON teams(supervisor_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
