//! Client-side reactive cache of the last-synced collections.
//!
//! Only the store subscriptions write here. Handlers that mutate data go
//! through the entity store and wait for the resulting snapshot like
//! everyone else.

use std::sync::{Arc, RwLock};

use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::models::{Employee, OrgSnapshot, RevisionInfo, Team};
use crate::store::{CollectionRevisions, CollectionSnapshot, Repository, Subscription};

#[derive(Default)]
struct Cached {
    employees: Option<CollectionSnapshot<Employee>>,
    teams: Option<CollectionSnapshot<Team>>,
}

/// Process-wide holder of the latest employee and team snapshots.
#[derive(Default)]
pub struct ReactiveStore {
    cached: RwLock<Cached>,
    notify: Notify,
}

impl ReactiveStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to both collections of `repo`. The cache stays live for as
    /// long as the returned handles are held.
    pub fn attach(self: &Arc<Self>, repo: &Repository) -> Vec<Subscription> {
        let for_employees = Arc::clone(self);
        let for_teams = Arc::clone(self);
        vec![
            repo.subscribe_employees(move |snapshot| for_employees.apply_employees(snapshot)),
            repo.subscribe_teams(move |snapshot| for_teams.apply_teams(snapshot)),
        ]
    }

    pub fn apply_employees(&self, snapshot: CollectionSnapshot<Employee>) {
        {
            let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
            // A slow subscriber must not roll the cache back
            if is_stale(cached.employees.as_ref(), snapshot.revision_id) {
                return;
            }
            cached.employees = Some(snapshot);
        }
        self.notify.notify_waiters();
    }

    pub fn apply_teams(&self, snapshot: CollectionSnapshot<Team>) {
        {
            let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
            if is_stale(cached.teams.as_ref(), snapshot.revision_id) {
                return;
            }
            cached.teams = Some(snapshot);
        }
        self.notify.notify_waiters();
    }

    /// Both collections have delivered at least one snapshot.
    pub fn is_loaded(&self) -> bool {
        let cached = self.cached.read().unwrap_or_else(|e| e.into_inner());
        cached.employees.is_some() && cached.teams.is_some()
    }

    /// Cheap copy of the current state for view computation.
    pub fn snapshot(&self) -> OrgSnapshot {
        let cached = self.cached.read().unwrap_or_else(|e| e.into_inner());
        let employees_rev = cached.employees.as_ref().map_or(0, |s| s.revision_id);
        let teams_rev = cached.teams.as_ref().map_or(0, |s| s.revision_id);

        OrgSnapshot {
            revision_id: employees_rev.max(teams_rev),
            employees: cached
                .employees
                .as_ref()
                .map(|s| Arc::clone(&s.records))
                .unwrap_or_default(),
            teams: cached
                .teams
                .as_ref()
                .map(|s| Arc::clone(&s.records))
                .unwrap_or_default(),
        }
    }

    pub fn revision_info(&self) -> RevisionInfo {
        RevisionInfo {
            revision_id: self.snapshot().revision_id,
            loaded: self.is_loaded(),
        }
    }

    /// Revision applied per collection, 0 for one not yet delivered.
    pub fn revisions(&self) -> CollectionRevisions {
        let cached = self.cached.read().unwrap_or_else(|e| e.into_inner());
        CollectionRevisions {
            employees: cached.employees.as_ref().map_or(0, |s| s.revision_id),
            teams: cached.teams.as_ref().map_or(0, |s| s.revision_id),
        }
    }

    /// Resolves once a snapshot is applied after this call.
    pub fn changed(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Wait until both collections have delivered their first snapshot.
    pub async fn wait_loaded(&self) {
        loop {
            let changed = self.changed();
            if self.is_loaded() {
                return;
            }
            changed.await;
        }
    }

    /// Wait until each collection is at least as new as in `target`.
    pub async fn wait_for_revisions(&self, target: CollectionRevisions) {
        loop {
            let changed = self.changed();
            if self.revisions().covers(&target) {
                return;
            }
            changed.await;
        }
    }
}

fn is_stale<T>(current: Option<&CollectionSnapshot<T>>, incoming: i64) -> bool {
    current.is_some_and(|c| c.revision_id > incoming)
}
