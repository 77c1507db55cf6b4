//! Collection snapshots pushed by the entity store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Employee, Team};

/// Last-known state of both collections.
///
/// The collections are shared behind `Arc` so handing a snapshot to a view
/// is a pointer copy.
#[derive(Debug, Clone, Default)]
pub struct OrgSnapshot {
    pub revision_id: i64,
    pub employees: Arc<Vec<Employee>>,
    pub teams: Arc<Vec<Team>>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub loaded: bool,
}
