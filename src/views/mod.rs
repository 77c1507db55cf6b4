//! Derived view builder.
//!
//! Pure functions of `(employees, teams)` producing every projection the
//! presentation layer may read. Archived employees are excluded unless a
//! function says otherwise. Nothing here touches the store.

mod paging;
mod roster;
mod search;
mod tenure;

pub use paging::*;
pub use roster::*;
pub use search::*;
pub use tenure::*;

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Employee, Position};

/// Sort direction; ascending unless toggled.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Minimal reference to an employee for list rows.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRef {
    pub id: String,
    pub name: String,
    pub position: Position,
}

impl From<&Employee> for EmployeeRef {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id.clone(),
            name: employee.name.clone(),
            position: employee.position,
        }
    }
}

/// Case-insensitive name ordering.
pub fn cmp_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Case-insensitive substring match against an already lowercased needle.
pub(crate) fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}

/// Index of non-archived employees by id.
pub(crate) fn active_index(employees: &[Employee]) -> HashMap<&str, &Employee> {
    employees
        .iter()
        .filter(|e| e.is_active())
        .map(|e| (e.id.as_str(), e))
        .collect()
}
