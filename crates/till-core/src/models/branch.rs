//! Branch model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::util::contains_ignore_case;

/// A store branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub version: u64,
}

impl Branch {
    /// Create a new branch with a fresh id
    #[must_use]
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: super::new_record_id(),
            name: name.into(),
            location: location.into(),
            last_modified: 0,
            version: 0,
        }
    }
}

/// Remote branch search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Entity for Branch {
    const KIND: EntityKind = EntityKind::Branch;
    type Search = BranchSearch;

    fn id(&self) -> &str {
        &self.id
    }

    fn last_modified(&self) -> i64 {
        self.last_modified
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_stamp(&mut self, last_modified: i64, version: u64) {
        self.last_modified = last_modified;
        self.version = version;
    }

    fn matches(&self, filter: &BranchSearch) -> bool {
        contains_ignore_case(&self.name, filter.name.as_deref())
            && contains_ignore_case(&self.location, filter.location.as_deref())
    }
}
