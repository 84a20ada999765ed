//! Cashier model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::util::{contains_ignore_case, equals_filter};

/// A cashier account. `branch_id` is a loose reference: the sync protocol
/// never validates it or cascades branch deletions into it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cashier {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pin: String,
    #[serde(default)]
    pub branch_id: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub version: u64,
}

impl std::fmt::Debug for Cashier {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Cashier")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pin", &"[REDACTED]")
            .field("branch_id", &self.branch_id)
            .field("last_modified", &self.last_modified)
            .field("version", &self.version)
            .finish()
    }
}

impl Cashier {
    /// Create a new cashier with a fresh id
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        pin: impl Into<String>,
        branch_id: impl Into<String>,
    ) -> Self {
        Self {
            id: super::new_record_id(),
            name: name.into(),
            pin: pin.into(),
            branch_id: branch_id.into(),
            last_modified: 0,
            version: 0,
        }
    }
}

/// Remote cashier search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashierSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

impl Entity for Cashier {
    const KIND: EntityKind = EntityKind::Cashier;
    type Search = CashierSearch;

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

    fn matches(&self, filter: &CashierSearch) -> bool {
        contains_ignore_case(&self.name, filter.name.as_deref())
            && equals_filter(&self.branch_id, filter.branch_id.as_deref())
    }
}
