//! Owner/admin model

use serde::{Deserialize, Serialize};

/// Role of a signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OwnerRole {
    #[default]
    Owner,
    Cashier,
}

/// The single owner/admin account. Read-only from the client's perspective:
/// it is fetched from the backend and cached, never pushed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pin: String,
    #[serde(default)]
    pub role: OwnerRole,
}

impl std::fmt::Debug for Owner {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Owner")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pin", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}
