//! Explicit application state shared by the UI shell and the sync layer
//!
//! Replaces ambient lookups of "who is signed in" and "what is the sync
//! status" with one cloneable object that owns both.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Cashier, Owner, Sale};
use crate::services::LocalStoreService;
use crate::sync::{SyncError, SyncReconciler, SyncReport, SyncResult, SyncState};

/// Name used for sales recorded without a signed-in user
pub const DEFAULT_USER_NAME: &str = "User";

/// Role of the signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Cashier,
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_name: String,
    pub role: Role,
    pub branch_id: Option<String>,
}

impl Session {
    pub fn owner(owner: &Owner) -> Self {
        Self {
            user_name: owner.name.clone(),
            role: Role::Owner,
            branch_id: None,
        }
    }

    pub fn cashier(cashier: &Cashier) -> Self {
        Self {
            user_name: cashier.name.clone(),
            role: Role::Cashier,
            branch_id: Some(cashier.branch_id.clone()).filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    session: Option<Session>,
    sync_state: SyncState,
    last_sync_at: Option<DateTime<Utc>>,
    last_sync_error: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    store: LocalStoreService,
    reconciler: SyncReconciler,
    shared: Arc<RwLock<Shared>>,
}

impl AppState {
    pub fn new(store: LocalStoreService, reconciler: SyncReconciler) -> Self {
        Self {
            store,
            reconciler,
            shared: Arc::new(RwLock::new(Shared::default())),
        }
    }

    pub const fn store(&self) -> &LocalStoreService {
        &self.store
    }

    pub const fn reconciler(&self) -> &SyncReconciler {
        &self.reconciler
    }

    pub fn session(&self) -> Option<Session> {
        self.read(|shared| shared.session.clone())
    }

    pub fn sign_in(&self, session: Session) {
        tracing::info!(user = %session.user_name, role = ?session.role, "Signed in");
        self.write(|shared| shared.session = Some(session));
    }

    pub fn sign_out(&self) {
        self.write(|shared| shared.session = None);
    }

    /// Signed-in user's name, or `User` when nobody is signed in
    pub fn current_user_name(&self) -> String {
        self.session()
            .map(|session| session.user_name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string())
    }

    /// Sign in as the owner when `pin` matches the cached owner record
    pub async fn sign_in_owner(&self, pin: &str) -> Result<Session> {
        let owner = self
            .store
            .cached_owner()
            .await
            .ok_or_else(|| Error::NotFound("owner record has not been synced yet".to_string()))?;
        if owner.pin != pin {
            return Err(Error::InvalidInput("incorrect PIN".to_string()));
        }
        let session = Session::owner(&owner);
        self.sign_in(session.clone());
        Ok(session)
    }

    /// Sign in as the cashier whose PIN matches
    pub async fn sign_in_cashier(&self, pin: &str) -> Result<Session> {
        let cashier = self
            .store
            .list::<Cashier>()
            .await
            .into_iter()
            .find(|cashier| !cashier.pin.is_empty() && cashier.pin == pin)
            .ok_or_else(|| Error::InvalidInput("incorrect PIN".to_string()))?;
        let session = Session::cashier(&cashier);
        self.sign_in(session.clone());
        Ok(session)
    }

    /// Store a sale, attributing it to the signed-in user when unattributed
    pub async fn record_sale(&self, mut sale: Sale) -> Result<Sale> {
        if sale.user_name.trim().is_empty() {
            sale.user_name = self.current_user_name();
        }
        self.store.upsert(sale).await
    }

    pub fn sync_state(&self) -> SyncState {
        self.read(|shared| shared.sync_state)
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.read(|shared| shared.last_sync_at)
    }

    pub fn last_sync_error(&self) -> Option<String> {
        self.read(|shared| shared.last_sync_error.clone())
    }

    /// Run one sync cycle and record its outcome for the UI.
    ///
    /// A call rejected because another cycle is running leaves the shared
    /// state to that cycle.
    pub async fn sync(&self) -> SyncResult<SyncReport> {
        if self.reconciler.is_syncing() {
            return Err(SyncError::InProgress);
        }
        self.write(|shared| shared.sync_state = SyncState::Syncing);
        let result = self.reconciler.request_sync().await;
        self.write(|shared| match &result {
            Err(SyncError::InProgress) => {}
            Ok(_) => {
                shared.sync_state = SyncState::Synced;
                shared.last_sync_at = Some(Utc::now());
                shared.last_sync_error = None;
            }
            Err(error) => {
                shared.sync_state = SyncState::Error;
                shared.last_sync_error = Some(error.to_string());
            }
        });
        result
    }

    fn read<R>(&self, f: impl FnOnce(&Shared) -> R) -> R {
        let shared = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        f(&*shared)
    }

    fn write(&self, f: impl FnOnce(&mut Shared)) {
        let mut shared = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *shared);
    }
}
