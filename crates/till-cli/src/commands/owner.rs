use till_core::models::OwnerRole;
use till_core::Owner;

use crate::commands::common::Context;
use crate::error::CliError;

/// Fetch the owner from the backend, falling back to the cached copy offline
pub async fn run_owner(context: &Context) -> Result<(), CliError> {
    let store = context.open_store()?;

    let owner = match context.client()?.fetch_owner().await {
        Ok(owner) => {
            store.cache_owner(&owner).await?;
            owner
        }
        Err(error) => {
            let Some(cached) = store.cached_owner().await else {
                return Err(error.into());
            };
            tracing::warn!("Backend unavailable ({error}); showing cached owner");
            cached
        }
    };

    println!("{}", owner_line(&owner));
    Ok(())
}

pub fn owner_line(owner: &Owner) -> String {
    let role = match owner.role {
        OwnerRole::Owner => "owner",
        OwnerRole::Cashier => "cashier",
    };
    format!("{}  {}  ({role})", owner.id, owner.name)
}
