use serde::Serialize;

use crate::commands::common::{print_json, Context};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub collection: &'static str,
    pub deleted_ids: Vec<String>,
}

pub async fn run_pending(as_json: bool, context: &Context) -> Result<(), CliError> {
    let store = context.open_store()?;
    let pending = store
        .pending_deletions()
        .await
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(kind, deleted_ids)| PendingItem {
            collection: kind.collection(),
            deleted_ids,
        })
        .collect::<Vec<_>>();

    if as_json {
        return print_json(&pending);
    }

    if pending.is_empty() {
        println!("No deletions waiting for sync.");
        return Ok(());
    }

    for item in &pending {
        for id in &item.deleted_ids {
            println!("{:<10}  {id}", item.collection);
        }
    }
    Ok(())
}
