use till_core::EntityKind;

use crate::commands::common::{normalize_record_id, Context};
use crate::commands::with_entity;
use crate::error::CliError;

pub async fn run_delete(kind: EntityKind, id: &str, context: &Context) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let store = context.open_store()?;

    let deleted = with_entity!(kind, |E| store.delete::<E>(&id).await?);
    if !deleted {
        return Err(CliError::RecordNotFound(kind.to_string(), id));
    }

    println!("{id}");
    Ok(())
}
