use till_core::{EntityKind, Sale};

use crate::commands::common::{parse_record, resolve_payload, Context};
use crate::commands::with_entity;
use crate::error::CliError;

pub async fn run_put(
    kind: EntityKind,
    payload: Option<&str>,
    context: &Context,
) -> Result<(), CliError> {
    let raw = resolve_payload(payload)?;

    let store = context.open_store()?;
    let id = if kind == EntityKind::Sale {
        let mut sale: Sale = parse_record(&raw)?;
        if sale.total.abs() < f64::EPSILON && !sale.items.is_empty() {
            sale.total = Sale::total_of(&sale.items);
        }
        if sale.user_name.trim().is_empty() {
            sale.user_name = context.user_name();
        }
        store.upsert(sale).await?.id
    } else {
        with_entity!(kind, |E| {
            let record: E = parse_record(&raw)?;
            store.upsert(record).await?.id
        })
    };

    println!("{id}");
    Ok(())
}
