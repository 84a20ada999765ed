use till_core::EntityKind;

use crate::commands::common::{format_record_lines, print_json, Context};
use crate::commands::with_entity;
use crate::error::CliError;

pub async fn run_list(kind: EntityKind, as_json: bool, context: &Context) -> Result<(), CliError> {
    let store = context.open_store()?;

    with_entity!(kind, |E| {
        let records = store.list::<E>().await;
        if as_json {
            print_json(&records)?;
        } else if records.is_empty() {
            println!("No {} stored locally.", kind.collection());
        } else {
            for line in format_record_lines(&records) {
                println!("{line}");
            }
        }
    });

    Ok(())
}
