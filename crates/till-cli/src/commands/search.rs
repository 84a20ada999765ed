use till_core::EntityKind;

use crate::commands::common::{format_record_lines, parse_filters, print_json, Context};
use crate::commands::with_entity;
use crate::error::CliError;

pub async fn run_search(
    kind: EntityKind,
    filters: &[String],
    as_json: bool,
    context: &Context,
) -> Result<(), CliError> {
    let client = context.client()?;

    with_entity!(kind, |E| {
        let filter = parse_filters::<E>(filters)?;
        let records = client.search::<E>(&filter).await?;
        if as_json {
            print_json(&records)?;
        } else if records.is_empty() {
            println!("No matching {}.", kind.collection());
        } else {
            for line in format_record_lines(&records) {
                println!("{line}");
            }
        }
    });

    Ok(())
}
