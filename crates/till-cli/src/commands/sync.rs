use crate::commands::common::{
    format_sync_conflict_lines, print_json, sync_conflict_to_item, Context, SyncConflictItem,
};
use crate::error::CliError;

pub async fn run_sync(context: &Context) -> Result<(), CliError> {
    let state = context.app_state()?;
    let report = state.sync().await?;

    println!(
        "Sync completed: pushed {} records and {} deletions, received {} records",
        report.pushed_records, report.pushed_deletions, report.received_records
    );
    if report.conflicts > 0 {
        println!(
            "{} stale writes were discarded; run `till sync conflicts` for details",
            report.conflicts
        );
    }
    Ok(())
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    context: &Context,
) -> Result<(), CliError> {
    let conflicts = context.client()?.list_conflicts(limit).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        return print_json(&json_items);
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
