use std::path::PathBuf;

use clap::Parser;
use pretty_assertions::assert_eq;
use till_core::models::{CashierSearch, OwnerRole, ProductSearch};
use till_core::{EntityKind, LocalStoreService, Owner, Product, Sale, SyncConflict};

use crate::cli::{Cli, Commands, CompletionShell};
use crate::commands::common::{
    format_relative_time, format_sync_conflict_lines, format_sync_timestamp, normalize_content,
    normalize_record_id, parse_filters, parse_record, Context,
};
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::delete::run_delete;
use crate::commands::owner::{owner_line, run_owner};
use crate::commands::put::run_put;
use crate::error::CliError;

fn test_context(dir: &tempfile::TempDir, user: Option<&str>) -> Context {
    Context::new(
        Some(dir.path().join("till.db")),
        // Nothing listens on port 9 locally
        Some("http://127.0.0.1:9".to_string()),
        user.map(str::to_string),
    )
}

fn reopen(context: &Context) -> LocalStoreService {
    LocalStoreService::open_path(&context.db_path).unwrap()
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
    assert!(matches!(
        normalize_record_id("   "),
        Err(CliError::EmptyRecordId)
    ));
}

#[test]
fn parse_record_generates_missing_id() {
    let generated: Product = parse_record(r#"{"name":"Rice","price":100}"#).unwrap();
    assert!(!generated.id.is_empty());
    assert_eq!(generated.name, "Rice");

    let kept: Product = parse_record(r#"{"id":"p1","name":"Rice"}"#).unwrap();
    assert_eq!(kept.id, "p1");

    assert!(matches!(
        parse_record::<Product>("[1, 2]"),
        Err(CliError::InvalidPayload)
    ));
}

#[test]
fn parse_filters_accepts_snake_case_keys() {
    let filter = parse_filters::<till_core::Cashier>(&["branch_id=b1".to_string()]).unwrap();
    assert_eq!(
        filter,
        CashierSearch {
            name: None,
            branch_id: Some("b1".to_string()),
        }
    );

    let filter = parse_filters::<Product>(&[
        "name = rice".to_string(),
        "category=Grains".to_string(),
    ])
    .unwrap();
    assert_eq!(filter.name.as_deref(), Some("rice"));
    assert_eq!(filter.category.as_deref(), Some("Grains"));
    assert_eq!(parse_filters::<Product>(&[]).unwrap(), ProductSearch::default());

    assert!(matches!(
        parse_filters::<Product>(&["rice".to_string()]),
        Err(CliError::InvalidFilter(_))
    ));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(0, now), "never");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_sync_conflict_lines_include_key_fields() {
    let conflicts = vec![SyncConflict {
        id: 1,
        collection: "products".to_string(),
        record_id: "p1".to_string(),
        remote_last_modified: 200,
        incoming_last_modified: 100,
        remote_version: 3,
        incoming_version: 2,
        resolved_at: 300,
        strategy: "lww".to_string(),
    }];

    let rendered = format_sync_conflict_lines(&conflicts);
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("lww"));
    assert!(rendered[0].contains("products=p1"));
    assert!(rendered[0].contains("remote=v3@200"));
    assert!(rendered[0].contains("incoming=v2@100"));
}

#[test]
fn cli_accepts_plural_entity_names() {
    let cli = Cli::try_parse_from(["till", "list", "products", "--json"]).unwrap();
    match cli.command {
        Commands::List { entity, json } => {
            assert_eq!(EntityKind::from(entity), EntityKind::Product);
            assert!(json);
        }
        _ => panic!("expected list command"),
    }

    assert!(Cli::try_parse_from(["till", "list", "invoices"]).is_err());
}

#[test]
fn owner_line_never_shows_pin() {
    let owner = Owner {
        id: "owner-1".to_string(),
        name: "John Doe".to_string(),
        pin: "5222".to_string(),
        role: OwnerRole::Owner,
    };
    let line = owner_line(&owner);
    assert!(line.contains("John Doe"));
    assert!(line.contains("(owner)"));
    assert!(!line.contains("5222"));
}

#[tokio::test]
async fn put_then_delete_queues_tombstone() {
    let dir = tempfile::tempdir().unwrap();
    let context = test_context(&dir, None);

    run_put(
        EntityKind::Product,
        Some(r#"{"id":"p1","name":"Rice","price":100}"#),
        &context,
    )
    .await
    .unwrap();
    assert_eq!(reopen(&context).list::<Product>().await.len(), 1);

    run_delete(EntityKind::Product, "p1", &context).await.unwrap();

    let store = reopen(&context);
    assert!(store.list::<Product>().await.is_empty());
    assert_eq!(store.tombstones::<Product>().await, vec!["p1".to_string()]);
}

#[tokio::test]
async fn delete_missing_record_fails() {
    let dir = tempfile::tempdir().unwrap();
    let context = test_context(&dir, None);

    let err = run_delete(EntityKind::Branch, "b404", &context)
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::RecordNotFound(_, _)));
    assert!(reopen(&context).tombstones::<till_core::Branch>().await.is_empty());
}

#[tokio::test]
async fn put_sale_attributes_user_and_totals_items() {
    let dir = tempfile::tempdir().unwrap();
    let context = test_context(&dir, Some("Wanjiru"));

    run_put(
        EntityKind::Sale,
        Some(
            r#"{"id":"s1","paymentMethod":"cash","items":[
                {"id":"p1","name":"Rice","price":100,"quantity":2},
                {"id":"p2","name":"Salt","price":25.5,"quantity":1}
            ]}"#,
        ),
        &context,
    )
    .await
    .unwrap();

    let sale = reopen(&context).get::<Sale>("s1").await.unwrap();
    assert_eq!(sale.user_name, "Wanjiru");
    assert!((sale.total - 225.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn owner_falls_back_to_cached_copy_offline() {
    let dir = tempfile::tempdir().unwrap();
    let context = test_context(&dir, None);

    assert!(matches!(
        run_owner(&context).await,
        Err(CliError::Sync(_))
    ));

    reopen(&context)
        .cache_owner(&Owner {
            id: "owner-1".to_string(),
            name: "John Doe".to_string(),
            pin: "5222".to_string(),
            role: OwnerRole::Owner,
        })
        .await
        .unwrap();

    assert!(run_owner(&context).await.is_ok());
}

#[test]
fn completions_write_to_nested_file() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("completions").join("till.bash");

    run_completions(CompletionShell::Bash, Some(path.as_path())).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("till"));
    assert!(script.contains("pending"));
}

#[test]
fn completions_render_for_every_shell() {
    for shell in [
        CompletionShell::Bash,
        CompletionShell::Zsh,
        CompletionShell::Fish,
        CompletionShell::PowerShell,
        CompletionShell::Elvish,
    ] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        assert!(script.contains("till"), "{shell:?}");
    }
}

#[tokio::test]
async fn put_sale_works_without_usable_sync_settings() {
    let dir = tempfile::tempdir().unwrap();
    let context = Context::new(
        Some(dir.path().join("till.db")),
        Some("not-a-url".to_string()),
        None,
    );

    run_put(
        EntityKind::Sale,
        Some(r#"{"id":"s1","paymentMethod":"cash","total":50}"#),
        &context,
    )
    .await
    .unwrap();

    let sale = reopen(&context).get::<Sale>("s1").await.unwrap();
    assert_eq!(sale.user_name, "User");
}
