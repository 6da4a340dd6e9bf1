use anyhow::Result;
use chrono::Duration;
use serde_json::json;

use maplefile::catalog::{DEFAULT_CATEGORY, DEFAULT_FILE_NOTES, DEFAULT_STATUS, SEED_CHECKLIST};
use maplefile::checklist;
use maplefile::files;

#[path = "util.rs"]
mod util;

#[tokio::test]
async fn provisioning_creates_an_active_file_with_the_seed_checklist() -> Result<()> {
    let pool = util::memory_pool().await?;

    assert!(files::find_active_file(&pool, "client-1").await?.is_none());

    let file = files::get_or_create_active_file(&pool, "client-1").await?;
    assert_eq!(file.owner_id, "client-1");
    assert!(file.is_active);
    assert!(file.file_number.starts_with("IMM-"));
    assert!(file.file_number.ends_with("nt-1"));
    assert_eq!(file.category, DEFAULT_CATEGORY);
    assert_eq!(file.status, DEFAULT_STATUS);
    assert_eq!(file.crs_score, 0);
    assert_eq!(file.notes.as_deref(), Some(DEFAULT_FILE_NOTES));
    assert_eq!(file.profile, json!({}));

    let items = checklist::list_items(&pool, &file.id).await?;
    assert_eq!(items.len(), SEED_CHECKLIST.len());
    for (idx, (item, seed)) in items.iter().zip(SEED_CHECKLIST).enumerate() {
        assert_eq!(item.title, seed.title);
        assert_eq!(item.description.as_deref(), Some(seed.description));
        assert_eq!(item.position, idx as i64);
        assert!(!item.is_completed);
        let due = item.due_date.expect("seed items carry a due date");
        assert_eq!(due - file.created_at, Duration::days(seed.due_in_days));
    }

    Ok(())
}

#[tokio::test]
async fn get_or_create_is_idempotent_per_owner() -> Result<()> {
    let pool = util::memory_pool().await?;

    let first = files::get_or_create_active_file(&pool, "client-1").await?;
    let second = files::get_or_create_active_file(&pool, "client-1").await?;
    assert_eq!(first.id, second.id);
    assert_eq!(first.file_number, second.file_number);

    // Repeat calls never re-seed the checklist.
    let items = checklist::list_items(&pool, &first.id).await?;
    assert_eq!(items.len(), SEED_CHECKLIST.len());

    Ok(())
}

#[tokio::test]
async fn owners_get_separate_active_files() -> Result<()> {
    let pool = util::memory_pool().await?;

    let alpha = files::get_or_create_active_file(&pool, "client-a").await?;
    let beta = files::get_or_create_active_file(&pool, "client-b").await?;
    assert_ne!(alpha.id, beta.id);

    let found = files::find_active_file(&pool, "client-a")
        .await?
        .expect("client-a keeps an active file");
    assert_eq!(found.id, alpha.id);

    Ok(())
}

#[tokio::test]
async fn explicit_creation_never_steals_the_active_slot() -> Result<()> {
    let pool = util::memory_pool().await?;

    let active = files::get_or_create_active_file(&pool, "client-1").await?;
    let extra = files::create_file(
        &pool,
        "client-1",
        maplefile::model::NewFilePayload {
            file_number: "IMM-MANUAL-0001".into(),
            category: None,
            crs_score: None,
            status: None,
            notes: None,
        },
    )
    .await?;

    assert!(!extra.is_active);
    assert_eq!(extra.category, DEFAULT_CATEGORY);
    assert_eq!(extra.status, DEFAULT_STATUS);
    // Explicit files start without a checklist.
    assert!(checklist::list_items(&pool, &extra.id).await?.is_empty());

    let still_active = files::find_active_file(&pool, "client-1")
        .await?
        .expect("active file survives explicit creation");
    assert_eq!(still_active.id, active.id);

    Ok(())
}
