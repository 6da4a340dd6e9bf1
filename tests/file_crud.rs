use anyhow::Result;
use serde_json::json;

use maplefile::auth::Requester;
use maplefile::catalog::{DEFAULT_CATEGORY, DEFAULT_STATUS};
use maplefile::documents::{self, BinaryStoreHandle};
use maplefile::files;
use maplefile::model::{
    FilePatch, NewDocumentPayload, NewFilePayload, ProfileSections, FILE_NOT_FOUND,
    VALIDATION_FILE_NUMBER_TAKEN, VALIDATION_NEGATIVE_CRS,
};

#[path = "util.rs"]
mod util;

fn payload(file_number: &str) -> NewFilePayload {
    NewFilePayload {
        file_number: file_number.to_string(),
        category: None,
        crs_score: None,
        status: None,
        notes: None,
    }
}

#[tokio::test]
async fn duplicate_file_numbers_are_rejected() -> Result<()> {
    let pool = util::memory_pool().await?;

    files::create_file(&pool, "client-1", payload("IMM-2026-0001")).await?;
    let err = files::create_file(&pool, "client-2", payload("IMM-2026-0001"))
        .await
        .expect_err("second create with the same number must fail");
    assert_eq!(err.code(), VALIDATION_FILE_NUMBER_TAKEN);

    Ok(())
}

#[tokio::test]
async fn negative_scores_never_persist() -> Result<()> {
    let pool = util::memory_pool().await?;

    let mut bad = payload("IMM-2026-0002");
    bad.crs_score = Some(-10);
    let err = files::create_file(&pool, "client-1", bad)
        .await
        .expect_err("negative score on create must fail");
    assert_eq!(err.code(), VALIDATION_NEGATIVE_CRS);

    let file = files::create_file(&pool, "client-1", payload("IMM-2026-0002")).await?;
    let err = files::update_crs_score(&pool, &file.id, -1)
        .await
        .expect_err("negative score on update must fail");
    assert_eq!(err.code(), VALIDATION_NEGATIVE_CRS);

    let stored = files::update_crs_score(&pool, &file.id, 488).await?;
    assert_eq!(stored, 488);
    assert_eq!(files::get_file(&pool, &file.id).await?.crs_score, 488);

    Ok(())
}

#[tokio::test]
async fn create_treats_empty_strings_as_absent() -> Result<()> {
    let pool = util::memory_pool().await?;

    let file = files::create_file(
        &pool,
        "client-1",
        NewFilePayload {
            file_number: "IMM-2026-0003".to_string(),
            category: Some(String::new()),
            crs_score: Some(455),
            status: Some(String::new()),
            notes: Some("Transferred from paper file".to_string()),
        },
    )
    .await?;

    assert_eq!(file.category, DEFAULT_CATEGORY);
    assert_eq!(file.status, DEFAULT_STATUS);
    assert_eq!(file.crs_score, 455);
    assert_eq!(file.notes.as_deref(), Some("Transferred from paper file"));

    Ok(())
}

#[tokio::test]
async fn partial_updates_keep_and_clear_per_field() -> Result<()> {
    let pool = util::memory_pool().await?;
    let mut seed = payload("IMM-2026-0004");
    seed.notes = Some("initial".to_string());
    let file = files::create_file(&pool, "client-1", seed).await?;

    let updated = files::update_file(
        &pool,
        &file.id,
        FilePatch {
            file_number: Some(String::new()),
            category: Some("Study Permit".to_string()),
            crs_score: Some(0),
            status: Some(String::new()),
            notes: Some(String::new()),
        },
    )
    .await?;

    // Empty number/status keep their values; notes clear; score 0 sticks.
    assert_eq!(updated.file_number, "IMM-2026-0004");
    assert_eq!(updated.status, DEFAULT_STATUS);
    assert_eq!(updated.category, "Study Permit");
    assert_eq!(updated.crs_score, 0);
    assert_eq!(updated.notes, None);

    let untouched = files::update_file(&pool, &file.id, FilePatch::default()).await?;
    assert_eq!(untouched.category, "Study Permit");
    assert_eq!(untouched.notes, None);

    Ok(())
}

#[tokio::test]
async fn renumbering_onto_a_taken_number_surfaces_a_store_error() -> Result<()> {
    let pool = util::memory_pool().await?;
    files::create_file(&pool, "client-1", payload("IMM-2026-0005")).await?;
    let second = files::create_file(&pool, "client-1", payload("IMM-2026-0006")).await?;

    let err = files::update_file(
        &pool,
        &second.id,
        FilePatch {
            file_number: Some("IMM-2026-0005".to_string()),
            ..FilePatch::default()
        },
    )
    .await
    .expect_err("unique index must hold on update");
    assert!(err.code().starts_with("STORE/"), "got {}", err.code());

    Ok(())
}

#[tokio::test]
async fn listing_is_role_scoped_and_newest_first() -> Result<()> {
    let pool = util::memory_pool().await?;
    // Creations can share a millisecond; pin distinct timestamps so the
    // ordering assertion is deterministic.
    for (number, owner, created_at) in [
        ("IMM-A-1", "client-a", 1_000_i64),
        ("IMM-A-2", "client-a", 2_000),
        ("IMM-B-1", "client-b", 3_000),
    ] {
        files::create_file(&pool, owner, payload(number)).await?;
        sqlx::query("UPDATE immigration_files SET created_at = ? WHERE file_number = ?")
            .bind(created_at)
            .bind(number)
            .execute(&pool)
            .await?;
    }

    let own = files::list_files(&pool, &Requester::client("client-a")).await?;
    let numbers: Vec<&str> = own.iter().map(|f| f.file_number.as_str()).collect();
    assert_eq!(numbers, vec!["IMM-A-2", "IMM-A-1"]);

    let all = files::list_files(&pool, &Requester::staff("officer-1")).await?;
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].file_number, "IMM-B-1");

    Ok(())
}

#[tokio::test]
async fn deleting_a_file_cascades_and_discards_binaries() -> Result<()> {
    let pool = util::memory_pool().await?;
    let store = BinaryStoreHandle::in_memory();
    let file = files::get_or_create_active_file(&pool, "client-1").await?;

    store.put("uploads/passport.pdf", b"%PDF").unwrap();
    store.put("uploads/payslip.pdf", b"%PDF").unwrap();
    for url in ["uploads/passport.pdf", "uploads/payslip.pdf"] {
        documents::add_document(
            &pool,
            &file.id,
            NewDocumentPayload {
                title: None,
                description: None,
                file_url: url.to_string(),
                mime_type: Some("application/pdf".to_string()),
            },
        )
        .await?;
    }

    files::delete_file(&pool, &store, &file.id).await?;

    let err = files::get_file(&pool, &file.id)
        .await
        .expect_err("file row must be gone");
    assert_eq!(err.code(), FILE_NOT_FOUND);

    let orphans: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM checklist_items WHERE file_id = ?")
            .bind(&file.id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(orphans, 0);
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE file_id = ?")
        .bind(&file.id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(orphans, 0);

    assert!(!store.contains("uploads/passport.pdf"));
    assert!(!store.contains("uploads/payslip.pdf"));

    let err = files::delete_file(&pool, &store, &file.id)
        .await
        .expect_err("second delete must report not found");
    assert_eq!(err.code(), FILE_NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn profile_updates_merge_per_section() -> Result<()> {
    let pool = util::memory_pool().await?;
    let file = files::get_or_create_active_file(&pool, "client-1").await?;

    let after_first = files::update_profile(
        &pool,
        &file.id,
        ProfileSections {
            personal_info: Some(json!({"firstName": "Amara", "lastName": "Okafor"})),
            education: Some(json!([{"degree": "BSc", "field": "Nursing"}])),
            ..ProfileSections::default()
        },
    )
    .await?;
    assert_eq!(
        after_first.profile.get("personalInfo"),
        Some(&json!({"firstName": "Amara", "lastName": "Okafor"}))
    );

    let after_second = files::update_profile(
        &pool,
        &file.id,
        ProfileSections {
            education: Some(json!([{"degree": "MSc", "field": "Public Health"}])),
            contact_info: Some(json!({"email": "amara@example.ca"})),
            ..ProfileSections::default()
        },
    )
    .await?;

    // Untouched sections survive; provided ones are replaced wholesale.
    assert_eq!(
        after_second.profile.get("personalInfo"),
        Some(&json!({"firstName": "Amara", "lastName": "Okafor"}))
    );
    assert_eq!(
        after_second.profile.get("education"),
        Some(&json!([{"degree": "MSc", "field": "Public Health"}]))
    );
    assert_eq!(
        after_second.profile.get("contactInfo"),
        Some(&json!({"email": "amara@example.ca"}))
    );

    let reread = files::get_file(&pool, &file.id).await?;
    assert_eq!(reread.profile, after_second.profile);

    Ok(())
}
