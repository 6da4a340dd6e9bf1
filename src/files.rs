//! Access gateway for immigration files.
//!
//! Per-owner lookups resolve through [`find_active_file`]; the
//! find-or-create path is the only place active files are minted, which is
//! what keeps "at most one active file per owner" true without a database
//! constraint. Explicitly created files always start inactive.

use futures::FutureExt;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::{Requester, Role};
use crate::catalog;
use crate::catalog::{DEFAULT_CATEGORY, DEFAULT_FILE_NOTES, DEFAULT_STATUS, SEED_CHECKLIST};
use crate::db::run_in_tx;
use crate::documents::BinaryStoreHandle;
use crate::error::{AppError, AppResult};
use crate::id::new_uuid_v7;
use crate::model::{
    CategoryListing, FilePatch, ImmigrationFile, NewFilePayload, ProfileSections,
    VALIDATION_EMPTY_CATEGORY, VALIDATION_FILE_NUMBER_TAKEN, VALIDATION_NEGATIVE_CRS,
    FILE_NOT_FOUND,
};
use crate::time::{now_ms, to_date};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub(crate) fn file_not_found(file_id: &str) -> AppError {
    AppError::new(FILE_NOT_FOUND, "Immigration file not found")
        .with_context("file_id", file_id.to_string())
}

pub(crate) fn no_active_file(owner_id: &str) -> AppError {
    AppError::new(FILE_NOT_FOUND, "No active immigration file found")
        .with_context("owner_id", owner_id.to_string())
}

fn ensure_non_negative_crs(score: i64) -> AppResult<()> {
    if score < 0 {
        return Err(
            AppError::new(VALIDATION_NEGATIVE_CRS, "CRS score cannot be negative")
                .with_context("score", score.to_string()),
        );
    }
    Ok(())
}

/// `IMM-<epoch ms>-<last four characters of the owner id>`.
pub fn generate_file_number(owner_id: &str, now: i64) -> String {
    let tail_start = owner_id
        .char_indices()
        .rev()
        .take(4)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    format!("IMM-{}-{}", now, &owner_id[tail_start..])
}

/// Bump the parent file's `updated_at`; child mutations call this inside
/// their own transaction.
pub(crate) async fn touch(
    conn: &mut SqliteConnection,
    file_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE immigration_files SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(file_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn find_active_file(
    pool: &SqlitePool,
    owner_id: &str,
) -> AppResult<Option<ImmigrationFile>> {
    let row = sqlx::query(
        "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
         FROM immigration_files WHERE owner_id = ? AND is_active = 1 ORDER BY created_at LIMIT 1",
    )
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(ImmigrationFile::from_row).transpose()
}

pub async fn get_file(pool: &SqlitePool, file_id: &str) -> AppResult<ImmigrationFile> {
    let row = sqlx::query(
        "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
         FROM immigration_files WHERE id = ?",
    )
    .bind(file_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| file_not_found(file_id))?;

    ImmigrationFile::from_row(&row)
}

/// Return the owner's active file, provisioning one with the seed checklist
/// when none exists. Creation and seeding happen in a single transaction.
pub async fn get_or_create_active_file(
    pool: &SqlitePool,
    owner_id: &str,
) -> AppResult<ImmigrationFile> {
    if let Some(file) = find_active_file(pool, owner_id).await? {
        return Ok(file);
    }

    let owner = owner_id.to_string();
    let id = new_uuid_v7();
    let now = now_ms();
    let file_number = generate_file_number(owner_id, now);

    let created = run_in_tx(pool, |tx| {
        async move {
            sqlx::query(
                "INSERT INTO immigration_files \
                 (id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, 0, ?, ?, 1, '{}', ?, ?)",
            )
            .bind(&id)
            .bind(&owner)
            .bind(&file_number)
            .bind(DEFAULT_CATEGORY)
            .bind(DEFAULT_STATUS)
            .bind(DEFAULT_FILE_NOTES)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for (position, seed) in SEED_CHECKLIST.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO checklist_items \
                     (id, file_id, title, description, due_date, notes, is_completed, position, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, NULL, 0, ?, ?, ?)",
                )
                .bind(new_uuid_v7())
                .bind(&id)
                .bind(seed.title)
                .bind(seed.description)
                .bind(now + seed.due_in_days * DAY_MS)
                .bind(position as i64)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            let row = sqlx::query(
                "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
                 FROM immigration_files WHERE id = ?",
            )
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;
            ImmigrationFile::from_row(&row)
        }
        .boxed()
    })
    .await?;

    info!(
        target: "maplefile",
        event = "file_auto_provisioned",
        owner_id = %owner_id,
        file_id = %created.id,
        file_number = %created.file_number
    );
    Ok(created)
}

/// Explicit creation with a caller-supplied file number. The result is
/// never active and carries an empty checklist.
pub async fn create_file(
    pool: &SqlitePool,
    owner_id: &str,
    payload: NewFilePayload,
) -> AppResult<ImmigrationFile> {
    let crs_score = payload.crs_score.unwrap_or(0);
    ensure_non_negative_crs(crs_score)?;

    let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM immigration_files WHERE file_number = ?")
        .bind(&payload.file_number)
        .fetch_optional(pool)
        .await?;
    if taken.is_some() {
        return Err(AppError::new(
            VALIDATION_FILE_NUMBER_TAKEN,
            "Immigration file with this number already exists",
        )
        .with_context("file_number", payload.file_number.clone()));
    }

    let owner = owner_id.to_string();
    let id = new_uuid_v7();
    let now = now_ms();
    let category = payload
        .category
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let status = payload
        .status
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());
    let file_number = payload.file_number;
    let notes = payload.notes;

    run_in_tx(pool, |tx| {
        async move {
            sqlx::query(
                "INSERT INTO immigration_files \
                 (id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, 0, '{}', ?, ?)",
            )
            .bind(&id)
            .bind(&owner)
            .bind(&file_number)
            .bind(&category)
            .bind(crs_score)
            .bind(&status)
            .bind(&notes)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            let row = sqlx::query(
                "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
                 FROM immigration_files WHERE id = ?",
            )
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;
            ImmigrationFile::from_row(&row)
        }
        .boxed()
    })
    .await
}

/// Staff see every file, clients their own; newest first.
pub async fn list_files(pool: &SqlitePool, requester: &Requester) -> AppResult<Vec<ImmigrationFile>> {
    let rows = match requester.role {
        Role::Staff => {
            sqlx::query(
                "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
                 FROM immigration_files ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(pool)
            .await?
        }
        Role::Client => {
            sqlx::query(
                "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
                 FROM immigration_files WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
            )
            .bind(&requester.id)
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(ImmigrationFile::from_row).collect()
}

/// Partial update. File number, category and status only change when a
/// non-empty value is supplied; CRS score and notes change whenever the
/// field is present, with an empty notes string clearing the column.
pub async fn update_file(
    pool: &SqlitePool,
    file_id: &str,
    patch: FilePatch,
) -> AppResult<ImmigrationFile> {
    if let Some(score) = patch.crs_score {
        ensure_non_negative_crs(score)?;
    }

    let id = file_id.to_string();
    run_in_tx(pool, |tx| {
        async move {
            let row = sqlx::query(
                "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
                 FROM immigration_files WHERE id = ?",
            )
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| file_not_found(&id))?;
            let mut file = ImmigrationFile::from_row(&row)?;

            if let Some(number) = patch.file_number.filter(|value| !value.is_empty()) {
                file.file_number = number;
            }
            if let Some(category) = patch.category.filter(|value| !value.is_empty()) {
                file.category = category;
            }
            if let Some(score) = patch.crs_score {
                file.crs_score = score;
            }
            if let Some(status) = patch.status.filter(|value| !value.is_empty()) {
                file.status = status;
            }
            if let Some(notes) = patch.notes {
                file.notes = if notes.is_empty() { None } else { Some(notes) };
            }

            let now = now_ms();
            sqlx::query(
                "UPDATE immigration_files \
                 SET file_number = ?, category = ?, crs_score = ?, status = ?, notes = ?, updated_at = ? \
                 WHERE id = ?",
            )
            .bind(&file.file_number)
            .bind(&file.category)
            .bind(file.crs_score)
            .bind(&file.status)
            .bind(&file.notes)
            .bind(now)
            .bind(&id)
            .execute(&mut *tx)
            .await?;

            file.updated_at = to_date(now);
            Ok(file)
        }
        .boxed()
    })
    .await
}

/// Delete the file row (children cascade), then discard document binaries
/// best-effort. A failed discard is logged and never fails the delete.
pub async fn delete_file(
    pool: &SqlitePool,
    documents: &BinaryStoreHandle,
    file_id: &str,
) -> AppResult<()> {
    let id = file_id.to_string();
    let urls: Vec<String> = run_in_tx(pool, |tx| {
        async move {
            let urls: Vec<String> =
                sqlx::query_scalar("SELECT file_url FROM documents WHERE file_id = ?")
                    .bind(&id)
                    .fetch_all(&mut *tx)
                    .await?;

            let affected = sqlx::query("DELETE FROM immigration_files WHERE id = ?")
                .bind(&id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if affected == 0 {
                return Err(file_not_found(&id));
            }
            Ok(urls)
        }
        .boxed()
    })
    .await?;

    for url in &urls {
        documents.discard(url);
    }

    info!(
        target: "maplefile",
        event = "file_deleted",
        file_id = %file_id,
        binaries = urls.len()
    );
    Ok(())
}

pub async fn update_crs_score(pool: &SqlitePool, file_id: &str, score: i64) -> AppResult<i64> {
    ensure_non_negative_crs(score)?;

    let id = file_id.to_string();
    run_in_tx(pool, |tx| {
        async move {
            let affected = sqlx::query(
                "UPDATE immigration_files SET crs_score = ?, updated_at = ? WHERE id = ?",
            )
            .bind(score)
            .bind(now_ms())
            .bind(&id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if affected == 0 {
                return Err(file_not_found(&id));
            }
            Ok(score)
        }
        .boxed()
    })
    .await
}

/// Catalog entries with `selected`/`available` derived from the owner's
/// active file; no file means everything reads `available`.
pub async fn category_listings(
    pool: &SqlitePool,
    owner_id: &str,
) -> AppResult<Vec<CategoryListing>> {
    let current = find_active_file(pool, owner_id).await?;
    Ok(catalog::listings(current.as_ref().map(|f| f.category.as_str())))
}

/// Set the active file's category. The value is stored verbatim; the
/// catalog is advisory and unknown names are allowed.
pub async fn select_category(
    pool: &SqlitePool,
    owner_id: &str,
    category: &str,
) -> AppResult<String> {
    if category.is_empty() {
        return Err(AppError::new(VALIDATION_EMPTY_CATEGORY, "Category is required"));
    }

    let file = find_active_file(pool, owner_id)
        .await?
        .ok_or_else(|| no_active_file(owner_id))?;

    let file_id = file.id.clone();
    let chosen = category.to_string();
    run_in_tx(pool, |tx| {
        async move {
            sqlx::query("UPDATE immigration_files SET category = ?, updated_at = ? WHERE id = ?")
                .bind(&chosen)
                .bind(now_ms())
                .bind(&file_id)
                .execute(&mut *tx)
                .await?;
            Ok(chosen)
        }
        .boxed()
    })
    .await
}

/// Replace only the provided profile sections inside `profile_json`.
pub async fn update_profile(
    pool: &SqlitePool,
    file_id: &str,
    sections: ProfileSections,
) -> AppResult<ImmigrationFile> {
    let id = file_id.to_string();
    run_in_tx(pool, |tx| {
        async move {
            let row = sqlx::query(
                "SELECT id, owner_id, file_number, category, crs_score, status, notes, is_active, profile_json, created_at, updated_at \
                 FROM immigration_files WHERE id = ?",
            )
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| file_not_found(&id))?;
            let mut file = ImmigrationFile::from_row(&row)?;

            let mut profile = match file.profile {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            let ProfileSections {
                personal_info,
                contact_info,
                education,
                work_experience,
                language_proficiency,
            } = sections;
            for (key, value) in [
                ("personalInfo", personal_info),
                ("contactInfo", contact_info),
                ("education", education),
                ("workExperience", work_experience),
                ("languageProficiency", language_proficiency),
            ] {
                if let Some(value) = value {
                    profile.insert(key.to_string(), value);
                }
            }

            let serialized = serde_json::to_string(&profile)?;
            let now = now_ms();
            sqlx::query("UPDATE immigration_files SET profile_json = ?, updated_at = ? WHERE id = ?")
                .bind(&serialized)
                .bind(now)
                .bind(&id)
                .execute(&mut *tx)
                .await?;

            file.profile = serde_json::Value::Object(profile);
            file.updated_at = to_date(now);
            Ok(file)
        }
        .boxed()
    })
    .await
}
