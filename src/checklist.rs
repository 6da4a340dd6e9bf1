//! Checklist engine: item CRUD, progress stats and dependency gating.
//!
//! Items keep a `position` column that records insertion order; deletes
//! leave a gap rather than renumbering, so order stays stable under
//! concurrent edits. Every mutation runs in one transaction together with
//! the parent file's `updated_at` bump and returns the refreshed list.

use std::collections::HashMap;

use futures::FutureExt;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

use crate::db::run_in_tx;
use crate::error::{AppError, AppResult};
use crate::files;
use crate::id::new_uuid_v7;
use crate::model::{
    ChecklistItem, ChecklistItemPatch, ChecklistStats, NewChecklistItem,
    CHECKLIST_ITEM_NOT_FOUND, VALIDATION_EMPTY_TITLE,
};
use crate::time::now_ms;

/// Advisory prerequisite edges: item id -> ids that should be completed
/// first. Toggles are never rejected on the strength of this map; pending
/// prerequisites only surface through [`unlocked`] and [`blocked_items`].
pub type DependencyMap = HashMap<String, Vec<String>>;

fn item_not_found(item_id: &str) -> AppError {
    AppError::new(CHECKLIST_ITEM_NOT_FOUND, "Checklist item not found")
        .with_context("item_id", item_id.to_string())
}

async fn list_in_tx(
    conn: &mut SqliteConnection,
    file_id: &str,
) -> Result<Vec<ChecklistItem>, AppError> {
    let rows = sqlx::query(
        "SELECT id, file_id, title, description, due_date, notes, is_completed, position, created_at, updated_at \
         FROM checklist_items WHERE file_id = ? ORDER BY position, id",
    )
    .bind(file_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(ChecklistItem::from_row).collect()
}

/// Items for one file in insertion order.
pub async fn list_items(pool: &SqlitePool, file_id: &str) -> AppResult<Vec<ChecklistItem>> {
    let rows = sqlx::query(
        "SELECT id, file_id, title, description, due_date, notes, is_completed, position, created_at, updated_at \
         FROM checklist_items WHERE file_id = ? ORDER BY position, id",
    )
    .bind(file_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(ChecklistItem::from_row).collect()
}

/// Append an item at the end of the file's checklist.
pub async fn add_item(
    pool: &SqlitePool,
    file_id: &str,
    item: NewChecklistItem,
) -> AppResult<Vec<ChecklistItem>> {
    if item.title.is_empty() {
        return Err(AppError::new(
            VALIDATION_EMPTY_TITLE,
            "Checklist item title is required",
        ));
    }

    let id = file_id.to_string();
    run_in_tx(pool, |tx| {
        async move {
            let position: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM checklist_items WHERE file_id = ?",
            )
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

            let now = now_ms();
            sqlx::query(
                "INSERT INTO checklist_items \
                 (id, file_id, title, description, due_date, notes, is_completed, position, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)",
            )
            .bind(new_uuid_v7())
            .bind(&id)
            .bind(&item.title)
            .bind(&item.description)
            .bind(item.due_date.map(|date| date.timestamp_millis()))
            .bind(&item.notes)
            .bind(position)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            files::touch(&mut *tx, &id, now).await?;
            list_in_tx(&mut *tx, &id).await
        }
        .boxed()
    })
    .await
}

/// Partial update. The title only changes when a non-empty value is
/// supplied; the other fields change whenever present, with an empty
/// `description`/`notes` string clearing the column.
pub async fn update_item(
    pool: &SqlitePool,
    file_id: &str,
    item_id: &str,
    patch: ChecklistItemPatch,
) -> AppResult<Vec<ChecklistItem>> {
    let file = file_id.to_string();
    let item = item_id.to_string();
    run_in_tx(pool, |tx| {
        async move {
            let row = sqlx::query(
                "SELECT id, file_id, title, description, due_date, notes, is_completed, position, created_at, updated_at \
                 FROM checklist_items WHERE id = ? AND file_id = ?",
            )
            .bind(&item)
            .bind(&file)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| item_not_found(&item))?;
            let mut current = ChecklistItem::from_row(&row)?;

            if let Some(title) = patch.title.filter(|value| !value.is_empty()) {
                current.title = title;
            }
            if let Some(description) = patch.description {
                current.description = if description.is_empty() {
                    None
                } else {
                    Some(description)
                };
            }
            if let Some(completed) = patch.is_completed {
                current.is_completed = completed;
            }
            if let Some(due) = patch.due_date {
                current.due_date = Some(due);
            }
            if let Some(notes) = patch.notes {
                current.notes = if notes.is_empty() { None } else { Some(notes) };
            }

            let now = now_ms();
            sqlx::query(
                "UPDATE checklist_items \
                 SET title = ?, description = ?, due_date = ?, notes = ?, is_completed = ?, updated_at = ? \
                 WHERE id = ?",
            )
            .bind(&current.title)
            .bind(&current.description)
            .bind(current.due_date.map(|date| date.timestamp_millis()))
            .bind(&current.notes)
            .bind(current.is_completed as i64)
            .bind(now)
            .bind(&item)
            .execute(&mut *tx)
            .await?;

            files::touch(&mut *tx, &file, now).await?;
            list_in_tx(&mut *tx, &file).await
        }
        .boxed()
    })
    .await
}

/// Set an item's completion flag. Idempotent; repeating a toggle with the
/// same value is a no-op apart from `updated_at`.
pub async fn toggle_item(
    pool: &SqlitePool,
    file_id: &str,
    item_id: &str,
    completed: bool,
) -> AppResult<Vec<ChecklistItem>> {
    let file = file_id.to_string();
    let item = item_id.to_string();
    run_in_tx(pool, |tx| {
        async move {
            let now = now_ms();
            let affected = sqlx::query(
                "UPDATE checklist_items SET is_completed = ?, updated_at = ? WHERE id = ? AND file_id = ?",
            )
            .bind(completed as i64)
            .bind(now)
            .bind(&item)
            .bind(&file)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if affected == 0 {
                return Err(item_not_found(&item));
            }

            files::touch(&mut *tx, &file, now).await?;
            list_in_tx(&mut *tx, &file).await
        }
        .boxed()
    })
    .await
}

/// Remove an item. Surviving items keep their positions.
pub async fn delete_item(
    pool: &SqlitePool,
    file_id: &str,
    item_id: &str,
) -> AppResult<Vec<ChecklistItem>> {
    let file = file_id.to_string();
    let item = item_id.to_string();
    run_in_tx(pool, |tx| {
        async move {
            let affected = sqlx::query("DELETE FROM checklist_items WHERE id = ? AND file_id = ?")
                .bind(&item)
                .bind(&file)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if affected == 0 {
                return Err(item_not_found(&item));
            }

            files::touch(&mut *tx, &file, now_ms()).await?;
            list_in_tx(&mut *tx, &file).await
        }
        .boxed()
    })
    .await
}

/// Progress over a list of items. An empty list reads as 0%, not NaN.
pub fn compute_stats(items: &[ChecklistItem]) -> ChecklistStats {
    let total = items.len() as u32;
    let completed = items.iter().filter(|item| item.is_completed).count() as u32;
    let percentage = if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total) * 100.0
    };
    ChecklistStats {
        completed,
        total,
        percentage,
    }
}

/// Whether an item's prerequisites are all completed. Items without an
/// entry in the map are always unlocked; a prerequisite id that does not
/// resolve to an item in the list counts as unmet.
pub fn unlocked(item_id: &str, items: &[ChecklistItem], deps: &DependencyMap) -> bool {
    let Some(prerequisites) = deps.get(item_id) else {
        return true;
    };
    prerequisites.iter().all(|needed| {
        items
            .iter()
            .find(|item| item.id == *needed)
            .is_some_and(|item| item.is_completed)
    })
}

/// Ids of items still waiting on a prerequisite, in list order.
pub fn blocked_items(items: &[ChecklistItem], deps: &DependencyMap) -> Vec<String> {
    items
        .iter()
        .filter(|item| !unlocked(&item.id, items, deps))
        .map(|item| item.id.clone())
        .collect()
}
