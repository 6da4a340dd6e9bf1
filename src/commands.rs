//! Transport-agnostic operation surface.
//!
//! Every entry point takes the shared [`AppState`] plus the calling
//! [`Requester`] and returns an [`AppResult`]; a host shim (HTTP, IPC,
//! CLI) only maps arguments in and serialized results out. Commands that
//! name a specific file resolve it before checking access, so an unknown
//! id always reads as `FILE/NOT_FOUND` and never leaks whether the file
//! belongs to someone else.

use std::time::Instant;

use crate::{
    auth::{self, Requester},
    checklist, documents, files,
    model::{
        CategoryListing, ChecklistItem, ChecklistItemPatch, ChecklistSnapshot, DocumentRef,
        FilePatch, ImmigrationFile, NewChecklistItem, NewDocumentPayload, NewFilePayload,
        ProfileSections,
    },
    state::AppState,
    AppError, AppResult,
};

fn log_command_start(cmd: &'static str, requester_id: &str, file_id: Option<&str>) {
    tracing::debug!(
        target: "maplefile",
        area = "casefile",
        cmd,
        requester_id,
        file_id,
        "op_enter"
    );
}

fn log_command_success(
    cmd: &'static str,
    start: Instant,
    requester_id: &str,
    file_id: Option<&str>,
    row_count: usize,
) {
    tracing::info!(
        target: "maplefile",
        area = "casefile",
        cmd,
        requester_id,
        file_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        row_count,
        "op_success"
    );
}

fn log_command_error(
    cmd: &'static str,
    start: Instant,
    err: &AppError,
    requester_id: &str,
    file_id: Option<&str>,
) {
    // `tracing::event!` needs a const level, so the WARN/ERROR split is
    // expressed as two branches instead of a runtime `level` value.
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if is_caller_error(err.code()) {
        tracing::event!(
            target: "maplefile",
            tracing::Level::WARN,
            area = "casefile",
            cmd,
            requester_id,
            file_id,
            code = err.code(),
            message = err.message(),
            elapsed_ms,
            "op_failure"
        );
    } else {
        tracing::event!(
            target: "maplefile",
            tracing::Level::ERROR,
            area = "casefile",
            cmd,
            requester_id,
            file_id,
            code = err.code(),
            message = err.message(),
            elapsed_ms,
            "op_failure"
        );
    }
}

/// Rejections the caller can fix keep WARN; everything else is ERROR.
fn is_caller_error(code: &str) -> bool {
    code.starts_with("VALIDATION/") || code.starts_with("AUTH/") || code.ends_with("/NOT_FOUND")
}

/// Resolve a file by id, then check access. Lookup runs first so an
/// unknown id surfaces as `FILE/NOT_FOUND` even for foreign callers.
async fn authorized_file(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
) -> AppResult<ImmigrationFile> {
    let file = files::get_file(&state.pool, file_id).await?;
    auth::authorize(&file, requester)?;
    Ok(file)
}

/// The requester's active file, provisioning one on first call.
pub async fn active_file_command(
    state: &AppState,
    requester: &Requester,
) -> AppResult<ImmigrationFile> {
    log_command_start("active_file_command", &requester.id, None);
    let start = Instant::now();

    match files::get_or_create_active_file(&state.pool, &requester.id).await {
        Ok(file) => {
            log_command_success("active_file_command", start, &requester.id, Some(&file.id), 1);
            Ok(file)
        }
        Err(err) => {
            log_command_error("active_file_command", start, &err, &requester.id, None);
            Err(err)
        }
    }
}

/// Checklist of the requester's active file. Unlike
/// [`active_file_command`] this never provisions; no active file is an
/// error.
pub async fn checklist_fetch_command(
    state: &AppState,
    requester: &Requester,
) -> AppResult<ChecklistSnapshot> {
    log_command_start("checklist_fetch_command", &requester.id, None);
    let start = Instant::now();

    let result = async {
        let file = files::find_active_file(&state.pool, &requester.id)
            .await?
            .ok_or_else(|| files::no_active_file(&requester.id))?;
        let checklist = checklist::list_items(&state.pool, &file.id).await?;
        Ok(ChecklistSnapshot {
            file_id: file.id,
            checklist,
        })
    }
    .await;

    match result {
        Ok(snapshot) => {
            log_command_success(
                "checklist_fetch_command",
                start,
                &requester.id,
                Some(&snapshot.file_id),
                snapshot.checklist.len(),
            );
            Ok(snapshot)
        }
        Err(err) => {
            log_command_error("checklist_fetch_command", start, &err, &requester.id, None);
            Err(err)
        }
    }
}

pub async fn checklist_add_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    item: NewChecklistItem,
) -> AppResult<Vec<ChecklistItem>> {
    log_command_start("checklist_add_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        checklist::add_item(&state.pool, &file.id, item).await
    }
    .await;

    match result {
        Ok(items) => {
            log_command_success(
                "checklist_add_command",
                start,
                &requester.id,
                Some(file_id),
                items.len(),
            );
            Ok(items)
        }
        Err(err) => {
            log_command_error("checklist_add_command", start, &err, &requester.id, Some(file_id));
            Err(err)
        }
    }
}

pub async fn checklist_update_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    item_id: &str,
    patch: ChecklistItemPatch,
) -> AppResult<Vec<ChecklistItem>> {
    log_command_start("checklist_update_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        checklist::update_item(&state.pool, &file.id, item_id, patch).await
    }
    .await;

    match result {
        Ok(items) => {
            log_command_success(
                "checklist_update_command",
                start,
                &requester.id,
                Some(file_id),
                items.len(),
            );
            Ok(items)
        }
        Err(err) => {
            log_command_error(
                "checklist_update_command",
                start,
                &err,
                &requester.id,
                Some(file_id),
            );
            Err(err)
        }
    }
}

pub async fn checklist_toggle_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    item_id: &str,
    completed: bool,
) -> AppResult<Vec<ChecklistItem>> {
    log_command_start("checklist_toggle_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        checklist::toggle_item(&state.pool, &file.id, item_id, completed).await
    }
    .await;

    match result {
        Ok(items) => {
            log_command_success(
                "checklist_toggle_command",
                start,
                &requester.id,
                Some(file_id),
                items.len(),
            );
            Ok(items)
        }
        Err(err) => {
            log_command_error(
                "checklist_toggle_command",
                start,
                &err,
                &requester.id,
                Some(file_id),
            );
            Err(err)
        }
    }
}

pub async fn checklist_delete_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    item_id: &str,
) -> AppResult<Vec<ChecklistItem>> {
    log_command_start("checklist_delete_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        checklist::delete_item(&state.pool, &file.id, item_id).await
    }
    .await;

    match result {
        Ok(items) => {
            log_command_success(
                "checklist_delete_command",
                start,
                &requester.id,
                Some(file_id),
                items.len(),
            );
            Ok(items)
        }
        Err(err) => {
            log_command_error(
                "checklist_delete_command",
                start,
                &err,
                &requester.id,
                Some(file_id),
            );
            Err(err)
        }
    }
}

/// Staff see every file, clients their own.
pub async fn files_list_command(
    state: &AppState,
    requester: &Requester,
) -> AppResult<Vec<ImmigrationFile>> {
    log_command_start("files_list_command", &requester.id, None);
    let start = Instant::now();

    match files::list_files(&state.pool, requester).await {
        Ok(records) => {
            log_command_success(
                "files_list_command",
                start,
                &requester.id,
                None,
                records.len(),
            );
            Ok(records)
        }
        Err(err) => {
            log_command_error("files_list_command", start, &err, &requester.id, None);
            Err(err)
        }
    }
}

pub async fn file_get_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
) -> AppResult<ImmigrationFile> {
    log_command_start("file_get_command", &requester.id, Some(file_id));
    let start = Instant::now();

    match authorized_file(state, requester, file_id).await {
        Ok(file) => {
            log_command_success("file_get_command", start, &requester.id, Some(file_id), 1);
            Ok(file)
        }
        Err(err) => {
            log_command_error("file_get_command", start, &err, &requester.id, Some(file_id));
            Err(err)
        }
    }
}

/// Explicit creation; the new file is never active.
pub async fn file_create_command(
    state: &AppState,
    requester: &Requester,
    payload: NewFilePayload,
) -> AppResult<ImmigrationFile> {
    log_command_start("file_create_command", &requester.id, None);
    let start = Instant::now();

    match files::create_file(&state.pool, &requester.id, payload).await {
        Ok(file) => {
            log_command_success("file_create_command", start, &requester.id, Some(&file.id), 1);
            Ok(file)
        }
        Err(err) => {
            log_command_error("file_create_command", start, &err, &requester.id, None);
            Err(err)
        }
    }
}

pub async fn file_update_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    patch: FilePatch,
) -> AppResult<ImmigrationFile> {
    log_command_start("file_update_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        files::update_file(&state.pool, &file.id, patch).await
    }
    .await;

    match result {
        Ok(file) => {
            log_command_success("file_update_command", start, &requester.id, Some(file_id), 1);
            Ok(file)
        }
        Err(err) => {
            log_command_error("file_update_command", start, &err, &requester.id, Some(file_id));
            Err(err)
        }
    }
}

/// Remove a file, its checklist and document rows, then its binaries.
pub async fn file_delete_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
) -> AppResult<()> {
    log_command_start("file_delete_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        files::delete_file(&state.pool, &state.documents, &file.id).await
    }
    .await;

    match result {
        Ok(()) => {
            log_command_success("file_delete_command", start, &requester.id, Some(file_id), 1);
            Ok(())
        }
        Err(err) => {
            log_command_error("file_delete_command", start, &err, &requester.id, Some(file_id));
            Err(err)
        }
    }
}

/// Set the CRS score and echo the stored value.
pub async fn crs_update_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    score: i64,
) -> AppResult<i64> {
    log_command_start("crs_update_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        files::update_crs_score(&state.pool, &file.id, score).await
    }
    .await;

    match result {
        Ok(stored) => {
            log_command_success("crs_update_command", start, &requester.id, Some(file_id), 1);
            Ok(stored)
        }
        Err(err) => {
            log_command_error("crs_update_command", start, &err, &requester.id, Some(file_id));
            Err(err)
        }
    }
}

/// Merge the provided profile sections into the file's profile.
pub async fn profile_update_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    sections: ProfileSections,
) -> AppResult<ImmigrationFile> {
    log_command_start("profile_update_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        files::update_profile(&state.pool, &file.id, sections).await
    }
    .await;

    match result {
        Ok(file) => {
            log_command_success("profile_update_command", start, &requester.id, Some(file_id), 1);
            Ok(file)
        }
        Err(err) => {
            log_command_error("profile_update_command", start, &err, &requester.id, Some(file_id));
            Err(err)
        }
    }
}

/// Category catalog decorated with the requester's current selection.
pub async fn categories_list_command(
    state: &AppState,
    requester: &Requester,
) -> AppResult<Vec<CategoryListing>> {
    log_command_start("categories_list_command", &requester.id, None);
    let start = Instant::now();

    match files::category_listings(&state.pool, &requester.id).await {
        Ok(listings) => {
            log_command_success(
                "categories_list_command",
                start,
                &requester.id,
                None,
                listings.len(),
            );
            Ok(listings)
        }
        Err(err) => {
            log_command_error("categories_list_command", start, &err, &requester.id, None);
            Err(err)
        }
    }
}

/// Store a category name on the requester's active file.
pub async fn category_select_command(
    state: &AppState,
    requester: &Requester,
    category: &str,
) -> AppResult<String> {
    log_command_start("category_select_command", &requester.id, None);
    let start = Instant::now();

    match files::select_category(&state.pool, &requester.id, category).await {
        Ok(stored) => {
            log_command_success("category_select_command", start, &requester.id, None, 1);
            Ok(stored)
        }
        Err(err) => {
            log_command_error("category_select_command", start, &err, &requester.id, None);
            Err(err)
        }
    }
}

/// Record metadata for an uploaded binary. When the file lookup or the
/// access check fails, the orphaned binary at `file_url` is discarded so
/// rejected uploads do not pile up in the store.
pub async fn document_add_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    payload: NewDocumentPayload,
) -> AppResult<Vec<DocumentRef>> {
    log_command_start("document_add_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let file = match authorized_file(state, requester, file_id).await {
        Ok(file) => file,
        Err(err) => {
            state.documents.discard(&payload.file_url);
            log_command_error("document_add_command", start, &err, &requester.id, Some(file_id));
            return Err(err);
        }
    };

    match documents::add_document(&state.pool, &file.id, payload).await {
        Ok(docs) => {
            log_command_success(
                "document_add_command",
                start,
                &requester.id,
                Some(file_id),
                docs.len(),
            );
            Ok(docs)
        }
        Err(err) => {
            log_command_error("document_add_command", start, &err, &requester.id, Some(file_id));
            Err(err)
        }
    }
}

pub async fn document_delete_command(
    state: &AppState,
    requester: &Requester,
    file_id: &str,
    document_id: &str,
) -> AppResult<Vec<DocumentRef>> {
    log_command_start("document_delete_command", &requester.id, Some(file_id));
    let start = Instant::now();

    let result = async {
        let file = authorized_file(state, requester, file_id).await?;
        documents::delete_document(&state.pool, &state.documents, &file.id, document_id).await
    }
    .await;

    match result {
        Ok(docs) => {
            log_command_success(
                "document_delete_command",
                start,
                &requester.id,
                Some(file_id),
                docs.len(),
            );
            Ok(docs)
        }
        Err(err) => {
            log_command_error(
                "document_delete_command",
                start,
                &err,
                &requester.id,
                Some(file_id),
            );
            Err(err)
        }
    }
}
