//! Document metadata and the binary store behind `file_url`.
//!
//! Rows in `documents` are immutable once written; the only mutations are
//! append and delete. Binary removal is always best-effort and happens
//! after the owning transaction commits, so a missing or locked file never
//! rolls back a metadata change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;

use crate::catalog::UNTITLED_DOCUMENT;
use crate::db::run_in_tx;
use crate::error::{AppError, AppResult};
use crate::files;
use crate::id::new_uuid_v7;
use crate::model::{DocumentRef, NewDocumentPayload, DOCUMENT_NOT_FOUND};
use crate::time::now_ms;

const FALLBACK_MIME: &str = "application/octet-stream";

static MIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._+-]+/[a-zA-Z0-9._+-]+$")
        .expect("mime validation pattern to compile")
});

#[derive(Error, Debug)]
pub enum BinaryStoreError {
    #[error("document reference {0:?} has no usable file name")]
    InvalidReference(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Storage for uploaded binaries, keyed by the `file_url` recorded in the
/// metadata row.
trait BinaryStore {
    fn put(&self, file_url: &str, bytes: &[u8]) -> Result<(), BinaryStoreError>;
    fn remove(&self, file_url: &str) -> Result<(), BinaryStoreError>;
    fn contains(&self, file_url: &str) -> bool;
}

/// Flat directory store. Only the final path component of a `file_url` is
/// honoured, so references cannot escape the root.
struct FsStore {
    root: PathBuf,
}

impl FsStore {
    fn resolve(&self, file_url: &str) -> Result<PathBuf, BinaryStoreError> {
        match Path::new(file_url).file_name().and_then(|name| name.to_str()) {
            Some(name) => Ok(self.root.join(name)),
            None => Err(BinaryStoreError::InvalidReference(file_url.to_string())),
        }
    }
}

impl BinaryStore for FsStore {
    fn put(&self, file_url: &str, bytes: &[u8]) -> Result<(), BinaryStoreError> {
        let path = self.resolve(file_url)?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn remove(&self, file_url: &str) -> Result<(), BinaryStoreError> {
        match std::fs::remove_file(self.resolve(file_url)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn contains(&self, file_url: &str) -> bool {
        self.resolve(file_url)
            .map(|path| path.exists())
            .unwrap_or(false)
    }
}

#[derive(Default)]
struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl BinaryStore for MemoryStore {
    fn put(&self, file_url: &str, bytes: &[u8]) -> Result<(), BinaryStoreError> {
        if let Ok(mut guard) = self.blobs.lock() {
            guard.insert(file_url.to_string(), bytes.to_vec());
        }
        Ok(())
    }

    fn remove(&self, file_url: &str) -> Result<(), BinaryStoreError> {
        if let Ok(mut guard) = self.blobs.lock() {
            guard.remove(file_url);
        }
        Ok(())
    }

    fn contains(&self, file_url: &str) -> bool {
        self.blobs
            .lock()
            .map(|guard| guard.contains_key(file_url))
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct BinaryStoreHandle {
    inner: Arc<dyn BinaryStore + Send + Sync>,
}

impl BinaryStoreHandle {
    pub fn fs(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FsStore { root: root.into() }),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(MemoryStore::default()),
        }
    }

    pub fn put(&self, file_url: &str, bytes: &[u8]) -> Result<(), BinaryStoreError> {
        self.inner.put(file_url, bytes)
    }

    pub fn remove(&self, file_url: &str) -> Result<(), BinaryStoreError> {
        self.inner.remove(file_url)
    }

    pub fn contains(&self, file_url: &str) -> bool {
        self.inner.contains(file_url)
    }

    /// Best-effort removal. Failures are logged and swallowed; metadata is
    /// already committed by the time this runs.
    pub fn discard(&self, file_url: &str) {
        if let Err(err) = self.inner.remove(file_url) {
            warn!(
                target: "maplefile",
                event = "binary_discard_failed",
                file_url = %file_url,
                error = %err
            );
        }
    }
}

/// Keep a syntactically valid caller hint, otherwise sniff from the file
/// name and fall back to octet-stream.
fn resolve_mime(provided: Option<&str>, file_url: &str) -> String {
    if let Some(mime) = provided {
        if MIME_PATTERN.is_match(mime) {
            return mime.to_string();
        }
    }
    mime_guess::from_path(file_url)
        .first_raw()
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

fn document_not_found(document_id: &str) -> AppError {
    AppError::new(DOCUMENT_NOT_FOUND, "Document not found")
        .with_context("document_id", document_id.to_string())
}

async fn list_in_tx(
    conn: &mut SqliteConnection,
    file_id: &str,
) -> Result<Vec<DocumentRef>, AppError> {
    let rows = sqlx::query(
        "SELECT id, file_id, title, description, file_url, mime_type, uploaded_at, position \
         FROM documents WHERE file_id = ? ORDER BY position, id",
    )
    .bind(file_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(DocumentRef::from_row).collect()
}

pub async fn list_documents(pool: &SqlitePool, file_id: &str) -> AppResult<Vec<DocumentRef>> {
    let rows = sqlx::query(
        "SELECT id, file_id, title, description, file_url, mime_type, uploaded_at, position \
         FROM documents WHERE file_id = ? ORDER BY position, id",
    )
    .bind(file_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(DocumentRef::from_row).collect()
}

/// Record metadata for an already-stored binary and return the refreshed
/// document list. An empty or missing title falls back to
/// [`UNTITLED_DOCUMENT`].
pub async fn add_document(
    pool: &SqlitePool,
    file_id: &str,
    payload: NewDocumentPayload,
) -> AppResult<Vec<DocumentRef>> {
    let file = file_id.to_string();
    let title = payload
        .title
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| UNTITLED_DOCUMENT.to_string());
    let description = payload.description.unwrap_or_default();
    let mime_type = resolve_mime(payload.mime_type.as_deref(), &payload.file_url);
    let file_url = payload.file_url;

    run_in_tx(pool, |tx| {
        async move {
            let position: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM documents WHERE file_id = ?",
            )
            .bind(&file)
            .fetch_one(&mut *tx)
            .await?;

            let now = now_ms();
            sqlx::query(
                "INSERT INTO documents \
                 (id, file_id, title, description, file_url, mime_type, uploaded_at, position) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(new_uuid_v7())
            .bind(&file)
            .bind(&title)
            .bind(&description)
            .bind(&file_url)
            .bind(&mime_type)
            .bind(now)
            .bind(position)
            .execute(&mut *tx)
            .await?;

            files::touch(&mut *tx, &file, now).await?;
            list_in_tx(&mut *tx, &file).await
        }
        .boxed()
    })
    .await
}

/// Delete a metadata row, then discard its binary. Returns the refreshed
/// document list.
pub async fn delete_document(
    pool: &SqlitePool,
    store: &BinaryStoreHandle,
    file_id: &str,
    document_id: &str,
) -> AppResult<Vec<DocumentRef>> {
    let file = file_id.to_string();
    let document = document_id.to_string();

    let (file_url, remaining) = run_in_tx(pool, |tx| {
        async move {
            let file_url: String =
                sqlx::query_scalar("SELECT file_url FROM documents WHERE id = ? AND file_id = ?")
                    .bind(&document)
                    .bind(&file)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| document_not_found(&document))?;

            sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(&document)
                .execute(&mut *tx)
                .await?;

            files::touch(&mut *tx, &file, now_ms()).await?;
            let remaining = list_in_tx(&mut *tx, &file).await?;
            Ok::<_, AppError>((file_url, remaining))
        }
        .boxed()
    })
    .await?;

    store.discard(&file_url);
    Ok(remaining)
}
