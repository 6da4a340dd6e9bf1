use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row};
use ts_rs::TS;

use crate::error::AppError;
use crate::time::to_date;

pub const VALIDATION_EMPTY_TITLE: &str = "VALIDATION/EMPTY_TITLE";
pub const VALIDATION_EMPTY_CATEGORY: &str = "VALIDATION/EMPTY_CATEGORY";
pub const VALIDATION_FILE_NUMBER_TAKEN: &str = "VALIDATION/FILE_NUMBER_TAKEN";
pub const VALIDATION_NEGATIVE_CRS: &str = "VALIDATION/NEGATIVE_CRS_SCORE";
pub const FILE_NOT_FOUND: &str = "FILE/NOT_FOUND";
pub const CHECKLIST_ITEM_NOT_FOUND: &str = "CHECKLIST/ITEM_NOT_FOUND";
pub const DOCUMENT_NOT_FOUND: &str = "DOCUMENT/NOT_FOUND";
pub const AUTH_FORBIDDEN: &str = "AUTH/FORBIDDEN";

/// A per-applicant case file. At most one file per owner is active at a
/// time; the invariant is maintained by the gateway's find-or-create path,
/// not by a database constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ImmigrationFile {
    pub id: String,
    pub owner_id: String,
    pub file_number: String,
    pub category: String,
    #[serde(rename = "CRSScore")]
    #[ts(rename = "CRSScore", type = "number")]
    pub crs_score: i64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub notes: Option<String>,
    pub is_active: bool,
    /// Profile sections keyed by section name; shape is owned by the client.
    #[ts(type = "Record<string, unknown>")]
    pub profile: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChecklistItem {
    pub id: String,
    pub file_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub notes: Option<String>,
    pub is_completed: bool,
    #[ts(type = "number")]
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for a document whose bytes live behind the binary store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentRef {
    pub id: String,
    pub file_id: String,
    pub title: String,
    pub description: String,
    pub file_url: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    #[ts(type = "number")]
    pub position: i64,
}

/// Checklist fetch response: items in insertion order plus the file they
/// belong to, so the caller can issue follow-up item operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChecklistSnapshot {
    pub file_id: String,
    pub checklist: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChecklistStats {
    #[ts(type = "number")]
    pub completed: u32,
    #[ts(type = "number")]
    pub total: u32,
    pub percentage: f64,
}

/// Catalog entry decorated with whether the owner's active file currently
/// points at it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryListing {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub eligibility: Vec<String>,
    pub requirements: Vec<String>,
    pub processing_time: String,
    #[serde(rename = "minCRS")]
    #[ts(rename = "minCRS", type = "number")]
    pub min_crs: i64,
    pub popularity: String,
    /// "selected" for the active file's category, otherwise "available".
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFilePayload {
    #[serde(alias = "fileNumber")]
    pub file_number: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "CRSScore")]
    pub crs_score: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a case file. `file_number`, `category` and `status`
/// only change when a non-empty value is supplied; `crs_score` and `notes`
/// change whenever the field is present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilePatch {
    #[serde(default, alias = "fileNumber")]
    pub file_number: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "CRSScore")]
    pub crs_score: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklistItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a checklist item. Same keep/replace rules as
/// [`FilePatch`]: the title never blanks, `description`/`notes` treat an
/// empty string as an explicit clear, and there is no way to clear a due
/// date once set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistItemPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "isCompleted")]
    pub is_completed: Option<bool>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocumentPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "fileUrl")]
    pub file_url: String,
    #[serde(default, alias = "mimeType")]
    pub mime_type: Option<String>,
}

/// Profile sections; only the provided ones are replaced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSections {
    #[serde(default, alias = "personalInfo")]
    pub personal_info: Option<Value>,
    #[serde(default, alias = "contactInfo")]
    pub contact_info: Option<Value>,
    #[serde(default)]
    pub education: Option<Value>,
    #[serde(default, alias = "workExperience")]
    pub work_experience: Option<Value>,
    #[serde(default, alias = "languageProficiency")]
    pub language_proficiency: Option<Value>,
}

impl ImmigrationFile {
    pub fn from_row(row: &SqliteRow) -> Result<Self, AppError> {
        Self::try_from(row)
    }
}

impl TryFrom<&SqliteRow> for ImmigrationFile {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        let profile_raw: String = row.try_get("profile_json").map_err(AppError::from)?;
        let profile: Value = serde_json::from_str(&profile_raw)
            .map_err(|err| AppError::from(err).with_context("column", "profile_json"))?;
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            owner_id: row.try_get("owner_id").map_err(AppError::from)?,
            file_number: row.try_get("file_number").map_err(AppError::from)?,
            category: row.try_get("category").map_err(AppError::from)?,
            crs_score: row.try_get("crs_score").map_err(AppError::from)?,
            status: row.try_get("status").map_err(AppError::from)?,
            notes: row
                .try_get::<Option<String>, _>("notes")
                .map_err(AppError::from)?,
            is_active: row
                .try_get::<i64, _>("is_active")
                .map(|value| value != 0)
                .map_err(AppError::from)?,
            profile,
            created_at: to_date(row.try_get("created_at").map_err(AppError::from)?),
            updated_at: to_date(row.try_get("updated_at").map_err(AppError::from)?),
        })
    }
}

impl ChecklistItem {
    pub fn from_row(row: &SqliteRow) -> Result<Self, AppError> {
        Self::try_from(row)
    }
}

impl TryFrom<&SqliteRow> for ChecklistItem {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            file_id: row.try_get("file_id").map_err(AppError::from)?,
            title: row.try_get("title").map_err(AppError::from)?,
            description: row
                .try_get::<Option<String>, _>("description")
                .map_err(AppError::from)?,
            due_date: row
                .try_get::<Option<i64>, _>("due_date")
                .map_err(AppError::from)?
                .map(to_date),
            notes: row
                .try_get::<Option<String>, _>("notes")
                .map_err(AppError::from)?,
            is_completed: row
                .try_get::<i64, _>("is_completed")
                .map(|value| value != 0)
                .map_err(AppError::from)?,
            position: row.try_get("position").map_err(AppError::from)?,
            created_at: to_date(row.try_get("created_at").map_err(AppError::from)?),
            updated_at: to_date(row.try_get("updated_at").map_err(AppError::from)?),
        })
    }
}

impl DocumentRef {
    pub fn from_row(row: &SqliteRow) -> Result<Self, AppError> {
        Self::try_from(row)
    }
}

impl TryFrom<&SqliteRow> for DocumentRef {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            file_id: row.try_get("file_id").map_err(AppError::from)?,
            title: row.try_get("title").map_err(AppError::from)?,
            description: row.try_get("description").map_err(AppError::from)?,
            file_url: row.try_get("file_url").map_err(AppError::from)?,
            mime_type: row.try_get("mime_type").map_err(AppError::from)?,
            uploaded_at: to_date(row.try_get("uploaded_at").map_err(AppError::from)?),
            position: row.try_get("position").map_err(AppError::from)?,
        })
    }
}
