//! Ownership policy for case files.
//!
//! Every command that touches a specific file funnels through [`authorize`],
//! so the rule lives in exactly one place: staff act on any file, clients
//! only on files they own. There are no per-field or per-operation grants.

use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::error::{AppError, AppResult};
use crate::model::{ImmigrationFile, AUTH_FORBIDDEN};

/// Message surfaced when the ownership check rejects a request.
pub const FORBIDDEN_MESSAGE: &str = "Not authorized to access this file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    /// An applicant; may only touch files they own.
    Client,
    /// Back-office staff; may touch any file.
    Staff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Requester {
    pub id: String,
    pub role: Role,
}

impl Requester {
    pub fn client(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Client,
        }
    }

    pub fn staff(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Staff,
        }
    }
}

/// Permit iff the requester is staff or owns the file.
pub fn authorize(file: &ImmigrationFile, requester: &Requester) -> AppResult<()> {
    if requester.role == Role::Staff || file.owner_id == requester.id {
        return Ok(());
    }
    warn!(
        target: "maplefile",
        event = "authorization_rejected",
        file_id = %file.id,
        requester_id = %requester.id
    );
    Err(AppError::new(AUTH_FORBIDDEN, FORBIDDEN_MESSAGE)
        .with_context("file_id", file.id.clone())
        .with_context("requester_id", requester.id.clone()))
}
