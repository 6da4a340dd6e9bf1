use anyhow::Result;

use maplefile::auth::{Requester, FORBIDDEN_MESSAGE};
use maplefile::commands;
use maplefile::model::{
    AUTH_FORBIDDEN, ChecklistItemPatch, FilePatch, FILE_NOT_FOUND, NewChecklistItem,
    NewDocumentPayload, ProfileSections,
};

#[path = "util.rs"]
mod util;

fn new_item() -> NewChecklistItem {
    NewChecklistItem {
        title: "Book biometrics appointment".to_string(),
        description: None,
        due_date: None,
        notes: None,
    }
}

fn new_document() -> NewDocumentPayload {
    NewDocumentPayload {
        title: None,
        description: None,
        file_url: "uploads/evidence.pdf".to_string(),
        mime_type: None,
    }
}

#[tokio::test]
async fn owners_and_staff_read_foreign_clients_do_not() -> Result<()> {
    let state = util::memory_state().await?;
    let owner = Requester::client("client-a");
    let intruder = Requester::client("client-b");
    let officer = Requester::staff("officer-1");

    let file = commands::active_file_command(&state, &owner).await?;

    assert_eq!(
        commands::file_get_command(&state, &owner, &file.id).await?.id,
        file.id
    );
    assert_eq!(
        commands::file_get_command(&state, &officer, &file.id).await?.id,
        file.id
    );

    let err = commands::file_get_command(&state, &intruder, &file.id)
        .await
        .expect_err("foreign client must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);
    assert_eq!(err.message(), FORBIDDEN_MESSAGE);

    Ok(())
}

#[tokio::test]
async fn unknown_files_read_as_not_found_before_any_access_check() -> Result<()> {
    let state = util::memory_state().await?;
    let intruder = Requester::client("client-b");

    let err = commands::file_get_command(&state, &intruder, "no-such-file")
        .await
        .expect_err("unknown id must fail");
    assert_eq!(err.code(), FILE_NOT_FOUND);

    let err = commands::file_delete_command(&state, &intruder, "no-such-file")
        .await
        .expect_err("unknown id must fail");
    assert_eq!(err.code(), FILE_NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn every_file_scoped_mutation_rejects_foreign_clients() -> Result<()> {
    let state = util::memory_state().await?;
    let owner = Requester::client("client-a");
    let intruder = Requester::client("client-b");

    let file = commands::active_file_command(&state, &owner).await?;
    let item_id = commands::checklist_fetch_command(&state, &owner).await?.checklist[0]
        .id
        .clone();
    let docs = commands::document_add_command(&state, &owner, &file.id, new_document()).await?;
    let document_id = docs[0].id.clone();

    let err = commands::checklist_add_command(&state, &intruder, &file.id, new_item())
        .await
        .expect_err("add must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err = commands::checklist_update_command(
        &state,
        &intruder,
        &file.id,
        &item_id,
        ChecklistItemPatch::default(),
    )
    .await
    .expect_err("update must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err = commands::checklist_toggle_command(&state, &intruder, &file.id, &item_id, true)
        .await
        .expect_err("toggle must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err = commands::checklist_delete_command(&state, &intruder, &file.id, &item_id)
        .await
        .expect_err("delete must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err = commands::file_update_command(&state, &intruder, &file.id, FilePatch::default())
        .await
        .expect_err("file update must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err = commands::crs_update_command(&state, &intruder, &file.id, 500)
        .await
        .expect_err("score update must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err = commands::profile_update_command(
        &state,
        &intruder,
        &file.id,
        ProfileSections::default(),
    )
    .await
    .expect_err("profile update must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err =
        commands::document_delete_command(&state, &intruder, &file.id, &document_id)
            .await
            .expect_err("document delete must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    let err = commands::file_delete_command(&state, &intruder, &file.id)
        .await
        .expect_err("file delete must be rejected");
    assert_eq!(err.code(), AUTH_FORBIDDEN);

    // Nothing moved: the file, its checklist and its document survive.
    let untouched = commands::file_get_command(&state, &owner, &file.id).await?;
    assert_eq!(untouched.crs_score, file.crs_score);
    let snapshot = commands::checklist_fetch_command(&state, &owner).await?;
    assert_eq!(snapshot.checklist.len(), 3);
    assert!(!snapshot.checklist[0].is_completed);

    Ok(())
}

#[tokio::test]
async fn staff_can_mutate_any_file() -> Result<()> {
    let state = util::memory_state().await?;
    let owner = Requester::client("client-a");
    let officer = Requester::staff("officer-1");

    let file = commands::active_file_command(&state, &owner).await?;

    let items = commands::checklist_add_command(&state, &officer, &file.id, new_item()).await?;
    assert_eq!(items.len(), 4);

    let stored = commands::crs_update_command(&state, &officer, &file.id, 470).await?;
    assert_eq!(stored, 470);

    Ok(())
}
