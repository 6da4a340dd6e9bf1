use anyhow::Result;

use maplefile::checklist::{self, DependencyMap};
use maplefile::files;

#[path = "util.rs"]
mod util;

#[tokio::test]
async fn gating_reports_blockers_but_never_rejects_toggles() -> Result<()> {
    let pool = util::memory_pool().await?;
    let file = files::get_or_create_active_file(&pool, "client-1").await?;
    let items = checklist::list_items(&pool, &file.id).await?;

    // "Upload Required Documents" waits on the first two seed tasks.
    let mut deps = DependencyMap::new();
    deps.insert(
        items[2].id.clone(),
        vec![items[0].id.clone(), items[1].id.clone()],
    );

    assert!(!checklist::unlocked(&items[2].id, &items, &deps));
    assert_eq!(
        checklist::blocked_items(&items, &deps),
        vec![items[2].id.clone()]
    );

    // The gate is advisory: completing a blocked item still succeeds.
    let toggled = checklist::toggle_item(&pool, &file.id, &items[2].id, true).await?;
    assert!(toggled[2].is_completed);
    assert!(!checklist::unlocked(&items[2].id, &toggled, &deps));

    checklist::toggle_item(&pool, &file.id, &items[0].id, true).await?;
    let after = checklist::toggle_item(&pool, &file.id, &items[1].id, true).await?;
    assert!(checklist::unlocked(&items[2].id, &after, &deps));
    assert!(checklist::blocked_items(&after, &deps).is_empty());

    Ok(())
}

#[tokio::test]
async fn deleting_a_prerequisite_leaves_the_dependent_blocked() -> Result<()> {
    let pool = util::memory_pool().await?;
    let file = files::get_or_create_active_file(&pool, "client-1").await?;
    let items = checklist::list_items(&pool, &file.id).await?;

    let mut deps = DependencyMap::new();
    deps.insert(items[1].id.clone(), vec![items[0].id.clone()]);

    let remaining = checklist::delete_item(&pool, &file.id, &items[0].id).await?;

    // The stale edge cannot resolve, so the dependent stays blocked even
    // though its prerequisite row is gone.
    assert!(!checklist::unlocked(&items[1].id, &remaining, &deps));
    assert_eq!(
        checklist::blocked_items(&remaining, &deps),
        vec![items[1].id.clone()]
    );

    Ok(())
}
