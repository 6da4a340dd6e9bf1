use proptest::prelude::*;

use maplefile::checklist::{self, DependencyMap};
use maplefile::model::ChecklistItem;
use maplefile::time::to_date;

fn id_str(index: usize) -> String {
    format!("item-{index}")
}

fn item(index: usize, completed: bool) -> ChecklistItem {
    ChecklistItem {
        id: id_str(index),
        file_id: "file-1".to_string(),
        title: format!("Task {index}"),
        description: None,
        due_date: None,
        notes: None,
        is_completed: completed,
        position: index as i64,
        created_at: to_date(0),
        updated_at: to_date(0),
    }
}

fn deps_from_edges(edges: &[(usize, usize)], n: usize) -> DependencyMap {
    let mut deps = DependencyMap::new();
    for (dependent, prerequisite) in edges {
        if *dependent < n && *prerequisite < n && dependent != prerequisite {
            deps.entry(id_str(*dependent))
                .or_insert_with(Vec::new)
                .push(id_str(*prerequisite));
        }
    }
    deps
}

proptest! {
    #[test]
    fn percentage_tracks_the_completed_ratio(
        flags in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let items: Vec<ChecklistItem> = flags
            .iter()
            .enumerate()
            .map(|(index, done)| item(index, *done))
            .collect();

        let stats = checklist::compute_stats(&items);
        prop_assert_eq!(stats.total as usize, items.len());
        prop_assert_eq!(
            stats.completed as usize,
            flags.iter().filter(|done| **done).count()
        );
        prop_assert!(stats.completed <= stats.total);
        prop_assert!(stats.percentage >= 0.0 && stats.percentage <= 100.0);

        if stats.total == 0 {
            prop_assert_eq!(stats.percentage, 0.0);
        } else {
            let expected = f64::from(stats.completed) / f64::from(stats.total) * 100.0;
            prop_assert!((stats.percentage - expected).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn completing_an_item_never_blocks_more(
        n in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..20),
        done in prop::collection::vec(any::<bool>(), 12),
        promoted in 0usize..12,
    ) {
        let items: Vec<ChecklistItem> =
            (0..n).map(|index| item(index, done[index])).collect();
        let deps = deps_from_edges(&edges, n);

        let before = checklist::blocked_items(&items, &deps);

        let mut more = items.clone();
        if promoted < n {
            more[promoted].is_completed = true;
        }
        let after = checklist::blocked_items(&more, &deps);

        for id in &after {
            prop_assert!(before.contains(id), "item {} became blocked", id);
        }
    }

    #[test]
    fn fully_completed_lists_have_no_blocked_items(
        n in 0usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..20),
    ) {
        let items: Vec<ChecklistItem> = (0..n).map(|index| item(index, true)).collect();
        let deps = deps_from_edges(&edges, n);
        prop_assert!(checklist::blocked_items(&items, &deps).is_empty());
    }
}
