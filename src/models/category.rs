//! Equipment category tree

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EquipmentCategory {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub lab_id: Option<i32>,
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub lab_id: Option<i32>,
    pub parent_id: Option<i32>,
}

/// Returns true if re-parenting `id` under `new_parent` would close a loop.
///
/// `parents` maps every known category id to its current parent. Walking up
/// from `new_parent` must never reach `id`; a loop already present in the
/// stored tree also counts as a cycle.
pub fn creates_cycle(parents: &HashMap<i32, Option<i32>>, id: i32, new_parent: Option<i32>) -> bool {
    let mut seen = HashSet::new();
    let mut cursor = new_parent;
    while let Some(current) = cursor {
        if current == id || !seen.insert(current) {
            return true;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> HashMap<i32, Option<i32>> {
        // 1 -> 2 -> 3, 4 standalone
        HashMap::from([(1, None), (2, Some(1)), (3, Some(2)), (4, None)])
    }

    #[test]
    fn test_move_under_descendant_is_cycle() {
        assert!(creates_cycle(&tree(), 1, Some(3)));
        assert!(creates_cycle(&tree(), 2, Some(2)));
    }

    #[test]
    fn test_valid_moves() {
        assert!(!creates_cycle(&tree(), 4, Some(3)));
        assert!(!creates_cycle(&tree(), 3, None));
        assert!(!creates_cycle(&tree(), 3, Some(1)));
    }

    #[test]
    fn test_new_category_never_cycles() {
        // Fresh ids are not yet in the map
        assert!(!creates_cycle(&tree(), 99, Some(3)));
    }
}
