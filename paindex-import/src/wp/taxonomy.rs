//! Parent-before-child ordering of WordPress categories
//!
//! Categories reference their parent by WordPress ID. Import must create a
//! parent before any of its children, so the orchestrator processes
//! categories in the order produced here.

use std::collections::{HashMap, VecDeque};

use super::client::WpCategory;

/// Result of ordering a category set
#[derive(Debug, Default)]
pub struct TaxonomyOrder {
    /// Categories in a valid creation order (parents before children)
    pub ordered: Vec<WpCategory>,
    /// Categories that cannot be placed (cycle members)
    pub unresolved: Vec<WpCategory>,
    /// Human-readable notes about irregular input (dangling parents)
    pub warnings: Vec<String>,
}

/// Order categories so every parent precedes its children.
///
/// WordPress uses parent ID 0 for roots. A category whose parent ID is
/// non-zero but absent from the input is treated as a root and noted in
/// `warnings`. Categories stuck in a reference cycle land in `unresolved`.
pub fn order_categories(categories: Vec<WpCategory>) -> TaxonomyOrder {
    let mut order = TaxonomyOrder::default();
    let known: HashMap<u64, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();

    // Effective parent: 0 (root) when the declared parent is missing
    let mut parent_of: HashMap<u64, u64> = HashMap::new();
    for category in &categories {
        let parent = if category.parent == 0 || known.contains_key(&category.parent) {
            category.parent
        } else {
            order.warnings.push(format!(
                "category '{}' (wp_id {}) references missing parent {}; importing as root",
                category.name, category.id, category.parent
            ));
            0
        };
        parent_of.insert(category.id, parent);
    }

    let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
    let mut indegree: HashMap<u64, usize> = HashMap::new();
    for category in &categories {
        let parent = parent_of[&category.id];
        if parent == 0 {
            indegree.insert(category.id, 0);
        } else {
            indegree.insert(category.id, 1);
            children.entry(parent).or_default().push(category.id);
        }
    }

    let mut queue: VecDeque<u64> = categories
        .iter()
        .filter(|c| indegree[&c.id] == 0)
        .map(|c| c.id)
        .collect();

    let mut placed: Vec<u64> = Vec::with_capacity(categories.len());
    while let Some(id) = queue.pop_front() {
        placed.push(id);
        if let Some(kids) = children.get(&id) {
            for &kid in kids {
                if let Some(remaining) = indegree.get_mut(&kid) {
                    *remaining -= 1;
                    if *remaining == 0 {
                        queue.push_back(kid);
                    }
                }
            }
        }
    }

    let placed_set: std::collections::HashSet<u64> = placed.iter().copied().collect();
    let mut by_id: HashMap<u64, WpCategory> =
        categories.into_iter().map(|c| (c.id, c)).collect();

    for id in &placed {
        if let Some(category) = by_id.remove(id) {
            order.ordered.push(category);
        }
    }
    // Whatever remains is part of a cycle
    let mut leftover: Vec<WpCategory> = by_id.into_values().collect();
    leftover.sort_by_key(|c| c.id);
    for category in leftover {
        if !placed_set.contains(&category.id) {
            order.unresolved.push(category);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: u64, parent: u64, name: &str) -> WpCategory {
        WpCategory {
            id,
            parent,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
        }
    }

    fn position(order: &TaxonomyOrder, id: u64) -> usize {
        order
            .ordered
            .iter()
            .position(|c| c.id == id)
            .unwrap_or_else(|| panic!("category {} not placed", id))
    }

    #[test]
    fn three_level_hierarchy_orders_parents_first() {
        // child listed before parent before grandparent in the input
        let input = vec![
            category(3, 2, "Nerve Blocks"),
            category(2, 1, "Injections"),
            category(1, 0, "Treatments"),
            category(4, 1, "Ablation"),
        ];
        let order = order_categories(input);

        assert_eq!(order.ordered.len(), 4);
        assert!(order.unresolved.is_empty());
        assert!(position(&order, 1) < position(&order, 2));
        assert!(position(&order, 2) < position(&order, 3));
        assert!(position(&order, 1) < position(&order, 4));
    }

    #[test]
    fn dangling_parent_imports_as_root_with_warning() {
        let input = vec![category(5, 99, "Orphan"), category(1, 0, "Root")];
        let order = order_categories(input);

        assert_eq!(order.ordered.len(), 2);
        assert!(order.unresolved.is_empty());
        assert_eq!(order.warnings.len(), 1);
        assert!(order.warnings[0].contains("missing parent 99"));
    }

    #[test]
    fn cycle_members_are_unresolved() {
        let input = vec![
            category(1, 0, "Root"),
            category(2, 3, "A"),
            category(3, 2, "B"),
        ];
        let order = order_categories(input);

        assert_eq!(order.ordered.len(), 1);
        assert_eq!(order.ordered[0].id, 1);
        assert_eq!(order.unresolved.len(), 2);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let order = order_categories(Vec::new());
        assert!(order.ordered.is_empty());
        assert!(order.unresolved.is_empty());
        assert!(order.warnings.is_empty());
    }
}
