//! Dependency graph over the items of one checklist.
//!
//! Edges point from a prerequisite to the item that depends on it. The graph is
//! read-only: it validates proposed edges and answers reachability questions
//! against a snapshot of items taken inside the mutation's unit of work.
//!
//! Every chain walk is bounded by the item count, so even corrupted data that
//! already contains a cycle cannot make a walk run forever.

use std::collections::HashMap;

use rustworkx_core::petgraph::algo::toposort;
use rustworkx_core::petgraph::graph::{DiGraph, NodeIndex};

use crate::entities::ChecklistItem;
use crate::errors::CoreError;

pub struct DependencyGraph<'a> {
    items: Vec<&'a ChecklistItem>,
    by_id: HashMap<&'a str, &'a ChecklistItem>,
}

impl<'a> DependencyGraph<'a> {
    /// Index the items of a single checklist.
    #[must_use]
    pub fn new(items: &'a [ChecklistItem]) -> Self {
        let items: Vec<&ChecklistItem> = items.iter().collect();
        let by_id = items.iter().map(|item| (item.id.as_str(), *item)).collect();
        Self { items, by_id }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a ChecklistItem> {
        self.by_id.get(id).copied()
    }

    /// Check that `item_id` may depend on `depends_on_id`.
    ///
    /// `item_id` need not exist yet (a new item cannot close a cycle, but the
    /// self-reference and membership checks still apply).
    ///
    /// # Errors
    ///
    /// - [`CoreError::DependencyCycle`] if `depends_on_id == item_id` or the chain
    ///   starting at `depends_on_id` leads back to `item_id`.
    /// - [`CoreError::Validation`] if `depends_on_id` is not an item of this checklist.
    pub fn validate_edge(&self, item_id: &str, depends_on_id: &str) -> Result<(), CoreError> {
        let cycle = || CoreError::DependencyCycle {
            item_id: item_id.to_string(),
            depends_on_id: depends_on_id.to_string(),
        };

        if item_id == depends_on_id {
            return Err(cycle());
        }
        if !self.by_id.contains_key(depends_on_id) {
            return Err(CoreError::validation(format!(
                "dependency {depends_on_id} is not an item of this checklist"
            )));
        }

        let mut current = Some(depends_on_id);
        let mut visits = 0usize;
        while let Some(id) = current {
            if id == item_id {
                return Err(cycle());
            }
            visits += 1;
            if visits > self.items.len() {
                // The existing chain already loops; refuse to extend it.
                return Err(cycle());
            }
            current = self.by_id.get(id).and_then(|item| item.depends_on_id.as_deref());
        }
        Ok(())
    }

    /// True when `item` has no dependency or its immediate prerequisite is completed.
    ///
    /// A dangling reference counts as unsatisfied.
    #[must_use]
    pub fn is_satisfied(&self, item: &ChecklistItem) -> bool {
        item.depends_on_id
            .as_deref()
            .is_none_or(|dep| self.by_id.get(dep).is_some_and(|d| d.is_completed))
    }

    /// Walk the full prerequisite chain of `item` and return every incomplete link,
    /// nearest first. Mandatory flags are irrelevant: every edge gates completion.
    #[must_use]
    pub fn unmet_prerequisites(&self, item: &ChecklistItem) -> Vec<&'a ChecklistItem> {
        let mut unmet = Vec::new();
        let mut current = item.depends_on_id.as_deref();
        let mut visits = 0usize;
        while let Some(id) = current {
            visits += 1;
            if visits > self.items.len() || id == item.id {
                break;
            }
            let Some(prerequisite) = self.by_id.get(id).copied() else {
                break;
            };
            if !prerequisite.is_completed {
                unmet.push(prerequisite);
            }
            current = prerequisite.depends_on_id.as_deref();
        }
        unmet
    }

    /// Items whose `depends_on_id` points at `item_id`.
    #[must_use]
    pub fn dependents_of(&self, item_id: &str) -> Vec<&'a ChecklistItem> {
        self.items
            .iter()
            .filter(|item| item.depends_on_id.as_deref() == Some(item_id))
            .copied()
            .collect()
    }

    /// Item ids ordered so every prerequisite precedes its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DependencyCycle`] if stored data contains a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>, CoreError> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.items.len());
        for item in &self.items {
            index.insert(item.id.as_str(), graph.add_node(item.id.as_str()));
        }
        for item in &self.items {
            let from = item.depends_on_id.as_deref().and_then(|dep| index.get(dep));
            if let Some(&from) = from {
                graph.add_edge(from, index[item.id.as_str()], ());
            }
        }

        let sorted = toposort(&graph, None).map_err(|cycle| {
            let id = graph[cycle.node_id()].to_string();
            let depends_on_id = self
                .by_id
                .get(id.as_str())
                .and_then(|item| item.depends_on_id.clone())
                .unwrap_or_default();
            CoreError::DependencyCycle {
                item_id: id,
                depends_on_id,
            }
        })?;
        Ok(sorted.into_iter().map(|idx| graph[idx].to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn item(id: &str, depends_on: Option<&str>, completed: bool) -> ChecklistItem {
        ChecklistItem {
            id: id.to_string(),
            checklist_id: "chk-test".to_string(),
            title: id.to_uppercase(),
            description: None,
            is_completed: completed,
            is_mandatory: false,
            order: 0,
            depends_on_id: depends_on.map(String::from),
            completed_by: None,
            completed_at: None,
            due_date: None,
            created_at: Utc::now(),
        }
    }

    /// a <- b <- c, plus an unrelated d.
    fn chain() -> Vec<ChecklistItem> {
        vec![
            item("a", None, false),
            item("b", Some("a"), false),
            item("c", Some("b"), false),
            item("d", None, false),
        ]
    }

    #[rstest]
    #[case::self_reference("a", "a")]
    #[case::direct_back_edge("a", "b")]
    #[case::transitive_back_edge("a", "c")]
    fn validate_edge_rejects_cycles(#[case] item_id: &str, #[case] dep: &str) {
        let items = chain();
        let graph = DependencyGraph::new(&items);
        let err = graph.validate_edge(item_id, dep).unwrap_err();
        assert!(matches!(err, CoreError::DependencyCycle { .. }), "{err}");
    }

    #[rstest]
    #[case::unrelated("d", "c")]
    #[case::retarget("c", "a")]
    #[case::new_item("e", "c")]
    fn validate_edge_accepts_dag(#[case] item_id: &str, #[case] dep: &str) {
        let items = chain();
        let graph = DependencyGraph::new(&items);
        graph.validate_edge(item_id, dep).unwrap();
    }

    #[test]
    fn validate_edge_rejects_foreign_item() {
        let items = chain();
        let graph = DependencyGraph::new(&items);
        let err = graph.validate_edge("a", "itm-elsewhere").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn validate_edge_terminates_on_corrupt_loop() {
        let items = vec![
            item("x", Some("y"), false),
            item("y", Some("x"), false),
            item("z", None, false),
        ];
        let graph = DependencyGraph::new(&items);
        let err = graph.validate_edge("z", "x").unwrap_err();
        assert!(matches!(err, CoreError::DependencyCycle { .. }));
    }

    #[test]
    fn is_satisfied_checks_immediate_prerequisite() {
        let items = vec![item("a", None, true), item("b", Some("a"), false)];
        let graph = DependencyGraph::new(&items);
        assert!(graph.is_satisfied(&items[0]));
        assert!(graph.is_satisfied(&items[1]));

        let dangling = item("c", Some("gone"), false);
        assert!(!graph.is_satisfied(&dangling));
    }

    #[test]
    fn unmet_prerequisites_walks_whole_chain() {
        // b is done but a is not: c is still blocked through b.
        let items = vec![
            item("a", None, false),
            item("b", Some("a"), true),
            item("c", Some("b"), false),
        ];
        let graph = DependencyGraph::new(&items);
        assert!(graph.is_satisfied(&items[2]));
        let unmet: Vec<&str> = graph
            .unmet_prerequisites(&items[2])
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(unmet, vec!["a"]);
    }

    #[test]
    fn dependents_of_lists_direct_children() {
        let items = chain();
        let graph = DependencyGraph::new(&items);
        let ids: Vec<&str> = graph.dependents_of("a").iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert!(graph.dependents_of("c").is_empty());
    }

    #[test]
    fn topological_order_puts_prerequisites_first() {
        let items = vec![
            item("c", Some("b"), false),
            item("b", Some("a"), false),
            item("a", None, false),
        ];
        let graph = DependencyGraph::new(&items);
        let order = graph.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert_eq!(order.len(), 3);
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn topological_order_reports_cycle() {
        let items = vec![item("x", Some("y"), false), item("y", Some("x"), false)];
        let graph = DependencyGraph::new(&items);
        assert!(matches!(
            graph.topological_order(),
            Err(CoreError::DependencyCycle { .. })
        ));
    }
}
