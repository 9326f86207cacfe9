//! The graph-partition algorithm, kept free of SQL so it can be unit-tested on its own.
//!
//! Per the design notes (§9): union-find on edge-add, BFS/DFS over the affected subgraph on
//! edge-remove. Every function here takes the minimal slice of state it needs (entity keys,
//! edges, existing `graph_id`s) and returns a plan the caller applies with `UPDATE` statements;
//! none of it touches a database connection.

use std::collections::{HashMap, HashSet};

use configurator_types::{EntityKey, GraphId};

/// A directed edge used only for the in-memory graph algorithms (not [`configurator_types::GraphEdge`],
/// which is the persisted/returned shape).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: EntityKey,
    pub to: EntityKey,
}

/// Whether adding `new_edges` to a network whose existing edges are `existing_edges` would
/// introduce a cycle into the directed association graph.
///
/// Runs a DFS from every node touched by `new_edges`, which is sufficient because a cycle must
/// pass through at least one newly added edge (the pre-existing graph is already known to be
/// acyclic). Self-loops (`from == to`) are permitted and carry no semantic weight, so they never
/// count as a cycle.
#[must_use]
pub fn would_introduce_cycle(existing_edges: &[Edge], new_edges: &[Edge]) -> bool {
    let mut adjacency: HashMap<&EntityKey, Vec<&EntityKey>> = HashMap::new();
    for edge in existing_edges.iter().chain(new_edges) {
        adjacency.entry(&edge.from).or_default().push(&edge.to);
    }

    for edge in new_edges.iter().filter(|edge| edge.from != edge.to) {
        if has_path(&adjacency, &edge.to, &edge.from) {
            return true;
        }
    }
    false
}

fn has_path<'a>(
    adjacency: &HashMap<&'a EntityKey, Vec<&'a EntityKey>>,
    from: &'a EntityKey,
    to: &'a EntityKey,
) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        if let Some(neighbors) = adjacency.get(node) {
            stack.extend(neighbors.iter().copied());
        }
    }
    false
}

/// Given the `graph_id`s of the endpoints of one or more newly added edges (treated as
/// undirected for connectivity, per §4.4), returns the winning `graph_id` — the lexicographically
/// smallest among them — that every entity in the merged component should be re-stamped with.
///
/// Returns `None` if `graph_ids` is empty.
#[must_use]
pub fn merge_winner(graph_ids: impl IntoIterator<Item = GraphId>) -> Option<GraphId> {
    graph_ids.into_iter().min()
}

/// Computes the undirected weakly-connected components of `entities` under `edges`.
///
/// Entities with no edges among `entities` form their own singleton component. Only edges whose
/// both endpoints are in `entities` are considered, so callers can scope this to one network (or
/// one previously-known component) without filtering the edge list themselves.
#[must_use]
pub fn connected_components(entities: &[EntityKey], edges: &[Edge]) -> Vec<Vec<EntityKey>> {
    let members: HashSet<&EntityKey> = entities.iter().collect();
    let mut adjacency: HashMap<&EntityKey, Vec<&EntityKey>> = HashMap::new();
    for entity in entities {
        adjacency.entry(entity).or_default();
    }
    for edge in edges {
        if members.contains(&edge.from) && members.contains(&edge.to) {
            adjacency.entry(&edge.from).or_default().push(&edge.to);
            adjacency.entry(&edge.to).or_default().push(&edge.from);
        }
    }

    let mut visited: HashSet<&EntityKey> = HashSet::new();
    let mut components = Vec::new();
    for entity in entities {
        if visited.contains(entity) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![entity];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            component.push(node.clone());
            if let Some(neighbors) = adjacency.get(node) {
                stack.extend(neighbors.iter().copied());
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

/// Assigns post-split `graph_id`s to `components` (as produced by [`connected_components`]).
///
/// The component containing the lexicographically smallest [`EntityKey`] keeps
/// `previous_graph_id`; every other component is handed a fresh ID from `next_id`, called once
/// per additional component in input order. Pure with respect to ID allocation, so tests can
/// supply a deterministic `next_id`.
#[must_use]
pub fn assign_graph_ids_after_split(
    components: Vec<Vec<EntityKey>>,
    previous_graph_id: GraphId,
    mut next_id: impl FnMut() -> GraphId,
) -> HashMap<EntityKey, GraphId> {
    let retaining_index = components
        .iter()
        .enumerate()
        .filter(|(_, component)| !component.is_empty())
        .min_by_key(|(_, component)| component.iter().min())
        .map(|(index, _)| index);

    let mut assignment = HashMap::new();
    for (index, component) in components.into_iter().enumerate() {
        let graph_id = if Some(index) == retaining_index {
            previous_graph_id.clone()
        } else {
            next_id()
        };
        for entity in component {
            assignment.insert(entity, graph_id.clone());
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> EntityKey {
        EntityKey::new("t", k)
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge {
            from: key(from),
            to: key(to),
        }
    }

    #[test]
    fn no_cycle_in_an_empty_graph() {
        assert!(!would_introduce_cycle(&[], &[edge("a", "b")]));
    }

    #[test]
    fn direct_reverse_edge_is_a_cycle() {
        let existing = vec![edge("a", "b")];
        assert!(would_introduce_cycle(&existing, &[edge("b", "a")]));
    }

    #[test]
    fn indirect_cycle_through_existing_chain_is_detected() {
        // a -> b -> c already exists; adding c -> a closes the loop.
        let existing = vec![edge("a", "b"), edge("b", "c")];
        assert!(would_introduce_cycle(&existing, &[edge("c", "a")]));
    }

    #[test]
    fn self_loop_is_not_a_cycle() {
        assert!(!would_introduce_cycle(&[], &[edge("a", "a")]));
    }

    #[test]
    fn self_loop_alongside_a_real_cycle_still_detects_the_real_cycle() {
        let existing = vec![edge("a", "b")];
        assert!(would_introduce_cycle(&existing, &[edge("a", "a"), edge("b", "a")]));
    }

    #[test]
    fn unrelated_edge_is_not_a_cycle() {
        let existing = vec![edge("a", "b")];
        assert!(!would_introduce_cycle(&existing, &[edge("c", "d")]));
    }

    #[test]
    fn merge_winner_is_the_lexicographically_smallest() {
        let winner = merge_winner([GraphId::new("zzz"), GraphId::new("aaa")]);
        assert_eq!(winner, Some(GraphId::new("aaa")));
    }

    #[test]
    fn merge_winner_of_empty_set_is_none() {
        assert_eq!(merge_winner(std::iter::empty()), None);
    }

    #[test]
    fn connected_entities_form_one_component() {
        let entities = vec![key("a"), key("b"), key("c")];
        let edges = vec![edge("a", "b")];
        let components = connected_components(&entities, &edges);
        assert_eq!(components.len(), 2);
        assert!(components.contains(&vec![key("a"), key("b")]));
        assert!(components.contains(&vec![key("c")]));
    }

    #[test]
    fn isolated_entities_are_singleton_components() {
        let entities = vec![key("a"), key("b")];
        let components = connected_components(&entities, &[]);
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn split_retains_previous_id_on_component_with_smallest_key() {
        let components = vec![vec![key("b"), key("c")], vec![key("a")]];
        let mut fresh_ids = vec![GraphId::new("fresh-1")].into_iter();
        let assignment = assign_graph_ids_after_split(components, GraphId::new("old"), || {
            fresh_ids.next().expect("exactly one fresh id needed")
        });
        assert_eq!(assignment[&key("a")], GraphId::new("old"));
        assert_eq!(assignment[&key("b")], GraphId::new("fresh-1"));
        assert_eq!(assignment[&key("c")], GraphId::new("fresh-1"));
    }

    #[test]
    fn split_into_a_single_component_keeps_the_previous_id_for_everyone() {
        let components = vec![vec![key("a"), key("b")]];
        let assignment = assign_graph_ids_after_split(components, GraphId::new("old"), || {
            panic!("no fresh id should be needed")
        });
        assert_eq!(assignment[&key("a")], GraphId::new("old"));
        assert_eq!(assignment[&key("b")], GraphId::new("old"));
    }
}
