//! Selection tracking and hierarchy traversal.
//!
//! The selection is an ordered, duplicate-free list of layer IDs. Groups in
//! the selection stand for all of their descendant elements; see
//! [`expand_to_elements`].

use std::collections::HashSet;

use crate::{Layer, LayerId, LayerStore};

/// All layers whose `parent_id` chain leads back to `layer_id`.
///
/// Never includes `layer_id` itself. Results are in breadth-first order, and
/// sequence order within each level. A visited set guards against cyclic parent
/// chains in malformed input.
#[must_use]
pub fn find_descendant_ids(layer_id: LayerId, layers: &[Layer]) -> Vec<LayerId> {
    let mut visited: HashSet<LayerId> = HashSet::from([layer_id]);
    let mut result = Vec::new();
    let mut cursor = 0;
    let mut frontier = vec![layer_id];

    while cursor < frontier.len() {
        let parent = frontier[cursor];
        cursor += 1;
        for layer in layers {
            if layer.parent_id == Some(parent) && visited.insert(layer.id) {
                result.push(layer.id);
                frontier.push(layer.id);
            }
        }
    }

    result
}

/// Flatten a selection into the elements it affects.
///
/// Image and text layers are taken as-is. Groups contribute every descendant
/// element; nested groups are traversed but not included. Output follows the
/// selection order, then sequence order within a group, with duplicates removed.
#[must_use]
pub fn expand_to_elements(selected_ids: &[LayerId], layers: &[Layer]) -> Vec<LayerId> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for id in selected_ids {
        let Some(layer) = layers.iter().find(|l| l.id == *id) else {
            continue;
        };
        if layer.is_element() {
            if seen.insert(layer.id) {
                result.push(layer.id);
            }
            continue;
        }

        let descendants: HashSet<LayerId> = find_descendant_ids(layer.id, layers).into_iter().collect();
        for candidate in layers {
            if candidate.is_element() && descendants.contains(&candidate.id) && seen.insert(candidate.id) {
                result.push(candidate.id);
            }
        }
    }

    result
}

/// The set of selected layer IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<LayerId>,
}

impl Selection {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected IDs in selection order.
    #[must_use]
    pub fn ids(&self) -> &[LayerId] {
        &self.ids
    }

    /// Whether the ID is selected.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        self.ids.contains(&id)
    }

    /// Number of selected layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replace the selection with a single layer.
    pub fn select_only(&mut self, id: LayerId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Add the layer if absent, remove it if present.
    pub fn toggle(&mut self, id: LayerId) {
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
    }

    /// Replace the selection, dropping duplicates but keeping first-seen order.
    pub fn set(&mut self, ids: impl IntoIterator<Item = LayerId>) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop IDs that no longer exist in the store.
    pub fn prune(&mut self, store: &LayerStore) {
        self.ids.retain(|id| store.contains(*id));
    }

    /// Element IDs affected by this selection.
    #[must_use]
    pub fn effective_elements(&self, store: &LayerStore) -> Vec<LayerId> {
        expand_to_elements(&self.ids, store.layers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Geometry;

    fn image() -> Layer {
        Layer::image("data:,", "image/png", Geometry::default())
    }

    #[test]
    fn test_find_descendants_excludes_root() {
        let group = Layer::group();
        let child = image().with_parent(Some(group.id));
        let other = image();
        let layers = vec![group.clone(), child.clone(), other];

        let found = find_descendant_ids(group.id, &layers);
        assert_eq!(found, vec![child.id]);
        assert!(!found.contains(&group.id));
    }

    #[test]
    fn test_find_descendants_is_transitive() {
        let outer = Layer::group();
        let inner = Layer::group().with_parent(Some(outer.id));
        let leaf = image().with_parent(Some(inner.id));
        let layers = vec![outer.clone(), inner.clone(), leaf.clone()];

        let found = find_descendant_ids(outer.id, &layers);
        assert_eq!(found, vec![inner.id, leaf.id]);
    }

    #[test]
    fn test_find_descendants_terminates_on_cycle() {
        let mut a = Layer::group();
        let b = Layer::group().with_parent(Some(a.id));
        a.parent_id = Some(b.id);
        let layers = vec![a.clone(), b.clone()];

        let found = find_descendant_ids(a.id, &layers);
        assert_eq!(found, vec![b.id]);
    }

    #[test]
    fn test_expand_skips_groups_and_dedups() {
        let outer = Layer::group();
        let inner = Layer::group().with_parent(Some(outer.id));
        let leaf_a = image().with_parent(Some(outer.id));
        let leaf_b = image().with_parent(Some(inner.id));
        let loose = image();
        let layers = vec![
            outer.clone(),
            inner.clone(),
            leaf_b.clone(),
            leaf_a.clone(),
            loose.clone(),
        ];

        let expanded = expand_to_elements(&[leaf_a.id, outer.id, loose.id, inner.id], &layers);
        assert_eq!(expanded, vec![leaf_a.id, leaf_b.id, loose.id]);
    }

    #[test]
    fn test_expand_ignores_unknown_ids() {
        let layers = vec![image()];
        assert!(expand_to_elements(&[LayerId::new()], &layers).is_empty());
    }

    #[test]
    fn test_toggle_and_set() {
        let a = LayerId::new();
        let b = LayerId::new();
        let mut selection = Selection::new();
        selection.toggle(a);
        selection.toggle(b);
        assert_eq!(selection.ids(), &[a, b]);
        selection.toggle(a);
        assert_eq!(selection.ids(), &[b]);

        selection.set([a, a, b]);
        assert_eq!(selection.ids(), &[a, b]);

        selection.select_only(b);
        assert_eq!(selection.ids(), &[b]);
    }

    #[test]
    fn test_prune_drops_missing() {
        let kept = image();
        let store = LayerStore::from_layers(vec![kept.clone()]);
        let mut selection = Selection::new();
        selection.set([kept.id, LayerId::new()]);
        selection.prune(&store);
        assert_eq!(selection.ids(), &[kept.id]);
    }
}
