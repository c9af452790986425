//! Structural edits: group, ungroup, reorder/re-parent, visibility, delete.
//!
//! Each edit is a pure function from the current store to the next one.
//! `None` means the edit was rejected or matched nothing; callers commit
//! nothing in that case. Edits keep every group's descendants contiguous
//! directly after the group.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Layer, LayerId, LayerKind, LayerStore};

/// Where a dragged layer lands relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    /// Sibling of the target, directly above it.
    Before,
    /// Sibling of the target, directly below it (and its descendants).
    After,
    /// Last child of the target group.
    Inside,
}

/// Result of a successful [`group`].
#[derive(Debug, Clone, PartialEq)]
pub struct Grouped {
    /// Store with the new group in place.
    pub store: LayerStore,
    /// ID of the new group.
    pub group_id: LayerId,
}

/// Result of a successful [`ungroup`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ungrouped {
    /// Store with the groups dissolved.
    pub store: LayerStore,
    /// Layers that were released from their groups, in sequence order.
    pub released: Vec<LayerId>,
}

/// Selected layers that have no selected ancestor, in sequence order.
fn selection_roots(store: &LayerStore, selected: &[LayerId]) -> Vec<LayerId> {
    let chosen: HashSet<LayerId> = selected.iter().copied().filter(|id| store.contains(*id)).collect();
    store
        .iter()
        .filter(|l| chosen.contains(&l.id))
        .filter(|l| !store.ancestors(l.id).iter().any(|a| chosen.contains(a)))
        .map(|l| l.id)
        .collect()
}

/// Wrap the selected layers in a new group.
///
/// The group takes the sequence position of the first selected layer. The
/// selected layers follow it, carrying their own descendants along. Fewer
/// than two independent selected layers is a no-op.
#[must_use]
pub fn group(store: &LayerStore, selected: &[LayerId]) -> Option<Grouped> {
    let roots = selection_roots(store, selected);
    if roots.len() < 2 {
        tracing::debug!("group rejected: {} independent layers selected", roots.len());
        return None;
    }

    let mut moved: HashSet<LayerId> = HashSet::new();
    for root in &roots {
        moved.extend(store.span(*root));
    }
    let root_set: HashSet<LayerId> = roots.iter().copied().collect();

    let first_index = store.index_of(roots[0])?;
    let group_parent = store.get(roots[0])?.parent_id;
    let group = Layer::group().with_parent(group_parent);
    let group_id = group.id;

    let mut before = Vec::new();
    let mut members = Vec::new();
    let mut after = Vec::new();
    for (index, layer) in store.iter().enumerate() {
        if moved.contains(&layer.id) {
            let mut layer = layer.clone();
            if root_set.contains(&layer.id) {
                layer.parent_id = Some(group_id);
            }
            members.push(layer);
        } else if index < first_index {
            before.push(layer.clone());
        } else {
            after.push(layer.clone());
        }
    }

    let mut layers = before;
    layers.push(group);
    layers.extend(members);
    layers.extend(after);

    Some(Grouped {
        store: LayerStore::from_layers(layers),
        group_id,
    })
}

/// Dissolve every selected group.
///
/// Direct children become top-level layers and the group layer is removed,
/// even if it was empty. Children of a nested group move, with their
/// descendants, to just below the span of the group's outermost ancestor.
/// Non-group IDs are ignored; `None` if no group was selected.
#[must_use]
pub fn ungroup(store: &LayerStore, selected: &[LayerId]) -> Option<Ungrouped> {
    let mut next = store.clone();
    let mut released = Vec::new();
    let mut dissolved = false;

    for id in selected {
        let Some(group) = next.get(*id) else {
            continue;
        };
        if !group.is_group() {
            continue;
        }
        let outermost = next.ancestors(*id).last().copied();
        let children = next.children(*id);
        for child in &children {
            if let Some(layer) = next.get_mut(*child) {
                layer.parent_id = None;
            }
        }
        next.remove_all(&HashSet::from([*id]));
        if let Some(root) = outermost {
            next = lift_after_span(next, &children, root);
        }
        released.extend(children);
        dissolved = true;
    }

    if !dissolved {
        return None;
    }

    let released = next
        .iter()
        .filter(|l| released.contains(&l.id))
        .map(|l| l.id)
        .collect();
    Some(Ungrouped {
        store: next,
        released,
    })
}

/// Move the spans of `roots` as one block to just below the span of `anchor`.
fn lift_after_span(store: LayerStore, roots: &[LayerId], anchor: LayerId) -> LayerStore {
    let block: HashSet<LayerId> = roots.iter().flat_map(|id| store.span(*id)).collect();
    let (moved, rest): (Vec<Layer>, Vec<Layer>) = store
        .into_layers()
        .into_iter()
        .partition(|l| block.contains(&l.id));
    let rest = LayerStore::from_layers(rest);
    let at = rest
        .index_of(anchor)
        .map_or(rest.len(), |index| index + rest.span(anchor).len());

    let mut layers = rest.into_layers();
    layers.splice(at..at, moved);
    LayerStore::from_layers(layers)
}

/// Move a layer (with its descendants) next to or into another layer.
///
/// Rejected when the IDs are equal or unknown, when the drop target is the
/// dragged layer's child or any deeper descendant, or when dropping inside a
/// non-group.
#[must_use]
pub fn reorder_and_reparent(
    store: &LayerStore,
    drag_id: LayerId,
    drop_id: LayerId,
    position: DropPosition,
) -> Option<LayerStore> {
    if drag_id == drop_id {
        return None;
    }
    let drop = store.get(drop_id)?;
    store.get(drag_id)?;

    if drop.parent_id == Some(drag_id) || store.descendant_ids(drag_id).contains(&drop_id) {
        tracing::debug!("reorder rejected: {drop_id} is inside {drag_id}");
        return None;
    }

    let new_parent = match position {
        DropPosition::Before | DropPosition::After => drop.parent_id,
        DropPosition::Inside => {
            if !drop.is_group() {
                tracing::debug!("reorder rejected: {drop_id} is not a group");
                return None;
            }
            Some(drop_id)
        }
    };

    let block_ids: HashSet<LayerId> = store.span(drag_id).into_iter().collect();
    let mut block = Vec::new();
    let mut remaining = Vec::new();
    for layer in store.iter() {
        if block_ids.contains(&layer.id) {
            let mut layer = layer.clone();
            if layer.id == drag_id {
                layer.parent_id = new_parent;
            }
            block.push(layer);
        } else {
            remaining.push(layer.clone());
        }
    }

    let remaining = LayerStore::from_layers(remaining);
    let drop_index = remaining.index_of(drop_id)?;
    let insert_at = match position {
        DropPosition::Before => drop_index,
        DropPosition::After | DropPosition::Inside => {
            let span: HashSet<LayerId> = remaining.span(drop_id).into_iter().collect();
            remaining
                .iter()
                .enumerate()
                .filter(|(_, l)| span.contains(&l.id))
                .map(|(i, _)| i)
                .max()
                .unwrap_or(drop_index)
                + 1
        }
    };

    let mut layers = remaining.into_layers();
    layers.splice(insert_at..insert_at, block);
    Some(LayerStore::from_layers(layers))
}

/// Flip the visibility flag of exactly one layer.
#[must_use]
pub fn toggle_visibility(store: &LayerStore, id: LayerId) -> Option<LayerStore> {
    let mut next = store.clone();
    let layer = next.get_mut(id)?;
    layer.visible = !layer.visible;
    Some(next)
}

/// Remove the selected layers and all of their descendants.
#[must_use]
pub fn delete_selected(store: &LayerStore, selected: &[LayerId]) -> Option<LayerStore> {
    let mut doomed = HashSet::new();
    for id in selected {
        if store.contains(*id) {
            doomed.insert(*id);
            doomed.extend(store.descendant_ids(*id));
        }
    }
    if doomed.is_empty() {
        return None;
    }
    let mut next = store.clone();
    next.remove_all(&doomed);
    Some(next)
}

/// Expand or collapse a group in the layer tree.
#[must_use]
pub fn set_expanded(store: &LayerStore, id: LayerId, expanded: bool) -> Option<LayerStore> {
    let mut next = store.clone();
    match &mut next.get_mut(id)?.kind {
        LayerKind::Group { expanded: current } => *current = expanded,
        LayerKind::Image { .. } | LayerKind::Text { .. } => return None,
    }
    Some(next)
}

/// Change a layer's display name.
#[must_use]
pub fn rename(store: &LayerStore, id: LayerId, name: &str) -> Option<LayerStore> {
    let mut next = store.clone();
    next.get_mut(id)?.name = name.to_string();
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Geometry;

    fn image(name: &str) -> Layer {
        Layer::image("data:,", "image/png", Geometry::default()).with_name(name)
    }

    fn names(store: &LayerStore) -> Vec<&str> {
        store.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_group_two_top_level_layers() {
        let a = image("A");
        let b = image("B");
        let store = LayerStore::from_layers(vec![a.clone(), b.clone()]);

        let grouped = group(&store, &[a.id, b.id]).expect("group");
        let layers = grouped.store.layers();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].id, grouped.group_id);
        assert!(layers[0].is_group());
        assert_eq!(layers[0].parent_id, None);
        assert_eq!(layers[1].id, a.id);
        assert_eq!(layers[1].parent_id, Some(grouped.group_id));
        assert_eq!(layers[2].id, b.id);
        assert_eq!(layers[2].parent_id, Some(grouped.group_id));
    }

    #[test]
    fn test_group_single_layer_is_noop() {
        let a = image("A");
        let store = LayerStore::from_layers(vec![a.clone(), image("B")]);
        assert!(group(&store, &[a.id]).is_none());
        assert!(group(&store, &[a.id, a.id]).is_none());
        assert!(group(&store, &[a.id, LayerId::new()]).is_none());
    }

    #[test]
    fn test_group_positions_at_first_selected() {
        let top = image("top");
        let a = image("A");
        let mid = image("mid");
        let b = image("B");
        let store = LayerStore::from_layers(vec![top, a.clone(), mid, b.clone()]);

        let grouped = group(&store, &[b.id, a.id]).expect("group");
        assert_eq!(names(&grouped.store), vec!["top", "Group", "A", "B", "mid"]);
    }

    #[test]
    fn test_group_moves_selected_group_with_children() {
        let inner = Layer::group();
        let child = image("child").with_parent(Some(inner.id));
        let other = image("other");
        let store = LayerStore::from_layers(vec![inner.clone(), child.clone(), other.clone()]);

        let grouped = group(&store, &[other.id, inner.id, child.id]).expect("group");
        let s = &grouped.store;
        assert_eq!(s.get(inner.id).and_then(|l| l.parent_id), Some(grouped.group_id));
        assert_eq!(s.get(other.id).and_then(|l| l.parent_id), Some(grouped.group_id));
        assert_eq!(s.get(child.id).and_then(|l| l.parent_id), Some(inner.id));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_ungroup_restores_top_level() {
        let a = image("A");
        let b = image("B");
        let store = LayerStore::from_layers(vec![a.clone(), b.clone()]);
        let grouped = group(&store, &[a.id, b.id]).expect("group");

        let ungrouped = ungroup(&grouped.store, &[grouped.group_id]).expect("ungroup");
        assert_eq!(ungrouped.store, store);
        assert_eq!(ungrouped.released, vec![a.id, b.id]);
    }

    #[test]
    fn test_ungroup_nested_releases_children_to_top_level() {
        let outer = Layer::group();
        let inner = Layer::group().with_parent(Some(outer.id));
        let leaf = image("leaf").with_parent(Some(inner.id));
        let store = LayerStore::from_layers(vec![outer.clone(), inner.clone(), leaf.clone()]);

        let ungrouped = ungroup(&store, &[inner.id]).expect("ungroup");
        assert_eq!(ungrouped.store.get(leaf.id).and_then(|l| l.parent_id), None);
        assert!(!ungrouped.store.contains(inner.id));
        assert_eq!(ungrouped.released, vec![leaf.id]);
        assert!(ungrouped.store.validate().is_ok());
    }

    #[test]
    fn test_ungroup_nested_keeps_spans_contiguous() {
        // outer [ a, inner [ sub [ deep ], b ], c ], below
        let outer = Layer::group();
        let a = image("a").with_parent(Some(outer.id));
        let inner = Layer::group().with_parent(Some(outer.id));
        let sub = Layer::group().with_parent(Some(inner.id));
        let deep = image("deep").with_parent(Some(sub.id));
        let b = image("b").with_parent(Some(inner.id));
        let c = image("c").with_parent(Some(outer.id));
        let below = image("below");
        let store = LayerStore::from_layers(vec![
            outer.clone(),
            a.clone(),
            inner.clone(),
            sub.clone(),
            deep.clone(),
            b.clone(),
            c.clone(),
            below.clone(),
        ]);

        let ungrouped = ungroup(&store, &[inner.id]).expect("ungroup");
        let order: Vec<LayerId> = ungrouped.store.iter().map(|l| l.id).collect();
        assert_eq!(order, vec![outer.id, a.id, c.id, sub.id, deep.id, b.id, below.id]);
        assert_eq!(ungrouped.store.get(sub.id).and_then(|l| l.parent_id), None);
        assert_eq!(ungrouped.store.get(b.id).and_then(|l| l.parent_id), None);
        assert_eq!(ungrouped.store.get(deep.id).and_then(|l| l.parent_id), Some(sub.id));
        assert_eq!(ungrouped.store.get(c.id).and_then(|l| l.parent_id), Some(outer.id));
        assert_eq!(ungrouped.released, vec![sub.id, b.id]);
    }

    #[test]
    fn test_ungroup_empty_group_removes_it() {
        let empty = Layer::group();
        let store = LayerStore::from_layers(vec![empty.clone()]);
        let ungrouped = ungroup(&store, &[empty.id]).expect("ungroup");
        assert!(ungrouped.store.is_empty());
        assert!(ungrouped.released.is_empty());
    }

    #[test]
    fn test_ungroup_ignores_elements() {
        let a = image("A");
        let store = LayerStore::from_layers(vec![a.clone()]);
        assert!(ungroup(&store, &[a.id]).is_none());
    }

    #[test]
    fn test_reorder_before_and_after() {
        let a = image("A");
        let b = image("B");
        let c = image("C");
        let store = LayerStore::from_layers(vec![a.clone(), b.clone(), c.clone()]);

        let moved = reorder_and_reparent(&store, a.id, c.id, DropPosition::After).expect("after");
        assert_eq!(names(&moved), vec!["B", "C", "A"]);

        let moved = reorder_and_reparent(&store, c.id, a.id, DropPosition::Before).expect("before");
        assert_eq!(names(&moved), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_reorder_sibling_takes_target_parent() {
        let g = Layer::group().with_name("G");
        let inside = image("in").with_parent(Some(g.id));
        let loose = image("loose");
        let store = LayerStore::from_layers(vec![g.clone(), inside.clone(), loose.clone()]);

        let moved = reorder_and_reparent(&store, loose.id, inside.id, DropPosition::Before).expect("before");
        assert_eq!(names(&moved), vec!["G", "loose", "in"]);
        assert_eq!(moved.get(loose.id).and_then(|l| l.parent_id), Some(g.id));

        let out = reorder_and_reparent(&store, inside.id, loose.id, DropPosition::After).expect("after");
        assert_eq!(out.get(inside.id).and_then(|l| l.parent_id), None);
        assert_eq!(names(&out), vec!["G", "loose", "in"]);
    }

    #[test]
    fn test_reorder_inside_appends_after_last_child() {
        let g = Layer::group().with_name("G");
        let first = image("first").with_parent(Some(g.id));
        let loose = image("loose");
        let store = LayerStore::from_layers(vec![loose.clone(), g.clone(), first.clone()]);

        let moved = reorder_and_reparent(&store, loose.id, g.id, DropPosition::Inside).expect("inside");
        assert_eq!(names(&moved), vec!["G", "first", "loose"]);
        assert_eq!(moved.get(loose.id).and_then(|l| l.parent_id), Some(g.id));
    }

    #[test]
    fn test_reorder_inside_empty_group() {
        let g = Layer::group().with_name("G");
        let loose = image("loose");
        let other = image("other");
        let store = LayerStore::from_layers(vec![loose.clone(), other, g.clone()]);

        let moved = reorder_and_reparent(&store, loose.id, g.id, DropPosition::Inside).expect("inside");
        assert_eq!(names(&moved), vec!["other", "G", "loose"]);
    }

    #[test]
    fn test_reorder_carries_group_children() {
        let g = Layer::group().with_name("G");
        let child = image("child").with_parent(Some(g.id));
        let last = image("last");
        let store = LayerStore::from_layers(vec![g.clone(), child, last.clone()]);

        let moved = reorder_and_reparent(&store, g.id, last.id, DropPosition::After).expect("after");
        assert_eq!(names(&moved), vec!["last", "G", "child"]);
    }

    #[test]
    fn test_reorder_rejects_cycles() {
        let outer = Layer::group();
        let inner = Layer::group().with_parent(Some(outer.id));
        let leaf = image("leaf").with_parent(Some(inner.id));
        let store = LayerStore::from_layers(vec![outer.clone(), inner.clone(), leaf.clone()]);

        assert!(reorder_and_reparent(&store, outer.id, inner.id, DropPosition::Inside).is_none());
        assert!(reorder_and_reparent(&store, outer.id, leaf.id, DropPosition::Before).is_none());
        assert!(reorder_and_reparent(&store, outer.id, outer.id, DropPosition::Inside).is_none());
    }

    #[test]
    fn test_reorder_rejects_inside_element_and_unknown_ids() {
        let a = image("A");
        let b = image("B");
        let store = LayerStore::from_layers(vec![a.clone(), b.clone()]);
        assert!(reorder_and_reparent(&store, a.id, b.id, DropPosition::Inside).is_none());
        assert!(reorder_and_reparent(&store, a.id, LayerId::new(), DropPosition::After).is_none());
        assert!(reorder_and_reparent(&store, LayerId::new(), a.id, DropPosition::After).is_none());
    }

    #[test]
    fn test_toggle_visibility_touches_one_layer() {
        let g = Layer::group();
        let child = image("child").with_parent(Some(g.id));
        let store = LayerStore::from_layers(vec![g.clone(), child.clone()]);

        let hidden = toggle_visibility(&store, g.id).expect("toggle");
        assert!(!hidden.get(g.id).expect("group").visible);
        assert!(hidden.get(child.id).expect("child").visible);
        assert!(!hidden.is_effectively_visible(child.id));
        assert!(toggle_visibility(&store, LayerId::new()).is_none());
    }

    #[test]
    fn test_delete_group_cascades() {
        let g = Layer::group();
        let a = image("A").with_parent(Some(g.id));
        let b = image("B").with_parent(Some(g.id));
        let keep = image("keep");
        let store = LayerStore::from_layers(vec![g.clone(), a, b, keep.clone()]);

        let next = delete_selected(&store, &[g.id]).expect("delete");
        assert_eq!(next.len(), 1);
        assert!(next.iter().all(|l| l.parent_id != Some(g.id)));
        assert!(next.contains(keep.id));
        assert!(delete_selected(&store, &[LayerId::new()]).is_none());
    }

    #[test]
    fn test_set_expanded_and_rename() {
        let g = Layer::group();
        let a = image("A");
        let store = LayerStore::from_layers(vec![g.clone(), a.clone()]);

        let collapsed = set_expanded(&store, g.id, false).expect("collapse");
        assert_eq!(
            collapsed.get(g.id).map(|l| &l.kind),
            Some(&LayerKind::Group { expanded: false })
        );
        assert!(set_expanded(&store, a.id, false).is_none());

        let renamed = rename(&store, a.id, "Logo").expect("rename");
        assert_eq!(renamed.get(a.id).map(|l| l.name.as_str()), Some("Logo"));
    }
}
