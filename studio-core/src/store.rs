//! The layer store: an ordered arena of layers.
//!
//! Index 0 is the top-most (newest) layer; later layers are painted first.
//! Hierarchy lives entirely in `parent_id` back-references, so every
//! traversal here is guarded against cycles.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::selection::find_descendant_ids;
use crate::{Layer, LayerId, LayerKind, StudioError, StudioResult};

/// One row of the layer tree as a layer panel would list it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    /// Layer shown on this row.
    pub id: LayerId,
    /// Nesting depth, 0 for top-level layers.
    pub depth: usize,
    /// Whether the layer and all of its ancestors are visible.
    pub effectively_visible: bool,
}

/// Ordered collection of all layers in a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerStore {
    layers: Vec<Layer>,
}

impl LayerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from layers in paint order (top-most first).
    #[must_use]
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// All layers, top-most first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Consume the store, returning its layers.
    #[must_use]
    pub fn into_layers(self) -> Vec<Layer> {
        self.layers
    }

    /// Iterate layers, top-most first.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the store has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get a layer by ID.
    #[must_use]
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Get a mutable reference to a layer by ID.
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Position of a layer in the sequence.
    #[must_use]
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// Whether a layer with this ID exists.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        self.index_of(id).is_some()
    }

    /// Insert a layer at the front, making it the top-most layer.
    pub fn prepend(&mut self, layer: Layer) -> LayerId {
        let id = layer.id;
        self.layers.insert(0, layer);
        id
    }

    /// Remove every layer whose ID is in `ids`. Returns how many were removed.
    pub fn remove_all(&mut self, ids: &HashSet<LayerId>) -> usize {
        let before = self.layers.len();
        self.layers.retain(|l| !ids.contains(&l.id));
        before - self.layers.len()
    }

    /// Direct children of a layer, in sequence order.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|l| l.parent_id == Some(id))
            .map(|l| l.id)
            .collect()
    }

    /// All transitive descendants of a layer.
    #[must_use]
    pub fn descendant_ids(&self, id: LayerId) -> Vec<LayerId> {
        find_descendant_ids(id, &self.layers)
    }

    /// A layer followed by its descendants, in sequence order.
    #[must_use]
    pub fn span(&self, id: LayerId) -> Vec<LayerId> {
        let mut members: HashSet<LayerId> = self.descendant_ids(id).into_iter().collect();
        members.insert(id);
        self.layers
            .iter()
            .filter(|l| members.contains(&l.id))
            .map(|l| l.id)
            .collect()
    }

    /// Parent chain of a layer, nearest first. Stops at a missing parent or a cycle.
    #[must_use]
    pub fn ancestors(&self, id: LayerId) -> Vec<LayerId> {
        let mut visited = HashSet::from([id]);
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|l| l.parent_id);
        while let Some(parent) = current {
            if !visited.insert(parent) {
                break;
            }
            chain.push(parent);
            current = self.get(parent).and_then(|l| l.parent_id);
        }
        chain
    }

    /// Whether `ancestor` appears in the parent chain of `id`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: LayerId, id: LayerId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Whether a layer and every one of its ancestors are visible.
    ///
    /// Hiding a group hides its descendants without touching their own flags.
    #[must_use]
    pub fn is_effectively_visible(&self, id: LayerId) -> bool {
        let Some(layer) = self.get(id) else {
            return false;
        };
        layer.visible
            && self
                .ancestors(id)
                .into_iter()
                .all(|a| self.get(a).is_some_and(|l| l.visible))
    }

    /// Effectively visible elements, top-most first.
    #[must_use]
    pub fn visible_elements(&self) -> Vec<&Layer> {
        self.layers
            .iter()
            .filter(|l| l.is_element() && self.is_effectively_visible(l.id))
            .collect()
    }

    /// Find the top-most visible element whose box contains the point.
    #[must_use]
    pub fn element_at(&self, x: f32, y: f32) -> Option<LayerId> {
        self.visible_elements()
            .into_iter()
            .find(|l| l.contains_point(x, y))
            .map(|l| l.id)
    }

    /// The layer tree in listing order, skipping children of collapsed groups.
    #[must_use]
    pub fn tree_rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        let mut visited = HashSet::new();
        for layer in &self.layers {
            let orphaned = layer.parent_id.is_some_and(|p| !self.contains(p));
            if layer.parent_id.is_none() || orphaned {
                self.push_rows(layer, 0, true, &mut visited, &mut rows);
            }
        }
        rows
    }

    fn push_rows(
        &self,
        layer: &Layer,
        depth: usize,
        parent_visible: bool,
        visited: &mut HashSet<LayerId>,
        rows: &mut Vec<TreeRow>,
    ) {
        if !visited.insert(layer.id) {
            return;
        }
        let effectively_visible = parent_visible && layer.visible;
        rows.push(TreeRow {
            id: layer.id,
            depth,
            effectively_visible,
        });
        if let LayerKind::Group { expanded: true } = layer.kind {
            for child in self.layers.iter().filter(|l| l.parent_id == Some(layer.id)) {
                self.push_rows(child, depth + 1, effectively_visible, visited, rows);
            }
        }
    }

    /// Check the structural invariants of the store.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::InvalidDocument`] on a duplicate ID, a parent
    /// that is missing or not a group, or a cyclic parent chain.
    pub fn validate(&self) -> StudioResult<()> {
        let mut ids = HashSet::new();
        for layer in &self.layers {
            if !ids.insert(layer.id) {
                return Err(StudioError::InvalidDocument(format!(
                    "duplicate layer id {}",
                    layer.id
                )));
            }
        }

        for layer in &self.layers {
            let Some(parent_id) = layer.parent_id else {
                continue;
            };
            match self.get(parent_id) {
                Some(parent) if parent.is_group() => {}
                Some(_) => {
                    return Err(StudioError::InvalidDocument(format!(
                        "layer {} has a parent {parent_id} that is not a group",
                        layer.id
                    )));
                }
                None => {
                    return Err(StudioError::InvalidDocument(format!(
                        "layer {} references missing parent {parent_id}",
                        layer.id
                    )));
                }
            }
            if self.descendant_ids(layer.id).contains(&parent_id) || parent_id == layer.id {
                return Err(StudioError::InvalidDocument(format!(
                    "layer {} is its own ancestor",
                    layer.id
                )));
            }
        }

        Ok(())
    }

    /// Serialize the store to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StudioResult<String> {
        serde_json::to_string_pretty(self).map_err(StudioError::Serialization)
    }

    /// Deserialize and validate a store from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the document violates a
    /// structural invariant.
    pub fn from_json(json: &str) -> StudioResult<Self> {
        let store: Self = serde_json::from_str(json)?;
        store.validate()?;
        Ok(store)
    }
}
