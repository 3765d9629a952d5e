//! Region quadtree broad-phase, max depth 4, per §4.1.
//!
//! Grounded on the teacher's `broadphase::SpatialHash` idiom (free insert/
//! pairs functions operating over AABBs, `HashSet`-deduped pair extraction)
//! but backed by a quadtree rather than a hash grid, with O(1) removal via
//! swap-remove plus an item -> (node, slot) map instead of rebuilding the
//! structure every step. Subdivision is lazy and containment-driven: a leaf
//! splits the first time an inserted item's AABB fits fully inside one of
//! its would-be quadrants, not once its item count crosses a threshold.

use std::collections::HashMap;

use crate::aabb::Aabb;
use crate::body::BodyId;

const MAX_DEPTH: u32 = 4;

struct Node {
    bounds: Aabb,
    depth: u32,
    items: Vec<(BodyId, Aabb)>,
    children: Option<[usize; 4]>,
}

impl Node {
    fn leaf(bounds: Aabb, depth: u32) -> Self {
        Self { bounds, depth, items: Vec::new(), children: None }
    }

    fn is_empty_leaf(&self) -> bool {
        self.children.is_none() && self.items.is_empty()
    }
}

pub struct Quadtree {
    nodes: Vec<Node>,
    locations: HashMap<BodyId, (usize, usize)>,
}

impl Quadtree {
    pub fn new(bounds: Aabb) -> Self {
        Self { nodes: vec![Node::leaf(bounds, 0)], locations: HashMap::new() }
    }

    pub fn clear(&mut self, bounds: Aabb) {
        self.nodes.clear();
        self.nodes.push(Node::leaf(bounds, 0));
        self.locations.clear();
    }

    /// Insert `id` with world AABB `aabb`. Returns `false` if `aabb` does
    /// not overlap the tree's root bounds at all — the caller logs this,
    /// the quadtree itself stays silent.
    pub fn insert(&mut self, id: BodyId, aabb: Aabb) -> bool {
        if !self.nodes[0].bounds.intersects(&aabb) {
            return false;
        }
        let node_index = self.descend_for_insert(0, aabb);
        let slot = self.nodes[node_index].items.len();
        self.nodes[node_index].items.push((id, aabb));
        self.locations.insert(id, (node_index, slot));
        true
    }

    /// Descend while `aabb` is fully contained in exactly one child's
    /// bounds, splitting a leaf lazily (on demand, not on a population
    /// count) the first time some inserted item actually fits one of its
    /// quadrants. On no-fit or at `MAX_DEPTH`, the current node is returned
    /// and the item is appended to its list.
    fn descend_for_insert(&mut self, node_index: usize, aabb: Aabb) -> usize {
        if self.nodes[node_index].depth >= MAX_DEPTH {
            return node_index;
        }
        if self.nodes[node_index].children.is_none() {
            if quadrant_bounds(self.nodes[node_index].bounds).iter().all(|q| !q.contains(&aabb)) {
                return node_index;
            }
            self.split(node_index);
        }
        if let Some(children) = self.nodes[node_index].children {
            if let Some(quadrant) = self.quadrant_for(node_index, aabb) {
                return self.descend_for_insert(children[quadrant], aabb);
            }
        }
        node_index
    }

    fn quadrant_for(&self, node_index: usize, aabb: Aabb) -> Option<usize> {
        let children = self.nodes[node_index].children?;
        for (i, &child) in children.iter().enumerate() {
            if self.nodes[child].bounds.contains(&aabb) {
                return Some(i);
            }
        }
        None
    }

    fn split(&mut self, node_index: usize) {
        let bounds = self.nodes[node_index].bounds;
        let depth = self.nodes[node_index].depth + 1;
        let quadrant_bounds = quadrant_bounds(bounds);

        let mut child_indices = [0usize; 4];
        for (i, qb) in quadrant_bounds.into_iter().enumerate() {
            self.nodes.push(Node::leaf(qb, depth));
            child_indices[i] = self.nodes.len() - 1;
        }
        self.nodes[node_index].children = Some(child_indices);

        let existing: Vec<(BodyId, Aabb)> = std::mem::take(&mut self.nodes[node_index].items);
        for (id, item_aabb) in existing {
            match self.quadrant_for(node_index, item_aabb) {
                Some(q) => {
                    let child = child_indices[q];
                    let slot = self.nodes[child].items.len();
                    self.nodes[child].items.push((id, item_aabb));
                    self.locations.insert(id, (child, slot));
                }
                None => {
                    let slot = self.nodes[node_index].items.len();
                    self.nodes[node_index].items.push((id, item_aabb));
                    self.locations.insert(id, (node_index, slot));
                }
            }
        }
    }

    /// O(1) removal: swap-remove within the owning node's item vec, then
    /// fix up the displaced item's recorded slot.
    pub fn remove(&mut self, id: BodyId) -> bool {
        let Some((node_index, slot)) = self.locations.remove(&id) else {
            return false;
        };
        let node = &mut self.nodes[node_index];
        node.items.swap_remove(slot);
        if let Some(&(moved_id, _)) = node.items.get(slot) {
            self.locations.insert(moved_id, (node_index, slot));
        }
        self.prune(node_index);
        true
    }

    /// Bottom-up: collapse a node's children back to `None` once the whole
    /// subtree (this node included) holds no items.
    fn prune(&mut self, node_index: usize) {
        if self.subtree_is_empty(node_index) {
            self.nodes[node_index].children = None;
        }
    }

    fn subtree_is_empty(&self, node_index: usize) -> bool {
        let node = &self.nodes[node_index];
        if !node.items.is_empty() {
            return false;
        }
        match node.children {
            None => true,
            Some(children) => children.iter().all(|&c| self.subtree_is_empty(c)),
        }
    }

    /// Move `id` to a new AABB; implemented as remove-then-insert, matching
    /// how broad-phase structures in this corpus handle per-step rebuilds.
    pub fn update(&mut self, id: BodyId, aabb: Aabb) -> bool {
        self.remove(id);
        self.insert(id, aabb)
    }

    pub fn is_empty(&self, node_index: usize) -> bool {
        self.nodes[node_index].is_empty_leaf()
    }

    /// Unique candidate pairs whose AABBs overlap. An item stored at an
    /// interior node (because its AABB spanned multiple quadrants) is
    /// tested against every item in its own subtree, matching the
    /// ancestor-items-carried-down-the-recursion technique.
    pub fn get_pairs(&self) -> Vec<(BodyId, BodyId)> {
        let mut pairs = Vec::new();
        self.collect_pairs(0, &[], &mut pairs);
        pairs
    }

    fn collect_pairs(&self, node_index: usize, ancestors: &[(BodyId, Aabb)], out: &mut Vec<(BodyId, BodyId)>) {
        let node = &self.nodes[node_index];

        for (i, &(id_a, aabb_a)) in node.items.iter().enumerate() {
            for &(id_b, aabb_b) in ancestors {
                if aabb_a.intersects(&aabb_b) {
                    out.push(ordered_pair(id_a, id_b));
                }
            }
            for &(id_b, aabb_b) in &node.items[i + 1..] {
                if aabb_a.intersects(&aabb_b) {
                    out.push(ordered_pair(id_a, id_b));
                }
            }
        }

        if let Some(children) = node.children {
            let mut combined = ancestors.to_vec();
            combined.extend_from_slice(&node.items);
            for child in children {
                self.collect_pairs(child, &combined, out);
            }
        }
    }

    /// All items whose AABB intersects `query`.
    pub fn query_aabb(&self, query: Aabb) -> Vec<BodyId> {
        let mut out = Vec::new();
        self.query_node(0, query, &mut out);
        out
    }

    fn query_node(&self, node_index: usize, query: Aabb, out: &mut Vec<BodyId>) {
        let node = &self.nodes[node_index];
        if !node.bounds.intersects(&query) {
            return;
        }
        for &(id, aabb) in &node.items {
            if aabb.intersects(&query) {
                out.push(id);
            }
        }
        if let Some(children) = node.children {
            for child in children {
                self.query_node(child, query, out);
            }
        }
    }
}

fn ordered_pair(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a < b { (a, b) } else { (b, a) }
}

/// The four quadrant bounds `bounds` splits into, in NW/NE/SW/SE-ish index
/// order matching `Node::children`.
fn quadrant_bounds(bounds: Aabb) -> [Aabb; 4] {
    let center = bounds.center();
    [
        Aabb::new(bounds.min, center),
        Aabb::new(crate::math::Vec2::new(center.x, bounds.min.y), crate::math::Vec2::new(bounds.max.x, center.y)),
        Aabb::new(crate::math::Vec2::new(bounds.min.x, center.y), crate::math::Vec2::new(center.x, bounds.max.y)),
        Aabb::new(center, bounds.max),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    fn world() -> Quadtree {
        Quadtree::new(Aabb::new(Vec2::new(-1000.0, -1000.0), Vec2::new(1000.0, 1000.0)))
    }

    #[test]
    fn insert_outside_bounds_is_rejected() {
        let mut tree = world();
        let far = Aabb::new(Vec2::new(5000.0, 5000.0), Vec2::new(5001.0, 5001.0));
        assert!(!tree.insert(1, far));
    }

    #[test]
    fn overlapping_pair_is_found() {
        let mut tree = world();
        tree.insert(1, Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0)));
        tree.insert(2, Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0)));
        let pairs = tree.get_pairs();
        assert_eq!(pairs, vec![(1, 2)]);
    }

    #[test]
    fn disjoint_bodies_produce_no_pairs() {
        let mut tree = world();
        tree.insert(1, Aabb::new(Vec2::new(-900.0, -900.0), Vec2::new(-898.0, -898.0)));
        tree.insert(2, Aabb::new(Vec2::new(900.0, 900.0), Vec2::new(902.0, 902.0)));
        assert!(tree.get_pairs().is_empty());
    }

    #[test]
    fn remove_is_reflected_in_pairs() {
        let mut tree = world();
        tree.insert(1, Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0)));
        tree.insert(2, Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0)));
        tree.remove(1);
        assert!(tree.get_pairs().is_empty());
        assert!(tree.is_empty(0) || !tree.locations.contains_key(&1));
    }

    #[test]
    fn splitting_across_many_items_still_finds_overlaps() {
        let mut tree = world();
        for i in 0..30u32 {
            let x = (i as f32) * 1.5;
            tree.insert(i, Aabb::new(Vec2::new(x, 0.0), Vec2::new(x + 2.0, 2.0)));
        }
        let pairs = tree.get_pairs();
        assert!(pairs.iter().any(|&(a, b)| a == 0 && b == 1));
    }
}
