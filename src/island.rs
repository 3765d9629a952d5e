//! Island builder: unions non-fixed bodies connected by active contacts
//! each step, for coherent sleep arbitration, per §4.6.
//!
//! No module in the reference pack models islands (the teacher's
//! `sleep.rs` puts bodies to sleep individually); this is grounded on the
//! teacher's general state-machine style (plain structs, index-based
//! back-references rather than shared ownership) rather than on any
//! specific file, per §9's note that a generational-index arena is the
//! systems-language rendering of the "weak back-pointer" in the original.

use crate::body::{BodyId, BodyType, RigidBody};

#[derive(Debug, Clone, Default)]
pub struct Island {
    pub bodies: Vec<BodyId>,
}

impl Island {
    fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct IslandSet {
    islands: Vec<Island>,
}

impl IslandSet {
    pub fn new() -> Self {
        Self { islands: Vec::new() }
    }

    /// Clears island membership on every body and discards the island
    /// list; called once at the start of each step.
    pub fn reset(&mut self, bodies: &mut [Option<RigidBody>]) {
        self.islands.clear();
        for body in bodies.iter_mut().flatten() {
            body.island_id = None;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Island> {
        self.islands.iter().filter(|i| !i.is_empty())
    }

    /// Folds a confirmed contact between `id_a` and `id_b` into the island
    /// structure. Fixed bodies are never added to an island.
    pub fn confirm_pair(&mut self, bodies: &mut [Option<RigidBody>], id_a: BodyId, id_b: BodyId) {
        let a_fixed = is_fixed(bodies, id_a);
        let b_fixed = is_fixed(bodies, id_b);

        match (a_fixed, b_fixed) {
            (true, true) => {}
            (true, false) => self.ensure_membership(bodies, id_b),
            (false, true) => self.ensure_membership(bodies, id_a),
            (false, false) => self.union(bodies, id_a, id_b),
        }
    }

    fn ensure_membership(&mut self, bodies: &mut [Option<RigidBody>], id: BodyId) {
        if island_id_of(bodies, id).is_some() {
            return;
        }
        let index = self.islands.len();
        self.islands.push(Island { bodies: vec![id] });
        set_island_id(bodies, id, index);
    }

    fn union(&mut self, bodies: &mut [Option<RigidBody>], id_a: BodyId, id_b: BodyId) {
        match (island_id_of(bodies, id_a), island_id_of(bodies, id_b)) {
            (Some(ia), Some(ib)) if ia != ib => self.merge(bodies, ia, ib),
            (Some(_), Some(_)) => {}
            (Some(ia), None) => {
                self.islands[ia].bodies.push(id_b);
                set_island_id(bodies, id_b, ia);
            }
            (None, Some(ib)) => {
                self.islands[ib].bodies.push(id_a);
                set_island_id(bodies, id_a, ib);
            }
            (None, None) => {
                let index = self.islands.len();
                self.islands.push(Island { bodies: vec![id_a, id_b] });
                set_island_id(bodies, id_a, index);
                set_island_id(bodies, id_b, index);
            }
        }
    }

    /// Merges the smaller island into the larger; the emptied island is
    /// left in place (its slot is simply never iterated again) rather than
    /// shifting indices that other bodies may still reference this step.
    fn merge(&mut self, bodies: &mut [Option<RigidBody>], ia: usize, ib: usize) {
        let (survivor, absorbed) =
            if self.islands[ia].bodies.len() >= self.islands[ib].bodies.len() { (ia, ib) } else { (ib, ia) };
        let moved: Vec<BodyId> = std::mem::take(&mut self.islands[absorbed].bodies);
        for id in &moved {
            set_island_id(bodies, *id, survivor);
        }
        self.islands[survivor].bodies.extend(moved);
    }
}

fn is_fixed(bodies: &[Option<RigidBody>], id: BodyId) -> bool {
    bodies[id as usize].as_ref().map(|b| b.body_type == BodyType::Static).unwrap_or(true)
}

fn island_id_of(bodies: &[Option<RigidBody>], id: BodyId) -> Option<usize> {
    bodies[id as usize].as_ref().and_then(|b| b.island_id.map(|i| i as usize))
}

fn set_island_id(bodies: &mut [Option<RigidBody>], id: BodyId, island_index: usize) {
    if let Some(body) = bodies[id as usize].as_mut() {
        body.island_id = Some(island_index as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{self, Material};
    use crate::math::Vec2;

    fn bodies() -> Vec<Option<RigidBody>> {
        vec![
            Some(body::from_circle(0, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap()),
            Some(body::from_circle(1, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap()),
            Some(body::from_circle(2, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap()),
            Some(body::from_rect(3, BodyType::Static, Vec2::ZERO, 1.0, 1.0, 1.0, Material::default()).unwrap()),
        ]
    }

    #[test]
    fn transitive_contacts_merge_into_one_island() {
        let mut bodies = bodies();
        let mut set = IslandSet::new();
        set.confirm_pair(&mut bodies, 0, 1);
        set.confirm_pair(&mut bodies, 1, 2);
        let islands: Vec<_> = set.iter().collect();
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].bodies.len(), 3);
    }

    #[test]
    fn fixed_body_never_joins_an_island() {
        let mut bodies = bodies();
        let mut set = IslandSet::new();
        set.confirm_pair(&mut bodies, 0, 3);
        let islands: Vec<_> = set.iter().collect();
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].bodies, vec![0]);
    }

    #[test]
    fn reset_clears_all_membership() {
        let mut bodies = bodies();
        let mut set = IslandSet::new();
        set.confirm_pair(&mut bodies, 0, 1);
        set.reset(&mut bodies);
        assert_eq!(set.iter().count(), 0);
        assert!(bodies[0].as_ref().unwrap().island_id.is_none());
    }
}
