//! Per body-pair contact manifold persistence, per §3/§4.4.
//!
//! Grounded on the teacher's `resolve::initialize_contacts`/warm-cache idiom
//! (precompute-once-per-step fields on a `Contact`, keyed body-pair state
//! carried across steps) but replaces the teacher's transient `HashMap`
//! warm-start cache with a full persistent manifold cache, since this is a
//! named module the spec requires rather than a solver implementation
//! detail.

use std::collections::{BTreeMap, HashSet};

use crate::body::{BodyId, RigidBody};
use crate::epa;
use crate::math::Vec2;

const WORLD_DRIFT_THRESHOLD_SQ: f32 = 4.0;
const SEPARATION_THRESHOLD: f32 = 0.01;
const DEDUP_THRESHOLD_SQ: f32 = 4.0;

#[derive(Debug, Clone)]
pub struct Contact {
    pub world_pos_a: Vec2,
    pub world_pos_b: Vec2,
    /// Offset from the owning body's position at creation time. Deliberately
    /// NOT rotated with the body afterward (§9) — this is what drives
    /// invalidation on rotation as well as translation.
    pub local_pos_a: Vec2,
    pub local_pos_b: Vec2,

    pub effective_mass_normal: f32,
    pub effective_mass_tangent: f32,
    pub original_restitution_bias: f32,
    pub accumulated_normal_magnitude: f32,
    pub accumulated_tangent_magnitude: f32,
}

impl Contact {
    fn fresh(world_pos_a: Vec2, world_pos_b: Vec2, body_a: &RigidBody, body_b: &RigidBody) -> Self {
        Self {
            world_pos_a,
            world_pos_b,
            local_pos_a: world_pos_a - body_a.position,
            local_pos_b: world_pos_b - body_b.position,
            effective_mass_normal: 0.0,
            effective_mass_tangent: 0.0,
            original_restitution_bias: 0.0,
            accumulated_normal_magnitude: 0.0,
            accumulated_tangent_magnitude: 0.0,
        }
    }

    fn current_world_a(&self, body_a: &RigidBody) -> Vec2 {
        body_a.position + self.local_pos_a
    }

    fn current_world_b(&self, body_b: &RigidBody) -> Vec2 {
        body_b.position + self.local_pos_b
    }
}

#[derive(Debug, Clone)]
pub struct CollisionManifold {
    pub normal: Vec2,
    pub tangent: Vec2,
    pub depth: f32,
    pub mtv: Vec2,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone)]
pub struct Collision {
    pub id: u64,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub restitution: f32,
    pub friction: f32,
    pub manifold: CollisionManifold,
}

/// Collision-free pair key for `idA < idB`, per §9.
pub fn pair_id(id_a: BodyId, id_b: BodyId) -> u64 {
    debug_assert!(id_a < id_b);
    id_a as u64 * 10_000_000_000 + id_b as u64
}

/// Keyed by `pair_id` in a `BTreeMap` rather than a `HashMap` so that
/// `iter`/`iter_mut` walk collisions in ascending id order. The velocity
/// solver is Gauss-Seidel and order-dependent, so the solve order must be
/// deterministic across runs of an identical scene (§5/§8) — a `HashMap`'s
/// iteration order is not guaranteed stable.
pub struct ManifoldCache {
    collisions: BTreeMap<u64, Collision>,
}

impl ManifoldCache {
    pub fn new() -> Self {
        Self { collisions: BTreeMap::new() }
    }

    pub fn get(&self, id: u64) -> Option<&Collision> {
        self.collisions.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collision> {
        self.collisions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Collision> {
        self.collisions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.collisions.len()
    }

    /// Merge a fresh single-point narrow-phase result into the persistent
    /// manifold for `(body_a, body_b)`, per §4.4. `confirmed` records this
    /// pair's id so the end-of-pass prune doesn't evict it.
    pub fn confirm(
        &mut self,
        body_a: &RigidBody,
        body_b: &RigidBody,
        narrow: &epa::Contact,
        confirmed: &mut HashSet<u64>,
    ) {
        let id = pair_id(body_a.id, body_b.id);
        confirmed.insert(id);

        let normal = narrow.normal;
        let tangent = normal.perp();
        let depth = narrow.penetration;
        let mtv = normal * depth;
        let candidate = Contact::fresh(narrow.world_pos_a, narrow.world_pos_b, body_a, body_b);

        let restitution = body_a.material.restitution * body_b.material.restitution;
        let friction = (body_a.material.friction + body_b.material.friction) * 0.5;

        match self.collisions.get_mut(&id) {
            None => {
                self.collisions.insert(
                    id,
                    Collision {
                        id,
                        body_a: body_a.id,
                        body_b: body_b.id,
                        restitution,
                        friction,
                        manifold: CollisionManifold { normal, tangent, depth, mtv, contacts: vec![candidate] },
                    },
                );
            }
            Some(existing) => {
                existing.restitution = restitution;
                existing.friction = friction;

                let mut retained: Vec<Contact> = std::mem::take(&mut existing.manifold.contacts)
                    .into_iter()
                    .filter(|c| {
                        let cur_a = c.current_world_a(body_a);
                        let cur_b = c.current_world_b(body_b);
                        let drift = (c.world_pos_a - cur_a).length_squared();
                        let separation = normal.dot(cur_b - cur_a);
                        drift <= WORLD_DRIFT_THRESHOLD_SQ && separation <= SEPARATION_THRESHOLD
                    })
                    .collect();

                let is_duplicate = retained.iter().any(|c| {
                    (candidate.local_pos_a - c.local_pos_a).length_squared() < DEDUP_THRESHOLD_SQ
                        || (candidate.local_pos_b - c.local_pos_b).length_squared() < DEDUP_THRESHOLD_SQ
                });
                if !is_duplicate {
                    retained.push(candidate);
                }

                if retained.len() > 2 {
                    retained = cap_to_two(retained);
                }

                existing.manifold = CollisionManifold { normal, tangent, depth, mtv, contacts: retained };
            }
        }
    }

    /// Drop any collision whose id was not confirmed this step.
    pub fn prune_unconfirmed(&mut self, confirmed: &HashSet<u64>) {
        self.collisions.retain(|id, _| confirmed.contains(id));
    }
}

impl Default for ManifoldCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the deepest contact (largest squared distance between its world
/// witnesses) and, among the rest, the one furthest in world space from
/// the deepest; discard the remainder.
fn cap_to_two(contacts: Vec<Contact>) -> Vec<Contact> {
    let deepest_index = contacts
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            let da = (a.world_pos_b - a.world_pos_a).length_squared();
            let db = (b.world_pos_b - b.world_pos_a).length_squared();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let deepest = contacts[deepest_index].clone();

    let furthest_index = contacts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != deepest_index)
        .max_by(|(_, a), (_, b)| {
            let da = (a.world_pos_a - deepest.world_pos_a).length_squared();
            let db = (b.world_pos_a - deepest.world_pos_a).length_squared();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i);

    match furthest_index {
        Some(i) => vec![deepest, contacts[i].clone()],
        None => vec![deepest],
    }
}
