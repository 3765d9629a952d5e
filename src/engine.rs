//! Fixed-step engine driver, per §4.8/§6.
//!
//! Grounded on the teacher's `world::PhysicsWorld` for overall shape (the
//! free-id-recycling body slab, the accumulator-driven `step`/`update`
//! split, read-only accessors) generalized to the quadtree broad-phase,
//! persistent manifolds, and island-based sleeping this specification adds.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, error, trace, warn};

use crate::aabb::Aabb;
use crate::body::{BodyId, BodyType, RigidBody};
use crate::config::EngineConfig;
use crate::error::PhysicsResult;
use crate::island::IslandSet;
use crate::manifold::{Collision, ManifoldCache};
use crate::math::Vec2;
use crate::narrowphase;
use crate::quadtree::Quadtree;
use crate::solver;

/// Default world bounds used by `PhysicsEngine::new` when the caller has no
/// specific arena size in mind. Large enough that ordinary scenes never hit
/// the quadtree's out-of-bounds rejection path.
const DEFAULT_BOUNDS_HALF_EXTENT: f32 = 1.0e6;

#[derive(Debug, Clone, Copy, Default)]
pub struct StepReport {
    pub steps_performed: u32,
    pub elapsed: Duration,
}

pub struct PhysicsEngine {
    config: EngineConfig,
    fixed_time_step: f32,
    time_elapsed: f32,
    steps_elapsed: u64,
    update_duration: Duration,

    bodies: Vec<Option<RigidBody>>,
    free_ids: Vec<BodyId>,
    next_id: BodyId,

    quadtree: Quadtree,
    manifolds: ManifoldCache,
    islands: IslandSet,
}

impl PhysicsEngine {
    pub fn new(config: EngineConfig) -> PhysicsResult<Self> {
        let half = DEFAULT_BOUNDS_HALF_EXTENT;
        Self::with_bounds(config, Aabb::new(Vec2::new(-half, -half), Vec2::new(half, half)))
    }

    pub fn with_bounds(config: EngineConfig, bounds: Aabb) -> PhysicsResult<Self> {
        config.validate()?;
        Ok(Self {
            fixed_time_step: config.fixed_time_step(),
            config,
            time_elapsed: 0.0,
            steps_elapsed: 0,
            update_duration: Duration::ZERO,
            bodies: Vec::new(),
            free_ids: Vec::new(),
            next_id: 0,
            quadtree: Quadtree::new(bounds),
            manifolds: ManifoldCache::new(),
            islands: IslandSet::new(),
        })
    }

    pub fn add_body(&mut self, mut body: RigidBody) -> BodyId {
        let id = self.free_ids.pop().unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });
        body.id = id;
        let aabb = body.world_aabb();

        if id as usize >= self.bodies.len() {
            self.bodies.resize_with(id as usize + 1, || None);
        }
        self.bodies[id as usize] = Some(body);

        if !self.quadtree.insert(id, aabb) {
            warn!("body {id} inserted outside broad-phase bounds");
        }
        id
    }

    pub fn remove_body(&mut self, id: BodyId) -> bool {
        if (id as usize) >= self.bodies.len() || self.bodies[id as usize].is_none() {
            return false;
        }
        self.bodies[id as usize] = None;
        self.free_ids.push(id);
        self.quadtree.remove(id)
    }

    pub fn get_body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id as usize)?.as_ref()
    }

    pub fn get_body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id as usize)?.as_mut()
    }

    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.bodies.iter().flatten()
    }

    pub fn collisions(&self) -> impl Iterator<Item = &Collision> {
        self.manifolds.iter()
    }

    pub fn islands(&self) -> impl Iterator<Item = &crate::island::Island> {
        self.islands.iter()
    }

    pub fn update_duration(&self) -> Duration {
        self.update_duration
    }

    pub fn time_elapsed(&self) -> f32 {
        self.time_elapsed
    }

    pub fn steps_elapsed(&self) -> u64 {
        self.steps_elapsed
    }

    /// Advances `time_elapsed` by `dt` and runs as many fixed substeps as
    /// have newly elapsed, per §4.8.
    pub fn update(&mut self, dt: f32) -> PhysicsResult<StepReport> {
        let start = Instant::now();

        self.time_elapsed += dt;
        let target_steps = (self.time_elapsed / self.fixed_time_step).floor() as u64;
        let delta_steps = target_steps.saturating_sub(self.steps_elapsed);

        trace!("update(dt={dt}): running {delta_steps} substeps");
        for _ in 0..delta_steps {
            self.step(self.fixed_time_step)?;
        }
        self.steps_elapsed += delta_steps;

        self.update_duration = start.elapsed();
        Ok(StepReport { steps_performed: delta_steps as u32, elapsed: self.update_duration })
    }

    fn step(&mut self, dt: f32) -> PhysicsResult<()> {
        self.integrate_bodies(dt);
        self.islands.reset(&mut self.bodies);

        let confirmed = self.run_narrowphase()?;
        self.manifolds.prune_unconfirmed(&confirmed);

        self.run_solver();

        crate::sleep::arbitrate(
            &self.islands,
            &mut self.bodies,
            dt,
            self.config.sleep_linear_threshold,
            self.config.sleep_angular_threshold,
            self.config.sleep_time_threshold,
        );

        Ok(())
    }

    fn integrate_bodies(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        for slot in self.bodies.iter_mut() {
            if let Some(body) = slot {
                if body.body_type != BodyType::Static && !body.sleeping {
                    body.linear_velocity.y += gravity * dt;
                    body.integrate(dt);
                }
            }
        }
        for slot in self.bodies.iter() {
            if let Some(body) = slot {
                self.quadtree.update(body.id, body.world_aabb());
            }
        }
        trace!("integrated {} bodies", self.bodies.iter().flatten().count());
    }

    fn run_narrowphase(&mut self) -> PhysicsResult<HashSet<u64>> {
        let mut confirmed = HashSet::new();
        let pairs = self.quadtree.get_pairs();

        for (id_a, id_b) in pairs {
            if !self.both_present(id_a, id_b) {
                continue;
            }
            if self.pair_is_inert(id_a, id_b) {
                continue;
            }

            let result = {
                let a = self.bodies[id_a as usize].as_ref().unwrap();
                let b = self.bodies[id_b as usize].as_ref().unwrap();
                narrowphase::test_pair(a, b)
            };

            let contact = match result {
                None => continue,
                Some(Err(err)) => {
                    error!("narrow-phase failed for bodies ({id_a}, {id_b}): {err}");
                    return Err(err);
                }
                Some(Ok(contact)) => contact,
            };

            {
                let a = self.bodies[id_a as usize].as_ref().unwrap();
                let b = self.bodies[id_b as usize].as_ref().unwrap();
                self.manifolds.confirm(a, b, &contact, &mut confirmed);
            }

            let had_island = self.islands.iter().count();
            self.islands.confirm_pair(&mut self.bodies, id_a, id_b);
            if self.islands.iter().count() != had_island {
                debug!("island created for pair ({id_a}, {id_b})");
            }

            self.wake_if_either_awake(id_a, id_b);
        }

        Ok(confirmed)
    }

    fn both_present(&self, id_a: BodyId, id_b: BodyId) -> bool {
        self.bodies.get(id_a as usize).is_some_and(|b| b.is_some())
            && self.bodies.get(id_b as usize).is_some_and(|b| b.is_some())
    }

    fn pair_is_inert(&self, id_a: BodyId, id_b: BodyId) -> bool {
        let a = self.bodies[id_a as usize].as_ref().unwrap();
        let b = self.bodies[id_b as usize].as_ref().unwrap();
        let a_inert = a.body_type == BodyType::Static || a.sleeping;
        let b_inert = b.body_type == BodyType::Static || b.sleeping;
        a_inert && b_inert
    }

    fn wake_if_either_awake(&mut self, id_a: BodyId, id_b: BodyId) {
        let either_awake = self.bodies[id_a as usize].as_ref().unwrap().is_awake()
            || self.bodies[id_b as usize].as_ref().unwrap().is_awake();
        if !either_awake {
            return;
        }
        if let Some(body) = self.bodies[id_a as usize].as_mut() {
            body.wake();
        }
        if let Some(body) = self.bodies[id_b as usize].as_mut() {
            body.wake();
        }
    }

    fn run_solver(&mut self) {
        for collision in self.manifolds.iter_mut() {
            let (a, b) = get_pair_mut(&mut self.bodies, collision.body_a, collision.body_b);
            solver::warm_start(a, b, collision);
        }
        for collision in self.manifolds.iter_mut() {
            let (a, b) = get_pair_mut(&mut self.bodies, collision.body_a, collision.body_b);
            solver::position_correct(a, b, collision);
        }
        for collision in self.manifolds.iter_mut() {
            let (a, b) = get_pair_mut(&mut self.bodies, collision.body_a, collision.body_b);
            solver::refresh_contacts(a, b, collision);
        }
        for _ in 0..self.config.velocity_iterations {
            for collision in self.manifolds.iter_mut() {
                let (a, b) = get_pair_mut(&mut self.bodies, collision.body_a, collision.body_b);
                solver::solve_velocity(a, b, collision);
            }
        }
    }
}

/// Two distinct mutable borrows into the body slab via `split_at_mut`.
/// Safe because narrow-phase pair filtering enforces `id_a != id_b`.
fn get_pair_mut(bodies: &mut [Option<RigidBody>], id_a: BodyId, id_b: BodyId) -> (&mut RigidBody, &mut RigidBody) {
    let (lo, hi) = if id_a < id_b { (id_a, id_b) } else { (id_b, id_a) };
    let (left, right) = bodies.split_at_mut(hi as usize);
    let lo_ref = left[lo as usize].as_mut().expect("body present");
    let hi_ref = right[0].as_mut().expect("body present");
    if id_a < id_b { (lo_ref, hi_ref) } else { (hi_ref, lo_ref) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{self, Material};

    fn floor(engine: &mut PhysicsEngine) -> BodyId {
        let body = body::from_rect(
            0,
            BodyType::Static,
            Vec2::new(640.0, 600.0),
            900.0,
            40.0,
            1.0,
            Material { restitution: 0.0, friction: 0.5 },
        )
        .unwrap();
        engine.add_body(body)
    }

    #[test]
    fn free_fall_matches_kinematics() {
        let mut engine = PhysicsEngine::new(EngineConfig::default()).unwrap();
        let square = body::from_rect(
            0,
            BodyType::Dynamic,
            Vec2::new(640.0, 100.0),
            40.0,
            40.0,
            1.0,
            Material::default(),
        )
        .unwrap();
        let id = engine.add_body(square);

        engine.update(0.2).unwrap();

        let body = engine.get_body(id).unwrap();
        let expected_y = 100.0 + 0.5 * 981.0 * 0.2 * 0.2;
        assert!((body.position.y - expected_y).abs() < 2.0, "y = {}", body.position.y);
    }

    #[test]
    fn resting_square_eventually_sleeps() {
        let mut engine = PhysicsEngine::new(EngineConfig::default()).unwrap();
        floor(&mut engine);
        let square = body::from_rect(
            1,
            BodyType::Dynamic,
            Vec2::new(640.0, 560.0),
            40.0,
            40.0,
            1.0,
            Material { restitution: 0.0, friction: 0.5 },
        )
        .unwrap();
        let id = engine.add_body(square);

        for _ in 0..(5 * engine.config.steps_per_second) {
            engine.update(1.0 / engine.config.steps_per_second as f32).unwrap();
        }

        let body = engine.get_body(id).unwrap();
        assert!(body.sleeping, "expected body to settle and sleep");
    }

    #[test]
    fn fast_body_through_a_gap_has_no_collisions() {
        let mut engine = PhysicsEngine::new(EngineConfig::default()).unwrap();
        let passer = body::from_circle(0, BodyType::Dynamic, Vec2::new(-500.0, 0.0), 5.0, 1.0, Material::default())
            .unwrap();
        let id = engine.add_body(passer);
        engine.get_body_mut(id).unwrap().linear_velocity = Vec2::new(50_000.0, 0.0);
        engine.update(1.0 / 500.0).unwrap();
        assert_eq!(engine.collisions().count(), 0);
    }

    #[test]
    fn remove_body_frees_its_id_for_reuse() {
        let mut engine = PhysicsEngine::new(EngineConfig::default()).unwrap();
        let body = body::from_circle(0, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap();
        let id = engine.add_body(body);
        assert!(engine.remove_body(id));
        assert!(engine.get_body(id).is_none());
        let body2 = body::from_circle(0, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap();
        let id2 = engine.add_body(body2);
        assert_eq!(id, id2);
    }
}
