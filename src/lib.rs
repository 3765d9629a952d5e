//! Deterministic 2D rigid-body physics core: a fixed-timestep simulator
//! advancing a population of planar rigid bodies under gravity and mutual
//! contact. See each module for its piece of the pipeline: broad-phase
//! quadtree, GJK + EPA narrow-phase, persistent contact manifolds, a
//! sequential-impulse solver, and island-based sleeping, sequenced by
//! `engine::PhysicsEngine`.

pub mod aabb;
pub mod body;
pub mod config;
pub mod engine;
pub mod epa;
pub mod error;
pub mod gjk;
pub mod island;
pub mod manifold;
pub mod math;
pub mod narrowphase;
pub mod quadtree;
pub mod shape;
pub mod sleep;
pub mod solver;

pub use body::{BodyId, BodyType, Material, RigidBody};
pub use config::EngineConfig;
pub use engine::{PhysicsEngine, StepReport};
pub use error::{PhysicsError, PhysicsResult};
pub use math::{Mat2, Vec2};
pub use shape::Shape;
