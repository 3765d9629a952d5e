//! Expanding Polytope Algorithm: given a GJK terminal simplex that encloses
//! the origin, recovers penetration depth, contact normal, and a contact
//! point, per §4.3.
//!
//! Like `gjk`, this has no direct teacher analog; grounded on the corpus's
//! idiom only (free functions, `Result`-returning, small iteration caps
//! with an explicit non-convergence error rather than a silent best guess).

use log::error;

use crate::error::{PhysicsError, PhysicsResult};
use crate::gjk::SupportPoint;
use crate::math::{triple_cross, Vec2};

const MAX_ITERATIONS: u32 = 100;
const TOLERANCE: f32 = 1e-3;

pub struct Contact {
    /// Points from shape A toward shape B.
    pub normal: Vec2,
    pub penetration: f32,
    pub world_pos_a: Vec2,
    pub world_pos_b: Vec2,
}

pub fn epa(
    support: impl Fn(Vec2) -> SupportPoint,
    simplex: Vec<SupportPoint>,
) -> PhysicsResult<Contact> {
    let mut polytope = ensure_triangle(&support, simplex);

    for _ in 0..MAX_ITERATIONS {
        let (edge_index, normal, distance) = closest_edge(&polytope);
        let new_point = support(normal);
        let support_distance = new_point.point.dot(normal);

        if support_distance - distance < TOLERANCE {
            return Ok(build_contact(&polytope, edge_index, normal, distance));
        }

        polytope.insert(edge_index + 1, new_point);
    }

    error!("EPA failed to converge after {MAX_ITERATIONS} iterations");
    Err(PhysicsError::EpaDidNotConverge { iterations: MAX_ITERATIONS })
}

/// GJK can terminate with a 2-point simplex when the origin lies exactly
/// on the Minkowski boundary; pad it to a triangle along the edge normal
/// before EPA's edge-walk, which assumes a closed polygon.
fn ensure_triangle(support: &impl Fn(Vec2) -> SupportPoint, mut simplex: Vec<SupportPoint>) -> Vec<SupportPoint> {
    if simplex.len() >= 3 {
        return simplex;
    }
    let a = simplex[0].point;
    let b = simplex[1].point;
    let edge = b - a;
    let normal = Vec2::new(-edge.y, edge.x).normalized();
    let candidate = support(normal);
    if is_new_vertex(&simplex, candidate.point) {
        simplex.push(candidate);
    } else {
        simplex.push(support(-normal));
    }
    simplex
}

fn is_new_vertex(simplex: &[SupportPoint], p: Vec2) -> bool {
    simplex.iter().all(|s| (s.point - p).length_squared() > 1e-10)
}

/// Returns (index of the edge's first vertex, outward unit normal, distance
/// to origin) for the polytope edge closest to the origin.
fn closest_edge(polytope: &[SupportPoint]) -> (usize, Vec2, f32) {
    let n = polytope.len();
    let mut best_index = 0;
    let mut best_normal = Vec2::ZERO;
    let mut best_distance = f32::MAX;

    for i in 0..n {
        let j = (i + 1) % n;
        let a = polytope[i].point;
        let b = polytope[j].point;
        let ab = b - a;
        let oa = a;
        let raw_normal = triple_cross(ab, oa, ab);
        let normal = if raw_normal.length_squared() > 1e-12 { raw_normal } else { ab.perp() }.normalized();
        let distance = normal.dot(a).max(0.0);
        if distance < best_distance {
            best_distance = distance;
            best_normal = normal;
            best_index = i;
        }
    }

    (best_index, best_normal, best_distance)
}

/// Recovers the contact witnesses from the polytope edge nearest the
/// origin, per §4.3: if the edge's two body-A witnesses nearly coincide,
/// use either directly; otherwise interpolate along the edge to the point
/// closest to the origin, then derive B's witness from the MTV.
fn build_contact(polytope: &[SupportPoint], edge_index: usize, normal: Vec2, distance: f32) -> Contact {
    let n = polytope.len();
    let i = edge_index;
    let j = (edge_index + 1) % n;
    let a = polytope[i];
    let b = polytope[j];

    let world_pos_a = if (a.witness_a - b.witness_a).length_squared() < 1.0 {
        a.witness_a
    } else {
        let edge = b.point - a.point;
        let t = if edge.length_squared() > 1e-12 {
            (-(a.point.dot(edge)) / edge.length_squared()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        a.witness_a + (b.witness_a - a.witness_a) * t
    };

    let mtv = normal * distance;
    let world_pos_b = world_pos_a - mtv;

    Contact { normal, penetration: distance, world_pos_a, world_pos_b }
}
