//! GJK boolean overlap test over the Minkowski difference of two convex
//! shapes, per §4.2.
//!
//! No file in the reference pack hand-rolls GJK (the SAT-based
//! `narrowphase` module this crate started from resolves shape pairs
//! directly); this module is grounded only on the corpus's general shape
//! for narrow-phase code — free functions, `Option`-returning, one entry
//! point per algorithm stage.

use crate::body::RigidBody;
use crate::math::{triple_cross, Vec2};

/// A single Minkowski-difference support point, carrying the shape-local
/// witnesses that EPA later needs to reconstruct contact points.
#[derive(Debug, Clone, Copy)]
pub struct SupportPoint {
    pub point: Vec2,
    pub witness_a: Vec2,
    pub witness_b: Vec2,
}

pub fn minkowski_support(a: &RigidBody, b: &RigidBody, d: Vec2) -> SupportPoint {
    let witness_a = a.shape.support(d, a.position, a.rotation());
    let witness_b = b.shape.support(-d, b.position, b.rotation());
    SupportPoint { point: witness_a - witness_b, witness_a, witness_b }
}

const MAX_ITERATIONS: u32 = 64;

/// Runs GJK and returns the terminal simplex (2 or 3 points) iff the
/// origin is enclosed, i.e. the shapes overlap. The simplex is handed
/// directly to EPA for penetration resolution.
pub fn gjk_overlap(a: &RigidBody, b: &RigidBody) -> Option<Vec<SupportPoint>> {
    let mut direction = b.position - a.position;
    if direction.length_squared() < 1e-12 {
        direction = Vec2::new(1.0, 0.0);
    }

    let mut simplex = vec![minkowski_support(a, b, direction)];
    direction = -simplex[0].point;

    for _ in 0..MAX_ITERATIONS {
        if direction.length_squared() < 1e-12 {
            return Some(simplex);
        }
        let next = minkowski_support(a, b, direction);
        if next.point.dot(direction) < 0.0 {
            return None;
        }
        simplex.push(next);

        if do_simplex(&mut simplex, &mut direction) {
            return Some(simplex);
        }
    }
    None
}

/// Evolves `simplex` toward the origin, updating `direction` for the next
/// support query. Returns `true` once the simplex encloses the origin.
fn do_simplex(simplex: &mut Vec<SupportPoint>, direction: &mut Vec2) -> bool {
    match simplex.len() {
        2 => line_case(simplex, direction),
        3 => triangle_case(simplex, direction),
        _ => unreachable!("simplex grows by exactly one point per iteration"),
    }
}

/// Two points (newest `a` last). The simplex never shrinks here — only the
/// triangle case drops a vertex.
fn line_case(simplex: &[SupportPoint], direction: &mut Vec2) -> bool {
    let a = simplex[1].point;
    let b = simplex[0].point;
    let ab = b - a;
    let ao = -a;

    let normal = triple_cross(ab, ao, ab);
    *direction = if normal.length_squared() > 1e-12 { normal } else { ab.perp() };
    false
}

/// Three points, oldest (`c`) first, newest (`a`) last.
fn triangle_case(simplex: &mut Vec<SupportPoint>, direction: &mut Vec2) -> bool {
    let c = simplex[0].point;
    let b = simplex[1].point;
    let a = simplex[2].point;
    let ac = c - a;
    let ab = b - a;
    let ao = -a;

    let ab_normal = triple_cross(ac, ab, ab);
    if ab_normal.dot(ao) > 0.0 {
        simplex.remove(0);
        *direction = ab_normal;
        return false;
    }

    let ac_normal = triple_cross(ab, ac, ac);
    if ac_normal.dot(ao) > 0.0 {
        simplex.remove(1);
        *direction = ac_normal;
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{self, BodyType, Material};

    fn circle(id: u32, pos: Vec2, r: f32) -> RigidBody {
        body::from_circle(id, BodyType::Dynamic, pos, r, 1.0, Material::default()).unwrap()
    }

    #[test]
    fn overlapping_circles_detected() {
        let a = circle(0, Vec2::new(0.0, 0.0), 1.0);
        let b = circle(1, Vec2::new(1.0, 0.0), 1.0);
        assert!(gjk_overlap(&a, &b).is_some());
    }

    #[test]
    fn separated_circles_not_detected() {
        let a = circle(0, Vec2::new(0.0, 0.0), 1.0);
        let b = circle(1, Vec2::new(10.0, 0.0), 1.0);
        assert!(gjk_overlap(&a, &b).is_none());
    }

    #[test]
    fn touching_polygons_detected() {
        let a = body::from_rect(0, BodyType::Dynamic, Vec2::new(0.0, 0.0), 2.0, 2.0, 1.0, Material::default())
            .unwrap();
        let b = body::from_rect(1, BodyType::Dynamic, Vec2::new(1.9, 0.0), 2.0, 2.0, 1.0, Material::default())
            .unwrap();
        assert!(gjk_overlap(&a, &b).is_some());
    }
}
