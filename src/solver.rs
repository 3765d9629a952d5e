//! Sequential-impulse constraint solver: warm start, position correction,
//! restitution bias refresh, and accumulated-impulse velocity iterations,
//! per §4.5.
//!
//! Grounded on the teacher's `resolve.rs` (`initialize_contacts`,
//! `warm_start_contacts`, `resolve_single_accumulated`, `position_correction`)
//! for the overall shape of the pipeline and the accumulated-impulse
//! bookkeeping; the concrete numeric recipe (bias cutoff, slop, iteration
//! count, per-contact effective masses) follows the new specification
//! rather than the teacher's own tuning.

use crate::body::RigidBody;
use crate::manifold::Collision;
use crate::math::Vec2;

const SLOP: f32 = 0.1;
const RESTITUTION_VELOCITY_CUTOFF: f32 = -0.1;

fn vel_at_point(body: &RigidBody, r: Vec2) -> Vec2 {
    body.linear_velocity + r.perp() * body.angular_velocity
}

fn apply_impulse(body: &mut RigidBody, impulse: Vec2, point: Vec2) {
    let r = point - body.position;
    body.linear_velocity = body.linear_velocity + impulse * body.inv_mass;
    body.angular_velocity += body.inv_inertia * r.cross(impulse);
}

fn effective_mass(body_a: &RigidBody, body_b: &RigidBody, r_a: Vec2, r_b: Vec2, axis: Vec2) -> f32 {
    let ra_cross = r_a.cross(axis);
    let rb_cross = r_b.cross(axis);
    let denom = body_a.inv_mass
        + body_b.inv_mass
        + body_a.inv_inertia * ra_cross * ra_cross
        + body_b.inv_inertia * rb_cross * rb_cross;
    if denom > 0.0 { 1.0 / denom } else { 0.0 }
}

/// Reapply each contact's accumulated impulse from the previous step as
/// this step's initial guess.
pub fn warm_start(body_a: &mut RigidBody, body_b: &mut RigidBody, collision: &Collision) {
    let normal = collision.manifold.normal;
    let tangent = collision.manifold.tangent;
    for contact in &collision.manifold.contacts {
        let impulse = normal * contact.accumulated_normal_magnitude + tangent * contact.accumulated_tangent_magnitude;
        apply_impulse(body_a, -impulse, contact.world_pos_a);
        apply_impulse(body_b, impulse, contact.world_pos_b);
    }
}

/// Linear-only Baumgarte-style correction; never rotates bodies, so it
/// cannot destabilize stacks the way angular correction can.
pub fn position_correct(body_a: &mut RigidBody, body_b: &mut RigidBody, collision: &Collision) {
    let inv_mass_sum = body_a.inv_mass + body_b.inv_mass;
    if inv_mass_sum <= 0.0 {
        return;
    }
    let k = 1.0 / inv_mass_sum;
    let c = collision.manifold.normal * (collision.manifold.depth - SLOP).max(0.0);
    body_a.position = body_a.position - c * (k * body_a.inv_mass);
    body_b.position = body_b.position + c * (k * body_b.inv_mass);
}

/// Recomputes each contact's effective masses and restitution bias for
/// this step. Must run after `position_correct` (lever arms use the
/// post-correction positions) and before the velocity iterations.
pub fn refresh_contacts(body_a: &RigidBody, body_b: &RigidBody, collision: &mut Collision) {
    let normal = collision.manifold.normal;
    let tangent = collision.manifold.tangent;
    let restitution = collision.restitution;

    for contact in collision.manifold.contacts.iter_mut() {
        let r_a = contact.world_pos_a - body_a.position;
        let r_b = contact.world_pos_b - body_b.position;

        contact.effective_mass_normal = effective_mass(body_a, body_b, r_a, r_b, normal);
        contact.effective_mass_tangent = effective_mass(body_a, body_b, r_a, r_b, tangent);

        let closing = vel_at_point(body_b, r_b) - vel_at_point(body_a, r_a);
        let vn = normal.dot(closing);
        contact.original_restitution_bias =
            if vn < RESTITUTION_VELOCITY_CUTOFF { -restitution * vn } else { 0.0 };
    }
}

/// One Gauss-Seidel velocity iteration: normal impulse then friction
/// impulse, both accumulated-impulse clamped.
pub fn solve_velocity(body_a: &mut RigidBody, body_b: &mut RigidBody, collision: &mut Collision) {
    let normal = collision.manifold.normal;
    let tangent = collision.manifold.tangent;
    let friction = collision.friction;

    for contact in collision.manifold.contacts.iter_mut() {
        let r_a = contact.world_pos_a - body_a.position;
        let r_b = contact.world_pos_b - body_b.position;

        let closing = vel_at_point(body_b, r_b) - vel_at_point(body_a, r_a);
        let vn = normal.dot(closing);
        let lambda = -(vn - contact.original_restitution_bias) * contact.effective_mass_normal;
        let new_accumulated = (contact.accumulated_normal_magnitude + lambda).max(0.0);
        let delta = new_accumulated - contact.accumulated_normal_magnitude;
        contact.accumulated_normal_magnitude = new_accumulated;
        apply_impulse(body_a, -normal * delta, contact.world_pos_a);
        apply_impulse(body_b, normal * delta, contact.world_pos_b);

        let closing = vel_at_point(body_b, r_b) - vel_at_point(body_a, r_a);
        let vt = tangent.dot(closing);
        let lambda_t = -vt * contact.effective_mass_tangent;
        let max_friction = friction * contact.accumulated_normal_magnitude;
        let new_tangent = (contact.accumulated_tangent_magnitude + lambda_t).clamp(-max_friction, max_friction);
        let delta_t = new_tangent - contact.accumulated_tangent_magnitude;
        contact.accumulated_tangent_magnitude = new_tangent;
        apply_impulse(body_a, -tangent * delta_t, contact.world_pos_a);
        apply_impulse(body_b, tangent * delta_t, contact.world_pos_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{self, BodyType, Material};
    use crate::manifold::{CollisionManifold, Contact};

    fn collision(depth: f32, normal: Vec2) -> Collision {
        Collision {
            id: 0,
            body_a: 0,
            body_b: 1,
            restitution: 0.0,
            friction: 0.5,
            manifold: CollisionManifold {
                normal,
                tangent: normal.perp(),
                depth,
                mtv: normal * depth,
                contacts: vec![Contact {
                    world_pos_a: Vec2::new(0.0, 1.0),
                    world_pos_b: Vec2::new(0.0, 1.0),
                    local_pos_a: Vec2::new(0.0, 1.0),
                    local_pos_b: Vec2::new(0.0, -1.0),
                    effective_mass_normal: 0.0,
                    effective_mass_tangent: 0.0,
                    original_restitution_bias: 0.0,
                    accumulated_normal_magnitude: 0.0,
                    accumulated_tangent_magnitude: 0.0,
                }],
            },
        }
    }

    #[test]
    fn accumulated_normal_never_goes_negative() {
        let mut a =
            body::from_circle(0, BodyType::Dynamic, Vec2::new(0.0, 0.0), 1.0, 1.0, Material::default()).unwrap();
        let mut b =
            body::from_circle(1, BodyType::Static, Vec2::new(0.0, 2.0), 1.0, 1.0, Material::default()).unwrap();
        a.linear_velocity = Vec2::new(0.0, -5.0);
        let mut c = collision(0.2, Vec2::new(0.0, 1.0));
        refresh_contacts(&a, &b, &mut c);
        for _ in 0..5 {
            solve_velocity(&mut a, &mut b, &mut c);
        }
        assert!(c.manifold.contacts[0].accumulated_normal_magnitude >= 0.0);
    }

    #[test]
    fn static_body_is_unaffected_by_impulses() {
        let mut a =
            body::from_circle(0, BodyType::Dynamic, Vec2::new(0.0, 0.0), 1.0, 1.0, Material::default()).unwrap();
        let mut b =
            body::from_circle(1, BodyType::Static, Vec2::new(0.0, 2.0), 1.0, 1.0, Material::default()).unwrap();
        a.linear_velocity = Vec2::new(0.0, -5.0);
        let mut c = collision(0.2, Vec2::new(0.0, 1.0));
        refresh_contacts(&a, &b, &mut c);
        solve_velocity(&mut a, &mut b, &mut c);
        assert_eq!(b.linear_velocity, Vec2::ZERO);
    }

    #[test]
    fn position_correction_pushes_bodies_apart_by_penetration_minus_slop() {
        let mut a =
            body::from_circle(0, BodyType::Dynamic, Vec2::new(0.0, 0.0), 1.0, 1.0, Material::default()).unwrap();
        let mut b =
            body::from_circle(1, BodyType::Dynamic, Vec2::new(0.0, 2.0), 1.0, 1.0, Material::default()).unwrap();
        let c = collision(0.3, Vec2::new(0.0, 1.0));
        position_correct(&mut a, &mut b, &c);
        assert!(a.position.y < 0.0);
        assert!(b.position.y > 2.0);
    }
}
