//! Island-wide sleep arbitration, per §4.6.
//!
//! Grounded on the teacher's `sleep.rs` (per-body still-timers, threshold
//! constants read from configuration rather than hard-coded) generalized
//! from per-body to island-wide arbitration.

use crate::body::RigidBody;
use crate::island::IslandSet;

pub fn arbitrate(
    islands: &IslandSet,
    bodies: &mut [Option<RigidBody>],
    dt: f32,
    sleep_linear_threshold: f32,
    sleep_angular_threshold: f32,
    sleep_time_threshold: f32,
) {
    let linear_threshold_sq = sleep_linear_threshold * sleep_linear_threshold;

    for island in islands.iter() {
        if island.bodies.is_empty() {
            continue;
        }

        for &id in &island.bodies {
            if let Some(body) = bodies[id as usize].as_mut() {
                let still = body.linear_velocity.length_squared() < linear_threshold_sq
                    && body.angular_velocity.abs() < sleep_angular_threshold;
                body.sleep_timer = if still { body.sleep_timer + dt } else { 0.0 };
            }
        }

        let min_sleep_time = island
            .bodies
            .iter()
            .filter_map(|&id| bodies[id as usize].as_ref())
            .map(|b| b.sleep_timer)
            .fold(f32::MAX, f32::min);

        if min_sleep_time >= sleep_time_threshold {
            for &id in &island.bodies {
                if let Some(body) = bodies[id as usize].as_mut() {
                    body.sleeping = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{self, BodyType, Material};
    use crate::math::Vec2;

    #[test]
    fn still_island_falls_asleep_after_threshold() {
        let mut bodies =
            vec![Some(body::from_circle(0, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap())];
        let mut islands = IslandSet::new();
        islands.confirm_pair(&mut bodies, 0, 0);
        for _ in 0..10 {
            arbitrate(&islands, &mut bodies, 0.1, 0.15, 0.15, 0.5);
        }
        assert!(bodies[0].as_ref().unwrap().sleeping);
    }

    #[test]
    fn moving_body_never_accumulates_still_time() {
        let mut bodies =
            vec![Some(body::from_circle(0, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap())];
        bodies[0].as_mut().unwrap().linear_velocity = Vec2::new(100.0, 0.0);
        let mut islands = IslandSet::new();
        islands.confirm_pair(&mut bodies, 0, 0);
        arbitrate(&islands, &mut bodies, 0.1, 0.15, 0.15, 0.5);
        assert_eq!(bodies[0].as_ref().unwrap().sleep_timer, 0.0);
        assert!(!bodies[0].as_ref().unwrap().sleeping);
    }
}
