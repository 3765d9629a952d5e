//! Single narrow-phase entry point: GJK boolean test followed by EPA
//! penetration recovery, per §4.2/§4.3.

use crate::body::RigidBody;
use crate::epa::{self, Contact};
use crate::error::PhysicsResult;
use crate::gjk::{self, minkowski_support};

/// `None` means the shapes do not overlap. `Some(Err(..))` never occurs —
/// EPA failure is surfaced through the `Result`, not folded into `None`,
/// so a caller can't mistake "no collision" for "collision detection
/// broke".
pub fn test_pair(a: &RigidBody, b: &RigidBody) -> Option<PhysicsResult<Contact>> {
    let simplex = gjk::gjk_overlap(a, b)?;
    Some(epa::epa(|d| minkowski_support(a, b, d), simplex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{self, BodyType, Material};
    use crate::math::Vec2;

    #[test]
    fn separated_shapes_report_no_collision() {
        let a = body::from_circle(0, BodyType::Dynamic, Vec2::new(0.0, 0.0), 1.0, 1.0, Material::default()).unwrap();
        let b = body::from_circle(1, BodyType::Dynamic, Vec2::new(10.0, 0.0), 1.0, 1.0, Material::default()).unwrap();
        assert!(test_pair(&a, &b).is_none());
    }

    #[test]
    fn overlapping_shapes_report_a_contact() {
        let a = body::from_circle(0, BodyType::Dynamic, Vec2::new(0.0, 0.0), 1.0, 1.0, Material::default()).unwrap();
        let b = body::from_circle(1, BodyType::Dynamic, Vec2::new(1.0, 0.0), 1.0, 1.0, Material::default()).unwrap();
        let contact = test_pair(&a, &b).expect("overlap").expect("epa converges");
        assert!(contact.penetration > 0.0);
    }
}
