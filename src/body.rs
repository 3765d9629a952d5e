//! Rigid body state and the shape-specific factory functions that derive
//! mass/inertia from density, per §4.7 and §6.

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat2, Vec2};
use crate::shape::{self, Shape};

pub type BodyId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Static,
    Dynamic,
    Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self { restitution: 0.3, friction: 0.5 }
    }
}

#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: BodyId,
    pub body_type: BodyType,
    pub shape: Shape,
    pub material: Material,

    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,

    pub force: Vec2,
    pub torque: f32,

    pub mass: f32,
    pub inv_mass: f32,
    pub inertia: f32,
    pub inv_inertia: f32,

    pub sleeping: bool,
    pub sleep_timer: f32,
    /// Island this body was last grouped into; `None` while awake-and-unassigned.
    pub island_id: Option<u32>,
}

impl RigidBody {
    pub fn rotation(&self) -> Mat2 {
        Mat2::from_angle(self.angle)
    }

    pub fn world_aabb(&self) -> crate::aabb::Aabb {
        self.shape.world_aabb(self.position, self.rotation())
    }

    pub fn is_awake(&self) -> bool {
        !self.sleeping
    }

    pub fn wake(&mut self) {
        self.sleeping = false;
        self.sleep_timer = 0.0;
    }

    pub fn apply_force(&mut self, force: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.force = self.force + force;
    }

    pub fn apply_torque(&mut self, torque: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.torque += torque;
    }

    pub fn apply_impulse(&mut self, impulse: Vec2, contact_point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.linear_velocity = self.linear_velocity + impulse * self.inv_mass;
        let r = contact_point - self.position;
        self.angular_velocity += self.inv_inertia * r.cross(impulse);
        self.wake();
    }

    pub fn set_velocity(&mut self, v: Vec2) {
        self.linear_velocity = v;
        self.wake();
    }

    pub fn set_angular_velocity(&mut self, w: f32) {
        self.angular_velocity = w;
        self.wake();
    }

    pub fn set_position(&mut self, p: Vec2) {
        self.position = p;
        self.wake();
    }

    /// Semi-implicit Euler step plus the exponential damping called out in
    /// §4.7/§9: reuses the body's own friction as a global damping
    /// coefficient for both linear and angular velocity. Gravity is the
    /// engine's responsibility, applied to `linear_velocity` before this runs.
    pub fn integrate(&mut self, dt: f32) {
        if self.body_type == BodyType::Static || self.sleeping {
            return;
        }

        let linear_accel = self.force * self.inv_mass;
        let angular_accel = self.torque * self.inv_inertia;
        self.linear_velocity = self.linear_velocity + linear_accel * dt;
        self.angular_velocity += angular_accel * dt;

        self.position = self.position + self.linear_velocity * dt;
        self.angle += self.angular_velocity * dt;

        let damping = (-dt * self.material.friction).exp();
        self.linear_velocity = self.linear_velocity * damping;
        self.angular_velocity *= damping;

        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}

fn finite_guard(name: &'static str, v: f32) -> PhysicsResult<()> {
    if !v.is_finite() {
        return Err(PhysicsError::NonFiniteState { field: name });
    }
    Ok(())
}

fn base_body(
    id: BodyId,
    body_type: BodyType,
    shape: Shape,
    material: Material,
    position: Vec2,
    angle: f32,
    mass: f32,
    inertia: f32,
) -> RigidBody {
    let (inv_mass, inv_inertia) = match body_type {
        BodyType::Static | BodyType::Kinematic => (0.0, 0.0),
        BodyType::Dynamic => (
            if mass > 0.0 { 1.0 / mass } else { 0.0 },
            if inertia > 0.0 { 1.0 / inertia } else { 0.0 },
        ),
    };
    RigidBody {
        id,
        body_type,
        shape,
        material,
        position,
        angle,
        linear_velocity: Vec2::ZERO,
        angular_velocity: 0.0,
        force: Vec2::ZERO,
        torque: 0.0,
        mass,
        inv_mass,
        inertia,
        inv_inertia,
        sleeping: false,
        sleep_timer: 0.0,
        island_id: None,
    }
}

/// Derive mass from density * area and inertia from the shape's unit MMOI,
/// per §4.7. Static/kinematic bodies get zero inverse mass/inertia
/// regardless of the supplied density.
pub fn mass_properties(shape: &Shape, density: f32) -> PhysicsResult<(f32, f32)> {
    if density <= 0.0 {
        return Err(PhysicsError::NonPositiveDensity { density });
    }
    let mass = density * shape.area();
    let inertia = mass * shape::unit_mmoi(shape);
    Ok((mass, inertia))
}

pub fn from_circle(
    id: BodyId,
    body_type: BodyType,
    position: Vec2,
    radius: f32,
    density: f32,
    material: Material,
) -> PhysicsResult<RigidBody> {
    finite_guard("position", position.x)?;
    finite_guard("position", position.y)?;
    let shape = Shape::Circle { radius };
    let (mass, inertia) = mass_properties(&shape, density)?;
    Ok(base_body(id, body_type, shape, material, position, 0.0, mass, inertia))
}

/// Axis-aligned rectangle centered on the body origin, `width` x `height`.
pub fn from_rect(
    id: BodyId,
    body_type: BodyType,
    position: Vec2,
    width: f32,
    height: f32,
    density: f32,
    material: Material,
) -> PhysicsResult<RigidBody> {
    let hw = width * 0.5;
    let hh = height * 0.5;
    let vertices = vec![
        Vec2::new(-hw, -hh),
        Vec2::new(hw, -hh),
        Vec2::new(hw, hh),
        Vec2::new(-hw, hh),
    ];
    let shape = Shape::polygon(vertices)?;
    let (mass, inertia) = mass_properties(&shape, density)?;
    Ok(base_body(id, body_type, shape, material, position, 0.0, mass, inertia))
}

/// Triangle given in body-local vertices; the body position is placed at
/// the supplied `position` and the triangle recentered around its own
/// centroid so rotation happens about the center of mass.
pub fn from_triangle(
    id: BodyId,
    body_type: BodyType,
    position: Vec2,
    p1: Vec2,
    p2: Vec2,
    p3: Vec2,
    density: f32,
    material: Material,
) -> PhysicsResult<RigidBody> {
    let shape = Shape::polygon(vec![p1, p2, p3])?;
    let centroid = shape.centroid();
    let recentered = Shape::polygon(vec![p1 - centroid, p2 - centroid, p3 - centroid])?;
    let (mass, inertia) = mass_properties(&recentered, density)?;
    Ok(base_body(id, body_type, recentered, material, position, 0.0, mass, inertia))
}

pub fn from_capsule(
    id: BodyId,
    body_type: BodyType,
    position: Vec2,
    a: Vec2,
    b: Vec2,
    radius: f32,
    density: f32,
    material: Material,
) -> PhysicsResult<RigidBody> {
    let shape = Shape::Capsule { a, b, radius };
    let (mass, inertia) = mass_properties(&shape, density)?;
    Ok(base_body(id, body_type, shape, material, position, 0.0, mass, inertia))
}

/// Arbitrary convex polygon given in CCW body-local vertices. Recentered
/// around its own centroid, matching `from_triangle`.
pub fn from_convex_polygon(
    id: BodyId,
    body_type: BodyType,
    position: Vec2,
    vertices: Vec<Vec2>,
    density: f32,
    material: Material,
) -> PhysicsResult<RigidBody> {
    let shape = Shape::polygon(vertices)?;
    let centroid = shape.centroid();
    let local_vertices = match &shape {
        Shape::Polygon { vertices } => vertices.iter().map(|v| *v - centroid).collect(),
        _ => unreachable!(),
    };
    let recentered = Shape::polygon(local_vertices)?;
    let (mass, inertia) = mass_properties(&recentered, density)?;
    Ok(base_body(id, body_type, recentered, material, position, 0.0, mass, inertia))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_mass_and_inertia_match_formula() {
        let body = from_circle(0, BodyType::Dynamic, Vec2::ZERO, 2.0, 1.0, Material::default()).unwrap();
        let expected_mass = std::f32::consts::PI * 4.0;
        assert!((body.mass - expected_mass).abs() < 1e-3);
        let expected_inertia = expected_mass * 0.5 * 4.0;
        assert!((body.inertia - expected_inertia).abs() < 1e-2);
        assert!(body.inv_mass > 0.0 && body.inv_inertia > 0.0);
    }

    #[test]
    fn static_body_has_zero_inverse_mass() {
        let body = from_rect(0, BodyType::Static, Vec2::ZERO, 2.0, 2.0, 1.0, Material::default()).unwrap();
        assert_eq!(body.inv_mass, 0.0);
        assert_eq!(body.inv_inertia, 0.0);
    }

    #[test]
    fn non_positive_density_rejected() {
        let result = from_circle(0, BodyType::Dynamic, Vec2::ZERO, 1.0, 0.0, Material::default());
        assert!(matches!(result, Err(PhysicsError::NonPositiveDensity { .. })));
    }

    #[test]
    fn triangle_is_recentered_on_its_own_centroid() {
        let body = from_triangle(
            0,
            BodyType::Dynamic,
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(0.0, 3.0),
            1.0,
            Material::default(),
        )
        .unwrap();
        let c = body.shape.centroid();
        assert!(c.x.abs() < 1e-4 && c.y.abs() < 1e-4);
    }

    #[test]
    fn apply_impulse_wakes_sleeping_body() {
        let mut body = from_circle(0, BodyType::Dynamic, Vec2::ZERO, 1.0, 1.0, Material::default()).unwrap();
        body.sleeping = true;
        body.apply_impulse(Vec2::new(1.0, 0.0), Vec2::ZERO);
        assert!(!body.sleeping);
    }
}
