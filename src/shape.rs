//! Convex shape kernel: Circle, Polygon, Capsule. Closed variant dispatch
//! (§9 design note) rather than a trait object, so the GJK/EPA inner loop
//! can inline `support`.

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat2, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        radius: f32,
    },
    /// Vertices are stored in body-local space, ordered counter-clockwise.
    Polygon {
        vertices: Vec<Vec2>,
    },
    /// Two endpoints (body-local) plus a radius; the capsule is the
    /// Minkowski sum of the segment between them and a disc of `radius`.
    Capsule {
        a: Vec2,
        b: Vec2,
        radius: f32,
    },
}

impl Shape {
    pub fn polygon(vertices: Vec<Vec2>) -> PhysicsResult<Shape> {
        if vertices.len() < 3 {
            return Err(PhysicsError::DegeneratePolygon { vertex_count: vertices.len() });
        }
        Ok(Shape::Polygon { vertices })
    }

    /// Local-space centroid (center of mass assuming uniform density).
    pub fn centroid(&self) -> Vec2 {
        match self {
            Shape::Circle { .. } => Vec2::ZERO,
            Shape::Capsule { a, b, .. } => (*a + *b) * 0.5,
            Shape::Polygon { vertices } => polygon_centroid(vertices),
        }
    }

    pub fn area(&self) -> f32 {
        match self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Capsule { a, b, radius } => {
                let length = (*b - *a).length();
                // rectangle (length x 2r) plus a full circle of area pi r^2
                length * 2.0 * radius + std::f32::consts::PI * radius * radius
            }
            Shape::Polygon { vertices } => polygon_area(vertices),
        }
    }

    /// World-space AABB given the body's pose. Rotated polygon/capsule
    /// extents are recomputed from the rotated vertex set, not approximated.
    pub fn world_aabb(&self, position: Vec2, rotation: Mat2) -> crate::aabb::Aabb {
        match self {
            Shape::Circle { radius } => crate::aabb::Aabb::new(
                position - Vec2::new(*radius, *radius),
                position + Vec2::new(*radius, *radius),
            ),
            Shape::Capsule { a, b, radius } => {
                let wa = position + rotation.transform(*a);
                let wb = position + rotation.transform(*b);
                let min = Vec2::new(wa.x.min(wb.x) - radius, wa.y.min(wb.y) - radius);
                let max = Vec2::new(wa.x.max(wb.x) + radius, wa.y.max(wb.y) + radius);
                crate::aabb::Aabb::new(min, max)
            }
            Shape::Polygon { vertices } => {
                let mut min = Vec2::new(f32::MAX, f32::MAX);
                let mut max = Vec2::new(f32::MIN, f32::MIN);
                for v in vertices {
                    let w = position + rotation.transform(*v);
                    min.x = min.x.min(w.x);
                    min.y = min.y.min(w.y);
                    max.x = max.x.max(w.x);
                    max.y = max.y.max(w.y);
                }
                crate::aabb::Aabb::new(min, max)
            }
        }
    }

    /// World-space extreme point along direction `d` (need not be normalized).
    /// `position`/`rotation` place the shape in world space.
    pub fn support(&self, d: Vec2, position: Vec2, rotation: Mat2) -> Vec2 {
        match self {
            Shape::Circle { radius } => {
                let dir = d.normalized();
                position + dir * *radius
            }
            Shape::Capsule { a, b, radius } => {
                let wa = position + rotation.transform(*a);
                let wb = position + rotation.transform(*b);
                let base = if wa.dot(d) > wb.dot(d) { wa } else { wb };
                base + d.normalized() * *radius
            }
            Shape::Polygon { vertices } => {
                // Support direction in local space (rotation is orthogonal).
                let local_d = rotation.inverse_transform(d);
                let mut best = vertices[0];
                let mut best_dot = best.dot(local_d);
                for v in &vertices[1..] {
                    let dot = v.dot(local_d);
                    if dot > best_dot {
                        best_dot = dot;
                        best = *v;
                    }
                }
                position + rotation.transform(best)
            }
        }
    }

    pub fn world_vertices(&self, position: Vec2, rotation: Mat2) -> Vec<Vec2> {
        match self {
            Shape::Polygon { vertices } => {
                vertices.iter().map(|v| position + rotation.transform(*v)).collect()
            }
            Shape::Capsule { a, b, .. } => {
                vec![position + rotation.transform(*a), position + rotation.transform(*b)]
            }
            Shape::Circle { .. } => vec![position],
        }
    }
}

fn polygon_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        let v0 = vertices[i];
        let v1 = vertices[(i + 1) % n];
        sum += v0.cross(v1);
    }
    (sum * 0.5).abs()
}

fn polygon_centroid(vertices: &[Vec2]) -> Vec2 {
    let n = vertices.len();
    let mut area_acc = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let v0 = vertices[i];
        let v1 = vertices[(i + 1) % n];
        let cross = v0.cross(v1);
        area_acc += cross;
        cx += (v0.x + v1.x) * cross;
        cy += (v0.y + v1.y) * cross;
    }
    if area_acc.abs() < 1e-12 {
        // Degenerate (zero-area) polygon: fall back to vertex average.
        let sum = vertices.iter().fold(Vec2::ZERO, |acc, v| acc + *v);
        return sum / n as f32;
    }
    let factor = 1.0 / (3.0 * area_acc);
    Vec2::new(cx * factor, cy * factor)
}

/// MMOI about the centroid divided by mass, i.e. per §4.7, multiplied by
/// mass at the call site. Returns the `angularMass` scalar (mass * this).
pub fn unit_mmoi(shape: &Shape) -> f32 {
    match shape {
        Shape::Circle { radius } => 0.5 * radius * radius,
        Shape::Polygon { vertices } => polygon_unit_mmoi(vertices),
        Shape::Capsule { a, b, radius } => capsule_unit_mmoi(*a, *b, *radius),
    }
}

/// Rectangle MMOI-per-mass: (w^2 + h^2) / 12.
pub fn rect_unit_mmoi(w: f32, h: f32) -> f32 {
    (w * w + h * h) / 12.0
}

/// Triangle MMOI-per-mass about the centroid, per §4.7.
pub fn triangle_unit_mmoi(p1: Vec2, p2: Vec2, p3: Vec2) -> f32 {
    let a = (p2 - p1).length_squared();
    let b = (p3 - p1).length_squared();
    let c = (p2 - p3).length_squared();
    (a + b + c) / 36.0
}

fn capsule_unit_mmoi(a: Vec2, b: Vec2, radius: f32) -> f32 {
    let length = (b - a).length();
    let circle_area_frac = std::f32::consts::PI * radius;
    let denom = circle_area_frac + 2.0 * length;
    if denom < 1e-12 {
        return 0.5 * radius * radius;
    }
    let m_circle = circle_area_frac / denom;
    let m_rect = 1.0 - m_circle;
    let circle_term = 0.5 * radius * radius + length * length * 0.5;
    let rect_term = rect_unit_mmoi(length, 2.0 * radius);
    circle_term * m_circle + rect_term * m_rect
}

/// Fan-triangulate at vertex 0, weight each triangle's MMOI by its area
/// fraction, parallel-axis-shift to the polygon centroid, per §4.7.
fn polygon_unit_mmoi(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let total_area = polygon_area(vertices);
    if total_area < 1e-12 {
        return 0.0;
    }
    let poly_centroid = polygon_centroid(vertices);
    let p0 = vertices[0];
    let mut acc = 0.0;
    for i in 1..n - 1 {
        let p1 = vertices[i];
        let p2 = vertices[i + 1];
        let tri_area = ((p1 - p0).cross(p2 - p0) * 0.5).abs();
        if tri_area < 1e-12 {
            continue;
        }
        let tri_centroid = (p0 + p1 + p2) / 3.0;
        let tri_unit_mmoi = triangle_unit_mmoi(p0, p1, p2);
        let offset_sq = (tri_centroid - poly_centroid).length_squared();
        let weight = tri_area / total_area;
        acc += weight * (tri_unit_mmoi + offset_sq);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_polygon() {
        let result = Shape::polygon(vec![Vec2::ZERO, Vec2::new(1.0, 0.0)]);
        assert!(matches!(result, Err(PhysicsError::DegeneratePolygon { vertex_count: 2 })));
    }

    #[test]
    fn square_area_and_centroid() {
        let square = Shape::polygon(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ])
        .unwrap();
        assert!((square.area() - 4.0).abs() < 1e-5);
        let c = square.centroid();
        assert!(c.x.abs() < 1e-5 && c.y.abs() < 1e-5);
    }

    #[test]
    fn circle_support_along_axis() {
        let circle = Shape::Circle { radius: 2.0 };
        let p = circle.support(Vec2::new(1.0, 0.0), Vec2::new(5.0, 5.0), Mat2::from_angle(0.0));
        assert!((p.x - 7.0).abs() < 1e-5);
        assert!((p.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn polygon_support_picks_furthest_vertex() {
        let square = Shape::polygon(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ])
        .unwrap();
        let p = square.support(Vec2::new(1.0, 1.0), Vec2::ZERO, Mat2::from_angle(0.0));
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rect_mmoi_matches_formula() {
        assert!((rect_unit_mmoi(2.0, 4.0) - ((4.0 + 16.0) / 12.0)).abs() < 1e-6);
    }

    #[test]
    fn circle_unit_mmoi_is_half_r_squared() {
        let c = Shape::Circle { radius: 3.0 };
        assert!((unit_mmoi(&c) - 4.5).abs() < 1e-6);
    }
}
