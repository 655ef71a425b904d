//! Shapes: a vertex set plus exactly one element topology.
//!
//! Each shape owns a BVH over its own elements. The tree is tied to the
//! geometry it was built from, so every geometry setter drops it and
//! [`Shape::build_bvh`] must run again before the shape can be intersected.

use lumen_math::{Ray, Vec2, Vec3};

use crate::bvh::{Bvh, BvhPrimitive};
use crate::error::ShapeError;
use crate::primitive::{
    intersect_line, intersect_point, intersect_triangle, line_bounds, point_bounds,
    triangle_bounds,
};

/// Radius used for points and lines when a shape carries no radius array.
pub const DEFAULT_RADIUS: f32 = 0.001;

/// Element connectivity. A shape is a point cloud, a set of line segments
/// or a triangle mesh, never a mix.
#[derive(Clone, Debug, PartialEq)]
pub enum Topology {
    Points(Vec<u32>),
    Lines(Vec<[u32; 2]>),
    Triangles(Vec<[u32; 3]>),
}

impl Default for Topology {
    fn default() -> Self {
        Topology::Triangles(Vec::new())
    }
}

impl Topology {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Topology::Points(points) => points.len(),
            Topology::Lines(lines) => lines.len(),
            Topology::Triangles(triangles) => triangles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> &'static str {
        match self {
            Topology::Points(_) => "points",
            Topology::Lines(_) => "lines",
            Topology::Triangles(_) => "triangles",
        }
    }
}

/// Result of a ray query against a single shape.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ElementHit {
    /// Index of the hit point, line or triangle.
    pub element: usize,
    /// Barycentric coordinates of the hit within the element.
    pub uv: Vec2,
    /// Ray parameter at the hit.
    pub distance: f32,
}

/// A mesh with per-vertex attributes.
///
/// `normals`, `texcoords` and `radius` are optional: an empty array means the
/// attribute is absent and evaluation falls back to a derived value.
#[derive(Clone, Debug, Default)]
pub struct Shape {
    topology: Topology,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    radius: Vec<f32>,
    bvh: Option<Bvh>,
}

impl Shape {
    pub fn new(topology: Topology, positions: Vec<Vec3>) -> Self {
        Self {
            topology,
            positions,
            ..Default::default()
        }
    }

    /// Create a triangle mesh.
    pub fn triangles(triangles: Vec<[u32; 3]>, positions: Vec<Vec3>) -> Self {
        Self::new(Topology::Triangles(triangles), positions)
    }

    /// Create a set of line segments.
    pub fn lines(lines: Vec<[u32; 2]>, positions: Vec<Vec3>) -> Self {
        Self::new(Topology::Lines(lines), positions)
    }

    /// Create a point cloud.
    pub fn points(points: Vec<u32>, positions: Vec<Vec3>) -> Self {
        Self::new(Topology::Points(points), positions)
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.set_normals(normals);
        self
    }

    pub fn with_texcoords(mut self, texcoords: Vec<Vec2>) -> Self {
        self.set_texcoords(texcoords);
        self
    }

    pub fn with_radius(mut self, radius: Vec<f32>) -> Self {
        self.set_radius(radius);
        self
    }

    pub fn set_topology(&mut self, topology: Topology) {
        self.topology = topology;
        self.bvh = None;
    }

    pub fn set_positions(&mut self, positions: Vec<Vec3>) {
        self.positions = positions;
        self.bvh = None;
    }

    pub fn set_normals(&mut self, normals: Vec<Vec3>) {
        self.normals = normals;
        self.bvh = None;
    }

    pub fn set_texcoords(&mut self, texcoords: Vec<Vec2>) {
        self.texcoords = texcoords;
        self.bvh = None;
    }

    pub fn set_radius(&mut self, radius: Vec<f32>) {
        self.radius = radius;
        self.bvh = None;
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    pub fn radius(&self) -> &[f32] {
        &self.radius
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn num_elements(&self) -> usize {
        self.topology.len()
    }

    fn radius_at(&self, vertex: u32) -> f32 {
        self.radius
            .get(vertex as usize)
            .copied()
            .unwrap_or(DEFAULT_RADIUS)
    }

    /// Check that every element references existing vertices and that
    /// optional attribute arrays are either empty or one entry per vertex.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let count = self.positions.len();

        let optional = [
            ("normals", self.normals.len()),
            ("texcoords", self.texcoords.len()),
            ("radius", self.radius.len()),
        ];
        for (attribute, len) in optional {
            if len != 0 && len != count {
                return Err(ShapeError::AttributeLength {
                    attribute,
                    len,
                    expected: count,
                });
            }
        }

        let check = |element: usize, vertices: &[u32]| -> Result<(), ShapeError> {
            match vertices.iter().find(|&&v| v as usize >= count) {
                Some(&vertex) => Err(ShapeError::IndexOutOfBounds {
                    element,
                    vertex,
                    count,
                }),
                None => Ok(()),
            }
        };

        match &self.topology {
            Topology::Points(points) => {
                for (element, &p) in points.iter().enumerate() {
                    check(element, std::slice::from_ref(&p))?;
                }
            }
            Topology::Lines(lines) => {
                for (element, line) in lines.iter().enumerate() {
                    check(element, &line[..])?;
                }
            }
            Topology::Triangles(triangles) => {
                for (element, triangle) in triangles.iter().enumerate() {
                    check(element, &triangle[..])?;
                }
            }
        }

        Ok(())
    }

    /// Validate the geometry and rebuild the shape BVH, replacing any
    /// previous tree.
    pub fn build_bvh(&mut self) -> Result<(), ShapeError> {
        self.validate()?;

        let positions = &self.positions;
        let primitives: Vec<BvhPrimitive> = match &self.topology {
            Topology::Points(points) => points
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    BvhPrimitive::new(i, point_bounds(positions[p as usize], self.radius_at(p)))
                })
                .collect(),
            Topology::Lines(lines) => lines
                .iter()
                .enumerate()
                .map(|(i, &[a, b])| {
                    let bbox = line_bounds(
                        positions[a as usize],
                        positions[b as usize],
                        self.radius_at(a),
                        self.radius_at(b),
                    );
                    BvhPrimitive::new(i, bbox)
                })
                .collect(),
            Topology::Triangles(triangles) => triangles
                .iter()
                .enumerate()
                .map(|(i, &[a, b, c])| {
                    let bbox = triangle_bounds(
                        positions[a as usize],
                        positions[b as usize],
                        positions[c as usize],
                    );
                    BvhPrimitive::new(i, bbox)
                })
                .collect(),
        };

        if primitives.is_empty() {
            log::warn!("Shape has no {}, its BVH is empty", self.topology.name());
        }

        let bvh = Bvh::build(primitives);
        log::debug!(
            "Shape BVH: {} {} -> {} nodes",
            self.topology.len(),
            self.topology.name(),
            bvh.nodes().len()
        );
        self.bvh = Some(bvh);
        Ok(())
    }

    /// Intersect a ray given in the shape's local space.
    ///
    /// Returns `None` if the shape has no BVH.
    pub fn intersect(&self, ray: &Ray, find_any: bool) -> Option<ElementHit> {
        let bvh = self.bvh.as_ref()?;
        let positions = &self.positions;
        let hit = |element: usize, (uv, distance): (Vec2, f32)| {
            (
                ElementHit {
                    element,
                    uv,
                    distance,
                },
                distance,
            )
        };

        match &self.topology {
            Topology::Points(points) => bvh.intersect(ray, find_any, |ray, i| {
                let p = points[i];
                intersect_point(ray, positions[p as usize], self.radius_at(p)).map(|h| hit(i, h))
            }),
            Topology::Lines(lines) => bvh.intersect(ray, find_any, |ray, i| {
                let [a, b] = lines[i];
                intersect_line(
                    ray,
                    positions[a as usize],
                    positions[b as usize],
                    self.radius_at(a),
                    self.radius_at(b),
                )
                .map(|h| hit(i, h))
            }),
            Topology::Triangles(triangles) => bvh.intersect(ray, find_any, |ray, i| {
                let [a, b, c] = triangles[i];
                intersect_triangle(
                    ray,
                    positions[a as usize],
                    positions[b as usize],
                    positions[c as usize],
                )
                .map(|h| hit(i, h))
            }),
        }
    }

    /// Interpolate a per-vertex attribute over an element.
    fn interpolate<T>(&self, values: &[T], element: usize, uv: Vec2) -> T
    where
        T: Copy + std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T>,
    {
        match &self.topology {
            Topology::Points(points) => values[points[element] as usize],
            Topology::Lines(lines) => {
                let [a, b] = lines[element];
                values[a as usize] * (1.0 - uv.x) + values[b as usize] * uv.x
            }
            Topology::Triangles(triangles) => {
                let [a, b, c] = triangles[element];
                values[a as usize] * (1.0 - uv.x - uv.y)
                    + values[b as usize] * uv.x
                    + values[c as usize] * uv.y
            }
        }
    }

    /// Position on `element` at barycentric `uv`.
    pub fn eval_position(&self, element: usize, uv: Vec2) -> Vec3 {
        self.interpolate(&self.positions, element, uv)
    }

    /// Flat normal of an element: the triangle plane normal, the line
    /// tangent, or +z for points.
    pub fn eval_element_normal(&self, element: usize) -> Vec3 {
        let p = &self.positions;
        match &self.topology {
            Topology::Points(_) => Vec3::Z,
            Topology::Lines(lines) => {
                let [a, b] = lines[element];
                (p[b as usize] - p[a as usize]).normalize_or_zero()
            }
            Topology::Triangles(triangles) => {
                let [a, b, c] = triangles[element];
                let (p0, p1, p2) = (p[a as usize], p[b as usize], p[c as usize]);
                (p1 - p0).cross(p2 - p0).normalize_or_zero()
            }
        }
    }

    /// Shading normal at `uv`, falling back to the flat element normal when
    /// the shape has no vertex normals.
    pub fn eval_normal(&self, element: usize, uv: Vec2) -> Vec3 {
        if self.normals.is_empty() {
            return self.eval_element_normal(element);
        }
        self.interpolate(&self.normals, element, uv).normalize_or_zero()
    }

    /// Texture coordinates at `uv`, or `uv` itself when the shape has none.
    pub fn eval_texcoord(&self, element: usize, uv: Vec2) -> Vec2 {
        if self.texcoords.is_empty() {
            return uv;
        }
        self.interpolate(&self.texcoords, element, uv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Shape {
        Shape::triangles(
            vec![[0, 1, 2], [0, 2, 3]],
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::Y,
            ],
        )
    }

    #[test]
    fn test_triangle_evaluation() {
        let shape = quad().with_texcoords(vec![
            Vec2::ZERO,
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ]);
        let uv = Vec2::new(0.25, 0.5);

        let p = shape.eval_position(0, uv);
        assert!((p - Vec3::new(0.75, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(shape.eval_normal(0, uv), Vec3::Z);

        let st = shape.eval_texcoord(0, uv);
        assert!((st - Vec2::new(1.5, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_missing_texcoords_return_barycentrics() {
        let shape = quad();
        let uv = Vec2::new(0.1, 0.7);
        assert_eq!(shape.eval_texcoord(1, uv), uv);
    }

    #[test]
    fn test_vertex_normals_are_interpolated() {
        let n = Vec3::new(0.0, 1.0, 1.0).normalize();
        let shape = quad().with_normals(vec![Vec3::Z, Vec3::Z, n, n]);

        let normal = shape.eval_normal(0, Vec2::new(0.0, 0.5));
        assert!((normal.length() - 1.0).abs() < 1e-5);
        assert!(normal.y > 0.0 && normal.z > normal.y);
    }

    #[test]
    fn test_line_and_point_normals() {
        let lines = Shape::lines(vec![[0, 1]], vec![Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)]);
        assert_eq!(lines.eval_normal(0, Vec2::new(0.5, 0.0)), Vec3::Y);
        let p = lines.eval_position(0, Vec2::new(0.25, 0.0));
        assert!((p - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);

        let points = Shape::points(vec![0], vec![Vec3::ONE]);
        assert_eq!(points.eval_normal(0, Vec2::ZERO), Vec3::Z);
        assert_eq!(points.eval_position(0, Vec2::ZERO), Vec3::ONE);
    }

    #[test]
    fn test_validate() {
        assert!(quad().validate().is_ok());

        let bad = Shape::triangles(vec![[0, 1, 5]], vec![Vec3::ZERO; 3]);
        assert_eq!(
            bad.validate(),
            Err(ShapeError::IndexOutOfBounds {
                element: 0,
                vertex: 5,
                count: 3
            })
        );

        let bad = quad().with_normals(vec![Vec3::Z; 2]);
        assert!(matches!(
            bad.validate(),
            Err(ShapeError::AttributeLength {
                attribute: "normals",
                ..
            })
        ));
    }

    #[test]
    fn test_intersect_requires_bvh() {
        let mut shape = quad();
        let ray = Ray::new(Vec3::new(0.25, 0.5, 1.0), Vec3::NEG_Z);
        assert!(shape.intersect(&ray, false).is_none());

        shape.build_bvh().unwrap();
        let hit = shape.intersect(&ray, false).unwrap();
        assert_eq!(hit.element, 1);
        assert!((hit.distance - 1.0).abs() < 1e-5);

        // Editing geometry drops the tree
        shape.set_positions(shape.positions().to_vec());
        assert!(shape.bvh().is_none());
        assert!(shape.intersect(&ray, false).is_none());
    }

    #[test]
    fn test_intersect_nearest_triangle_in_stack() {
        // Ten parallel quads stacked along z; the ray must stop at the top one.
        let mut positions = Vec::new();
        let mut triangles = Vec::new();
        for layer in 0..10 {
            let z = layer as f32;
            let base = positions.len() as u32;
            positions.extend([
                Vec3::new(0.0, 0.0, z),
                Vec3::new(1.0, 0.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(0.0, 1.0, z),
            ]);
            triangles.push([base, base + 1, base + 2]);
            triangles.push([base, base + 2, base + 3]);
        }
        let mut shape = Shape::triangles(triangles, positions);
        shape.build_bvh().unwrap();

        let ray = Ray::new(Vec3::new(0.7, 0.2, 20.0), Vec3::NEG_Z);
        let hit = shape.intersect(&ray, false).unwrap();
        assert_eq!(hit.element, 18);
        assert!((hit.distance - 11.0).abs() < 1e-4);

        let p = shape.eval_position(hit.element, hit.uv);
        assert!((p - Vec3::new(0.7, 0.2, 9.0)).length() < 1e-4);

        assert!(shape.intersect(&ray, true).is_some());
    }

    #[test]
    fn test_intersect_points_and_lines() {
        let mut points = Shape::points(vec![0, 1], vec![Vec3::ZERO, Vec3::X]).with_radius(vec![0.1, 0.1]);
        points.build_bvh().unwrap();
        let ray = Ray::new(Vec3::new(1.0, 0.0, 2.0), Vec3::NEG_Z);
        assert_eq!(points.intersect(&ray, false).map(|h| h.element), Some(1));

        let mut lines = Shape::lines(vec![[0, 1]], vec![Vec3::ZERO, Vec3::X]);
        lines.build_bvh().unwrap();
        let ray = Ray::new(Vec3::new(0.5, 0.0, 2.0), Vec3::NEG_Z);
        let hit = lines.intersect(&ray, false).unwrap();
        assert!((hit.uv.x - 0.5).abs() < 1e-5);

        // Default radius is tiny
        let ray = Ray::new(Vec3::new(0.5, 0.01, 2.0), Vec3::NEG_Z);
        assert!(lines.intersect(&ray, false).is_none());
    }
}
