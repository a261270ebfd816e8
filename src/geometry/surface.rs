//! Abstract triangulated-surface interface and the owned mesh backend.
//!
//! The core consumes geometry exclusively through [`TriangleSurface`]:
//! vertex/face buffers, an axis-aligned bounding box, and a horizontal
//! plane-intersection query. Mesh-file parsing (STL etc.) is deliberately
//! external; any backend that can hand over triangles plugs in here.
//!
//! [`TriMesh`] is the built-in backend: an exclusively owned vertex/face
//! store with the affine transforms the pipeline needs (scale, rotate,
//! translate, centring). Composition over inheritance: the structure layer
//! owns a `TriMesh` rather than *being* one.

use nalgebra::{Point2, Point3, Unit, UnitQuaternion, Vector3};

/// Tolerance for treating a vertex as lying exactly on the slicing plane.
const ON_PLANE_EPS: f64 = 1e-9;

/// Axis-aligned bounding box of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Bounding box of a vertex set. Empty input collapses to the origin.
    pub fn of_points(points: &[Point3<f64>]) -> Self {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        if points.is_empty() {
            min = Point3::origin();
            max = Point3::origin();
        }
        Aabb { min, max }
    }

    /// Centre of the box.
    pub fn centre(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

/// A single 2D cross-section segment, start then end.
pub type Segment2 = [Point2<f64>; 2];

/// Read-only view of a triangulated boundary surface.
///
/// The slicer only ever calls these four operations; implementors are free
/// to back them however they like (owned buffers, memory-mapped files,
/// generated geometry, ...).
pub trait TriangleSurface {
    /// Vertex buffer.
    fn vertices(&self) -> &[Point3<f64>];

    /// Face buffer; each face indexes `vertices()`.
    fn faces(&self) -> &[[u32; 3]];

    /// Axis-aligned bounds of the surface.
    fn bounds(&self) -> Aabb {
        Aabb::of_points(self.vertices())
    }

    /// Intersects the surface with the horizontal plane at height `z`.
    ///
    /// Returns one line segment per face that crosses the plane in exactly
    /// two distinct points. Edges strictly straddling the plane are
    /// interpolated; vertices within [`ON_PLANE_EPS`] of the plane are taken
    /// verbatim. Faces touching the plane in fewer than two distinct points
    /// (a single vertex, or a coplanar sliver collapsing to one point)
    /// contribute nothing.
    fn cross_section(&self, z: f64) -> Vec<Segment2> {
        let verts = self.vertices();
        let mut segments = Vec::new();
        for face in self.faces() {
            let tri = [
                verts[face[0] as usize],
                verts[face[1] as usize],
                verts[face[2] as usize],
            ];
            if let Some(seg) = triangle_plane_segment(&tri, z) {
                segments.push(seg);
            }
        }
        segments
    }
}

/// Intersects one triangle with the plane at height `z`.
fn triangle_plane_segment(tri: &[Point3<f64>; 3], z: f64) -> Option<Segment2> {
    let mut hits: Vec<Point2<f64>> = Vec::with_capacity(2);
    let mut push = |p: Point2<f64>| {
        // coincident hit points (shared vertex, degenerate edge) collapse
        if !hits
            .iter()
            .any(|q| (q.x - p.x).abs() <= ON_PLANE_EPS && (q.y - p.y).abs() <= ON_PLANE_EPS)
        {
            hits.push(p);
        }
    };

    let on_plane = [
        (tri[0].z - z).abs() <= ON_PLANE_EPS,
        (tri[1].z - z).abs() <= ON_PLANE_EPS,
        (tri[2].z - z).abs() <= ON_PLANE_EPS,
    ];
    for (v, on) in tri.iter().zip(on_plane) {
        if on {
            push(Point2::new(v.x, v.y));
        }
    }
    for (ia, ib) in [(0usize, 1usize), (1, 2), (2, 0)] {
        if on_plane[ia] || on_plane[ib] {
            continue;
        }
        let (a, b) = (&tri[ia], &tri[ib]);
        if (a.z - z) * (b.z - z) < 0.0 {
            let t = (z - a.z) / (b.z - a.z);
            push(Point2::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y)));
        }
    }

    if hits.len() == 2 {
        Some([hits[0], hits[1]])
    } else {
        None
    }
}

/// Owned triangulated surface with basic affine transforms.
///
/// Transforms mutate the vertex buffer in place; whoever caches state
/// derived from this geometry is responsible for invalidating it (see
/// `Structure`).
#[derive(Debug, Clone)]
pub struct TriMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Builds a mesh from raw buffers. Face indices are trusted to be in
    /// range; out-of-range indices would panic on first cross-section.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Uniformly scales the mesh about the origin.
    pub fn rescale(&mut self, scale: f64) {
        for v in &mut self.vertices {
            v.coords *= scale;
        }
    }

    /// Rotates the mesh about `axis` (through the origin) by `angle_deg`
    /// degrees.
    pub fn rotate_deg(&mut self, axis: Vector3<f64>, angle_deg: f64) {
        let rot = UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), angle_deg.to_radians());
        for v in &mut self.vertices {
            *v = rot.transform_point(v);
        }
    }

    /// Translates the mesh by `offset`.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Moves the minimum corner of the bounding box to the origin, so the
    /// structure sits on the substrate plane z = 0.
    pub fn rezero(&mut self) {
        let min = self.bounds().min;
        self.translate(-min.coords);
    }

    /// Drops the mesh onto z = 0 and centres its bounding box on the z axis.
    pub fn centre_xy(&mut self) {
        self.rezero();
        let c = self.bounds().centre();
        self.translate(Vector3::new(-c.x, -c.y, 0.0));
    }
}

impl TriangleSurface for TriMesh {
    fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }
}
