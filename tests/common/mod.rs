//! Shared mesh builders for integration tests.
#![allow(dead_code)]

use beamstream::geometry::TriMesh;
use nalgebra::Point3;

/// Axis-aligned box spanning `[0, w] x [0, d] x [0, h]`, 12 triangles.
pub fn slab(w: f64, d: f64, h: f64) -> TriMesh {
    let v = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
    let vertices = vec![
        v(0.0, 0.0, 0.0),
        v(w, 0.0, 0.0),
        v(w, d, 0.0),
        v(0.0, d, 0.0),
        v(0.0, 0.0, h),
        v(w, 0.0, h),
        v(w, d, h),
        v(0.0, d, h),
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    TriMesh::new(vertices, faces)
}

/// Two separated pillars merging into one wide slab on top: below
/// `z = split_z` the cross sections form two branches, above a single one.
pub fn merging_pillars(split_z: f64, top_z: f64) -> TriMesh {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut add_box = |x0: f64, x1: f64, z0: f64, z1: f64| {
        let base = vertices.len() as u32;
        let (y0, y1) = (0.0, 2.0);
        vertices.extend([
            Point3::new(x0, y0, z0),
            Point3::new(x1, y0, z0),
            Point3::new(x1, y1, z0),
            Point3::new(x0, y1, z0),
            Point3::new(x0, y0, z1),
            Point3::new(x1, y0, z1),
            Point3::new(x1, y1, z1),
            Point3::new(x0, y1, z1),
        ]);
        for f in [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ] {
            faces.push([base + f[0], base + f[1], base + f[2]]);
        }
    };
    // two thin pillars, then one box bridging both footprints
    add_box(0.0, 2.0, 0.0, split_z);
    add_box(8.0, 10.0, 0.0, split_z);
    add_box(0.0, 10.0, split_z, top_z);
    TriMesh::new(vertices, faces)
}
