use glam::Vec3;

use misfit_core::Validity;

use crate::geometry::{Triangle, Vertex};
use crate::model::Model;
use crate::pose::CoordSource;

/// Unit normal of a triangle, zero when degenerate.
#[inline]
fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Smooth vertex normals: the normalized sum of incident face normals.
/// Vertices with no usable face keep `+Z`.
fn smooth_normals(triangles: &[Triangle], vertices: &[Vertex], coord: impl Fn(&Vertex) -> Vec3) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; vertices.len()];
    for tri in triangles {
        let [i0, i1, i2] = tri.vertices;
        let (Some(v0), Some(v1), Some(v2)) = (vertices.get(i0), vertices.get(i1), vertices.get(i2)) else {
            continue;
        };
        let n = face_normal(coord(v0), coord(v1), coord(v2));
        sums[i0] += n;
        sums[i1] += n;
        sums[i2] += n;
    }
    sums.into_iter().map(|n| n.normalize_or(Vec3::Z)).collect()
}

impl Model {
    /// Recomputes rest normals and, while animating, normals of the
    /// resampled coordinates. No-op for whichever set is valid.
    pub fn validate_normals(&mut self) {
        if !self.validity.is_valid(Validity::NORMALS) {
            let normals = smooth_normals(&self.triangles, &self.vertices, |v| v.coord);
            for (v, n) in self.vertices.iter_mut().zip(normals) {
                v.normal = n;
            }
            log::trace!("Rest normals validated ({} vertices)", self.vertices.len());
            self.validity.mark_valid(Validity::NORMALS);
        }

        if !self.validity.is_valid(Validity::ANIMATED_NORMALS) {
            self.validate_animation();
            if self.source == CoordSource::Animated {
                let normals = smooth_normals(&self.triangles, &self.vertices, |v| v.anim_coord);
                for (v, n) in self.vertices.iter_mut().zip(normals) {
                    v.anim_normal = n;
                }
            }
            self.validity.mark_valid(Validity::ANIMATED_NORMALS);
        }
    }

    /// Smooth normal of a vertex in the current pose.
    pub fn get_vertex_normal(&mut self, vertex: usize) -> Option<Vec3> {
        self.validate_normals();
        let v = self.vertices.get(vertex)?;
        Some(match self.source {
            CoordSource::Rest => v.normal,
            CoordSource::Animated => v.anim_normal,
        })
    }

    /// Face normal of a triangle in the current pose.
    pub fn get_triangle_normal(&mut self, triangle: usize) -> Option<Vec3> {
        let [i0, i1, i2] = self.triangles.get(triangle)?.vertices;
        let a = self.get_vertex_coords(i0)?;
        let b = self.get_vertex_coords(i1)?;
        let c = self.get_vertex_coords(i2)?;
        Some(face_normal(a, b, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_quad_points_up() {
        let mut model = Model::new();
        let a = model.add_vertex(Vec3::ZERO);
        let b = model.add_vertex(Vec3::X);
        let c = model.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = model.add_vertex(Vec3::Y);
        model.add_triangle(a, b, c).unwrap();
        model.add_triangle(a, c, d).unwrap();

        for v in [a, b, c, d] {
            let n = model.get_vertex_normal(v).unwrap();
            assert!((n - Vec3::Z).length() < 1e-6, "vertex {v}: {n}");
        }
        assert_eq!(model.get_triangle_normal(0), Some(Vec3::Z));
    }

    #[test]
    fn moving_a_vertex_invalidates_normals() {
        let mut model = Model::new();
        let a = model.add_vertex(Vec3::ZERO);
        let b = model.add_vertex(Vec3::X);
        let c = model.add_vertex(Vec3::Y);
        model.add_triangle(a, b, c).unwrap();
        model.validate_normals();
        assert!(model.is_valid(Validity::NORMALS));

        model
            .move_position(misfit_core::Position::vertex(c), Vec3::new(0.0, 0.0, 1.0))
            .unwrap();
        assert!(!model.is_valid(Validity::NORMALS));
        let n = model.get_vertex_normal(a).unwrap();
        assert!((n - Vec3::NEG_Y).length() < 1e-6, "{n}");
    }
}
