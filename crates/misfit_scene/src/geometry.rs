use glam::{Affine3A, Vec3};

use misfit_core::Recycle;

use crate::influence::InfluenceList;
use crate::joint::local_matrix;

#[derive(Debug, Clone)]
pub struct Vertex {
    /// Base mesh (rest) coordinate.
    pub(crate) coord: Vec3,
    /// Resolved coordinate for the active animation.
    pub(crate) anim_coord: Vec3,
    pub(crate) normal: Vec3,
    pub(crate) anim_normal: Vec3,
    pub(crate) influences: InfluenceList,
    pub(crate) selected: bool,
}

impl Vertex {
    #[inline]
    #[must_use]
    pub fn rest_coord(&self) -> Vec3 {
        self.coord
    }

    #[inline]
    #[must_use]
    pub fn influences(&self) -> &InfluenceList {
        &self.influences
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            coord: Vec3::ZERO,
            anim_coord: Vec3::ZERO,
            normal: Vec3::Z,
            anim_normal: Vec3::Z,
            influences: InfluenceList::new(),
            selected: false,
        }
    }
}

impl Recycle for Vertex {
    fn recycle(&mut self) {
        let mut influences = std::mem::take(&mut self.influences);
        influences.clear();
        *self = Self {
            influences,
            ..Self::default()
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [usize; 3],
}

/// A named oriented marker (attachment point) that can be skinned like a
/// vertex.
#[derive(Debug, Clone)]
pub struct Point {
    pub name: String,
    pub(crate) translation: Vec3,
    /// XYZ Euler radians
    pub(crate) rotation: Vec3,
    pub(crate) scale: Vec3,
    pub(crate) influences: InfluenceList,
    /// Resolved world matrix for the active animation.
    pub(crate) anim_matrix: Affine3A,
    pub(crate) selected: bool,
}

impl Point {
    #[inline]
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    #[inline]
    #[must_use]
    pub fn influences(&self) -> &InfluenceList {
        &self.influences
    }

    #[must_use]
    pub fn rest_matrix(&self) -> Affine3A {
        local_matrix(self.translation, self.rotation, self.scale)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self {
            name: String::new(),
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            influences: InfluenceList::new(),
            anim_matrix: Affine3A::IDENTITY,
            selected: false,
        }
    }
}

impl Recycle for Point {
    fn recycle(&mut self) {
        let mut name = std::mem::take(&mut self.name);
        name.clear();
        let mut influences = std::mem::take(&mut self.influences);
        influences.clear();
        *self = Self {
            name,
            influences,
            ..Self::default()
        };
    }
}

/// Texture projection gizmo. Positioned like a point, never skinned.
#[derive(Debug, Clone)]
pub struct Projection {
    pub name: String,
    pub(crate) position: Vec3,
    pub(crate) rotation: Vec3,
    pub(crate) scale: f32,
}

impl Projection {
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }
}
