use glam::{Affine3A, Vec3};

use misfit_animation::{euler_to_quat, quat_to_euler};
use misfit_core::Recycle;

/// A node of the skeleton.
///
/// # Matrices
///
/// - `relative`: local transform built from translation/rotation/scale
/// - `absolute`: rest-pose world transform, `absolute[parent] * relative`
/// - `final_matrix`: posed world transform for the current frame
/// - `skin`: `final_matrix * absolute⁻¹`, maps bind-pose coordinates to
///   the posed frame
///
/// `dirty` marks a joint whose `absolute` must be recomputed by the next
/// skeleton validation.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub(crate) parent: Option<usize>,

    pub(crate) local_translation: Vec3,
    /// XYZ Euler radians
    pub(crate) local_rotation: Vec3,
    pub(crate) local_scale: Vec3,

    pub(crate) relative: Affine3A,
    pub(crate) absolute: Affine3A,
    pub(crate) final_matrix: Affine3A,
    pub(crate) skin: Affine3A,

    pub(crate) dirty: bool,
    pub(crate) selected: bool,
}

impl Joint {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            parent: None,
            local_translation: Vec3::ZERO,
            local_rotation: Vec3::ZERO,
            local_scale: Vec3::ONE,
            relative: Affine3A::IDENTITY,
            absolute: Affine3A::IDENTITY,
            final_matrix: Affine3A::IDENTITY,
            skin: Affine3A::IDENTITY,
            dirty: true,
            selected: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn local_translation(&self) -> Vec3 {
        self.local_translation
    }

    #[inline]
    #[must_use]
    pub fn local_rotation(&self) -> Vec3 {
        self.local_rotation
    }

    #[inline]
    #[must_use]
    pub fn local_scale(&self) -> Vec3 {
        self.local_scale
    }

    #[inline]
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Rebuilds `relative` from the local components and marks the joint dirty.
    pub(crate) fn update_relative(&mut self) {
        self.relative = local_matrix(self.local_translation, self.local_rotation, self.local_scale);
        self.dirty = true;
    }

    /// Applies a relative matrix directly, decomposing it back into the
    /// local components. Shear is lost.
    pub(crate) fn apply_relative(&mut self, mat: Affine3A) {
        let (scale, rotation, translation) = mat.to_scale_rotation_translation();
        self.local_scale = scale;
        self.local_rotation = quat_to_euler(rotation);
        self.local_translation = translation;
        self.relative = mat;
        self.dirty = true;
    }
}

impl Default for Joint {
    fn default() -> Self {
        Self::new()
    }
}

impl Recycle for Joint {
    fn recycle(&mut self) {
        let mut name = std::mem::take(&mut self.name);
        name.clear();
        *self = Self {
            name,
            ..Self::new()
        };
    }
}

/// Local matrix from translation, XYZ Euler rotation and scale.
#[inline]
#[must_use]
pub fn local_matrix(translation: Vec3, rotation: Vec3, scale: Vec3) -> Affine3A {
    Affine3A::from_scale_rotation_translation(scale, euler_to_quat(rotation), translation)
}

/// Inverse of `mat`, or identity when it is singular.
#[must_use]
pub(crate) fn inverse_or_identity(mat: &Affine3A) -> Affine3A {
    if mat.matrix3.determinant().abs() <= f32::EPSILON {
        Affine3A::IDENTITY
    } else {
        mat.inverse()
    }
}
