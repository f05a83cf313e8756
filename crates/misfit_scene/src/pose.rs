//! Pose resolver and coordinate read surface.
//!
//! [`Model::validate_animation`] resamples every vertex and point for the
//! current frame and picks the [`CoordSource`] the accessors read from, so
//! call sites never branch on the animation mode themselves.

use glam::{Affine3A, Vec3};

use misfit_animation::{AnimationType, Channel};
use misfit_core::{Position, PositionKind, Validity};

use crate::influence::{blend_skin, skin_coord};
use crate::joint::local_matrix;
use crate::model::Model;

/// Which set of vertex and point fields the read surface returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordSource {
    /// Rest coordinates.
    #[default]
    Rest,
    /// Coordinates resampled for the active animation frame.
    Animated,
}

impl Model {
    /// Resamples vertices and points for the current frame. No-op while
    /// valid.
    ///
    /// Vertices start from their frame-vertex sample when the animation
    /// carries frame data (the rest coordinate otherwise), then are skinned
    /// when it carries joint data. Points use their keyed local transform
    /// (or rest transform) under the blended skin matrix of their
    /// influences.
    pub fn validate_animation(&mut self) {
        if self.validity.is_valid(Validity::ANIMATION) {
            return;
        }
        self.validate_animated_skeleton();

        let Model {
            vertices,
            points,
            joints,
            animations,
            anim_state,
            settings,
            source,
            ..
        } = self;
        let joints = &*joints;

        match anim_state.active(animations) {
            None => *source = CoordSource::Rest,
            Some((anim, frame, time)) => {
                *source = CoordSource::Animated;
                let eps = settings.weight_epsilon;
                let frame_data = anim.kind.contains(AnimationType::FRAME);
                let skinned = anim.kind.contains(AnimationType::JOINT);
                let point_keys = anim.kind.contains(AnimationType::POINT);

                for (i, v) in vertices.iter_mut().enumerate() {
                    let base = if frame_data {
                        anim.sample_vertex_at(i, frame, time, v.coord)
                    } else {
                        v.coord
                    };
                    v.anim_coord = if skinned {
                        skin_coord(base, &v.influences, joints, eps)
                    } else {
                        base
                    };
                }

                for (i, p) in points.iter_mut().enumerate() {
                    let local = if point_keys {
                        let target = Position::point(i);
                        local_matrix(
                            anim.sample_at(target, Channel::Translate, frame, time, p.translation),
                            anim.sample_at(target, Channel::Rotate, frame, time, p.rotation),
                            anim.sample_at(target, Channel::Scale, frame, time, p.scale),
                        )
                    } else {
                        p.rest_matrix()
                    };
                    let skin = skinned.then(|| blend_skin(&p.influences, joints, eps)).flatten();
                    p.anim_matrix = skin.map_or(local, |m| m * local);
                }

                log::trace!(
                    "Resampled {} vertices and {} points at t={time}",
                    vertices.len(),
                    points.len()
                );
            }
        }

        self.validity.mark_valid(Validity::ANIMATION);
    }

    /// The coordinate set the read surface currently returns.
    pub fn coord_source(&mut self) -> CoordSource {
        self.validate_animation();
        self.source
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    /// Resolved coordinate of any position, consistent with the active mode.
    pub fn get_position_coords(&mut self, pos: Position) -> Option<Vec3> {
        match pos.kind {
            PositionKind::Vertex => self.get_vertex_coords(pos.index),
            PositionKind::Joint => self.get_bone_joint_coords(pos.index),
            PositionKind::Point => self.get_point_matrix(pos.index).map(|m| m.translation.into()),
            PositionKind::Projection => self.projections.get(pos.index).map(|p| p.position),
        }
    }

    pub fn get_vertex_coords(&mut self, vertex: usize) -> Option<Vec3> {
        self.validate_animation();
        let v = self.vertices.get(vertex)?;
        Some(match self.source {
            CoordSource::Rest => v.coord,
            CoordSource::Animated => v.anim_coord,
        })
    }

    /// Posed world coordinate of a joint (its rest coordinate when no
    /// animation is active).
    pub fn get_bone_joint_coords(&mut self, joint: usize) -> Option<Vec3> {
        self.get_bone_joint_final_matrix(joint).map(|m| m.translation.into())
    }

    pub fn get_point_matrix(&mut self, point: usize) -> Option<Affine3A> {
        self.validate_animation();
        let p = self.points.get(point)?;
        Some(match self.source {
            CoordSource::Rest => p.rest_matrix(),
            CoordSource::Animated => p.anim_matrix,
        })
    }

    /// Rest coordinate of a vertex, ignoring animation.
    #[must_use]
    pub fn get_vertex_rest_coords(&self, vertex: usize) -> Option<Vec3> {
        self.vertices.get(vertex).map(|v| v.coord)
    }
}
