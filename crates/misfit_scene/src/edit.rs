//! Edit routing.
//!
//! Move, rotate and scale edits land in different places depending on the
//! animation mode:
//!
//! | Mode       | Vertices                      | Joints & points           |
//! |------------|-------------------------------|---------------------------|
//! | `None`     | rest coordinate               | rest transform            |
//! | `Skeletal` | rest coordinate, unskinned    | keyframe at current frame |
//! | `Frame`    | frame vertex at current frame | rejected                  |

use glam::{Affine3A, Vec3};

use misfit_animation::{AnimationType, Channel, Interpolate};
use misfit_core::{ModelError, Position, PositionKind, Result, Validity};

use crate::animation::AnimationMode;
use crate::influence::{blend_skin, unskin_coord};
use crate::joint::inverse_or_identity;
use crate::model::Model;
use crate::undo::ModelUndo;

impl Model {
    /// Moves any position so that it resolves to `coord` in the current pose.
    pub fn move_position(&mut self, pos: Position, coord: Vec3) -> Result<()> {
        self.check_position(pos)?;
        match pos.kind {
            PositionKind::Vertex => self.move_vertex(pos.index, coord),
            PositionKind::Joint => self.move_bone_joint(pos.index, coord),
            PositionKind::Point => self.move_point(pos.index, coord),
            PositionKind::Projection => {
                let proj = &mut self.projections[pos.index];
                let old = std::mem::replace(&mut proj.position, coord);
                self.record(ModelUndo::MovePosition { pos, old, new: coord });
                Ok(())
            }
        }
    }

    /// Sets the XYZ Euler rotation of a joint, point or projection.
    pub fn set_position_rotation(&mut self, pos: Position, rotation: Vec3) -> Result<()> {
        self.check_position(pos)?;
        if pos.kind == PositionKind::Projection {
            let proj = &mut self.projections[pos.index];
            let old = std::mem::replace(&mut proj.rotation, rotation);
            self.record(ModelUndo::RotatePosition { pos, old, new: rotation });
            return Ok(());
        }
        self.set_position_channel(pos, Channel::Rotate, rotation)
    }

    /// Sets the scale of a joint or point.
    pub fn set_position_scale(&mut self, pos: Position, scale: Vec3) -> Result<()> {
        self.check_position(pos)?;
        if pos.kind == PositionKind::Projection {
            return Err(ModelError::WrongPositionKind(pos.kind));
        }
        self.set_position_channel(pos, Channel::Scale, scale)
    }

    pub fn set_projection_scale(&mut self, index: usize, scale: f32) -> Result<()> {
        let pos = Position::projection(index);
        self.check_position(pos)?;
        let proj = &mut self.projections[index];
        let old = std::mem::replace(&mut proj.scale, scale);
        self.record(ModelUndo::ScalePosition {
            pos,
            old: Vec3::splat(old),
            new: Vec3::splat(scale),
        });
        Ok(())
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Interpolation for keys created by edits. Edits always carry data.
    fn edit_interpolation(&self) -> Interpolate {
        match self.settings.default_interpolation {
            Interpolate::None | Interpolate::Copy => Interpolate::Lerp,
            interp => interp,
        }
    }

    /// `(animation, frame)` a joint or point edit is keyed into, or `None`
    /// for a rest-pose edit.
    fn keyed_edit_target(&self, kind: PositionKind) -> Result<Option<(usize, usize)>> {
        match self.anim_state.mode {
            AnimationMode::None => Ok(None),
            AnimationMode::Frame => Err(ModelError::WrongPositionKind(kind)),
            AnimationMode::Skeletal => {
                let anim = self.active_animation_index()?;
                let needed = match kind {
                    PositionKind::Joint => AnimationType::JOINT,
                    _ => AnimationType::POINT,
                };
                if !self.animations[anim].kind.contains(needed) {
                    return Err(ModelError::AnimationMismatch(anim));
                }
                Ok(Some((anim, self.anim_state.frame)))
            }
        }
    }

    fn set_position_channel(&mut self, pos: Position, channel: Channel, value: Vec3) -> Result<()> {
        if !matches!(pos.kind, PositionKind::Joint | PositionKind::Point) {
            return Err(ModelError::WrongPositionKind(pos.kind));
        }
        if let Some((anim, frame)) = self.keyed_edit_target(pos.kind)? {
            let interp = self.edit_interpolation();
            return self.set_keyframe(anim, frame, pos, channel, value, interp);
        }

        let old = match pos.kind {
            PositionKind::Joint => {
                let joint = &mut self.joints[pos.index];
                let slot = match channel {
                    Channel::Translate => &mut joint.local_translation,
                    Channel::Rotate => &mut joint.local_rotation,
                    Channel::Scale => &mut joint.local_scale,
                };
                let old = std::mem::replace(slot, value);
                joint.update_relative();
                self.invalidate(Validity::SKELETON);
                old
            }
            _ => {
                let point = &mut self.points[pos.index];
                let slot = match channel {
                    Channel::Translate => &mut point.translation,
                    Channel::Rotate => &mut point.rotation,
                    Channel::Scale => &mut point.scale,
                };
                let old = std::mem::replace(slot, value);
                self.invalidate(Validity::ANIMATION);
                old
            }
        };

        let undo = match channel {
            Channel::Translate => ModelUndo::MovePosition { pos, old, new: value },
            Channel::Rotate => ModelUndo::RotatePosition { pos, old, new: value },
            Channel::Scale => ModelUndo::ScalePosition { pos, old, new: value },
        };
        self.record(undo);
        Ok(())
    }

    // ========================================================================
    // Moves
    // ========================================================================

    fn move_vertex(&mut self, vertex: usize, coord: Vec3) -> Result<()> {
        if self.anim_state.mode == AnimationMode::None {
            return self.set_vertex_rest_coord(vertex, coord);
        }

        let anim = self.active_animation_index()?;
        self.validate_animation();

        let a = &self.animations[anim];
        let v = &self.vertices[vertex];
        let base = if a.kind.contains(AnimationType::FRAME) {
            a.sample_vertex_at(vertex, self.anim_state.frame, self.anim_state.time, v.coord)
        } else {
            v.coord
        };
        let solved = if a.kind.contains(AnimationType::JOINT) {
            unskin_coord(
                base,
                v.anim_coord,
                coord,
                &v.influences,
                &self.joints,
                self.settings.weight_epsilon,
            )
        } else {
            coord
        };

        match self.anim_state.mode {
            AnimationMode::Frame => {
                let frame = self.anim_state.frame;
                let interp = self.edit_interpolation();
                self.set_frame_vertex_coords(anim, frame, vertex, solved, interp)
            }
            _ => {
                let rest = self.vertices[vertex].coord;
                self.set_vertex_rest_coord(vertex, rest + (solved - base))
            }
        }
    }

    fn set_vertex_rest_coord(&mut self, vertex: usize, coord: Vec3) -> Result<()> {
        let v = &mut self.vertices[vertex];
        let old = std::mem::replace(&mut v.coord, coord);
        v.anim_coord = coord;
        self.record(ModelUndo::MovePosition {
            pos: Position::vertex(vertex),
            old,
            new: coord,
        });
        self.invalidate_geometry();
        Ok(())
    }

    /// In the rest pose a moved joint leaves its children where they are;
    /// when animating it keys a translation that places it at `coord`.
    fn move_bone_joint(&mut self, joint: usize, coord: Vec3) -> Result<()> {
        let pos = Position::joint(joint);
        if let Some((anim, frame)) = self.keyed_edit_target(PositionKind::Joint)? {
            self.validate_animated_skeleton();
            let parent_final = self.joints[joint]
                .parent
                .map_or(Affine3A::IDENTITY, |p| self.joints[p].final_matrix);
            let local = inverse_or_identity(&parent_final).transform_point3(coord);
            let interp = self.edit_interpolation();
            return self.set_keyframe(anim, frame, pos, Channel::Translate, local, interp);
        }

        self.validate_skeleton();
        let parent_abs = self.joints[joint]
            .parent
            .map_or(Affine3A::IDENTITY, |p| self.joints[p].absolute);
        let old = Vec3::from(self.joints[joint].absolute.translation);

        let mut new_abs = self.joints[joint].absolute;
        new_abs.translation = coord.into();
        let j = &mut self.joints[joint];
        j.local_translation = inverse_or_identity(&parent_abs).transform_point3(coord);
        j.update_relative();

        let inv_new = inverse_or_identity(&new_abs);
        for child in self.get_bone_joint_children(joint) {
            let c = &mut self.joints[child];
            c.local_translation = inv_new.transform_point3(c.absolute.translation.into());
            c.update_relative();
        }

        self.record(ModelUndo::MovePosition { pos, old, new: coord });
        self.invalidate(Validity::SKELETON);
        Ok(())
    }

    /// When animating, a skinned point's key is solved back through its
    /// blended skin matrix.
    fn move_point(&mut self, point: usize, coord: Vec3) -> Result<()> {
        let pos = Position::point(point);
        let Some((anim, frame)) = self.keyed_edit_target(PositionKind::Point)? else {
            return self.set_position_channel(pos, Channel::Translate, coord);
        };

        self.validate_animated_skeleton();
        let skin = if self.animations[anim].kind.contains(AnimationType::JOINT) {
            blend_skin(
                &self.points[point].influences,
                &self.joints,
                self.settings.weight_epsilon,
            )
        } else {
            None
        };
        let local = skin.map_or(coord, |m| inverse_or_identity(&m).transform_point3(coord));
        let interp = self.edit_interpolation();
        self.set_keyframe(anim, frame, pos, Channel::Translate, local, interp)
    }
}
