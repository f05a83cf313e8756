//! Undo records emitted by the model.
//!
//! Each record carries enough state for a recorder to revert or replay the
//! change. Consecutive edits of the same target combine, so a drag that
//! issues hundreds of moves can collapse into one record.

use glam::Vec3;

use misfit_animation::{AnimationType, Channel, FrameVertex, KeyValue};
use misfit_core::{Combine, Position};

use crate::influence::Influence;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelUndo {
    AddVertex { index: usize, coord: Vec3 },
    DeleteVertex { index: usize, coord: Vec3 },
    AddTriangle { index: usize, vertices: [usize; 3] },
    DeleteTriangle { index: usize, vertices: [usize; 3] },
    AddJoint { index: usize, parent: Option<usize> },
    DeleteJoint { index: usize, name: String, parent: Option<usize> },
    AddPoint { index: usize },
    DeletePoint { index: usize, name: String },
    AddProjection { index: usize },
    DeleteProjection { index: usize, name: String },

    MovePosition { pos: Position, old: Vec3, new: Vec3 },
    RotatePosition { pos: Position, old: Vec3, new: Vec3 },
    ScalePosition { pos: Position, old: Vec3, new: Vec3 },
    SetJointParent { joint: usize, old: Option<usize>, new: Option<usize> },
    SetJointOffset {
        joint: usize,
        old_translation: Vec3,
        old_rotation: Vec3,
        new_translation: Vec3,
        new_rotation: Vec3,
    },
    RenameJoint { joint: usize, old: String, new: String },
    SelectJoint { joint: usize, selected: bool },

    SetInfluence { pos: Position, bone: usize, old: Option<Influence>, new: Option<Influence> },
    SetInfluences { pos: Position, old: Vec<Influence> },

    AddAnimation { index: usize, kind: AnimationType },
    DeleteAnimation { index: usize, name: String },
    SetAnimationFrameCount { anim: usize, old: usize, new: usize },
    SetAnimationFps { anim: usize, old: f32, new: f32 },
    SetAnimationWrap { anim: usize, wrap: bool },
    SetFrameTime { anim: usize, frame: usize, old: f32, new: f32 },
    DeleteFrame { anim: usize, frame: usize },
    SetKeyframe {
        anim: usize,
        frame: usize,
        target: Position,
        channel: Channel,
        old: Option<KeyValue>,
        new: Option<KeyValue>,
    },
    SetFrameVertex {
        anim: usize,
        frame: usize,
        vertex: usize,
        old: Option<FrameVertex>,
        new: Option<FrameVertex>,
    },
}

impl Combine for ModelUndo {
    fn combine(&mut self, next: &Self) -> bool {
        use ModelUndo::{
            MovePosition, RotatePosition, ScalePosition, SetFrameTime, SetFrameVertex, SetInfluence,
            SetKeyframe,
        };

        match (self, next) {
            (MovePosition { pos, new, .. }, MovePosition { pos: p, new: n, .. })
            | (RotatePosition { pos, new, .. }, RotatePosition { pos: p, new: n, .. })
            | (ScalePosition { pos, new, .. }, ScalePosition { pos: p, new: n, .. })
                if pos == p =>
            {
                *new = *n;
                true
            }
            (
                SetInfluence { pos, bone, new, .. },
                SetInfluence { pos: p, bone: b, new: n, .. },
            ) if pos == p && bone == b => {
                *new = *n;
                true
            }
            (
                SetKeyframe { anim, frame, target, channel, new, .. },
                SetKeyframe { anim: a, frame: f, target: t, channel: c, new: n, .. },
            ) if anim == a && frame == f && target == t && channel == c => {
                *new = *n;
                true
            }
            (
                SetFrameVertex { anim, frame, vertex, new, .. },
                SetFrameVertex { anim: a, frame: f, vertex: v, new: n, .. },
            ) if anim == a && frame == f && vertex == v => {
                *new = *n;
                true
            }
            (
                SetFrameTime { anim, frame, new, .. },
                SetFrameTime { anim: a, frame: f, new: n, .. },
            ) if anim == a && frame == f => {
                *new = *n;
                true
            }
            _ => false,
        }
    }
}
