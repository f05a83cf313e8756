//! Animation storage and playback state of the model.
//!
//! The model is in at most one animation mode at a time. The mode only
//! decides where new edits are routed; what the active animation drives
//! during posing depends on the data it carries ([`AnimationType`]).

use glam::Vec3;

use misfit_animation::{Animation, AnimationType, Channel, FrameVertex, Interpolate};
use misfit_core::{ModelError, Position, PositionKind, Result, Validity};

use crate::model::Model;
use crate::undo::ModelUndo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationMode {
    /// Rest pose; edits change rest data.
    #[default]
    None,
    /// Joint-driven; edits create joint and point keyframes.
    Skeletal,
    /// Direct per-vertex; edits create frame vertices.
    Frame,
}

/// Current animation, frame and playback time.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AnimationState {
    pub mode: AnimationMode,
    pub index: usize,
    pub frame: usize,
    pub time: f32,
}

impl AnimationState {
    /// The animation being posed with the frame and time to sample it at.
    pub(crate) fn active<'a>(&self, animations: &'a [Animation]) -> Option<(&'a Animation, usize, f32)> {
        if self.mode == AnimationMode::None {
            return None;
        }
        animations.get(self.index).map(|anim| (anim, self.frame, self.time))
    }
}

impl Model {
    // ========================================================================
    // Storage
    // ========================================================================

    /// Adds an empty animation using the configured default fps.
    pub fn add_animation(&mut self, name: &str, kind: AnimationType) -> usize {
        let index = self.animations.len();
        self.animations
            .push(Animation::new(name, kind, self.settings.default_fps));
        log::debug!("Added animation {index} '{name}' ({kind:?})");
        self.record(ModelUndo::AddAnimation { index, kind });
        index
    }

    pub fn delete_animation(&mut self, index: usize) -> Result<()> {
        if index >= self.animations.len() {
            return Err(ModelError::InvalidAnimation(index));
        }
        let anim = self.animations.remove(index);

        if self.anim_state.mode != AnimationMode::None {
            if self.anim_state.index == index {
                self.set_no_animation();
            } else if self.anim_state.index > index {
                self.anim_state.index -= 1;
            }
        }

        self.record(ModelUndo::DeleteAnimation {
            index,
            name: anim.name,
        });
        Ok(())
    }

    #[must_use]
    pub fn get_animation(&self, index: usize) -> Option<&Animation> {
        self.animations.get(index)
    }

    fn animation_mut(&mut self, index: usize) -> Result<&mut Animation> {
        self.animations
            .get_mut(index)
            .ok_or(ModelError::InvalidAnimation(index))
    }

    /// Whether `anim` is the one currently posed.
    fn is_active_animation(&self, anim: usize) -> bool {
        self.anim_state.mode != AnimationMode::None && self.anim_state.index == anim
    }

    /// Re-poses if `anim` is the active animation.
    fn animation_changed(&mut self, anim: usize, flag: Validity) {
        if self.is_active_animation(anim) {
            self.invalidate(flag);
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn set_animation_frame_count(&mut self, anim: usize, count: usize) -> Result<()> {
        let a = self.animation_mut(anim)?;
        let old = a.frame_count();
        a.set_frame_count(count);

        if self.is_active_animation(anim) && self.anim_state.frame >= count {
            self.anim_state.frame = count.saturating_sub(1);
            self.anim_state.time = self.animations[anim].frame_time(self.anim_state.frame).unwrap_or(0.0);
        }
        self.record(ModelUndo::SetAnimationFrameCount { anim, old, new: count });
        self.animation_changed(anim, Validity::ANIMATED_SKELETON);
        Ok(())
    }

    /// Changing fps rescales the frame time table.
    pub fn set_animation_fps(&mut self, anim: usize, fps: f32) -> Result<()> {
        let a = self.animation_mut(anim)?;
        let old = a.fps();
        a.set_fps(fps);
        let new = a.fps();

        if self.is_active_animation(anim) {
            self.anim_state.time = self.animations[anim]
                .frame_time(self.anim_state.frame)
                .unwrap_or(0.0);
        }
        self.record(ModelUndo::SetAnimationFps { anim, old, new });
        self.animation_changed(anim, Validity::ANIMATED_SKELETON);
        Ok(())
    }

    pub fn set_animation_wrap(&mut self, anim: usize, wrap: bool) -> Result<()> {
        self.animation_mut(anim)?.wrap = wrap;
        self.record(ModelUndo::SetAnimationWrap { anim, wrap });
        self.animation_changed(anim, Validity::ANIMATED_SKELETON);
        Ok(())
    }

    #[must_use]
    pub fn get_animation_frame_time(&self, anim: usize, frame: usize) -> Option<f32> {
        self.animations.get(anim)?.frame_time(frame)
    }

    pub fn set_animation_frame_time(&mut self, anim: usize, frame: usize, time: f32) -> Result<()> {
        let a = self.animation_mut(anim)?;
        let old = a.frame_time(frame).unwrap_or(0.0);
        a.set_frame_time(frame, time)?;

        if self.is_active_animation(anim) && self.anim_state.frame == frame {
            self.anim_state.time = time;
        }
        self.record(ModelUndo::SetFrameTime { anim, frame, old, new: time });
        self.animation_changed(anim, Validity::ANIMATED_SKELETON);
        Ok(())
    }

    /// Removes a frame with all data keyed on it; later frames move up.
    pub fn delete_animation_frame(&mut self, anim: usize, frame: usize) -> Result<()> {
        let a = self.animation_mut(anim)?;
        a.delete_frame(frame)?;
        let count = a.frame_count();

        if self.is_active_animation(anim) && self.anim_state.frame >= count {
            self.anim_state.frame = count.saturating_sub(1);
        }
        if self.is_active_animation(anim) {
            self.anim_state.time = self.animations[anim]
                .frame_time(self.anim_state.frame)
                .unwrap_or(0.0);
        }
        self.record(ModelUndo::DeleteFrame { anim, frame });
        self.animation_changed(anim, Validity::ANIMATED_SKELETON);
        Ok(())
    }

    // ========================================================================
    // Keyframes
    // ========================================================================

    /// Inserts or overwrites a joint or point keyframe.
    ///
    /// `Interpolate::Copy` stores only a marker; `Interpolate::None` removes
    /// the key.
    pub fn set_keyframe(
        &mut self,
        anim: usize,
        frame: usize,
        target: Position,
        channel: Channel,
        value: Vec3,
        interpolation: Interpolate,
    ) -> Result<()> {
        if !matches!(target.kind, PositionKind::Joint | PositionKind::Point) {
            return Err(ModelError::WrongPositionKind(target.kind));
        }
        self.check_position(target)?;
        let a = self.animation_mut(anim)?;
        let old = a.set_keyframe(target, frame, channel, value, interpolation)?;
        let new = a.keyframe(target, frame, channel).map(|k| k.value);

        self.record(ModelUndo::SetKeyframe {
            anim,
            frame,
            target,
            channel,
            old,
            new,
        });
        self.animation_changed(anim, keyframe_validity(target.kind));
        Ok(())
    }

    /// Removes a keyframe. Returns whether one existed.
    pub fn remove_keyframe(&mut self, anim: usize, frame: usize, target: Position, channel: Channel) -> Result<bool> {
        let Some(old) = self.animation_mut(anim)?.remove_keyframe(target, frame, channel) else {
            return Ok(false);
        };
        self.record(ModelUndo::SetKeyframe {
            anim,
            frame,
            target,
            channel,
            old: Some(old),
            new: None,
        });
        self.animation_changed(anim, keyframe_validity(target.kind));
        Ok(true)
    }

    /// Rest-pose value of one channel of a joint or point.
    pub(crate) fn rest_channel(&self, target: Position, channel: Channel) -> Option<Vec3> {
        let (t, r, s) = match target.kind {
            PositionKind::Joint => {
                let j = self.joints.get(target.index)?;
                (j.local_translation, j.local_rotation, j.local_scale)
            }
            PositionKind::Point => {
                let p = self.points.get(target.index)?;
                (p.translation, p.rotation, p.scale)
            }
            _ => return None,
        };
        Some(match channel {
            Channel::Translate => t,
            Channel::Rotate => r,
            Channel::Scale => s,
        })
    }

    /// Channel value of a joint or point at the start of `frame`.
    ///
    /// Exact keyframes return their stored value, copy markers resolve to
    /// the nearest preceding data, and missing keys fall back to the rest
    /// pose.
    #[must_use]
    pub fn interpolate_keyframe(&self, anim: usize, frame: usize, target: Position, channel: Channel) -> Option<Vec3> {
        let a = self.animations.get(anim)?;
        let rest = self.rest_channel(target, channel)?;
        a.frame_time(frame)?;
        Some(a.interpolate(target, channel, frame, rest))
    }

    // ========================================================================
    // Frame vertices
    // ========================================================================

    /// Stores a vertex's absolute coordinate for `frame`; `Interpolate::None`
    /// removes the sample.
    pub fn set_frame_vertex_coords(
        &mut self,
        anim: usize,
        frame: usize,
        vertex: usize,
        coord: Vec3,
        interpolation: Interpolate,
    ) -> Result<()> {
        self.check_position(Position::vertex(vertex))?;
        let a = self.animation_mut(anim)?;
        if !a.kind.contains(AnimationType::FRAME) {
            return Err(ModelError::AnimationMismatch(anim));
        }
        let old = a.frame_vertex(frame, vertex);
        a.set_frame_vertex(frame, vertex, coord, interpolation)?;
        let new = a.frame_vertex(frame, vertex);

        self.record(ModelUndo::SetFrameVertex {
            anim,
            frame,
            vertex,
            old,
            new,
        });
        self.animation_changed(anim, Validity::ANIMATION);
        Ok(())
    }

    #[must_use]
    pub fn get_frame_vertex(&self, anim: usize, frame: usize, vertex: usize) -> Option<FrameVertex> {
        self.animations.get(anim)?.frame_vertex(frame, vertex)
    }

    /// Direct-path coordinate of a vertex at the start of `frame`, falling
    /// back to the base mesh coordinate.
    #[must_use]
    pub fn interpolate_frame_vertex(&self, anim: usize, frame: usize, vertex: usize) -> Option<Vec3> {
        let a = self.animations.get(anim)?;
        let base = self.vertices.get(vertex)?.coord;
        a.frame_time(frame)?;
        Some(a.interpolate_vertex(vertex, frame, base))
    }

    // ========================================================================
    // Playback state
    // ========================================================================

    /// Enters `mode` on animation `anim` at its first frame.
    pub fn set_current_animation(&mut self, mode: AnimationMode, anim: usize) -> Result<()> {
        if mode == AnimationMode::None {
            self.set_no_animation();
            return Ok(());
        }
        let a = self.animations.get(anim).ok_or(ModelError::InvalidAnimation(anim))?;
        let compatible = match mode {
            AnimationMode::Skeletal => a.kind.intersects(AnimationType::SKELETAL),
            AnimationMode::Frame => a.kind.contains(AnimationType::FRAME),
            AnimationMode::None => true,
        };
        if !compatible {
            log::warn!("Animation {anim} ({:?}) cannot be used in {mode:?} mode", a.kind);
            return Err(ModelError::AnimationMismatch(anim));
        }

        let time = a.frame_time(0).unwrap_or(0.0);
        self.anim_state = AnimationState {
            mode,
            index: anim,
            frame: 0,
            time,
        };
        log::debug!("Animation {anim} active in {mode:?} mode");
        self.invalidate(Validity::ANIMATED_SKELETON);
        Ok(())
    }

    /// Moves playback to the start of `frame`.
    pub fn set_current_animation_frame(&mut self, frame: usize) -> Result<()> {
        let anim = self.active_animation_index()?;
        let a = &self.animations[anim];
        let time = a.frame_time(frame).ok_or(ModelError::InvalidFrame {
            frame,
            frame_count: a.frame_count(),
        })?;
        self.anim_state.frame = frame;
        self.anim_state.time = time;
        self.invalidate(Validity::ANIMATED_SKELETON);
        Ok(())
    }

    /// Moves playback to `seconds`, wrapping or clamping to the animation
    /// length. The current frame becomes the one containing that time.
    pub fn set_current_animation_time(&mut self, seconds: f32) -> Result<()> {
        let anim = self.active_animation_index()?;
        if !seconds.is_finite() {
            return Err(ModelError::InvalidTime {
                frame: self.anim_state.frame,
                time: seconds,
            });
        }
        let a = &self.animations[anim];
        let time = a.local_time(seconds);
        self.anim_state.frame = a.frame_at_time(time);
        self.anim_state.time = time;
        self.invalidate(Validity::ANIMATED_SKELETON);
        Ok(())
    }

    /// Returns to the rest pose.
    pub fn set_no_animation(&mut self) {
        if self.anim_state.mode != AnimationMode::None {
            log::debug!("Animation mode cleared");
        }
        self.anim_state = AnimationState::default();
        self.invalidate(Validity::ANIMATED_SKELETON);
    }

    #[inline]
    #[must_use]
    pub fn animation_mode(&self) -> AnimationMode {
        self.anim_state.mode
    }

    /// Index of the active animation, if any.
    #[must_use]
    pub fn current_animation(&self) -> Option<usize> {
        (self.anim_state.mode != AnimationMode::None).then_some(self.anim_state.index)
    }

    #[inline]
    #[must_use]
    pub fn current_animation_frame(&self) -> usize {
        self.anim_state.frame
    }

    #[inline]
    #[must_use]
    pub fn current_animation_time(&self) -> f32 {
        self.anim_state.time
    }

    pub(crate) fn active_animation_index(&self) -> Result<usize> {
        self.current_animation()
            .filter(|&i| i < self.animations.len())
            .ok_or(ModelError::NoActiveAnimation)
    }
}

/// Joint keys feed the skeleton pass; point keys only the resample pass.
fn keyframe_validity(kind: PositionKind) -> Validity {
    match kind {
        PositionKind::Joint => Validity::ANIMATED_SKELETON,
        _ => Validity::ANIMATION,
    }
}
