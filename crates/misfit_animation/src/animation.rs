use bitflags::bitflags;
use glam::Vec3;

use misfit_core::{ModelError, Position, PositionKind, Result};

use crate::interpolation::{Channel, Interpolate, KeyValue};
use crate::keyframe::{Keyframe, KeyframeList, TIME_EPSILON, TargetKeyframes, Timeline};

bitflags! {
    /// Target classes an animation drives. The classes are independent and
    /// may combine in one animation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct AnimationType: u32 {
        /// Joint keyframes (skeletal deformation).
        const JOINT = 1 << 0;
        /// Point keyframes.
        const POINT = 1 << 1;
        /// Direct per-vertex frame data.
        const FRAME = 1 << 2;

        const SKELETAL = Self::JOINT.bits() | Self::POINT.bits();
    }
}

/// One per-(vertex, frame) sample of the direct animation path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameVertex {
    /// Absolute coordinate, `None` for copy markers.
    pub coord: Option<Vec3>,
    pub interpolation: Interpolate,
}

/// A stored animation: frame timing plus sparse keyed data.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub kind: AnimationType,
    pub wrap: bool,
    fps: f32,
    /// Start time of every frame, non-decreasing.
    times: Vec<f32>,
    joints: Vec<TargetKeyframes>,
    points: Vec<TargetKeyframes>,
    vertices: Vec<KeyframeList>,
}

impl Animation {
    #[must_use]
    pub fn new(name: &str, kind: AnimationType, fps: f32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            wrap: false,
            fps: sanitize_fps(fps),
            times: Vec::new(),
            joints: Vec::new(),
            points: Vec::new(),
            vertices: Vec::new(),
        }
    }

    // ========================================================================
    // Timing
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Changing fps rescales the frame time table.
    pub fn set_fps(&mut self, fps: f32) {
        let fps = sanitize_fps(fps);
        let ratio = self.fps / fps;
        for t in &mut self.times {
            *t *= ratio;
        }
        self.fps = fps;
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.times.len()
    }

    /// Resizes the animation. New frames are spaced one fps step apart;
    /// data on removed frames is dropped.
    pub fn set_frame_count(&mut self, count: usize) {
        let step = 1.0 / self.fps;
        while self.times.len() < count {
            let next = self.times.last().map_or(0.0, |t| t + step);
            self.times.push(next);
        }
        if count < self.times.len() {
            self.times.truncate(count);
            for target in self.joints.iter_mut().chain(self.points.iter_mut()) {
                target.truncate(count);
            }
            for list in &mut self.vertices {
                list.truncate(count);
            }
        }
    }

    #[must_use]
    pub fn frame_time(&self, frame: usize) -> Option<f32> {
        self.times.get(frame).copied()
    }

    /// Retimes one frame. The table must stay non-decreasing.
    pub fn set_frame_time(&mut self, frame: usize, time: f32) -> Result<()> {
        self.check_frame(frame)?;
        let after_prev = frame == 0 || self.times[frame - 1] <= time;
        let before_next = self.times.get(frame + 1).is_none_or(|&next| time <= next);
        if !time.is_finite() || time < 0.0 || !after_prev || !before_next {
            return Err(ModelError::InvalidTime { frame, time });
        }
        self.times[frame] = time;
        Ok(())
    }

    /// Length of the animation: the last frame lasts one fps step.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().map_or(0.0, |t| t + 1.0 / self.fps)
    }

    /// The frame whose interval contains `time`, clamped to the frame range.
    #[must_use]
    pub fn frame_at_time(&self, time: f32) -> usize {
        self.times.partition_point(|&t| t <= time).saturating_sub(1)
    }

    /// Maps a playback time into the animation, wrapping when enabled.
    #[must_use]
    pub fn local_time(&self, time: f32) -> f32 {
        let end = self.end_time();
        if end <= 0.0 {
            return 0.0;
        }
        if self.wrap {
            time.rem_euclid(end)
        } else {
            time.clamp(0.0, end)
        }
    }

    #[must_use]
    pub fn timeline(&self) -> Timeline<'_> {
        Timeline {
            times: &self.times,
            end: self.end_time(),
            wrap: self.wrap,
        }
    }

    fn check_frame(&self, frame: usize) -> Result<()> {
        if frame < self.times.len() {
            Ok(())
        } else {
            Err(ModelError::InvalidFrame {
                frame,
                frame_count: self.times.len(),
            })
        }
    }

    /// Removes a frame and everything keyed on it; later frames move up.
    pub fn delete_frame(&mut self, frame: usize) -> Result<()> {
        self.check_frame(frame)?;
        self.times.remove(frame);
        for target in self.joints.iter_mut().chain(self.points.iter_mut()) {
            target.delete_frame(frame);
        }
        for list in &mut self.vertices {
            list.delete_frame(frame);
        }
        Ok(())
    }

    // ========================================================================
    // Joint & point keyframes
    // ========================================================================

    fn table(&self, kind: PositionKind) -> Option<&Vec<TargetKeyframes>> {
        match kind {
            PositionKind::Joint => Some(&self.joints),
            PositionKind::Point => Some(&self.points),
            _ => None,
        }
    }

    fn table_mut(&mut self, kind: PositionKind) -> Option<&mut Vec<TargetKeyframes>> {
        match kind {
            PositionKind::Joint => Some(&mut self.joints),
            PositionKind::Point => Some(&mut self.points),
            _ => None,
        }
    }

    fn drives(&self, kind: PositionKind) -> bool {
        match kind {
            PositionKind::Joint => self.kind.contains(AnimationType::JOINT),
            PositionKind::Point => self.kind.contains(AnimationType::POINT),
            PositionKind::Vertex => self.kind.contains(AnimationType::FRAME),
            PositionKind::Projection => false,
        }
    }

    /// Inserts or overwrites a keyframe; `Interpolate::None` removes it.
    ///
    /// Returns the value that was replaced, if any. Target range checking is
    /// the caller's job: the table grows on demand.
    pub fn set_keyframe(
        &mut self,
        target: Position,
        frame: usize,
        channel: Channel,
        value: Vec3,
        interpolation: Interpolate,
    ) -> Result<Option<KeyValue>> {
        if !self.drives(target.kind) || target.kind == PositionKind::Vertex {
            return Err(ModelError::WrongPositionKind(target.kind));
        }
        self.check_frame(frame)?;
        let Some(table) = self.table_mut(target.kind) else {
            return Err(ModelError::WrongPositionKind(target.kind));
        };

        let Some(key) = KeyValue::new(value, interpolation) else {
            return Ok(table
                .get_mut(target.index)
                .and_then(|t| t.channel_mut(channel).remove(frame)));
        };
        if table.len() <= target.index {
            table.resize_with(target.index + 1, TargetKeyframes::default);
        }
        Ok(table[target.index].channel_mut(channel).set(frame, key))
    }

    pub fn remove_keyframe(&mut self, target: Position, frame: usize, channel: Channel) -> Option<KeyValue> {
        self.table_mut(target.kind)?
            .get_mut(target.index)?
            .channel_mut(channel)
            .remove(frame)
    }

    #[must_use]
    pub fn keyframe(&self, target: Position, frame: usize, channel: Channel) -> Option<&Keyframe> {
        self.keyframes(target, channel)?.get(frame)
    }

    #[must_use]
    pub fn keyframes(&self, target: Position, channel: Channel) -> Option<&KeyframeList> {
        Some(self.table(target.kind)?.get(target.index)?.channel(channel))
    }

    /// Whether any key exists for the target.
    #[must_use]
    pub fn has_data(&self, target: Position) -> bool {
        match target.kind {
            PositionKind::Vertex => self.vertices.get(target.index).is_some_and(|l| !l.is_empty()),
            kind => self
                .table(kind)
                .and_then(|t| t.get(target.index))
                .is_some_and(|t| !t.is_empty()),
        }
    }

    /// Samples one channel of a joint or point at `time`.
    #[must_use]
    pub fn sample(&self, target: Position, channel: Channel, time: f32, rest: Vec3) -> Vec3 {
        match self.keyframes(target, channel) {
            Some(list) => list.sample(&self.timeline(), time, channel, rest),
            None => rest,
        }
    }

    /// Samples one channel at the start time of `frame`.
    ///
    /// A key stored on `frame` itself always wins, even when later frames
    /// share its start time.
    #[must_use]
    pub fn interpolate(&self, target: Position, channel: Channel, frame: usize, rest: Vec3) -> Vec3 {
        let Some(time) = self.frame_time(frame) else {
            return rest;
        };
        let list = self.keyframes(target, channel);
        if let Some(exact) = list.and_then(|l| l.resolved_at(frame, rest)) {
            return exact;
        }
        self.sample(target, channel, time, rest)
    }

    /// Samples one channel at playback position `(frame, time)`.
    #[must_use]
    pub fn sample_at(&self, target: Position, channel: Channel, frame: usize, time: f32, rest: Vec3) -> Vec3 {
        if self.starts_frame(frame, time) {
            self.interpolate(target, channel, frame, rest)
        } else {
            self.sample(target, channel, time, rest)
        }
    }

    /// Whether `time` is the start time of `frame`.
    fn starts_frame(&self, frame: usize, time: f32) -> bool {
        self.frame_time(frame)
            .is_some_and(|t| (t - time).abs() <= TIME_EPSILON)
    }

    // ========================================================================
    // Frame vertices
    // ========================================================================

    /// Stores a vertex sample; `Interpolate::None` removes it.
    pub fn set_frame_vertex(
        &mut self,
        frame: usize,
        vertex: usize,
        coord: Vec3,
        interpolation: Interpolate,
    ) -> Result<()> {
        if !self.kind.contains(AnimationType::FRAME) {
            return Err(ModelError::WrongPositionKind(PositionKind::Vertex));
        }
        self.check_frame(frame)?;
        match KeyValue::new(coord, interpolation) {
            Some(key) => {
                if self.vertices.len() <= vertex {
                    self.vertices.resize_with(vertex + 1, KeyframeList::default);
                }
                self.vertices[vertex].set(frame, key);
            }
            None => {
                if let Some(list) = self.vertices.get_mut(vertex) {
                    list.remove(frame);
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn frame_vertex(&self, frame: usize, vertex: usize) -> Option<FrameVertex> {
        let key = self.vertices.get(vertex)?.get(frame)?;
        Some(FrameVertex {
            coord: key.value.value(),
            interpolation: key.interpolation(),
        })
    }

    /// Samples a vertex's direct coordinate; `base` is the mesh coordinate.
    #[must_use]
    pub fn sample_vertex(&self, vertex: usize, time: f32, base: Vec3) -> Vec3 {
        match self.vertices.get(vertex) {
            Some(list) => list.sample(&self.timeline(), time, Channel::Translate, base),
            None => base,
        }
    }

    #[must_use]
    pub fn interpolate_vertex(&self, vertex: usize, frame: usize, base: Vec3) -> Vec3 {
        let Some(time) = self.frame_time(frame) else {
            return base;
        };
        let list = self.vertices.get(vertex);
        if let Some(exact) = list.and_then(|l| l.resolved_at(frame, base)) {
            return exact;
        }
        self.sample_vertex(vertex, time, base)
    }

    /// Vertex counterpart of [`Animation::sample_at`].
    #[must_use]
    pub fn sample_vertex_at(&self, vertex: usize, frame: usize, time: f32, base: Vec3) -> Vec3 {
        if self.starts_frame(frame, time) {
            self.interpolate_vertex(vertex, frame, base)
        } else {
            self.sample_vertex(vertex, time, base)
        }
    }

    // ========================================================================
    // Renumbering after deletes
    // ========================================================================

    /// Drops the keys of a deleted joint, point or vertex and shifts the
    /// keys of later targets down by one index.
    pub fn remove_target(&mut self, target: Position) {
        match target.kind {
            PositionKind::Vertex => {
                if target.index < self.vertices.len() {
                    self.vertices.remove(target.index);
                }
            }
            kind => {
                if let Some(table) = self.table_mut(kind)
                    && target.index < table.len()
                {
                    table.remove(target.index);
                }
            }
        }
    }
}

fn sanitize_fps(fps: f32) -> f32 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        log::warn!("Invalid animation fps {fps}, using 30");
        30.0
    }
}
