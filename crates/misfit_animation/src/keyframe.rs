use glam::Vec3;

use crate::interpolation::{Channel, Interpolate, KeyValue, blend};

/// Times closer than this are treated as the same instant.
pub(crate) const TIME_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame: usize,
    pub value: KeyValue,
}

impl Keyframe {
    #[inline]
    #[must_use]
    pub fn interpolation(&self) -> Interpolate {
        self.value.interpolation()
    }
}

/// Frame → time mapping an animation samples against.
///
/// Frames need not be evenly spaced, so every interpolation fraction is
/// computed from `times`, never from frame indices.
#[derive(Debug, Clone, Copy)]
pub struct Timeline<'a> {
    pub times: &'a [f32],
    /// Time at which the animation ends (start of the frame after the last).
    pub end: f32,
    pub wrap: bool,
}

impl Timeline<'_> {
    #[inline]
    #[must_use]
    pub fn time(&self, frame: usize) -> f32 {
        self.times.get(frame).copied().unwrap_or(self.end)
    }
}

/// Sparse keys of one channel of one target, sorted by frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeList {
    keys: Vec<Keyframe>,
}

impl KeyframeList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyframe> {
        self.keys.iter()
    }

    #[must_use]
    pub fn get(&self, frame: usize) -> Option<&Keyframe> {
        self.keys
            .binary_search_by_key(&frame, |k| k.frame)
            .ok()
            .map(|i| &self.keys[i])
    }

    /// Inserts or overwrites the key at `frame`. Returns the replaced value.
    pub fn set(&mut self, frame: usize, value: KeyValue) -> Option<KeyValue> {
        match self.keys.binary_search_by_key(&frame, |k| k.frame) {
            Ok(i) => Some(std::mem::replace(&mut self.keys[i].value, value)),
            Err(i) => {
                self.keys.insert(i, Keyframe { frame, value });
                None
            }
        }
    }

    pub fn remove(&mut self, frame: usize) -> Option<KeyValue> {
        let i = self.keys.binary_search_by_key(&frame, |k| k.frame).ok()?;
        Some(self.keys.remove(i).value)
    }

    /// Drops the key at `frame` and moves every later key one frame earlier.
    pub fn delete_frame(&mut self, frame: usize) {
        self.keys.retain(|k| k.frame != frame);
        for key in &mut self.keys {
            if key.frame > frame {
                key.frame -= 1;
            }
        }
    }

    /// Drops every key at or beyond `frame_count`.
    pub fn truncate(&mut self, frame_count: usize) {
        self.keys.retain(|k| k.frame < frame_count);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Value of the key at `index`, following copy markers back to the
    /// nearest key that stores data. Falls back to `rest`.
    fn resolve(&self, index: usize, rest: Vec3) -> Vec3 {
        self.keys[..=index]
            .iter()
            .rev()
            .find_map(|k| k.value.value())
            .unwrap_or(rest)
    }

    /// Resolved value of the key stored exactly at `frame`, if any.
    #[must_use]
    pub fn resolved_at(&self, frame: usize, rest: Vec3) -> Option<Vec3> {
        let i = self.keys.binary_search_by_key(&frame, |k| k.frame).ok()?;
        Some(self.resolve(i, rest))
    }

    /// Samples the channel at `time`.
    ///
    /// The key at or before `time` provides the start value; the mode of the
    /// key after `time` decides how to reach it (`Lerp` blends by normalized
    /// time, `Step` and `Copy` hold the start value). Before the first key
    /// the rest value applies, after the last key its value holds; a
    /// wrapping timeline instead bridges last and first key across the end.
    #[must_use]
    pub fn sample(&self, timeline: &Timeline<'_>, time: f32, channel: Channel, rest: Vec3) -> Vec3 {
        if self.keys.is_empty() {
            return rest;
        }

        // partition_point finds the first key strictly after `time`
        let next_idx = self.keys.partition_point(|k| timeline.time(k.frame) <= time);
        let last = self.keys.len() - 1;

        // 1. Start of the interval
        let (t0, v0) = if next_idx > 0 {
            let prev = next_idx - 1;
            let t0 = timeline.time(self.keys[prev].frame);
            let v0 = self.resolve(prev, rest);
            // Exact hit returns the stored value untouched
            if (time - t0).abs() <= TIME_EPSILON {
                return v0;
            }
            (t0, v0)
        } else if timeline.wrap {
            let t0 = timeline.time(self.keys[last].frame) - timeline.end;
            (t0, self.resolve(last, rest))
        } else {
            return rest;
        };

        // 2. End of the interval
        let (t1, next) = if next_idx <= last {
            (timeline.time(self.keys[next_idx].frame), &self.keys[next_idx])
        } else if timeline.wrap {
            (timeline.time(self.keys[0].frame) + timeline.end, &self.keys[0])
        } else {
            return v0;
        };

        match next.value {
            KeyValue::Lerp(v1) => {
                let dt = t1 - t0;
                // Prevent division by zero
                let t = if dt > TIME_EPSILON {
                    ((time - t0) / dt).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                blend(channel, v0, v1, t)
            }
            KeyValue::Step(_) | KeyValue::Copy => v0,
        }
    }
}

/// The three channel lists of one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetKeyframes {
    channels: [KeyframeList; 3],
}

impl TargetKeyframes {
    #[inline]
    #[must_use]
    pub fn channel(&self, channel: Channel) -> &KeyframeList {
        &self.channels[channel.index()]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: Channel) -> &mut KeyframeList {
        &mut self.channels[channel.index()]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(KeyframeList::is_empty)
    }

    pub fn delete_frame(&mut self, frame: usize) {
        for list in &mut self.channels {
            list.delete_frame(frame);
        }
    }

    pub fn truncate(&mut self, frame_count: usize) {
        for list in &mut self.channels {
            list.truncate(frame_count);
        }
    }
}
