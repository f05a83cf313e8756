use glam::{EulerRot, Quat, Vec3};

/// Interpolation tag of a keyframe or frame-vertex sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolate {
    /// No key at this frame. Setting a key with `None` removes it.
    None,
    /// Same value as the nearest preceding non-copy key; carries no data.
    Copy,
    /// Hold the previous value until this key's frame.
    Step,
    /// Blend linearly (by frame time) from the previous value.
    #[default]
    Lerp,
}

/// Transform channel a keyframe drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Translate,
    /// XYZ Euler angles in radians.
    Rotate,
    Scale,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Translate, Channel::Rotate, Channel::Scale];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Channel::Translate => 0,
            Channel::Rotate => 1,
            Channel::Scale => 2,
        }
    }
}

/// Stored keyframe payload. `Copy` markers carry no parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue {
    Copy,
    Step(Vec3),
    Lerp(Vec3),
}

impl KeyValue {
    /// Builds the stored form of `(value, interpolation)`.
    /// Returns `None` for [`Interpolate::None`], which means "no key".
    #[must_use]
    pub fn new(value: Vec3, interpolation: Interpolate) -> Option<Self> {
        match interpolation {
            Interpolate::None => None,
            Interpolate::Copy => Some(KeyValue::Copy),
            Interpolate::Step => Some(KeyValue::Step(value)),
            Interpolate::Lerp => Some(KeyValue::Lerp(value)),
        }
    }

    #[inline]
    #[must_use]
    pub fn interpolation(&self) -> Interpolate {
        match self {
            KeyValue::Copy => Interpolate::Copy,
            KeyValue::Step(_) => Interpolate::Step,
            KeyValue::Lerp(_) => Interpolate::Lerp,
        }
    }

    /// The stored parameter, `None` for copy markers.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<Vec3> {
        match *self {
            KeyValue::Copy => None,
            KeyValue::Step(v) | KeyValue::Lerp(v) => Some(v),
        }
    }
}

/// Blends two channel values. Rotations go through quaternion slerp.
#[must_use]
pub fn blend(channel: Channel, start: Vec3, end: Vec3, t: f32) -> Vec3 {
    match channel {
        Channel::Translate | Channel::Scale => start.lerp(end, t),
        Channel::Rotate => {
            if t <= 0.0 {
                return start;
            }
            if t >= 1.0 {
                return end;
            }
            let q0 = euler_to_quat(start);
            let q1 = euler_to_quat(end);
            quat_to_euler(q0.slerp(q1, t))
        }
    }
}

#[inline]
#[must_use]
pub fn euler_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z)
}

#[inline]
#[must_use]
pub fn quat_to_euler(rotation: Quat) -> Vec3 {
    let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
    Vec3::new(x, y, z)
}
