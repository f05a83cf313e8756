//! Keyframe store for the Misfit model.
//!
//! An [`Animation`] carries a non-uniform frame time table and sparse keyed
//! data for up to three independent target classes: joints, points, and
//! direct per-vertex frames. Sampling is always done by time, so frames may
//! be spaced arbitrarily.

pub mod animation;
pub mod interpolation;
pub mod keyframe;

pub use animation::{Animation, AnimationType, FrameVertex};
pub use interpolation::{Channel, Interpolate, KeyValue, blend, euler_to_quat, quat_to_euler};
pub use keyframe::{Keyframe, KeyframeList, TargetKeyframes, Timeline};
