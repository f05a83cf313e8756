#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Skeletal deformation and keyframe animation core for an interactive
//! mesh/skeleton editor.
//!
//! The workspace is split by concern:
//! - [`core`]: handles, errors, validation flags, recycling pool, undo interface
//! - [`animation`]: keyframe store and time-based sampling
//! - [`scene`]: the [`Model`] with its transform cache, influences and pose resolver

pub use misfit_animation as animation;
pub use misfit_core as core;
pub use misfit_scene as scene;

pub use misfit_animation::{Animation, AnimationType, Channel, FrameVertex, Interpolate, KeyValue};
pub use misfit_core::{ModelError, Position, PositionKind, Result, UndoList, UndoRecorder, Validity};
pub use misfit_scene::{
    AnimationMode, CoordSource, Influence, InfluenceType, Joint, Model, ModelSettings, ModelUndo,
};

pub use glam;
