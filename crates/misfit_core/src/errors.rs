//! Error Types
//!
//! This module defines the error type shared by every mutator of the model.
//!
//! # Overview
//!
//! [`ModelError`] covers the failures an edit can be rejected with:
//! - Invalid handles (an index out of range for its container)
//! - Structural inconsistencies (deleting a root joint that still has
//!   children, parenting a joint under its own descendant, ...)
//! - Animation routing failures (no active animation, wrong target kind)
//!
//! Degenerate geometry (zero-length bone vectors, zero total weight) is never
//! an error. It is guarded with epsilon fallbacks at the point of use.
//!
//! # Usage
//!
//! Mutators return [`Result<T>`]; a rejected edit leaves the model untouched.
//!
//! ```rust,ignore
//! use misfit_core::errors::{ModelError, Result};
//!
//! fn rename(model: &mut Model, joint: usize) -> Result<()> {
//!     model.set_bone_joint_name(joint, "spine")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::position::PositionKind;

/// The error type for all model mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    // ========================================================================
    // Invalid handles
    // ========================================================================
    /// The index does not refer to a live object of the given kind.
    #[error("invalid {kind:?} index {index}")]
    InvalidHandle {
        /// Container that was indexed
        kind: PositionKind,
        /// The offending index
        index: usize,
    },

    /// The animation index is out of range.
    #[error("invalid animation index {0}")]
    InvalidAnimation(usize),

    /// The triangle index is out of range.
    #[error("invalid triangle index {0}")]
    InvalidTriangle(usize),

    /// The frame is outside the animation's frame range.
    #[error("frame {frame} out of range (animation has {frame_count} frames)")]
    InvalidFrame {
        /// Requested frame
        frame: usize,
        /// Frames in the animation
        frame_count: usize,
    },

    /// Frame times must be finite and non-decreasing.
    #[error("time {time} is out of order for frame {frame}")]
    InvalidTime {
        /// Frame being retimed
        frame: usize,
        /// Requested time in seconds
        time: f32,
    },

    // ========================================================================
    // Structural inconsistencies
    // ========================================================================
    /// A root joint with children cannot be deleted.
    #[error("joint {0} is a root with children")]
    RootHasChildren(usize),

    /// The requested parent would introduce a cycle in the hierarchy.
    #[error("joint {joint} cannot be parented under {parent}")]
    CyclicParent {
        /// Joint being re-parented
        joint: usize,
        /// Requested parent
        parent: usize,
    },

    /// The vertex is still referenced by a triangle.
    #[error("vertex {0} is used by a triangle")]
    VertexInUse(usize),

    /// The operation does not apply to this kind of position.
    #[error("operation not supported for {0:?}")]
    WrongPositionKind(PositionKind),

    /// The edit needs an active animation frame.
    #[error("no active animation")]
    NoActiveAnimation,

    /// The animation does not carry the data the edit addresses.
    #[error("animation {0} does not carry this kind of data")]
    AnimationMismatch(usize),

    /// The weight is not a finite value in `[0, 1]`.
    #[error("invalid influence weight {0}")]
    InvalidWeight(f32),
}

impl ModelError {
    /// Shorthand for an [`ModelError::InvalidHandle`] error.
    #[inline]
    #[must_use]
    pub fn invalid(kind: PositionKind, index: usize) -> Self {
        ModelError::InvalidHandle { kind, index }
    }
}

/// Alias for `Result<T, ModelError>`.
pub type Result<T> = std::result::Result<T, ModelError>;
