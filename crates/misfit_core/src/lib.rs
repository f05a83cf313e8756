//! Foundational types shared by the Misfit model crates.
//!
//! - [`Position`]: tagged (kind, index) handle for vertices, joints, points
//!   and texture projections
//! - [`ModelError`]: error taxonomy for rejected edits
//! - [`ValidationState`]: lazy cache validity flags
//! - [`Pool`]: recycling free list with full reinitialization on reuse
//! - [`UndoRecorder`]: the undo collaborator interface

pub mod errors;
pub mod pool;
pub mod position;
pub mod undo;
pub mod validity;

pub use errors::{ModelError, Result};
pub use pool::{Pool, Recycle};
pub use position::{Position, PositionKind};
pub use undo::{Combine, UndoList, UndoOperation, UndoRecorder};
pub use validity::{ValidationState, Validity};
