//! The Misfit model: skeleton, skinned geometry and animation playback.
//!
//! [`Model`] owns joints, vertices, triangles, points, projections and
//! animations. Every edit goes through its mutators, which record undo
//! entries and clear the narrowest validation flags; every read goes through
//! accessors that lazily revalidate the caches they depend on.
//!
//! # Example
//!
//! ```rust,ignore
//! use glam::Vec3;
//! use misfit_scene::{InfluenceType, Model};
//! use misfit_core::Position;
//!
//! let mut model = Model::new();
//! let hip = model.add_bone_joint("hip", Vec3::ZERO, None)?;
//! let knee = model.add_bone_joint("knee", Vec3::new(0.0, -1.0, 0.0), Some(hip))?;
//! let v = model.add_vertex(Vec3::new(0.1, -0.5, 0.0));
//! model.set_position_influence(Position::vertex(v), knee, InfluenceType::Custom, 1.0)?;
//! ```

pub mod animation;
pub mod auto_weight;
pub mod edit;
pub mod geometry;
pub mod influence;
pub mod joint;
pub mod model;
pub mod normals;
pub mod pose;
pub mod settings;
pub mod skeleton;
pub mod undo;

pub use animation::AnimationMode;
pub use geometry::{Point, Projection, Triangle, Vertex};
pub use influence::{Influence, InfluenceList, InfluenceType, remainder_weight};
pub use joint::{Joint, local_matrix};
pub use model::Model;
pub use pose::CoordSource;
pub use settings::ModelSettings;
pub use undo::ModelUndo;
