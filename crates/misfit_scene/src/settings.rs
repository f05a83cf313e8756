//! Model Settings
//!
//! Tunables for the skinning guards and for the data the edit paths create.
//!
//! ```rust,ignore
//! use misfit::scene::{Model, ModelSettings};
//!
//! let model = Model::with_settings(ModelSettings {
//!     auto_sensitivity: 0.8,
//!     ..Default::default()
//! });
//! ```

use misfit_animation::Interpolate;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    /// Total influence weight below which a target is left unskinned.
    pub weight_epsilon: f32,
    /// Bone vectors shorter than this contribute no automatic weight.
    pub vector_epsilon: f32,
    /// Sensitivity used by automatic influence assignment, in `[0, 1]`.
    pub auto_sensitivity: f32,
    /// Frames per second assigned to new animations.
    pub default_fps: f32,
    /// Interpolation for keyframes and frame vertices created by edits.
    pub default_interpolation: Interpolate,
    /// Maximum number of released objects kept per recycling pool.
    pub pool_limit: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            weight_epsilon: 1e-6,
            vector_epsilon: 1e-6,
            auto_sensitivity: 0.5,
            default_fps: 30.0,
            default_interpolation: Interpolate::Lerp,
            pool_limit: 256,
        }
    }
}
