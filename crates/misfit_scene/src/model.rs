//! The model container.
//!
//! `Model` exclusively owns every joint, vertex, triangle, point, projection
//! and animation. Collaborators hold plain indices: they stay valid across
//! appends and in-place edits, and must be re-resolved after any delete
//! (deletes compact their container and renumber every reference).

use glam::Vec3;

use misfit_animation::Animation;
use misfit_core::{
    ModelError, Pool, Position, PositionKind, Result, UndoRecorder, ValidationState, Validity,
};

use crate::animation::AnimationState;
use crate::geometry::{Point, Projection, Triangle, Vertex};
use crate::joint::Joint;
use crate::pose::CoordSource;
use crate::settings::ModelSettings;
use crate::undo::ModelUndo;

pub struct Model {
    pub(crate) settings: ModelSettings,

    // === Skeleton ===
    pub(crate) joints: Vec<Joint>,
    /// Parent-before-child traversal order, independent of storage order.
    pub(crate) joint_order: Vec<usize>,

    // === Geometry ===
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) points: Vec<Point>,
    pub(crate) projections: Vec<Projection>,

    // === Animation ===
    pub(crate) animations: Vec<Animation>,
    pub(crate) anim_state: AnimationState,

    // === Caches ===
    pub(crate) validity: ValidationState,
    pub(crate) source: CoordSource,

    // === Recycling ===
    joint_pool: Pool<Joint>,
    vertex_pool: Pool<Vertex>,
    point_pool: Pool<Point>,

    undo: Option<Box<dyn UndoRecorder<ModelUndo>>>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("joints", &self.joints.len())
            .field("vertices", &self.vertices.len())
            .field("triangles", &self.triangles.len())
            .field("points", &self.points.len())
            .field("animations", &self.animations.len())
            .field("validity", &self.validity.flags())
            .finish_non_exhaustive()
    }
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(ModelSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: ModelSettings) -> Self {
        let limit = settings.pool_limit;
        Self {
            settings,
            joints: Vec::new(),
            joint_order: Vec::new(),
            vertices: Vec::new(),
            triangles: Vec::new(),
            points: Vec::new(),
            projections: Vec::new(),
            animations: Vec::new(),
            anim_state: AnimationState::default(),
            validity: ValidationState::new(),
            source: CoordSource::Rest,
            joint_pool: Pool::with_limit(limit),
            vertex_pool: Pool::with_limit(limit),
            point_pool: Pool::with_limit(limit),
            undo: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    // ========================================================================
    // Undo & validity plumbing
    // ========================================================================

    /// Installs the recorder that receives every state change.
    pub fn set_undo_recorder(&mut self, recorder: Box<dyn UndoRecorder<ModelUndo>>) {
        self.undo = Some(recorder);
    }

    pub fn take_undo_recorder(&mut self) -> Option<Box<dyn UndoRecorder<ModelUndo>>> {
        self.undo.take()
    }

    pub(crate) fn record(&mut self, undo: ModelUndo) {
        if let Some(recorder) = self.undo.as_mut() {
            recorder.record(undo);
        }
    }

    /// Clears `flag` and everything computed from it.
    pub fn invalidate(&mut self, flag: Validity) {
        self.validity.invalidate(flag);
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self, flag: Validity) -> bool {
        self.validity.is_valid(flag)
    }

    /// Rest coordinates changed: normals and resampled data are stale.
    pub(crate) fn invalidate_geometry(&mut self) {
        self.invalidate(Validity::NORMALS | Validity::ANIMATION);
    }

    // ========================================================================
    // Counts & handle checks
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    #[must_use]
    pub fn bone_joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    #[must_use]
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    #[inline]
    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    /// Whether `pos` refers to a live object.
    #[must_use]
    pub fn is_valid_position(&self, pos: Position) -> bool {
        let len = match pos.kind {
            PositionKind::Vertex => self.vertices.len(),
            PositionKind::Joint => self.joints.len(),
            PositionKind::Point => self.points.len(),
            PositionKind::Projection => self.projections.len(),
        };
        pos.index < len
    }

    pub(crate) fn check_position(&self, pos: Position) -> Result<()> {
        if self.is_valid_position(pos) {
            Ok(())
        } else {
            Err(ModelError::invalid(pos.kind, pos.index))
        }
    }

    // ========================================================================
    // Vertices & triangles
    // ========================================================================

    /// Adds a vertex at a rest coordinate and returns its index.
    pub fn add_vertex(&mut self, coord: Vec3) -> usize {
        let mut vertex = self.vertex_pool.acquire();
        vertex.coord = coord;
        vertex.anim_coord = coord;
        let index = self.vertices.len();
        self.vertices.push(vertex);

        self.record(ModelUndo::AddVertex { index, coord });
        self.invalidate_geometry();
        index
    }

    #[must_use]
    pub fn get_vertex(&self, index: usize) -> Option<&Vertex> {
        self.vertices.get(index)
    }

    /// Deletes an unused vertex. Later vertex indices shift down by one.
    pub fn delete_vertex(&mut self, index: usize) -> Result<()> {
        self.check_position(Position::vertex(index))?;
        if self.triangles.iter().any(|t| t.vertices.contains(&index)) {
            log::warn!("Vertex {index} is still used by a triangle");
            return Err(ModelError::VertexInUse(index));
        }

        let vertex = self.vertices.remove(index);
        let coord = vertex.coord;
        self.vertex_pool.release(vertex);

        for tri in &mut self.triangles {
            for v in &mut tri.vertices {
                if *v > index {
                    *v -= 1;
                }
            }
        }
        for anim in &mut self.animations {
            anim.remove_target(Position::vertex(index));
        }

        self.record(ModelUndo::DeleteVertex { index, coord });
        self.invalidate_geometry();
        Ok(())
    }

    pub fn add_triangle(&mut self, v0: usize, v1: usize, v2: usize) -> Result<usize> {
        let vertices = [v0, v1, v2];
        if let Some(&bad) = vertices.iter().find(|&&v| v >= self.vertices.len()) {
            return Err(ModelError::invalid(PositionKind::Vertex, bad));
        }
        let index = self.triangles.len();
        self.triangles.push(Triangle { vertices });
        self.record(ModelUndo::AddTriangle { index, vertices });
        self.invalidate(Validity::NORMALS | Validity::ANIMATED_NORMALS);
        Ok(index)
    }

    #[must_use]
    pub fn get_triangle(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    pub fn delete_triangle(&mut self, index: usize) -> Result<()> {
        if index >= self.triangles.len() {
            return Err(ModelError::InvalidTriangle(index));
        }
        let tri = self.triangles.remove(index);
        self.record(ModelUndo::DeleteTriangle {
            index,
            vertices: tri.vertices,
        });
        self.invalidate(Validity::NORMALS | Validity::ANIMATED_NORMALS);
        Ok(())
    }

    // ========================================================================
    // Points
    // ========================================================================

    pub fn add_point(&mut self, name: &str, coord: Vec3, rotation: Vec3) -> usize {
        let mut point = self.point_pool.acquire();
        point.name.push_str(name);
        point.translation = coord;
        point.rotation = rotation;
        point.anim_matrix = point.rest_matrix();
        let index = self.points.len();
        self.points.push(point);

        self.record(ModelUndo::AddPoint { index });
        self.invalidate(Validity::ANIMATION);
        index
    }

    #[must_use]
    pub fn get_point(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn delete_point(&mut self, index: usize) -> Result<()> {
        self.check_position(Position::point(index))?;
        let point = self.points.remove(index);
        let name = point.name.clone();
        self.point_pool.release(point);

        for anim in &mut self.animations {
            anim.remove_target(Position::point(index));
        }
        self.record(ModelUndo::DeletePoint { index, name });
        self.invalidate(Validity::ANIMATION);
        Ok(())
    }

    // ========================================================================
    // Texture projections
    // ========================================================================

    pub fn add_projection(&mut self, name: &str, coord: Vec3, rotation: Vec3, scale: f32) -> usize {
        let index = self.projections.len();
        self.projections.push(Projection {
            name: name.to_string(),
            position: coord,
            rotation,
            scale,
        });
        self.record(ModelUndo::AddProjection { index });
        index
    }

    #[must_use]
    pub fn get_projection(&self, index: usize) -> Option<&Projection> {
        self.projections.get(index)
    }

    pub fn delete_projection(&mut self, index: usize) -> Result<()> {
        self.check_position(Position::projection(index))?;
        let proj = self.projections.remove(index);
        self.record(ModelUndo::DeleteProjection {
            index,
            name: proj.name,
        });
        Ok(())
    }

    // ========================================================================
    // Joint storage (hierarchy logic lives in `skeleton`)
    // ========================================================================

    pub(crate) fn acquire_joint(&mut self) -> Joint {
        self.joint_pool.acquire()
    }

    pub(crate) fn release_joint(&mut self, joint: Joint) {
        self.joint_pool.release(joint);
    }

    #[must_use]
    pub fn get_bone_joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Index of the first joint with the given name.
    #[must_use]
    pub fn find_bone_joint(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }
}
