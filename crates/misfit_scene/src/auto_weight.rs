//! Automatic influence estimation.
//!
//! A purely geometric heuristic over the rest-pose skeleton. Each bone is
//! treated as a segment from the joint toward its best child (the child
//! nearest the coordinate); a leaf continues the direction of its parent
//! link. Scores remap cosine similarity from `[-1, 1]` to `[0, 1]`.

use glam::Vec3;

use misfit_core::{ModelError, Position, PositionKind, Result};

use crate::influence::InfluenceType;
use crate::model::Model;

/// Distance multiplier for coordinates ahead of a bone.
const AHEAD_BIAS: f32 = 0.667;
/// Distance multiplier for coordinates behind a bone.
const BEHIND_BIAS: f32 = 2.0;

/// Shortest distance from `p` to the segment `a..b`.
fn segment_distance(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// `(dot(a, b) + 1) / 2` for unit vectors.
#[inline]
fn remap(dot: f32) -> f32 {
    (dot + 1.0) * 0.5
}

impl Model {
    /// The child of `bone` whose rest position is nearest `coord`.
    fn best_child(&self, bone: usize, coord: Vec3) -> Option<usize> {
        self.get_bone_joint_children(bone)
            .into_iter()
            .map(|c| (c, coord.distance_squared(self.bone_joint_rest_coord(c))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)
    }

    /// Unit bone vector of `bone` as seen from `coord`, with the best child
    /// it points at. `None` for a degenerate bone.
    fn bone_vector(&self, bone: usize, coord: Vec3) -> Option<(Vec3, Option<usize>)> {
        let origin = self.bone_joint_rest_coord(bone);
        let child = self.best_child(bone, coord);
        let dir = match (child, self.joints[bone].parent) {
            (Some(c), _) => self.bone_joint_rest_coord(c) - origin,
            (None, Some(p)) => origin - self.bone_joint_rest_coord(p),
            (None, None) => return None,
        };
        if dir.length() < self.settings.vector_epsilon {
            return None;
        }
        Some((dir.normalize(), child))
    }

    /// Cosine between a bone vector and the direction to `coord`. A
    /// coordinate on top of the joint counts as fully aligned.
    fn alignment(&self, bvec: Vec3, origin: Vec3, coord: Vec3) -> f32 {
        let to = coord - origin;
        if to.length() < self.settings.vector_epsilon {
            return 1.0;
        }
        bvec.dot(to.normalize())
    }

    /// Affinity of `coord` to `bone` in `[0, 1]`.
    ///
    /// When the bone has a best child, the score is multiplied by the
    /// child's score against its own bone vector, inverted, so coordinates
    /// past the child fall off.
    pub fn calculate_weight(&mut self, coord: Vec3, bone: usize) -> Option<f32> {
        if bone >= self.joints.len() {
            return None;
        }
        self.validate_skeleton();

        let Some((bvec, child)) = self.bone_vector(bone, coord) else {
            return Some(0.0);
        };
        let score = remap(self.alignment(bvec, self.bone_joint_rest_coord(bone), coord));

        let Some(child) = child else {
            return Some(score);
        };
        let child_score = match self.bone_vector(child, coord) {
            Some((cvec, _)) => remap(-self.alignment(cvec, self.bone_joint_rest_coord(child), coord)),
            None => 1.0,
        };
        Some(score * child_score)
    }

    /// Picks one to three bones that should influence `coord`.
    ///
    /// The nearest bone wins, with distances biased toward bones the
    /// coordinate lies ahead of. Its best child joins when the coordinate is
    /// close to the bone segment; its parent joins when the coordinate lies
    /// well behind the bone. Higher `sensitivity` admits more bones.
    pub fn auto_set_influences(&mut self, coord: Vec3, sensitivity: f32, selected_only: bool) -> Vec<usize> {
        self.validate_skeleton();
        let sensitivity = sensitivity.clamp(0.0, 1.0);
        let eligible = |model: &Self, j: usize| !selected_only || model.joints[j].selected;

        let mut best: Option<(usize, f32, f32)> = None;
        for bone in 0..self.joints.len() {
            if !eligible(self, bone) {
                continue;
            }
            let origin = self.bone_joint_rest_coord(bone);
            let dot = self
                .bone_vector(bone, coord)
                .map_or(0.0, |(bvec, _)| self.alignment(bvec, origin, coord));
            let dist = coord.distance(origin);
            let metric = if dot >= 0.0 { dist * AHEAD_BIAS } else { dist * BEHIND_BIAS };
            if best.is_none_or(|(_, m, _)| metric < m) {
                best = Some((bone, metric, dot));
            }
        }

        let Some((bone, metric, dot)) = best else {
            return Vec::new();
        };
        let mut bones = vec![bone];

        if let Some(child) = self.best_child(bone, coord)
            && eligible(self, child)
        {
            let line = segment_distance(
                coord,
                self.bone_joint_rest_coord(bone),
                self.bone_joint_rest_coord(child),
            );
            if line * (1.0 - sensitivity) < metric * 0.5 {
                bones.push(child);
            }
        }

        if let Some(parent) = self.joints[bone].parent
            && eligible(self, parent)
            && (1.0 - dot) * 0.5 * (0.5 + sensitivity) > 0.5
        {
            bones.push(parent);
        }

        log::trace!("Auto influences for {coord}: {bones:?}");
        bones
    }

    /// Replaces the `Auto` influences of a vertex or point with freshly
    /// estimated ones. Bones already carrying a `Custom` entry are kept.
    pub fn auto_assign_position_influences(
        &mut self,
        pos: Position,
        sensitivity: f32,
        selected_only: bool,
    ) -> Result<Vec<usize>> {
        let coord = match pos.kind {
            PositionKind::Vertex => self.vertices.get(pos.index).map(|v| v.coord),
            PositionKind::Point => self.points.get(pos.index).map(|p| p.translation),
            kind => return Err(ModelError::WrongPositionKind(kind)),
        }
        .ok_or(ModelError::invalid(pos.kind, pos.index))?;

        let bones = self.auto_set_influences(coord, sensitivity, selected_only);

        let stale: Vec<usize> = self
            .get_position_influences(pos)
            .unwrap_or_default()
            .iter()
            .filter(|i| i.kind == InfluenceType::Auto)
            .map(|i| i.bone)
            .collect();
        for bone in stale {
            self.remove_position_influence(pos, bone)?;
        }

        for &bone in &bones {
            let custom = self
                .get_position_influences(pos)
                .unwrap_or_default()
                .iter()
                .any(|i| i.bone == bone && i.kind == InfluenceType::Custom);
            if custom {
                continue;
            }
            let weight = self.calculate_weight(coord, bone).unwrap_or(0.0);
            self.set_position_influence(pos, bone, InfluenceType::Auto, weight.clamp(0.0, 1.0))?;
        }
        Ok(bones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm() -> Model {
        let mut model = Model::new();
        let shoulder = model.add_bone_joint("shoulder", Vec3::ZERO, None).unwrap();
        let elbow = model.add_bone_joint("elbow", Vec3::X * 2.0, Some(shoulder)).unwrap();
        model.add_bone_joint("wrist", Vec3::X * 4.0, Some(elbow)).unwrap();
        model
    }

    #[test]
    fn segment_distance_clamps_to_ends() {
        let d = segment_distance(Vec3::new(-1.0, 0.0, 0.0), Vec3::ZERO, Vec3::X);
        assert!((d - 1.0).abs() < 1e-6);
        let d = segment_distance(Vec3::new(0.5, 2.0, 0.0), Vec3::ZERO, Vec3::X);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn coordinate_along_bone_scores_high() {
        let mut model = arm();
        let along = model.calculate_weight(Vec3::new(1.0, 0.1, 0.0), 0).unwrap();
        let behind = model.calculate_weight(Vec3::new(-1.0, 0.0, 0.0), 0).unwrap();
        assert!(along > 0.9, "along = {along}");
        assert!(behind < 0.1, "behind = {behind}");
    }

    #[test]
    fn lone_joint_contributes_nothing() {
        let mut model = Model::new();
        model.add_bone_joint("solo", Vec3::ZERO, None).unwrap();
        assert_eq!(model.calculate_weight(Vec3::X, 0), Some(0.0));
        assert_eq!(model.calculate_weight(Vec3::X, 3), None);
    }

    #[test]
    fn nearest_bone_wins() {
        let mut model = arm();
        let bones = model.auto_set_influences(Vec3::new(2.6, 0.2, 0.0), 0.0, false);
        assert_eq!(bones.first(), Some(&1));
    }
}
