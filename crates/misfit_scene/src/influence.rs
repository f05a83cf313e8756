//! Influence table and linear blend skinning.
//!
//! Every vertex and point owns a short list of `(bone, weight, type)`
//! entries, at most one per bone. `Remainder` entries are never authored:
//! they always share `1 - Σ(other weights)` evenly and are recomputed after
//! every change to the list.

use glam::{Affine3A, Vec3, Vec3A};
use smallvec::SmallVec;

use misfit_core::{ModelError, Position, PositionKind, Result, Validity};

use crate::joint::{Joint, inverse_or_identity};
use crate::model::Model;
use crate::undo::ModelUndo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfluenceType {
    /// Weight set explicitly by the user.
    Custom,
    /// Weight computed by the auto-weight estimator.
    Auto,
    /// Weight derived as the residual to a total of 1.
    Remainder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    pub bone: usize,
    pub weight: f32,
    pub kind: InfluenceType,
}

pub type InfluenceList = SmallVec<[Influence; 4]>;

/// Recomputes the `Remainder` entries of a list.
///
/// A list with remainder entries always totals 1: when the authored weights
/// already exceed 1 they are scaled down to sum to 1 and the remainders get
/// nothing. Returns whether authored weights were rescaled.
pub(crate) fn update_remainders(list: &mut InfluenceList) -> bool {
    let mut remainders = 0_usize;
    let mut authored = 0.0_f32;
    for infl in list.iter() {
        if infl.kind == InfluenceType::Remainder {
            remainders += 1;
        } else {
            authored += infl.weight;
        }
    }
    if remainders == 0 {
        return false;
    }

    let rescale = authored > 1.0;
    let share = (1.0 - authored).max(0.0) / remainders as f32;
    for infl in list.iter_mut() {
        if infl.kind == InfluenceType::Remainder {
            infl.weight = share;
        } else if rescale {
            infl.weight /= authored;
        }
    }
    rescale
}

/// Residual weight a single remainder entry would receive.
#[must_use]
pub fn remainder_weight(list: &[Influence]) -> f32 {
    let remainders = list
        .iter()
        .filter(|i| i.kind == InfluenceType::Remainder)
        .count()
        .max(1);
    let authored: f32 = list
        .iter()
        .filter(|i| i.kind != InfluenceType::Remainder)
        .map(|i| i.weight)
        .sum();
    (1.0 - authored).max(0.0) / remainders as f32
}

/// Weighted blend of the influencing bones' skin matrices.
///
/// Returns `None` when the total weight is below `epsilon`; the target is
/// then driven solely by its own transform.
#[must_use]
pub(crate) fn blend_skin(influences: &[Influence], joints: &[Joint], epsilon: f32) -> Option<Affine3A> {
    let mut total = 0.0_f32;
    let mut x = Vec3A::ZERO;
    let mut y = Vec3A::ZERO;
    let mut z = Vec3A::ZERO;
    let mut w = Vec3A::ZERO;

    for infl in influences {
        let Some(joint) = joints.get(infl.bone) else {
            continue;
        };
        let m = &joint.skin;
        x += m.matrix3.x_axis * infl.weight;
        y += m.matrix3.y_axis * infl.weight;
        z += m.matrix3.z_axis * infl.weight;
        w += m.translation * infl.weight;
        total += infl.weight;
    }

    if total < epsilon {
        return None;
    }
    let inv = 1.0 / total;
    Some(Affine3A::from_cols(x * inv, y * inv, z * inv, w * inv))
}

/// Linear blend skinning of one coordinate.
#[must_use]
pub(crate) fn skin_coord(coord: Vec3, influences: &[Influence], joints: &[Joint], epsilon: f32) -> Vec3 {
    match blend_skin(influences, joints, epsilon) {
        Some(m) => m.transform_point3(coord),
        None => coord,
    }
}

/// Bind-space coordinate that skins to `target`.
///
/// `base` is the current bind-space coordinate and `current` its skinned
/// position. With a single influence the skin matrix is inverted exactly.
/// With several, the world offset `target - current` is mapped through each
/// bone's inverse skin matrix and the results averaged: a rigid offset
/// applied equally in every influence frame. This is an approximation and
/// does not invert the blend exactly.
#[must_use]
pub(crate) fn unskin_coord(
    base: Vec3,
    current: Vec3,
    target: Vec3,
    influences: &[Influence],
    joints: &[Joint],
    epsilon: f32,
) -> Vec3 {
    let bones: SmallVec<[&Joint; 4]> = influences
        .iter()
        .filter(|i| i.weight > 0.0)
        .filter_map(|i| joints.get(i.bone))
        .collect();
    let total: f32 = influences
        .iter()
        .filter(|i| i.bone < joints.len())
        .map(|i| i.weight)
        .sum();

    match bones.as_slice() {
        _ if total < epsilon => target,
        [] => target,
        [bone] => inverse_or_identity(&bone.skin).transform_point3(target),
        _ => {
            let delta = target - current;
            let sum: Vec3 = bones
                .iter()
                .map(|j| inverse_or_identity(&j.skin).transform_vector3(delta))
                .sum();
            base + sum / bones.len() as f32
        }
    }
}

impl Model {
    pub(crate) fn influence_list(&self, pos: Position) -> Option<&InfluenceList> {
        match pos.kind {
            PositionKind::Vertex => self.vertices.get(pos.index).map(|v| &v.influences),
            PositionKind::Point => self.points.get(pos.index).map(|p| &p.influences),
            _ => None,
        }
    }

    pub(crate) fn influence_list_mut(&mut self, pos: Position) -> Result<&mut InfluenceList> {
        let list = match pos.kind {
            PositionKind::Vertex => self.vertices.get_mut(pos.index).map(|v| &mut v.influences),
            PositionKind::Point => self.points.get_mut(pos.index).map(|p| &mut p.influences),
            kind => return Err(ModelError::WrongPositionKind(kind)),
        };
        list.ok_or(ModelError::invalid(pos.kind, pos.index))
    }

    /// Influences of a vertex or point.
    #[must_use]
    pub fn get_position_influences(&self, pos: Position) -> Option<&[Influence]> {
        self.influence_list(pos).map(SmallVec::as_slice)
    }

    /// Inserts or updates the influence of `bone` on `pos`.
    ///
    /// For `Remainder` entries `weight` is ignored; the entry receives its
    /// share of the residual. Sibling remainder entries are recomputed.
    pub fn set_position_influence(
        &mut self,
        pos: Position,
        bone: usize,
        kind: InfluenceType,
        weight: f32,
    ) -> Result<()> {
        if bone >= self.joints.len() {
            return Err(ModelError::invalid(PositionKind::Joint, bone));
        }
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(ModelError::InvalidWeight(weight));
        }

        let list = self.influence_list_mut(pos)?;
        let before = list.clone();
        let old = list.iter().find(|i| i.bone == bone).copied();
        match list.iter_mut().find(|i| i.bone == bone) {
            Some(infl) => {
                infl.kind = kind;
                infl.weight = weight;
            }
            None => list.push(Influence { bone, weight, kind }),
        }
        let rescaled = update_remainders(list);
        let new = list.iter().find(|i| i.bone == bone).copied();

        if rescaled {
            log::debug!("Authored weights on {pos:?} exceed 1 with a remainder present; rescaled");
            self.record(ModelUndo::SetInfluences {
                pos,
                old: before.into_vec(),
            });
        } else {
            log::trace!("Influence of bone {bone} on {pos:?} set to {new:?}");
            self.record(ModelUndo::SetInfluence { pos, bone, old, new });
        }
        self.invalidate(Validity::ANIMATION);
        Ok(())
    }

    /// Removes the influence of `bone` on `pos`. Returns whether one existed.
    pub fn remove_position_influence(&mut self, pos: Position, bone: usize) -> Result<bool> {
        let list = self.influence_list_mut(pos)?;
        let Some(i) = list.iter().position(|infl| infl.bone == bone) else {
            return Ok(false);
        };
        let old = list.remove(i);
        update_remainders(list);

        self.record(ModelUndo::SetInfluence {
            pos,
            bone,
            old: Some(old),
            new: None,
        });
        self.invalidate(Validity::ANIMATION);
        Ok(true)
    }

    pub fn remove_all_position_influences(&mut self, pos: Position) -> Result<()> {
        let list = self.influence_list_mut(pos)?;
        if list.is_empty() {
            return Ok(());
        }
        let old = list.drain(..).collect();

        self.record(ModelUndo::SetInfluences { pos, old });
        self.invalidate(Validity::ANIMATION);
        Ok(())
    }

    /// Weight a remainder entry on `pos` receives (or would receive).
    #[must_use]
    pub fn calculate_remainder_weight(&self, pos: Position) -> Option<f32> {
        self.influence_list(pos).map(|list| remainder_weight(list))
    }

    /// Sum of all influence weights on `pos`.
    #[must_use]
    pub fn total_influence_weight(&self, pos: Position) -> Option<f32> {
        self.influence_list(pos)
            .map(|list| list.iter().map(|i| i.weight).sum())
    }

    /// Removes every influence referencing `bone` and renumbers the bone ids
    /// above it. Used when a joint is deleted.
    pub(crate) fn strip_bone_influences(&mut self, bone: usize) {
        let lists = self
            .vertices
            .iter_mut()
            .map(|v| &mut v.influences)
            .chain(self.points.iter_mut().map(|p| &mut p.influences));

        for list in lists {
            let before = list.len();
            list.retain(|infl| infl.bone != bone);
            for infl in list.iter_mut() {
                if infl.bone > bone {
                    infl.bone -= 1;
                }
            }
            if list.len() != before {
                update_remainders(list);
            }
        }
    }
}
