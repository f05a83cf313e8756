//! Skeleton hierarchy and transform cache.
//!
//! Joints live in insertion order; `joint_order` is a separate
//! parent-before-child index list rebuilt on every structural change, so a
//! joint may be parented under one stored after it.
//!
//! Two passes propagate matrices along `joint_order`:
//! - [`Model::validate_skeleton`]: `absolute = absolute[parent] * relative`
//! - [`Model::validate_animated_skeleton`]: `final = final[parent] * animated local`,
//!   then `skin = final * absolute⁻¹`

use glam::{Affine3A, Vec3};
use rustc_hash::FxHashSet;

use misfit_animation::{AnimationType, Channel};
use misfit_core::{ModelError, Position, Result, Validity};

use crate::joint::{inverse_or_identity, local_matrix};
use crate::model::Model;
use crate::undo::ModelUndo;

impl Model {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Adds a joint at a rest-pose world coordinate.
    ///
    /// The relative matrix is computed against the parent's current absolute
    /// matrix, so the joint lands exactly at `coord`.
    pub fn add_bone_joint(&mut self, name: &str, coord: Vec3, parent: Option<usize>) -> Result<usize> {
        if let Some(p) = parent {
            self.check_position(Position::joint(p))?;
        }
        self.validate_skeleton();

        let parent_abs = parent.map_or(Affine3A::IDENTITY, |p| self.joints[p].absolute);
        let mut joint = self.acquire_joint();
        joint.name.push_str(name);
        joint.parent = parent;
        joint.apply_relative(inverse_or_identity(&parent_abs) * Affine3A::from_translation(coord));

        let index = self.joints.len();
        self.joints.push(joint);
        self.joint_order.push(index);

        log::debug!("Added joint {index} '{name}' under {parent:?}");
        self.record(ModelUndo::AddJoint { index, parent });
        self.invalidate(Validity::SKELETON);
        Ok(index)
    }

    /// Sets a joint's local translation and rotation directly.
    ///
    /// This is the loader path: file formats store parent-relative offsets,
    /// and children keep their own offsets (they move with the joint).
    pub fn set_bone_joint_offset(&mut self, joint: usize, translation: Vec3, rotation: Vec3) -> Result<()> {
        self.check_position(Position::joint(joint))?;
        let j = &mut self.joints[joint];
        let old_translation = j.local_translation;
        let old_rotation = j.local_rotation;
        j.local_translation = translation;
        j.local_rotation = rotation;
        j.update_relative();

        self.record(ModelUndo::SetJointOffset {
            joint,
            old_translation,
            old_rotation,
            new_translation: translation,
            new_rotation: rotation,
        });
        self.invalidate(Validity::SKELETON);
        Ok(())
    }

    pub fn set_bone_joint_name(&mut self, joint: usize, name: &str) -> Result<()> {
        self.check_position(Position::joint(joint))?;
        let old = std::mem::replace(&mut self.joints[joint].name, name.to_string());
        self.record(ModelUndo::RenameJoint {
            joint,
            old,
            new: name.to_string(),
        });
        Ok(())
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    #[must_use]
    pub fn get_bone_joint_parent(&self, joint: usize) -> Option<usize> {
        self.joints.get(joint)?.parent
    }

    /// Direct children of `joint`, in storage order.
    #[must_use]
    pub fn get_bone_joint_children(&self, joint: usize) -> Vec<usize> {
        self.joints
            .iter()
            .enumerate()
            .filter(|(_, j)| j.parent == Some(joint))
            .map(|(i, _)| i)
            .collect()
    }

    /// Parent-before-child traversal order.
    #[inline]
    #[must_use]
    pub fn traversal_order(&self) -> &[usize] {
        &self.joint_order
    }

    /// `joint` and every joint below it.
    #[must_use]
    pub fn bone_joint_subtree(&self, joint: usize) -> FxHashSet<usize> {
        let mut subtree = FxHashSet::default();
        if joint >= self.joints.len() {
            return subtree;
        }
        subtree.insert(joint);
        // joint_order lists parents first, so one pass collects the subtree
        for &j in &self.joint_order {
            if let Some(p) = self.joints[j].parent
                && subtree.contains(&p)
            {
                subtree.insert(j);
            }
        }
        subtree
    }

    /// Re-parents a joint, preserving its world transform.
    ///
    /// The new relative matrix is derived from the existing absolute
    /// matrices: `relative = absolute[new_parent]⁻¹ * absolute[joint]`.
    pub fn set_bone_joint_parent(&mut self, joint: usize, parent: Option<usize>) -> Result<()> {
        self.check_position(Position::joint(joint))?;
        if let Some(p) = parent {
            self.check_position(Position::joint(p))?;
            if self.bone_joint_subtree(joint).contains(&p) {
                log::warn!("Refusing to parent joint {joint} under its descendant {p}");
                return Err(ModelError::CyclicParent { joint, parent: p });
            }
        }
        let old = self.joints[joint].parent;
        if old == parent {
            return Ok(());
        }

        self.validate_skeleton();
        let parent_abs = parent.map_or(Affine3A::IDENTITY, |p| self.joints[p].absolute);
        let j = &mut self.joints[joint];
        let relative = inverse_or_identity(&parent_abs) * j.absolute;
        j.parent = parent;
        j.apply_relative(relative);
        self.rebuild_joint_order();

        log::debug!("Joint {joint} re-parented from {old:?} to {parent:?}");
        self.record(ModelUndo::SetJointParent {
            joint,
            old,
            new: parent,
        });
        self.invalidate(Validity::SKELETON);
        Ok(())
    }

    /// Rebuilds `joint_order` by depth-first traversal from the roots.
    pub(crate) fn rebuild_joint_order(&mut self) {
        let count = self.joints.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut roots = Vec::new();
        for (i, joint) in self.joints.iter().enumerate() {
            match joint.parent {
                Some(p) if p < count => children[p].push(i),
                _ => roots.push(i),
            }
        }

        self.joint_order.clear();
        let mut stack: Vec<usize> = roots.into_iter().rev().collect();
        while let Some(j) = stack.pop() {
            self.joint_order.push(j);
            stack.extend(children[j].iter().rev());
        }

        if self.joint_order.len() != count {
            // Unreachable joints only arise from a corrupted hierarchy
            log::error!(
                "Joint hierarchy is inconsistent: {} of {count} joints reachable",
                self.joint_order.len()
            );
            let reached: FxHashSet<usize> = self.joint_order.iter().copied().collect();
            self.joint_order.extend((0..count).filter(|j| !reached.contains(j)));
        }
    }

    /// Deletes a joint.
    ///
    /// Children are re-parented to the deleted joint's parent, keeping their
    /// world transforms. A root joint with children cannot be deleted.
    /// Influences on the joint are dropped and every reference to a later
    /// joint (parents, influences, keyframes) shifts down by one.
    pub fn delete_bone_joint(&mut self, joint: usize) -> Result<()> {
        self.check_position(Position::joint(joint))?;
        let parent = self.joints[joint].parent;
        let children = self.get_bone_joint_children(joint);
        if parent.is_none() && !children.is_empty() {
            log::warn!("Joint {joint} is a root with {} children", children.len());
            return Err(ModelError::RootHasChildren(joint));
        }

        self.validate_skeleton();
        let inv_parent = inverse_or_identity(&parent.map_or(Affine3A::IDENTITY, |p| self.joints[p].absolute));
        for &c in &children {
            let child = &mut self.joints[c];
            let relative = inv_parent * child.absolute;
            child.parent = parent;
            child.apply_relative(relative);
            self.record(ModelUndo::SetJointParent {
                joint: c,
                old: Some(joint),
                new: parent,
            });
        }

        self.strip_bone_influences(joint);
        for anim in &mut self.animations {
            anim.remove_target(Position::joint(joint));
        }

        let removed = self.joints.remove(joint);
        for j in &mut self.joints {
            if let Some(p) = j.parent.as_mut()
                && *p > joint
            {
                *p -= 1;
            }
            j.dirty = true;
        }
        self.rebuild_joint_order();

        log::debug!("Deleted joint {joint} '{}'", removed.name);
        self.record(ModelUndo::DeleteJoint {
            index: joint,
            name: removed.name.clone(),
            parent,
        });
        self.release_joint(removed);
        self.invalidate(Validity::SKELETON | Validity::ANIMATION);
        Ok(())
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select_bone_joint(&mut self, joint: usize) -> Result<()> {
        self.set_bone_joint_selected(joint, true)
    }

    pub fn unselect_bone_joint(&mut self, joint: usize) -> Result<()> {
        self.set_bone_joint_selected(joint, false)
    }

    fn set_bone_joint_selected(&mut self, joint: usize, selected: bool) -> Result<()> {
        self.check_position(Position::joint(joint))?;
        if self.joints[joint].selected != selected {
            self.joints[joint].selected = selected;
            self.record(ModelUndo::SelectJoint { joint, selected });
        }
        Ok(())
    }

    pub fn unselect_all_bone_joints(&mut self) {
        let selected: Vec<usize> = (0..self.joints.len())
            .filter(|&j| self.joints[j].selected)
            .collect();
        for joint in selected {
            self.joints[joint].selected = false;
            self.record(ModelUndo::SelectJoint { joint, selected: false });
        }
    }

    #[must_use]
    pub fn is_bone_joint_selected(&self, joint: usize) -> bool {
        self.joints.get(joint).is_some_and(|j| j.selected)
    }

    // ========================================================================
    // Transform cache
    // ========================================================================

    /// Recomputes rest-pose absolute matrices. No-op while valid.
    ///
    /// Only dirty joints and the subtrees below them are recomputed.
    pub fn validate_skeleton(&mut self) {
        if self.validity.is_valid(Validity::SKELETON) {
            return;
        }

        let Model {
            joints, joint_order, ..
        } = self;
        let mut recomputed = vec![false; joints.len()];
        let mut count = 0_usize;

        for &j in joint_order.iter() {
            let parent = joints[j].parent;
            let parent_changed = parent.is_some_and(|p| recomputed[p]);
            if !joints[j].dirty && !parent_changed {
                continue;
            }

            let parent_abs = parent.map_or(Affine3A::IDENTITY, |p| joints[p].absolute);
            let joint = &mut joints[j];
            joint.absolute = parent_abs * joint.relative;
            joint.dirty = false;
            recomputed[j] = true;
            count += 1;
        }

        log::debug!("Skeleton validated: {count} joints recomputed");
        self.validity.mark_valid(Validity::SKELETON);
    }

    /// Recomputes posed final and skin matrices for the current frame.
    ///
    /// Each channel of a joint's local transform is sampled from the active
    /// animation, falling back to the rest-pose component when no keyframe
    /// applies.
    pub fn validate_animated_skeleton(&mut self) {
        if self.validity.is_valid(Validity::ANIMATED_SKELETON) {
            return;
        }
        self.validate_skeleton();

        let Model {
            joints,
            joint_order,
            animations,
            anim_state,
            ..
        } = self;
        let active = anim_state
            .active(animations)
            .filter(|(anim, _, _)| anim.kind.contains(AnimationType::JOINT));

        for &j in joint_order.iter() {
            let parent_final = joints[j]
                .parent
                .map_or(Affine3A::IDENTITY, |p| joints[p].final_matrix);
            let joint = &mut joints[j];

            let local = match active {
                Some((anim, frame, time)) => {
                    let target = Position::joint(j);
                    local_matrix(
                        anim.sample_at(target, Channel::Translate, frame, time, joint.local_translation),
                        anim.sample_at(target, Channel::Rotate, frame, time, joint.local_rotation),
                        anim.sample_at(target, Channel::Scale, frame, time, joint.local_scale),
                    )
                }
                None => joint.relative,
            };

            joint.final_matrix = parent_final * local;
            joint.skin = joint.final_matrix * inverse_or_identity(&joint.absolute);
        }

        log::trace!("Animated skeleton validated ({} joints)", joints.len());
        self.validity.mark_valid(Validity::ANIMATED_SKELETON);
    }

    // ========================================================================
    // Matrix read surface
    // ========================================================================

    #[must_use]
    pub fn get_bone_joint_relative_matrix(&self, joint: usize) -> Option<Affine3A> {
        self.joints.get(joint).map(|j| j.relative)
    }

    pub fn get_bone_joint_absolute_matrix(&mut self, joint: usize) -> Option<Affine3A> {
        self.validate_skeleton();
        self.joints.get(joint).map(|j| j.absolute)
    }

    pub fn get_bone_joint_final_matrix(&mut self, joint: usize) -> Option<Affine3A> {
        self.validate_animated_skeleton();
        self.joints.get(joint).map(|j| j.final_matrix)
    }

    /// `final * absolute⁻¹`: maps bind-pose coordinates into the posed frame.
    pub fn get_bone_joint_skin_matrix(&mut self, joint: usize) -> Option<Affine3A> {
        self.validate_animated_skeleton();
        self.joints.get(joint).map(|j| j.skin)
    }

    /// Rest-pose world coordinate of a joint.
    pub(crate) fn bone_joint_rest_coord(&self, joint: usize) -> Vec3 {
        self.joints[joint].absolute.translation.into()
    }
}
