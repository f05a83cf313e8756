//! Skeleton and transform cache tests
//!
//! Tests for:
//! - absolute = absolute[parent] * relative after edits and re-parents
//! - Idempotent validation and dirty propagation
//! - Out-of-order hierarchy construction (loader path)
//! - World-preserving re-parent and joint deletion
//! - Rest-pose joint moves and rotations

use glam::{Affine3A, Vec3};
use misfit::{Model, ModelError, Position, Validity};
use std::f32::consts::FRAC_PI_2;

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn affine_approx(a: Affine3A, b: Affine3A) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn assert_hierarchy_invariant(model: &mut Model) {
    for j in 0..model.bone_joint_count() {
        let parent_abs = model
            .get_bone_joint_parent(j)
            .and_then(|p| model.get_bone_joint_absolute_matrix(p))
            .unwrap_or(Affine3A::IDENTITY);
        let relative = model.get_bone_joint_relative_matrix(j).unwrap();
        let absolute = model.get_bone_joint_absolute_matrix(j).unwrap();
        assert!(
            affine_approx(absolute, parent_abs * relative),
            "joint {j}: {absolute:?} != {:?}",
            parent_abs * relative
        );
    }
}

/// A (root, origin) -> B (0,1,0) -> C (0,2,0)
fn chain() -> Model {
    let mut model = Model::new();
    let a = model.add_bone_joint("A", Vec3::ZERO, None).unwrap();
    let b = model.add_bone_joint("B", Vec3::Y, Some(a)).unwrap();
    model.add_bone_joint("C", Vec3::Y * 2.0, Some(b)).unwrap();
    model
}

fn abs_coord(model: &mut Model, joint: usize) -> Vec3 {
    model.get_bone_joint_absolute_matrix(joint).unwrap().translation.into()
}

// ============================================================================
// Transform cache
// ============================================================================

#[test]
fn added_joints_land_at_world_coordinates() {
    let mut model = chain();
    assert!(vec3_approx(abs_coord(&mut model, 0), Vec3::ZERO));
    assert!(vec3_approx(abs_coord(&mut model, 1), Vec3::Y));
    assert!(vec3_approx(abs_coord(&mut model, 2), Vec3::Y * 2.0));

    let rel = model.get_bone_joint_relative_matrix(2).unwrap();
    assert!(vec3_approx(rel.translation.into(), Vec3::Y));
}

#[test]
fn validation_is_idempotent() {
    let mut model = chain();
    model.validate_skeleton();
    let before: Vec<Affine3A> = (0..3)
        .map(|j| model.get_bone_joint_absolute_matrix(j).unwrap())
        .collect();

    model.validate_skeleton();
    assert!(model.is_valid(Validity::SKELETON));
    let after: Vec<Affine3A> = (0..3)
        .map(|j| model.get_bone_joint_absolute_matrix(j).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn editing_a_joint_clears_only_dependent_flags() {
    let mut model = chain();
    model.validate_normals();
    assert!(model.is_valid(Validity::NORMALS));
    assert!(model.is_valid(Validity::ANIMATION));

    model.set_bone_joint_offset(1, Vec3::X, Vec3::ZERO).unwrap();
    assert!(!model.is_valid(Validity::SKELETON));
    assert!(!model.is_valid(Validity::ANIMATED_SKELETON));
    assert!(!model.is_valid(Validity::ANIMATION));
    assert!(model.is_valid(Validity::NORMALS));
}

#[test]
fn offset_edit_propagates_to_descendants() {
    let mut model = chain();
    model.set_bone_joint_offset(1, Vec3::new(1.0, 1.0, 0.0), Vec3::ZERO).unwrap();

    assert!(vec3_approx(abs_coord(&mut model, 1), Vec3::new(1.0, 1.0, 0.0)));
    assert!(vec3_approx(abs_coord(&mut model, 2), Vec3::new(1.0, 2.0, 0.0)));
    assert_hierarchy_invariant(&mut model);
}

#[test]
fn parent_rotation_carries_children() {
    let mut model = Model::new();
    let root = model.add_bone_joint("root", Vec3::ZERO, None).unwrap();
    let tip = model.add_bone_joint("tip", Vec3::X, Some(root)).unwrap();

    model
        .set_position_rotation(Position::joint(root), Vec3::new(0.0, 0.0, FRAC_PI_2))
        .unwrap();
    assert!(vec3_approx(abs_coord(&mut model, tip), Vec3::Y));
    assert_hierarchy_invariant(&mut model);
}

// ============================================================================
// Hierarchy edits
// ============================================================================

#[test]
fn moving_joint_in_rest_pose_sets_relative() {
    // A (root) at origin, B child of A at (0,1,0); move B to (0,2,0)
    let mut model = Model::new();
    let a = model.add_bone_joint("A", Vec3::ZERO, None).unwrap();
    let b = model.add_bone_joint("B", Vec3::Y, Some(a)).unwrap();

    model.move_position(Position::joint(b), Vec3::new(0.0, 2.0, 0.0)).unwrap();
    model.validate_skeleton();

    let rel = model.get_bone_joint_relative_matrix(b).unwrap();
    assert!(vec3_approx(rel.translation.into(), Vec3::new(0.0, 2.0, 0.0)));
    assert!(vec3_approx(abs_coord(&mut model, b), Vec3::new(0.0, 2.0, 0.0)));
}

#[test]
fn moving_joint_keeps_children_in_place() {
    let mut model = chain();
    model.move_position(Position::joint(1), Vec3::new(3.0, 1.0, 0.0)).unwrap();

    assert!(vec3_approx(abs_coord(&mut model, 1), Vec3::new(3.0, 1.0, 0.0)));
    assert!(vec3_approx(abs_coord(&mut model, 2), Vec3::Y * 2.0));
    assert_hierarchy_invariant(&mut model);
}

#[test]
fn reparent_preserves_world_position() {
    let mut model = Model::new();
    let a = model.add_bone_joint("A", Vec3::new(1.0, 0.0, 0.0), None).unwrap();
    let b = model.add_bone_joint("B", Vec3::new(0.0, 5.0, 0.0), None).unwrap();
    let c = model.add_bone_joint("C", Vec3::new(2.0, 2.0, 2.0), Some(a)).unwrap();

    model.set_bone_joint_parent(c, Some(b)).unwrap();
    assert_eq!(model.get_bone_joint_parent(c), Some(b));
    assert!(vec3_approx(abs_coord(&mut model, c), Vec3::new(2.0, 2.0, 2.0)));

    let rel = model.get_bone_joint_relative_matrix(c).unwrap();
    assert!(vec3_approx(rel.translation.into(), Vec3::new(2.0, -3.0, 2.0)));
    assert_hierarchy_invariant(&mut model);
}

#[test]
fn reparent_under_rotated_parent_preserves_world_position() {
    let mut model = Model::new();
    let pivot = model.add_bone_joint("pivot", Vec3::ZERO, None).unwrap();
    model
        .set_position_rotation(Position::joint(pivot), Vec3::new(0.0, 0.0, FRAC_PI_2))
        .unwrap();
    let loose = model.add_bone_joint("loose", Vec3::new(0.0, 3.0, 0.0), None).unwrap();

    model.set_bone_joint_parent(loose, Some(pivot)).unwrap();
    assert!(vec3_approx(abs_coord(&mut model, loose), Vec3::new(0.0, 3.0, 0.0)));
    assert_hierarchy_invariant(&mut model);
}

#[test]
fn out_of_order_construction_resolves_after_validation() {
    // Loader order: the child is stored before its parent
    let mut model = Model::new();
    let hand = model.add_bone_joint("hand", Vec3::ZERO, None).unwrap();
    let arm = model.add_bone_joint("arm", Vec3::ZERO, None).unwrap();
    model.set_bone_joint_parent(hand, Some(arm)).unwrap();
    model.set_bone_joint_offset(arm, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO).unwrap();
    model.set_bone_joint_offset(hand, Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO).unwrap();

    model.validate_skeleton();
    assert_eq!(model.traversal_order(), &[arm, hand]);
    assert!(vec3_approx(abs_coord(&mut model, hand), Vec3::new(1.0, 2.0, 0.0)));
    assert_hierarchy_invariant(&mut model);
}

#[test]
fn reparent_rejects_cycles_and_missing_parents() {
    let mut model = chain();
    assert_eq!(
        model.set_bone_joint_parent(0, Some(2)),
        Err(ModelError::CyclicParent { joint: 0, parent: 2 })
    );
    assert_eq!(
        model.set_bone_joint_parent(1, Some(1)),
        Err(ModelError::CyclicParent { joint: 1, parent: 1 })
    );
    assert!(matches!(
        model.set_bone_joint_parent(1, Some(9)),
        Err(ModelError::InvalidHandle { index: 9, .. })
    ));
    // Rejected edits leave the hierarchy untouched
    assert_eq!(model.get_bone_joint_parent(1), Some(0));
    assert_eq!(model.traversal_order(), &[0, 1, 2]);
}

#[test]
fn many_reparents_keep_invariant() {
    let mut model = Model::new();
    for i in 0..6 {
        model
            .add_bone_joint(&format!("j{i}"), Vec3::new(i as f32, (i * i) as f32 * 0.1, 0.0), None)
            .unwrap();
    }
    let edits = [(0, Some(3)), (1, Some(0)), (5, Some(1)), (3, Some(4)), (1, None), (2, Some(5))];
    for (joint, parent) in edits {
        model.set_bone_joint_parent(joint, parent).unwrap();
        assert_hierarchy_invariant(&mut model);
    }

    // Parents always precede children in traversal order
    let order = model.traversal_order().to_vec();
    for (pos, &j) in order.iter().enumerate() {
        if let Some(p) = model.get_bone_joint_parent(j) {
            assert!(order[..pos].contains(&p), "parent {p} after child {j}");
        }
    }
}

// ============================================================================
// Joint deletion
// ============================================================================

#[test]
fn deleting_root_with_children_is_rejected() {
    let mut model = chain();
    assert_eq!(model.delete_bone_joint(0), Err(ModelError::RootHasChildren(0)));
    assert_eq!(model.bone_joint_count(), 3);
}

#[test]
fn deleting_joint_reparents_children_to_grandparent() {
    let mut model = chain();
    model.move_position(Position::joint(2), Vec3::new(1.0, 2.0, 0.0)).unwrap();

    model.delete_bone_joint(1).unwrap();
    assert_eq!(model.bone_joint_count(), 2);
    // C shifted down to index 1 and now hangs off A
    assert_eq!(model.get_bone_joint(1).map(|j| j.name.as_str()), Some("C"));
    assert_eq!(model.get_bone_joint_parent(1), Some(0));
    assert!(vec3_approx(abs_coord(&mut model, 1), Vec3::new(1.0, 2.0, 0.0)));
    assert_hierarchy_invariant(&mut model);
}

#[test]
fn recycled_joint_starts_clean() {
    let mut model = chain();
    model.select_bone_joint(2).unwrap();
    model.delete_bone_joint(2).unwrap();

    let j = model.add_bone_joint("fresh", Vec3::X, None).unwrap();
    let joint = model.get_bone_joint(j).unwrap();
    assert_eq!(joint.name, "fresh");
    assert!(!joint.is_selected());
    assert_eq!(joint.parent(), None);
    assert!(vec3_approx(abs_coord(&mut model, j), Vec3::X));
}
