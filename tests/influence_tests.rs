//! Influence table tests
//!
//! Tests for:
//! - Remainder weights tracking `1 - Σ(authored weights)`
//! - Handle, weight and position-kind validation
//! - Influence renumbering when joints are deleted
//! - Automatic influence assignment

use glam::Vec3;
use misfit::{InfluenceType, Model, ModelError, Position, PositionKind, Validity};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn weight_of(model: &Model, pos: Position, bone: usize) -> Option<f32> {
    model
        .get_position_influences(pos)?
        .iter()
        .find(|i| i.bone == bone)
        .map(|i| i.weight)
}

/// shoulder (origin) -> elbow (2,0,0) -> wrist (4,0,0)
fn arm() -> Model {
    let mut model = Model::new();
    let shoulder = model.add_bone_joint("shoulder", Vec3::ZERO, None).unwrap();
    let elbow = model.add_bone_joint("elbow", Vec3::X * 2.0, Some(shoulder)).unwrap();
    model.add_bone_joint("wrist", Vec3::X * 4.0, Some(elbow)).unwrap();
    model
}

// ============================================================================
// Remainder weights
// ============================================================================

#[test]
fn remainder_follows_sibling_weight() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::new(1.0, 0.0, 0.0)));

    model.set_position_influence(v, 0, InfluenceType::Custom, 0.6).unwrap();
    model.set_position_influence(v, 1, InfluenceType::Remainder, 0.0).unwrap();
    assert!(approx(weight_of(&model, v, 1).unwrap(), 0.4));

    // Only X is touched; Y follows
    model.set_position_influence(v, 0, InfluenceType::Custom, 0.9).unwrap();
    assert!(approx(weight_of(&model, v, 1).unwrap(), 0.1));
    assert!(approx(model.total_influence_weight(v).unwrap(), 1.0));
}

#[test]
fn remainders_share_residual_evenly() {
    let mut model = arm();
    let p = Position::point(model.add_point("socket", Vec3::ZERO, Vec3::ZERO));

    model.set_position_influence(p, 0, InfluenceType::Auto, 0.2).unwrap();
    model.set_position_influence(p, 1, InfluenceType::Remainder, 0.0).unwrap();
    model.set_position_influence(p, 2, InfluenceType::Remainder, 0.0).unwrap();

    assert!(approx(weight_of(&model, p, 1).unwrap(), 0.4));
    assert!(approx(weight_of(&model, p, 2).unwrap(), 0.4));
    assert!(approx(model.calculate_remainder_weight(p).unwrap(), 0.4));

    model.remove_position_influence(p, 2).unwrap();
    assert!(approx(weight_of(&model, p, 1).unwrap(), 0.8));
    assert!(approx(model.total_influence_weight(p).unwrap(), 1.0));
}

#[test]
fn remainder_list_totals_one_after_every_edit() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::ZERO));
    model.set_position_influence(v, 0, InfluenceType::Custom, 0.8).unwrap();
    let edits = [
        (1, InfluenceType::Remainder, 0.0),
        (2, InfluenceType::Auto, 0.7),
        (2, InfluenceType::Custom, 0.1),
        (0, InfluenceType::Custom, 0.95),
    ];
    for (bone, kind, weight) in edits {
        model.set_position_influence(v, bone, kind, weight).unwrap();
        let total = model.total_influence_weight(v).unwrap();
        assert!(approx(total, 1.0), "total {total} after setting bone {bone}");
    }
}

#[test]
fn overweight_authored_entries_are_rescaled() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::ZERO));
    model.set_position_influence(v, 0, InfluenceType::Custom, 0.8).unwrap();
    model.set_position_influence(v, 1, InfluenceType::Remainder, 0.0).unwrap();
    model.set_position_influence(v, 2, InfluenceType::Auto, 0.7).unwrap();

    // 0.8 + 0.7 scaled down to 1; nothing left for the remainder
    assert!(approx(weight_of(&model, v, 0).unwrap(), 0.8 / 1.5));
    assert!(approx(weight_of(&model, v, 2).unwrap(), 0.7 / 1.5));
    assert_eq!(weight_of(&model, v, 1), Some(0.0));
    assert!(approx(model.total_influence_weight(v).unwrap(), 1.0));
}

#[test]
fn adding_remainder_to_overweight_list_rescales() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::ZERO));
    model.set_position_influence(v, 0, InfluenceType::Custom, 0.7).unwrap();
    model.set_position_influence(v, 1, InfluenceType::Custom, 0.6).unwrap();
    // No remainder yet: authored weights are kept as-is
    assert!(approx(model.total_influence_weight(v).unwrap(), 1.3));

    model.set_position_influence(v, 2, InfluenceType::Remainder, 0.0).unwrap();
    assert_eq!(weight_of(&model, v, 2), Some(0.0));
    assert!(approx(model.total_influence_weight(v).unwrap(), 1.0));
}

#[test]
fn upsert_keeps_one_entry_per_bone() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::ZERO));
    model.set_position_influence(v, 1, InfluenceType::Custom, 0.3).unwrap();
    model.set_position_influence(v, 1, InfluenceType::Auto, 0.5).unwrap();

    let list = model.get_position_influences(v).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind, InfluenceType::Auto);
    assert!(approx(list[0].weight, 0.5));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn influence_edits_are_validated() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::ZERO));

    assert_eq!(
        model.set_position_influence(v, 7, InfluenceType::Custom, 0.5),
        Err(ModelError::invalid(PositionKind::Joint, 7))
    );
    assert_eq!(
        model.set_position_influence(v, 0, InfluenceType::Custom, 1.5),
        Err(ModelError::InvalidWeight(1.5))
    );
    assert_eq!(
        model.set_position_influence(Position::joint(0), 1, InfluenceType::Custom, 0.5),
        Err(ModelError::WrongPositionKind(PositionKind::Joint))
    );
    assert_eq!(
        model.set_position_influence(Position::vertex(4), 0, InfluenceType::Custom, 0.5),
        Err(ModelError::invalid(PositionKind::Vertex, 4))
    );
    assert!(model.get_position_influences(v).unwrap().is_empty());
}

#[test]
fn influence_edit_invalidates_resample() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::ZERO));
    model.validate_animation();
    assert!(model.is_valid(Validity::ANIMATION));

    model.set_position_influence(v, 0, InfluenceType::Custom, 1.0).unwrap();
    assert!(!model.is_valid(Validity::ANIMATION));
    assert!(model.is_valid(Validity::ANIMATED_SKELETON));
}

#[test]
fn remove_all_clears_list() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::ZERO));
    model.set_position_influence(v, 0, InfluenceType::Custom, 0.5).unwrap();
    model.set_position_influence(v, 1, InfluenceType::Remainder, 0.0).unwrap();

    model.remove_all_position_influences(v).unwrap();
    assert!(model.get_position_influences(v).unwrap().is_empty());
    assert_eq!(model.remove_position_influence(v, 0), Ok(false));
}

#[test]
fn deleting_joint_renumbers_influences() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::new(3.0, 0.0, 0.0)));
    model.set_position_influence(v, 1, InfluenceType::Custom, 0.5).unwrap();
    model.set_position_influence(v, 2, InfluenceType::Remainder, 0.0).unwrap();

    // Deleting the elbow drops its entry; the wrist moves from id 2 to id 1
    model.delete_bone_joint(1).unwrap();
    let list = model.get_position_influences(v).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].bone, 1);
    assert_eq!(list[0].kind, InfluenceType::Remainder);
    assert!(approx(list[0].weight, 1.0));
}

// ============================================================================
// Automatic assignment
// ============================================================================

#[test]
fn weight_is_high_along_bone_and_low_behind() {
    let mut model = arm();
    let along = model.calculate_weight(Vec3::new(3.0, 0.2, 0.0), 1).unwrap();
    let behind = model.calculate_weight(Vec3::new(3.0, 0.2, 0.0), 2).unwrap();
    assert!(along > 0.9, "along = {along}");
    assert!(behind < 0.05, "behind = {behind}");
    for w in [along, behind] {
        assert!((0.0..=1.0).contains(&w));
    }
}

#[test]
fn auto_assignment_picks_nearest_bone_and_child() {
    let mut model = arm();
    let bones = model.auto_set_influences(Vec3::new(3.0, 0.2, 0.0), 0.5, false);
    assert_eq!(bones, vec![1, 2]);
}

#[test]
fn auto_assignment_respects_selection() {
    let mut model = arm();
    model.select_bone_joint(0).unwrap();
    let bones = model.auto_set_influences(Vec3::new(3.0, 0.2, 0.0), 0.5, true);
    assert_eq!(bones, vec![0]);

    model.unselect_all_bone_joints();
    assert!(model.auto_set_influences(Vec3::ZERO, 0.5, true).is_empty());
}

#[test]
fn auto_assignment_replaces_auto_and_keeps_custom() {
    let mut model = arm();
    let v = Position::vertex(model.add_vertex(Vec3::new(3.0, 0.2, 0.0)));
    model.set_position_influence(v, 0, InfluenceType::Auto, 0.3).unwrap();
    model.set_position_influence(v, 2, InfluenceType::Custom, 0.5).unwrap();

    let bones = model.auto_assign_position_influences(v, 0.5, false).unwrap();
    assert_eq!(bones, vec![1, 2]);

    assert_eq!(weight_of(&model, v, 0), None);
    assert!(approx(weight_of(&model, v, 2).unwrap(), 0.5));
    let list = model.get_position_influences(v).unwrap();
    let elbow = list.iter().find(|i| i.bone == 1).unwrap();
    assert_eq!(elbow.kind, InfluenceType::Auto);
    assert!(elbow.weight > 0.9);
}

#[test]
fn auto_assignment_rejects_joints() {
    let mut model = arm();
    assert_eq!(
        model.auto_assign_position_influences(Position::joint(0), 0.5, false),
        Err(ModelError::WrongPositionKind(PositionKind::Joint))
    );
}
