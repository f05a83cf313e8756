//! Pose resolution benchmarks.
//!
//! Measures the transform cache and the resampling pass on a chain
//! skeleton with a skinned vertex grid.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use misfit::glam::Vec3;
use misfit::{AnimationMode, AnimationType, Channel, InfluenceType, Interpolate, Model, Position, Validity};

const FRAMES: usize = 24;

/// A chain of `joints` bones along +Y, `joints * 64` vertices bound to the
/// two nearest bones, and a joint animation rotating every bone.
fn build_model(joints: usize) -> Model {
    let mut model = Model::new();
    let mut parent = None;
    for j in 0..joints {
        let id = model
            .add_bone_joint(&format!("bone_{j}"), Vec3::new(0.0, j as f32, 0.0), parent)
            .unwrap();
        parent = Some(id);
    }

    for j in 0..joints {
        for k in 0..64 {
            let angle = k as f32 / 64.0 * std::f32::consts::TAU;
            let v = model.add_vertex(Vec3::new(angle.cos(), j as f32 + 0.5, angle.sin()));
            let pos = Position::vertex(v);
            model.set_position_influence(pos, j, InfluenceType::Custom, 0.7).unwrap();
            if j + 1 < joints {
                model.set_position_influence(pos, j + 1, InfluenceType::Remainder, 0.0).unwrap();
            }
        }
    }

    let anim = model.add_animation("sway", AnimationType::JOINT);
    model.set_animation_frame_count(anim, FRAMES).unwrap();
    for j in 0..joints {
        for frame in [0, FRAMES / 2, FRAMES - 1] {
            let bend = Vec3::new(0.0, 0.0, 0.1 * frame as f32 / FRAMES as f32);
            model
                .set_keyframe(anim, frame, Position::joint(j), Channel::Rotate, bend, Interpolate::Lerp)
                .unwrap();
        }
    }
    model.set_current_animation(AnimationMode::Skeletal, anim).unwrap();
    model
}

fn skeleton_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_skeleton");
    for joints in [16, 64, 256] {
        let mut model = build_model(joints);
        group.bench_with_input(BenchmarkId::from_parameter(joints), &joints, |b, _| {
            b.iter(|| {
                model.invalidate(Validity::SKELETON);
                model.validate_skeleton();
                black_box(model.get_bone_joint_absolute_matrix(0));
            });
        });
    }
    group.finish();
}

fn pose_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_animation");
    for joints in [16, 64] {
        let mut model = build_model(joints);
        let mut frame = 0;
        group.bench_with_input(BenchmarkId::from_parameter(joints), &joints, |b, _| {
            b.iter(|| {
                frame = (frame + 1) % FRAMES;
                model.set_current_animation_frame(frame).unwrap();
                model.validate_animation();
                black_box(model.get_vertex_coords(0));
            });
        });
    }
    group.finish();
}

fn auto_weight_benchmark(c: &mut Criterion) {
    let mut model = build_model(32);
    c.bench_function("auto_set_influences", |b| {
        b.iter(|| black_box(model.auto_set_influences(black_box(Vec3::new(0.3, 12.4, 0.1)), 0.5, false)));
    });
}

criterion_group!(benches, skeleton_benchmark, pose_benchmark, auto_weight_benchmark);
criterion_main!(benches);
