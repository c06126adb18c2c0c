//! Integration tests for the culling pipeline on the software device
//!
//! These tests drive the full pipeline (bounds reduction, per-frame
//! visibility, sink apply) end to end. No GPU required.
//!
//! Run with: cargo test --test culling_integration_tests

use std::sync::{Arc, Mutex};

use parallax_cull::glam::{Mat4, Vec3, Vec4};
use parallax_cull::parallax::camera::{Camera, Frustum};
use parallax_cull::parallax::device::{ComputeDevice, DeviceConfig, SoftwareDevice};
use parallax_cull::parallax::scene::{Aabb, SceneGeometry, VertexSource, VisibilityFlags};
use parallax_cull::parallax::{CullingConfig, CullingPipeline, PipelineState};

// ============================================================================
// Helpers
// ============================================================================

fn software_device(worker_threads: usize) -> Arc<Mutex<dyn ComputeDevice>> {
    let device = SoftwareDevice::new(DeviceConfig {
        worker_threads,
        ..DeviceConfig::default()
    })
    .unwrap();
    Arc::new(Mutex::new(device))
}

/// A mixed scene: dense meshes, tiny meshes, one empty object, and a mix
/// of translations, rotations and scales.
fn mixed_scene() -> SceneGeometry {
    let mut scene = SceneGeometry::new();

    // Dense spheres of points, large enough to span several reduce chunks
    for i in 0..8 {
        let positions: Vec<Vec3> = (0..700)
            .map(|v| {
                let a = v as f32 * 0.618;
                let b = v as f32 * 0.377;
                Vec3::new(a.cos() * b.sin(), a.sin() * b.sin(), b.cos()) * 2.0
            })
            .collect();
        let angle = i as f32 / 8.0 * std::f32::consts::TAU;
        let world = Mat4::from_rotation_y(angle)
            * Mat4::from_translation(Vec3::new(25.0, 0.0, 0.0))
            * Mat4::from_scale(Vec3::splat(1.0 + i as f32 * 0.25));
        scene.push_object(positions, world);
    }

    // Small boxes scattered on the Y axis
    for i in 0..6 {
        let positions = vec![Vec3::splat(-0.5), Vec3::splat(0.5)];
        scene.push_object(
            positions,
            Mat4::from_translation(Vec3::new(0.0, i as f32 * 10.0 - 25.0, 0.0)),
        );
    }

    // One object with no geometry at all
    scene.push_object(Vec::new(), Mat4::from_translation(Vec3::new(5.0, 0.0, 5.0)));

    scene
}

fn perspective_camera(eye: Vec3, target: Vec3) -> Camera {
    Camera::new(
        Mat4::look_at_rh(eye, target, Vec3::Y),
        Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 200.0),
    )
}

fn sink_pattern(sink: &VisibilityFlags, count: u32) -> Vec<bool> {
    (0..count).map(|i| sink.is_visible(i)).collect()
}

/// True when every corner of the box is strictly inside the clip volume.
fn fully_inside(vp: &Mat4, aabb: &Aabb) -> bool {
    for x in [aabb.min.x, aabb.max.x] {
        for y in [aabb.min.y, aabb.max.y] {
            for z in [aabb.min.z, aabb.max.z] {
                let clip = *vp * Vec4::new(x, y, z, 1.0);
                let inside = clip.w > 0.0
                    && clip.x.abs() <= clip.w
                    && clip.y.abs() <= clip.w
                    && clip.z.abs() <= clip.w;
                if !inside {
                    return false;
                }
            }
        }
    }
    true
}

// ============================================================================
// Full pipeline sweep
// ============================================================================

#[test]
fn test_integration_camera_sweep_matches_host_reference() {
    let device = software_device(0);
    let scene = mixed_scene();
    let object_count = scene.object_count();
    let mut sink = VisibilityFlags::new(object_count);
    let mut pipeline = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    )
    .unwrap();

    // Orbit the camera around the scene over 24 frames
    for frame in 0..24 {
        let angle = frame as f32 / 24.0 * std::f32::consts::TAU;
        let eye = Vec3::new(angle.cos() * 40.0, 10.0, angle.sin() * 40.0);
        let camera = perspective_camera(eye, Vec3::ZERO);

        let stats = pipeline.cull_frame(&camera, &mut sink).unwrap();
        assert_eq!(stats.objects, object_count);
        assert_eq!(stats.visible + stats.culled, object_count);

        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        for (index, world) in pipeline.world_bounds().iter().enumerate() {
            assert_eq!(
                sink.is_visible(index as u32),
                frustum.intersects_aabb(world),
                "frame {}: object {} disagrees with the host test",
                frame,
                index
            );
        }
    }

    assert_eq!(pipeline.state(), PipelineState::CullingActive);
    assert_eq!(pipeline.frames(), 24);
}

#[test]
fn test_integration_objects_fully_inside_are_never_culled() {
    let device = software_device(0);
    let scene = mixed_scene();
    let mut sink = VisibilityFlags::new(scene.object_count());
    let mut pipeline = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    )
    .unwrap();

    let mut checked = 0;
    for frame in 0..12 {
        let angle = frame as f32 / 12.0 * std::f32::consts::TAU;
        let eye = Vec3::new(angle.cos() * 60.0, 15.0, angle.sin() * 60.0);
        let camera = perspective_camera(eye, Vec3::ZERO);
        pipeline.cull_frame(&camera, &mut sink).unwrap();

        let vp = camera.view_projection_matrix();
        for (index, world) in pipeline.world_bounds().iter().enumerate() {
            if fully_inside(&vp, world) {
                checked += 1;
                assert!(
                    sink.is_visible(index as u32),
                    "frame {}: object {} is wholly inside but was culled",
                    frame,
                    index
                );
            }
        }
    }
    assert!(checked > 0, "sweep never produced a fully-inside object");
}

// ============================================================================
// Determinism across worker counts
// ============================================================================

#[test]
fn test_integration_results_identical_across_worker_counts() {
    let scene = mixed_scene();
    let camera = perspective_camera(Vec3::new(30.0, 10.0, 30.0), Vec3::ZERO);

    let mut reference_bounds: Option<Vec<Aabb>> = None;
    let mut reference_pattern: Option<Vec<bool>> = None;

    for worker_threads in [1, 2, 8] {
        let device = software_device(worker_threads);
        let mut sink = VisibilityFlags::new(scene.object_count());
        let mut pipeline = CullingPipeline::new(
            Arc::clone(&device),
            &scene,
            &sink,
            CullingConfig::default(),
        )
        .unwrap();
        pipeline.cull_frame(&camera, &mut sink).unwrap();

        let bounds = pipeline.world_bounds().to_vec();
        let pattern = sink_pattern(&sink, scene.object_count());

        match (&reference_bounds, &reference_pattern) {
            (None, None) => {
                reference_bounds = Some(bounds);
                reference_pattern = Some(pattern);
            }
            (Some(expected_bounds), Some(expected_pattern)) => {
                // Bit-exact: min/max reduction commutes, so worker count
                // must not influence a single bit of the results
                for (a, b) in bounds.iter().zip(expected_bounds.iter()) {
                    assert_eq!(a.min.to_array().map(f32::to_bits),
                               b.min.to_array().map(f32::to_bits));
                    assert_eq!(a.max.to_array().map(f32::to_bits),
                               b.max.to_array().map(f32::to_bits));
                }
                assert_eq!(&pattern, expected_pattern);
            }
            _ => unreachable!(),
        }
    }
}

#[test]
fn test_integration_repeated_frames_are_stable() {
    let device = software_device(4);
    let scene = mixed_scene();
    let mut sink = VisibilityFlags::new(scene.object_count());
    let mut pipeline = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    )
    .unwrap();
    let camera = perspective_camera(Vec3::new(30.0, 10.0, 30.0), Vec3::ZERO);

    pipeline.cull_frame(&camera, &mut sink).unwrap();
    let first = sink_pattern(&sink, scene.object_count());
    for _ in 0..10 {
        pipeline.cull_frame(&camera, &mut sink).unwrap();
        assert_eq!(sink_pattern(&sink, scene.object_count()), first);
    }
}

// ============================================================================
// Resource accounting at scale
// ============================================================================

#[test]
fn test_integration_teardown_leaves_no_live_buffers() {
    let device = software_device(0);
    let mut scene = SceneGeometry::new();
    for i in 0..200 {
        let positions: Vec<Vec3> = (0..50)
            .map(|v| Vec3::new(v as f32 * 0.1, (v % 7) as f32, (v % 3) as f32))
            .collect();
        scene.push_object(
            positions,
            Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
        );
    }
    let mut sink = VisibilityFlags::new(200);
    let mut pipeline = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    )
    .unwrap();

    let camera = perspective_camera(Vec3::new(100.0, 30.0, 100.0), Vec3::new(100.0, 0.0, 0.0));
    for _ in 0..5 {
        pipeline.cull_frame(&camera, &mut sink).unwrap();
    }

    // Session bounds + plane + flag buffers while active
    let stats = device.lock().unwrap().stats();
    assert_eq!(stats.live_buffers, 4);
    assert_eq!(
        stats.live_buffer_bytes,
        2 * 200 * 16 + 96 + 200 * 4
    );

    pipeline.teardown().unwrap();
    let stats = device.lock().unwrap().stats();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_buffer_bytes, 0);
}

#[test]
fn test_integration_one_submit_per_frame() {
    let device = software_device(0);
    let scene = mixed_scene();
    let mut sink = VisibilityFlags::new(scene.object_count());
    let mut pipeline = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    )
    .unwrap();

    let after_init = device.lock().unwrap().stats().submits;
    assert_eq!(after_init, 1, "bounds build is a single submission");

    let camera = perspective_camera(Vec3::new(30.0, 10.0, 30.0), Vec3::ZERO);
    for _ in 0..6 {
        pipeline.cull_frame(&camera, &mut sink).unwrap();
    }
    assert_eq!(device.lock().unwrap().stats().submits, after_init + 6);
}
