use super::*;
use std::sync::atomic::{AtomicBool, Ordering};
use glam::{Mat4, Vec3};
use crate::device::{
    BindingGroup, BindingResource, Buffer, BufferDesc, CommandList, DeviceConfig, Kernel,
    KernelDesc, SoftwareDevice,
};
use crate::scene::{SceneGeometry, VisibilityFlags};

// ============================================================================
// Helpers
// ============================================================================

fn test_device() -> Arc<Mutex<dyn ComputeDevice>> {
    let device = SoftwareDevice::new(DeviceConfig {
        worker_threads: 1,
        ..DeviceConfig::default()
    })
    .unwrap();
    Arc::new(Mutex::new(device))
}

fn cube_positions(half: f32) -> Vec<Vec3> {
    vec![Vec3::splat(-half), Vec3::splat(half)]
}

fn single_cube_scene(center: Vec3, half: f32) -> SceneGeometry {
    let mut scene = SceneGeometry::new();
    scene.push_object(cube_positions(half), Mat4::from_translation(center));
    scene
}

/// Unit cubes on a circle of the given radius in the XZ plane.
fn ring_scene(count: u32, radius: f32) -> SceneGeometry {
    let mut scene = SceneGeometry::new();
    for i in 0..count {
        let angle = i as f32 / count as f32 * std::f32::consts::TAU;
        let center = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
        scene.push_object(cube_positions(0.5), Mat4::from_translation(center));
    }
    scene
}

/// Perspective camera: 90 degree FOV, near 0.1, far 100.
fn camera_looking(eye: Vec3, target: Vec3) -> Camera {
    Camera::new(
        Mat4::look_at_rh(eye, target, Vec3::Y),
        Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0),
    )
}

fn pipeline_over(
    device: &Arc<Mutex<dyn ComputeDevice>>,
    scene: &SceneGeometry,
) -> (CullingPipeline, VisibilityFlags) {
    let sink = VisibilityFlags::new(scene.object_count());
    let pipeline = CullingPipeline::new(
        Arc::clone(device),
        scene,
        &sink,
        CullingConfig::default(),
    )
    .unwrap();
    (pipeline, sink)
}

fn visible_pattern(sink: &VisibilityFlags, count: u32) -> Vec<bool> {
    (0..count).map(|i| sink.is_visible(i)).collect()
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_pipeline_new_reaches_bounds_ready() {
    let device = test_device();
    let scene = single_cube_scene(Vec3::ZERO, 1.0);
    let (pipeline, _) = pipeline_over(&device, &scene);

    assert_eq!(pipeline.state(), PipelineState::BoundsReady);
    assert_eq!(pipeline.object_count(), 1);
    assert_eq!(pipeline.frames(), 0);
    assert_eq!(pipeline.world_bounds()[0].min, Vec3::splat(-1.0));
    assert_eq!(pipeline.world_bounds()[0].max, Vec3::splat(1.0));
}

#[test]
fn test_pipeline_sink_mismatch_is_fatal_before_allocation() {
    let device = test_device();
    let scene = ring_scene(3, 10.0);
    let sink = VisibilityFlags::new(2);

    let result = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    );

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    let stats = device.lock().unwrap().stats();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.submits, 0);
}

#[test]
fn test_pipeline_rejects_invalid_config() {
    let device = test_device();
    let scene = single_cube_scene(Vec3::ZERO, 1.0);
    let sink = VisibilityFlags::new(1);

    let config = CullingConfig {
        chunk_size: 0,
        ..CullingConfig::default()
    };
    let result = CullingPipeline::new(Arc::clone(&device), &scene, &sink, config);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));

    let config = CullingConfig {
        test_group_size: 0,
        ..CullingConfig::default()
    };
    let result = CullingPipeline::new(Arc::clone(&device), &scene, &sink, config);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_pipeline_allocation_failure_rolls_back_all_buffers() {
    // Budget admits the session buffers but runs out on the per-object
    // transients, so the build fails with allocations already made
    let device: Arc<Mutex<dyn ComputeDevice>> = Arc::new(Mutex::new(
        SoftwareDevice::new(DeviceConfig {
            worker_threads: 1,
            memory_budget: Some(300),
            ..DeviceConfig::default()
        })
        .unwrap(),
    ));
    let scene = ring_scene(4, 10.0);
    let sink = VisibilityFlags::new(4);

    let result = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    );

    assert!(matches!(result, Err(Error::OutOfMemory)));
    let stats = device.lock().unwrap().stats();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_buffer_bytes, 0);
}

#[test]
fn test_config_defaults() {
    let config = CullingConfig::default();
    assert_eq!(config.chunk_size, 256);
    assert_eq!(config.test_group_size, 64);
    assert_eq!(config.empty_object_bounds, Aabb::ZERO);
    assert!(matches!(
        config.kernels.reduce_bounds,
        KernelCode::Builtin(BuiltinKernel::ReduceBounds)
    ));
}

// ============================================================================
// Single-object visibility scenarios
// ============================================================================

#[test]
fn test_frame_object_fully_inside_is_visible() {
    let device = test_device();
    let scene = single_cube_scene(Vec3::ZERO, 1.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);

    let stats = pipeline.cull_frame(&camera, &mut sink).unwrap();

    assert_eq!(stats, FrameStats { objects: 1, visible: 1, culled: 0 });
    assert!(sink.is_visible(0));
}

#[test]
fn test_frame_object_beyond_far_plane_is_culled() {
    let device = test_device();
    // Camera at z=20 with far 100: far plane sits at z=-80
    let scene = single_cube_scene(Vec3::new(0.0, 0.0, -90.0), 0.5);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);

    let stats = pipeline.cull_frame(&camera, &mut sink).unwrap();

    assert_eq!(stats, FrameStats { objects: 1, visible: 0, culled: 1 });
    assert!(!sink.is_visible(0));
}

#[test]
fn test_frame_object_straddling_far_plane_is_kept() {
    let device = test_device();
    // Box centered exactly on the far plane; the conservative test keeps it
    let scene = single_cube_scene(Vec3::new(0.0, 0.0, -80.0), 0.5);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);

    let stats = pipeline.cull_frame(&camera, &mut sink).unwrap();

    assert_eq!(stats.visible, 1);
    assert!(sink.is_visible(0));
}

#[test]
fn test_frame_object_surrounding_camera_is_visible() {
    let device = test_device();
    let scene = single_cube_scene(Vec3::ZERO, 500.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);

    let stats = pipeline.cull_frame(&camera, &mut sink).unwrap();

    assert_eq!(stats.visible, 1);
    assert!(sink.is_visible(0));
}

#[test]
fn test_frame_zero_vertex_object_culls_as_point() {
    let device = test_device();
    let mut scene = SceneGeometry::new();
    scene.push_object(Vec::new(), Mat4::from_translation(Vec3::ZERO));
    scene.push_object(Vec::new(), Mat4::from_translation(Vec3::new(0.0, 0.0, 90.0)));
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);

    pipeline.cull_frame(&camera, &mut sink).unwrap();

    // Point at the origin is in view; point behind the camera is not
    assert!(sink.is_visible(0));
    assert!(!sink.is_visible(1));
}

// ============================================================================
// Ring scene and camera motion
// ============================================================================

#[test]
fn test_frame_ring_matches_host_reference() {
    let device = test_device();
    let scene = ring_scene(16, 30.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::ZERO, Vec3::X);

    let stats = pipeline.cull_frame(&camera, &mut sink).unwrap();

    assert_eq!(stats.objects, 16);
    assert_eq!(stats.visible + stats.culled, 16);
    assert!(stats.visible > 0, "ring ahead of the camera must be seen");
    assert!(stats.culled > 0, "ring behind the camera must be culled");

    let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
    for (index, world) in pipeline.world_bounds().iter().enumerate() {
        assert_eq!(
            sink.is_visible(index as u32),
            frustum.intersects_aabb(world),
            "object {} disagrees with the host test",
            index
        );
    }
}

#[test]
fn test_frame_rotating_camera_updates_every_slot() {
    let device = test_device();
    let scene = ring_scene(16, 30.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);

    let ahead = camera_looking(Vec3::ZERO, Vec3::X);
    pipeline.cull_frame(&ahead, &mut sink).unwrap();
    let first = visible_pattern(&sink, 16);
    assert!(first.iter().any(|v| *v) && first.iter().any(|v| !*v));

    // Straight up: the whole ring leaves the frustum, every slot flips off
    let up = Camera::new(
        Mat4::look_at_rh(Vec3::ZERO, Vec3::Y, Vec3::Z),
        Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0),
    );
    let stats = pipeline.cull_frame(&up, &mut sink).unwrap();
    assert_eq!(stats.visible, 0);
    assert!(visible_pattern(&sink, 16).iter().all(|v| !*v));

    // Back to the first heading restores the first pattern
    pipeline.cull_frame(&ahead, &mut sink).unwrap();
    assert_eq!(visible_pattern(&sink, 16), first);
}

#[test]
fn test_frame_opposite_headings_see_different_objects() {
    let device = test_device();
    let scene = ring_scene(16, 30.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);

    let toward_x = camera_looking(Vec3::ZERO, Vec3::X);
    pipeline.cull_frame(&toward_x, &mut sink).unwrap();
    let first = visible_pattern(&sink, 16);

    let toward_neg_x = camera_looking(Vec3::ZERO, Vec3::NEG_X);
    pipeline.cull_frame(&toward_neg_x, &mut sink).unwrap();
    let second = visible_pattern(&sink, 16);

    assert_ne!(first, second);
    let frustum = Frustum::from_view_projection(&toward_neg_x.view_projection_matrix());
    for (index, world) in pipeline.world_bounds().iter().enumerate() {
        assert_eq!(second[index], frustum.intersects_aabb(world));
    }
}

// ============================================================================
// State machine and per-frame errors
// ============================================================================

#[test]
fn test_state_moves_to_culling_active_after_first_frame() {
    let device = test_device();
    let scene = single_cube_scene(Vec3::ZERO, 1.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);

    assert_eq!(pipeline.state(), PipelineState::BoundsReady);
    pipeline.cull_frame(&camera, &mut sink).unwrap();
    assert_eq!(pipeline.state(), PipelineState::CullingActive);
    assert_eq!(pipeline.frames(), 1);
    pipeline.cull_frame(&camera, &mut sink).unwrap();
    assert_eq!(pipeline.frames(), 2);
}

#[test]
fn test_empty_scene_frames_are_vacuous() {
    let device = test_device();
    let scene = SceneGeometry::new();
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);

    let stats = pipeline.cull_frame(&camera, &mut sink).unwrap();

    assert_eq!(stats, FrameStats::default());
    assert_eq!(pipeline.state(), PipelineState::CullingActive);
    assert_eq!(device.lock().unwrap().stats().live_buffers, 0);
}

#[test]
fn test_frame_sink_mismatch_leaves_state_alone() {
    let device = test_device();
    let scene = ring_scene(4, 10.0);
    let (mut pipeline, _) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::ZERO, Vec3::X);

    let mut wrong_sink = VisibilityFlags::new(3);
    let result = pipeline.cull_frame(&camera, &mut wrong_sink);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(pipeline.state(), PipelineState::BoundsReady);
    assert_eq!(pipeline.frames(), 0);
    assert_eq!(wrong_sink.visible_count(), 3);
}

// ============================================================================
// Readback failure injection
// ============================================================================

/// Device wrapper that fails the next `wait_idle` on demand.
struct FlakyDevice {
    inner: SoftwareDevice,
    fail_next_wait: AtomicBool,
}

impl FlakyDevice {
    fn new() -> Self {
        Self {
            inner: SoftwareDevice::new(DeviceConfig {
                worker_threads: 1,
                ..DeviceConfig::default()
            })
            .unwrap(),
            fail_next_wait: AtomicBool::new(false),
        }
    }
}

impl ComputeDevice for FlakyDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.inner.create_buffer(desc)
    }

    fn create_kernel(&mut self, desc: KernelDesc) -> Result<Arc<dyn Kernel>> {
        self.inner.create_kernel(desc)
    }

    fn create_binding_group(
        &self,
        kernel: &Arc<dyn Kernel>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        self.inner.create_binding_group(kernel, resources)
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        self.inner.create_command_list()
    }

    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()> {
        self.inner.submit(commands)
    }

    fn wait_idle(&self) -> Result<()> {
        if self.fail_next_wait.swap(false, Ordering::SeqCst) {
            return Err(Error::BackendError("induced device loss".to_string()));
        }
        self.inner.wait_idle()
    }

    fn stats(&self) -> ComputeDeviceStats {
        self.inner.stats()
    }
}

#[test]
fn test_failed_readback_keeps_previous_visibility() {
    let flaky = Arc::new(Mutex::new(FlakyDevice::new()));
    let device: Arc<Mutex<dyn ComputeDevice>> = flaky.clone();

    let scene = ring_scene(16, 30.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);

    let toward_x = camera_looking(Vec3::ZERO, Vec3::X);
    pipeline.cull_frame(&toward_x, &mut sink).unwrap();
    let settled = visible_pattern(&sink, 16);

    // A camera move whose frame fails must not disturb the sink
    flaky
        .lock()
        .unwrap()
        .fail_next_wait
        .store(true, Ordering::SeqCst);
    let toward_neg_x = camera_looking(Vec3::ZERO, Vec3::NEG_X);
    let result = pipeline.cull_frame(&toward_neg_x, &mut sink);

    assert!(matches!(result, Err(Error::ReadbackFailed(_))));
    assert_eq!(visible_pattern(&sink, 16), settled);
    assert_eq!(pipeline.state(), PipelineState::CullingActive);
    assert_eq!(pipeline.frames(), 1);

    // The next healthy frame applies the new heading
    let stats = pipeline.cull_frame(&toward_neg_x, &mut sink).unwrap();
    assert!(stats.visible > 0);
    assert_ne!(visible_pattern(&sink, 16), settled);
    assert_eq!(pipeline.frames(), 2);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_teardown_releases_all_device_resources() {
    let device = test_device();
    let scene = ring_scene(8, 20.0);
    let (mut pipeline, mut sink) = pipeline_over(&device, &scene);
    let camera = camera_looking(Vec3::ZERO, Vec3::X);
    pipeline.cull_frame(&camera, &mut sink).unwrap();

    assert!(device.lock().unwrap().stats().live_buffers > 0);
    pipeline.teardown().unwrap();

    let stats = device.lock().unwrap().stats();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_buffer_bytes, 0);
}

#[test]
fn test_drop_releases_all_device_resources() {
    let device = test_device();
    let scene = ring_scene(8, 20.0);
    let (pipeline, _) = pipeline_over(&device, &scene);

    assert!(device.lock().unwrap().stats().live_buffers > 0);
    drop(pipeline);

    assert_eq!(device.lock().unwrap().stats().live_buffers, 0);
}
