//! Parallax culling demo
//!
//! Builds a ring of objects around the origin, runs the one-time bounds
//! reduction on the software device and orbits a camera around the scene,
//! printing per-frame visibility. No GPU required.

use std::sync::{Arc, Mutex};

use parallax_cull::glam::{Mat4, Vec3};
use parallax_cull::parallax::camera::Camera;
use parallax_cull::parallax::device::{ComputeDevice, DeviceConfig, SoftwareDevice};
use parallax_cull::parallax::scene::{SceneGeometry, VertexSource, VisibilityFlags};
use parallax_cull::parallax::{CullingConfig, CullingPipeline, Result};

const RING_OBJECTS: u32 = 48;
const RING_RADIUS: f32 = 30.0;
const POINTS_PER_OBJECT: u32 = 600;
const FRAMES: u32 = 16;

/// Deterministic point cloud filling a unit cube, dense enough to span
/// several reduce chunks.
fn cloud_positions(seed: u32) -> Vec<Vec3> {
    (0..POINTS_PER_OBJECT)
        .map(|i| {
            let t = (seed + i) as f32 * 0.618_034;
            let u = (seed + i) as f32 * 0.377_846;
            Vec3::new(t.fract(), u.fract(), (t + u).fract()) - Vec3::splat(0.5)
        })
        .collect()
}

/// A ring of objects around the origin plus one large object at the center.
fn ring_scene() -> SceneGeometry {
    let mut scene = SceneGeometry::new();

    for i in 0..RING_OBJECTS {
        let angle = i as f32 / RING_OBJECTS as f32 * std::f32::consts::TAU;
        let world = Mat4::from_translation(Vec3::new(
            angle.cos() * RING_RADIUS,
            (i % 5) as f32 - 2.0,
            angle.sin() * RING_RADIUS,
        )) * Mat4::from_scale(Vec3::splat(1.0 + (i % 3) as f32));
        scene.push_object(cloud_positions(i * 97), world);
    }

    scene.push_object(cloud_positions(7), Mat4::from_scale(Vec3::splat(4.0)));

    scene
}

fn visibility_strip(sink: &VisibilityFlags, count: u32) -> String {
    (0..count)
        .map(|i| if sink.is_visible(i) { '#' } else { '.' })
        .collect()
}

fn main() -> Result<()> {
    let scene = ring_scene();
    let object_count = scene.object_count();

    let device: Arc<Mutex<dyn ComputeDevice>> =
        Arc::new(Mutex::new(SoftwareDevice::new(DeviceConfig {
            app_name: "Parallax Demo".to_string(),
            ..DeviceConfig::default()
        })?));

    let mut sink = VisibilityFlags::new(object_count);
    let mut pipeline = CullingPipeline::new(
        Arc::clone(&device),
        &scene,
        &sink,
        CullingConfig::default(),
    )?;

    println!();
    println!("Orbiting {} objects over {} frames:", object_count, FRAMES);
    println!();

    for frame in 0..FRAMES {
        let angle = frame as f32 / FRAMES as f32 * std::f32::consts::TAU;
        let eye = Vec3::new(angle.cos() * 55.0, 12.0, angle.sin() * 55.0);
        let camera = Camera::new(
            Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y),
            Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 300.0),
        );

        let stats = pipeline.cull_frame(&camera, &mut sink)?;
        println!(
            "frame {:>2}  visible {:>2}/{}  [{}]",
            frame,
            stats.visible,
            stats.objects,
            visibility_strip(&sink, object_count)
        );
    }

    let stats = pipeline.device_stats();
    println!();
    println!(
        "device: {} live buffers ({} bytes), {} submits, {} dispatches",
        stats.live_buffers, stats.live_buffer_bytes, stats.submits, stats.dispatches
    );

    pipeline.teardown()?;

    let stats = device.lock().unwrap().stats();
    println!(
        "after teardown: {} live buffers ({} bytes)",
        stats.live_buffers, stats.live_buffer_bytes
    );

    Ok(())
}
