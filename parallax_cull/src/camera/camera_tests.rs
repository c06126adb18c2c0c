use glam::{Mat4, Vec3};
use super::*;

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_camera_new() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);

    let camera = Camera::new(view, proj);

    assert_eq!(*camera.view_matrix(), view);
    assert_eq!(*camera.projection_matrix(), proj);
}

// ============================================================================
// view_projection_matrix
// ============================================================================

#[test]
fn test_view_projection_matrix() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);

    let camera = Camera::new(view, proj);

    let expected = proj * view;
    assert_eq!(camera.view_projection_matrix(), expected);
}

// ============================================================================
// Setters
// ============================================================================

#[test]
fn test_set_view() {
    let mut camera = Camera::new(Mat4::IDENTITY, Mat4::IDENTITY);

    let new_view = Mat4::look_at_rh(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
    camera.set_view(new_view);

    assert_eq!(*camera.view_matrix(), new_view);
}

#[test]
fn test_set_projection() {
    let mut camera = Camera::new(Mat4::IDENTITY, Mat4::IDENTITY);

    let new_proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.5, 500.0);
    camera.set_projection(new_proj);

    assert_eq!(*camera.projection_matrix(), new_proj);
}

#[test]
fn test_setters_affect_view_projection() {
    let mut camera = Camera::new(Mat4::IDENTITY, Mat4::IDENTITY);
    assert_eq!(camera.view_projection_matrix(), Mat4::IDENTITY);

    let view = Mat4::look_at_rh(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    camera.set_view(view);
    camera.set_projection(proj);

    assert_eq!(camera.view_projection_matrix(), proj * view);
}

// ============================================================================
// Clone
// ============================================================================

#[test]
fn test_camera_clone() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);

    let camera = Camera::new(view, proj);
    let cloned = camera.clone();

    assert_eq!(*cloned.view_matrix(), view);
    assert_eq!(*cloned.projection_matrix(), proj);
}
