/// Camera — low-level passive data container.
///
/// The Camera computes nothing beyond the view-projection product. The
/// caller (game engine) is responsible for computing and setting both
/// matrices from its high-level parameters (position, rotation, FOV).
///
/// The culling pipeline does NOT store or manage cameras. They are tools
/// provided by the crate, owned and driven by the caller; `cull_frame`
/// borrows one long enough to extract the current frustum planes.

use glam::Mat4;

/// Low-level camera. A passive data container — computes nothing.
///
/// The caller is responsible for computing and setting both matrices.
/// Typically, the game engine computes view/projection from high-level
/// parameters and passes the results here.
#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    projection_matrix: Mat4,
}

impl Camera {
    /// Create a new camera with the given matrices.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view_matrix: view,
            projection_matrix: projection,
        }
    }

    // ===== GETTERS =====

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix (perspective or orthographic).
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    // ===== SETTERS — store, compute nothing =====

    /// Set the view matrix.
    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
    }

    /// Set the projection matrix.
    pub fn set_projection(&mut self, matrix: Mat4) {
        self.projection_matrix = matrix;
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
