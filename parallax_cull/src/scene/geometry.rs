/// Caller-side collaborator interfaces for the culling pipeline.
///
/// The pipeline does not own scene data. It reads vertex positions and
/// world transforms through `VertexSource` during the one-time bounds
/// build, and pushes per-frame visibility through `RenderEnableSink`.
/// Objects are identified by a stable dense index assigned by the caller
/// at scene-build time; every device-side sequence is aligned to it.

use glam::{Mat4, Vec3};

/// Provider of per-object geometry for the one-time bounds build.
///
/// Indices must be stable and dense: `0..object_count()`. Vertex
/// positions are object-space; `world_matrix` places the object in the
/// world. NaN or infinite components are out of scope and produce
/// unspecified bounds.
pub trait VertexSource {
    /// Number of objects in the scene.
    fn object_count(&self) -> u32;

    /// Object-space vertex positions for one object.
    ///
    /// May be empty; the pipeline then emits a degenerate box and warns.
    fn vertex_positions(&self, object: u32) -> &[Vec3];

    /// Object-to-world transform for one object.
    fn world_matrix(&self, object: u32) -> Mat4;
}

/// Receiver of per-frame visibility results.
///
/// `set_render_enabled` is called once per object per frame, in index
/// order, after a successful readback. On readback failure no call is
/// made at all for that frame (all-or-nothing apply).
pub trait RenderEnableSink {
    /// Number of render-enable slots. Must equal the vertex source's
    /// object count; checked at pipeline init and before every apply.
    fn slot_count(&self) -> u32;

    /// Record the visibility of one object for the current frame.
    fn set_render_enabled(&mut self, object: u32, visible: bool);
}

// ===== SIMPLE IMPLEMENTATIONS =====

/// One object's geometry as owned by `SceneGeometry`.
pub struct SceneObject {
    /// Object-space vertex positions
    pub positions: Vec<Vec3>,
    /// Object-to-world transform
    pub world_matrix: Mat4,
}

/// Owned vertex source backed by plain vectors.
///
/// Suitable for static scenes assembled up front; the demo and the tests
/// use it. Engines with their own mesh storage implement `VertexSource`
/// directly instead.
#[derive(Default)]
pub struct SceneGeometry {
    objects: Vec<SceneObject>,
}

impl SceneGeometry {
    pub fn new() -> SceneGeometry {
        SceneGeometry {
            objects: Vec::new(),
        }
    }

    /// Add an object and return its stable index.
    pub fn push_object(&mut self, positions: Vec<Vec3>, world_matrix: Mat4) -> u32 {
        let index = self.objects.len() as u32;
        self.objects.push(SceneObject {
            positions,
            world_matrix,
        });
        index
    }
}

impl VertexSource for SceneGeometry {
    fn object_count(&self) -> u32 {
        self.objects.len() as u32
    }

    fn vertex_positions(&self, object: u32) -> &[Vec3] {
        &self.objects[object as usize].positions
    }

    fn world_matrix(&self, object: u32) -> Mat4 {
        self.objects[object as usize].world_matrix
    }
}

/// Render-enable sink backed by a plain flag vector.
///
/// New slots start visible, matching renderers that draw everything until
/// the first culling pass lands.
pub struct VisibilityFlags {
    flags: Vec<bool>,
}

impl VisibilityFlags {
    /// Create `count` slots, all visible.
    pub fn new(count: u32) -> VisibilityFlags {
        VisibilityFlags {
            flags: vec![true; count as usize],
        }
    }

    /// Visibility of one object.
    pub fn is_visible(&self, object: u32) -> bool {
        self.flags[object as usize]
    }

    /// Number of currently visible objects.
    pub fn visible_count(&self) -> u32 {
        self.flags.iter().filter(|v| **v).count() as u32
    }
}

impl RenderEnableSink for VisibilityFlags {
    fn slot_count(&self) -> u32 {
        self.flags.len() as u32
    }

    fn set_render_enabled(&mut self, object: u32, visible: bool) {
        self.flags[object as usize] = visible;
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
