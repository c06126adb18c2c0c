/// CullingPipeline - device-resident visibility culling for a static scene.
///
/// The pipeline is an owned service object: it borrows scene data through
/// the caller's `VertexSource` once at creation, keeps the reduced bounds
/// on the device for the whole session, and pushes per-frame visibility
/// into the caller's `RenderEnableSink`. Dropping it (or calling
/// `teardown`) releases every device resource it created.
///
/// Lifecycle: `new` builds the scene bounds and the frame resources
/// (`BoundsReady`); the first successful `cull_frame` moves it to
/// `CullingActive`, where it stays until torn down. A failed frame leaves
/// the sink exactly as the last successful frame set it.

use std::sync::{Arc, Mutex};

use crate::{cull_bail, cull_error, cull_info, cull_warn};
use crate::camera::{Camera, Frustum};
use crate::error::{Error, Result};
use crate::scene::{Aabb, RenderEnableSink, VertexSource};
use crate::device::{BuiltinKernel, ComputeDevice, ComputeDeviceStats, KernelCode};
use super::bounds_builder::SceneBounds;
use super::kernels::{fold_bounds_desc, reduce_bounds_desc, test_visibility_desc};
use super::visibility_pass::VisibilityPass;

const TARGET: &str = "parallax::CullingPipeline";

// ============================================================================
// Configuration
// ============================================================================

/// Code for the three culling kernels.
///
/// Defaults to the built-in kernels the software device executes
/// natively. For the Vulkan device, supply the compiled SPIR-V blobs
/// instead; bindings and push constant layout are fixed either way.
#[derive(Debug, Clone)]
pub struct KernelSet {
    pub reduce_bounds: KernelCode,
    pub fold_bounds: KernelCode,
    pub test_visibility: KernelCode,
}

impl Default for KernelSet {
    fn default() -> Self {
        Self {
            reduce_bounds: KernelCode::Builtin(BuiltinKernel::ReduceBounds),
            fold_bounds: KernelCode::Builtin(BuiltinKernel::FoldBounds),
            test_visibility: KernelCode::Builtin(BuiltinKernel::TestVisibility),
        }
    }
}

/// Culling pipeline configuration
#[derive(Debug, Clone)]
pub struct CullingConfig {
    /// Vertices scanned per reduction workgroup
    pub chunk_size: u32,
    /// Objects tested per visibility workgroup (one thread per object)
    pub test_group_size: u32,
    /// Object-space box stood in for objects without vertices
    pub empty_object_bounds: Aabb,
    /// Kernel code for the culling kernels
    pub kernels: KernelSet,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            test_group_size: 64,
            empty_object_bounds: Aabb::ZERO,
            kernels: KernelSet::default(),
        }
    }
}

impl CullingConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            cull_error!(TARGET, "Invalid config: chunk_size must be nonzero");
            return Err(Error::InitializationFailed(
                "chunk_size must be nonzero".to_string(),
            ));
        }
        if self.test_group_size == 0 {
            cull_error!(TARGET, "Invalid config: test_group_size must be nonzero");
            return Err(Error::InitializationFailed(
                "test_group_size must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Pipeline state and per-frame statistics
// ============================================================================

/// Observable pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Bounds are built and device-resident; no frame has completed yet
    BoundsReady,
    /// At least one frame has been culled successfully
    CullingActive,
}

/// Result of one culled frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Objects tested
    pub objects: u32,
    /// Objects whose bounds touch the frustum
    pub visible: u32,
    /// Objects culled this frame
    pub culled: u32,
}

// ============================================================================
// CullingPipeline
// ============================================================================

/// GPU visibility culling for one static scene.
pub struct CullingPipeline {
    bounds: SceneBounds,
    pass: Option<VisibilityPass>,
    flags: Vec<u32>,
    state: PipelineState,
    frames: u64,
    device: Arc<Mutex<dyn ComputeDevice>>,
}

impl CullingPipeline {
    /// Build the pipeline for a scene.
    ///
    /// Validates the configuration and the source/sink pairing before any
    /// device resource is allocated, then runs the one-time bounds
    /// reduction synchronously. On any error the device is left exactly
    /// as it was; allocation is all-or-nothing.
    ///
    /// # Arguments
    ///
    /// * `device` - Compute device the pipeline allocates from
    /// * `source` - Scene geometry, indexed 0..object_count
    /// * `sink` - Render-enable receiver; must have one slot per object
    /// * `config` - Pipeline configuration
    pub fn new(
        device: Arc<Mutex<dyn ComputeDevice>>,
        source: &dyn VertexSource,
        sink: &dyn RenderEnableSink,
        config: CullingConfig,
    ) -> Result<CullingPipeline> {
        config.validate()?;

        let object_count = source.object_count();
        if sink.slot_count() != object_count {
            cull_error!(
                TARGET,
                "Sink has {} slots for {} objects",
                sink.slot_count(),
                object_count
            );
            return Err(Error::InitializationFailed(format!(
                "sink has {} slots for {} objects",
                sink.slot_count(),
                object_count
            )));
        }

        let (reduce_kernel, fold_kernel, test_kernel) = {
            let mut device = device.lock().unwrap();
            let reduce = device.create_kernel(reduce_bounds_desc(config.kernels.reduce_bounds.clone()))?;
            let fold = device.create_kernel(fold_bounds_desc(config.kernels.fold_bounds.clone()))?;
            let test = device.create_kernel(test_visibility_desc(
                config.kernels.test_visibility.clone(),
                config.test_group_size,
            ))?;
            (reduce, fold, test)
        };

        let bounds = SceneBounds::build(&device, source, &reduce_kernel, &fold_kernel, &config)?;

        // The reduction kernels are only needed for the one-time build;
        // they drop here. The test kernel lives in the pass.
        let pass = if object_count > 0 {
            Some(VisibilityPass::new(&device, test_kernel, &bounds)?)
        } else {
            None
        };

        cull_info!(
            TARGET,
            "Culling pipeline ready: {} objects, chunk_size {}, test_group_size {}",
            object_count,
            config.chunk_size,
            config.test_group_size
        );

        Ok(CullingPipeline {
            bounds,
            pass,
            flags: Vec::new(),
            state: PipelineState::BoundsReady,
            frames: 0,
            device,
        })
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Number of objects under management.
    pub fn object_count(&self) -> u32 {
        self.bounds.object_count()
    }

    /// World-space bounds as built at initialization, indexed by object.
    pub fn world_bounds(&self) -> &[Aabb] {
        self.bounds.world_bounds()
    }

    /// Frames culled successfully since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Statistics of the underlying device.
    pub fn device_stats(&self) -> ComputeDeviceStats {
        self.device.lock().unwrap().stats()
    }

    /// Cull one frame against the camera's current frustum.
    ///
    /// Extracts the six planes from the camera's view-projection matrix,
    /// runs the visibility kernel, reads the flags back and applies them
    /// to the sink in index order. The apply is all-or-nothing: if the
    /// dispatch or the readback fails, the sink keeps the visibility of
    /// the last successful frame and the error is returned.
    pub fn cull_frame(
        &mut self,
        camera: &Camera,
        sink: &mut dyn RenderEnableSink,
    ) -> Result<FrameStats> {
        let object_count = self.bounds.object_count();
        if sink.slot_count() != object_count {
            cull_bail!(
                TARGET,
                "Sink has {} slots for {} objects",
                sink.slot_count(),
                object_count
            );
        }

        if object_count == 0 {
            self.state = PipelineState::CullingActive;
            self.frames += 1;
            return Ok(FrameStats::default());
        }

        let Some(pass) = &self.pass else {
            cull_bail!(TARGET, "Visibility pass missing for a non-empty scene");
        };

        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        if let Err(e) = pass.run(&self.device, &frustum, &mut self.flags) {
            cull_warn!(
                TARGET,
                "Frame {} skipped, sink keeps previous visibility: {}",
                self.frames,
                e
            );
            return Err(e);
        }

        let mut visible = 0u32;
        for (index, flag) in self.flags.iter().enumerate() {
            let is_visible = *flag != 0;
            if is_visible {
                visible += 1;
            }
            sink.set_render_enabled(index as u32, is_visible);
        }

        self.state = PipelineState::CullingActive;
        self.frames += 1;
        Ok(FrameStats {
            objects: object_count,
            visible,
            culled: object_count - visible,
        })
    }

    /// Tear the pipeline down, waiting for outstanding device work.
    ///
    /// Every buffer, kernel and binding group the pipeline created is
    /// released. Dropping the pipeline has the same effect; `teardown`
    /// additionally surfaces a device error instead of ignoring it.
    pub fn teardown(self) -> Result<()> {
        self.device.lock().unwrap().wait_idle()?;
        cull_info!(
            TARGET,
            "Culling pipeline torn down after {} frames",
            self.frames
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "culling_pipeline_tests.rs"]
mod tests;
