/// Per-frame visibility pass - six-plane test over the scene bounds.
///
/// Owns the plane uniform buffer and the flag buffer for the session and
/// caches one binding group over them plus the static bounds buffers.
/// Each frame rewrites the plane buffer in place, dispatches one thread
/// per object and reads the flag buffer back after the device goes idle.

use std::sync::{Arc, Mutex};

use crate::cull_bail;
use crate::camera::Frustum;
use crate::error::{Error, Result};
use crate::device::{
    BindingGroup, BindingResource, Buffer, BufferDesc, BufferUsage, ComputeDevice, Kernel,
    dispatch_group_count,
};
use super::bounds_builder::SceneBounds;
use super::kernels::PLANE_BUFFER_SIZE;

const TARGET: &str = "parallax::VisibilityPass";

/// Device resources for the per-frame visibility test.
pub struct VisibilityPass {
    kernel: Arc<dyn Kernel>,
    plane_buffer: Arc<dyn Buffer>,
    flag_buffer: Arc<dyn Buffer>,
    binding_group: Arc<dyn BindingGroup>,
    object_count: u32,
    group_count: u32,
}

impl VisibilityPass {
    /// Create the pass resources over an already-built bounds set.
    pub fn new(
        device: &Arc<Mutex<dyn ComputeDevice>>,
        kernel: Arc<dyn Kernel>,
        bounds: &SceneBounds,
    ) -> Result<VisibilityPass> {
        let object_count = bounds.object_count();
        let Some((world_min, world_max)) = bounds.device_buffers() else {
            cull_bail!(TARGET, "Visibility pass requires device-resident bounds");
        };
        let group_count = dispatch_group_count(object_count, kernel.local_size());

        let (plane_buffer, flag_buffer) = {
            let mut device = device.lock().unwrap();
            let plane_buffer = device.create_buffer(BufferDesc {
                size: PLANE_BUFFER_SIZE,
                usage: BufferUsage::UNIFORM | BufferUsage::MAP_WRITE,
            })?;
            let flag_buffer = device.create_buffer(BufferDesc {
                size: object_count as u64 * 4,
                usage: BufferUsage::STORAGE | BufferUsage::MAP_READ,
            })?;
            (plane_buffer, flag_buffer)
        };

        // Bindings never change across frames: the bounds are static and
        // the plane buffer is rewritten in place
        let binding_group = device.lock().unwrap().create_binding_group(
            &kernel,
            &[
                BindingResource::StorageBuffer(world_min),
                BindingResource::StorageBuffer(world_max),
                BindingResource::UniformBuffer(&plane_buffer),
                BindingResource::StorageBuffer(&flag_buffer),
            ],
        )?;

        Ok(VisibilityPass {
            kernel,
            plane_buffer,
            flag_buffer,
            binding_group,
            object_count,
            group_count,
        })
    }

    /// Number of objects the pass tests.
    pub fn object_count(&self) -> u32 {
        self.object_count
    }

    /// Run the test for one frame and read the flags back.
    ///
    /// `flags` is resized to one u32 per object: 1 visible, 0 culled.
    /// The frame sequence is plane upload, dispatch, wait, readback.
    /// Failures after submission are reported as `ReadbackFailed`; the
    /// contents of `flags` are unspecified in that case and must not be
    /// applied.
    pub fn run(
        &self,
        device: &Arc<Mutex<dyn ComputeDevice>>,
        frustum: &Frustum,
        flags: &mut Vec<u32>,
    ) -> Result<()> {
        let plane_data: Vec<[f32; 4]> = frustum.planes.iter().map(|p| p.to_array()).collect();
        self.plane_buffer.update(0, bytemuck::cast_slice(&plane_data))?;

        let mut list = device.lock().unwrap().create_command_list()?;
        list.begin()?;
        list.bind_kernel(&self.kernel)?;
        list.bind_binding_group(0, &self.binding_group)?;
        list.push_constants(0, &self.object_count.to_ne_bytes())?;
        list.dispatch(self.group_count, 1, 1)?;
        list.buffer_barrier(&self.flag_buffer)?;
        list.end()?;

        {
            let device = device.lock().unwrap();
            device.submit(&[list.as_ref()])?;
            device
                .wait_idle()
                .map_err(|e| Error::ReadbackFailed(e.to_string()))?;
        }

        flags.resize(self.object_count as usize, 0);
        self.flag_buffer
            .read(0, bytemuck::cast_slice_mut(flags.as_mut_slice()))
            .map_err(|e| Error::ReadbackFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "visibility_pass_tests.rs"]
mod tests;
