/// Scene bounds builder - one-time AABB reduction over scene geometry.
///
/// For every object the vertex positions are uploaded to a transient
/// buffer and reduced on the device in two steps: reduce_bounds produces
/// per-chunk min/max partials, fold_bounds collapses them into one
/// object-space box. The object-space results are read back once,
/// transformed to world space on the host, and uploaded into two
/// session-long buffers that the per-frame visibility pass reads.
///
/// Transient buffers (positions and partials) are released as soon as the
/// reduction completes. Failures roll back naturally: every buffer is
/// reference counted, so an error exit drops whatever was created and no
/// half-initialized set survives.

use std::sync::{Arc, Mutex};

use glam::Vec3;

use crate::{cull_bail, cull_info, cull_warn};
use crate::error::Result;
use crate::scene::{Aabb, VertexSource};
use crate::device::{
    BindingGroup, BindingResource, Buffer, BufferDesc, BufferUsage,
    ComputeDevice, Kernel, dispatch_group_count,
};
use super::culling_pipeline::CullingConfig;
use super::kernels::VEC4_STRIDE;

const TARGET: &str = "parallax::SceneBounds";

/// Session-long device buffers holding the world-space bounds.
struct BoundsBuffers {
    world_min: Arc<dyn Buffer>,
    world_max: Arc<dyn Buffer>,
}

/// World-space scene bounds, device-resident for the session.
///
/// Buffer element i is the world AABB of object i; the index is the same
/// one the vertex source and the render sink use. A host copy is kept for
/// diagnostics and debug visualization.
pub struct SceneBounds {
    buffers: Option<BoundsBuffers>,
    world_bounds: Vec<Aabb>,
    object_count: u32,
}

impl SceneBounds {
    /// Number of objects covered by the bounds.
    pub fn object_count(&self) -> u32 {
        self.object_count
    }

    /// Host copy of the world-space bounds, indexed by object.
    pub fn world_bounds(&self) -> &[Aabb] {
        &self.world_bounds
    }

    /// The session buffers (min, max), or None for an empty scene.
    pub fn device_buffers(&self) -> Option<(&Arc<dyn Buffer>, &Arc<dyn Buffer>)> {
        self.buffers
            .as_ref()
            .map(|b| (&b.world_min, &b.world_max))
    }

    /// Build the bounds for every object in the source.
    ///
    /// Runs the full reduction on the device in one submission, blocks
    /// until it completes, then performs the world-space transform and
    /// uploads the results. Objects without vertices get the configured
    /// placeholder box and a warning.
    pub fn build(
        device: &Arc<Mutex<dyn ComputeDevice>>,
        source: &dyn VertexSource,
        reduce_kernel: &Arc<dyn Kernel>,
        fold_kernel: &Arc<dyn Kernel>,
        config: &CullingConfig,
    ) -> Result<SceneBounds> {
        let object_count = source.object_count();
        if object_count == 0 {
            cull_info!(TARGET, "Scene has no objects, bounds build skipped");
            return Ok(SceneBounds {
                buffers: None,
                world_bounds: Vec::new(),
                object_count: 0,
            });
        }

        let bounds_size = object_count as u64 * VEC4_STRIDE;

        // Session buffers (host-written after the readback) and staging
        // buffers the fold kernel writes object-space results into
        let (world_min, world_max, staging_min, staging_max) = {
            let mut device = device.lock().unwrap();
            let session_desc = BufferDesc {
                size: bounds_size,
                usage: BufferUsage::STORAGE | BufferUsage::MAP_WRITE,
            };
            let staging_desc = BufferDesc {
                size: bounds_size,
                usage: BufferUsage::STORAGE | BufferUsage::MAP_READ,
            };
            (
                device.create_buffer(session_desc.clone())?,
                device.create_buffer(session_desc)?,
                device.create_buffer(staging_desc.clone())?,
                device.create_buffer(staging_desc)?,
            )
        };

        // Record the whole reduction as one command list: per object a
        // reduce dispatch, barriers on its partials, then the fold
        let mut list = device.lock().unwrap().create_command_list()?;
        list.begin()?;

        let mut transients: Vec<Arc<dyn Buffer>> = Vec::new();
        let mut groups_alive: Vec<Arc<dyn BindingGroup>> = Vec::new();
        let mut is_empty = vec![false; object_count as usize];
        let mut total_vertices: u64 = 0;
        let mut total_groups: u32 = 0;

        for index in 0..object_count {
            let positions = source.vertex_positions(index);
            if positions.is_empty() {
                cull_warn!(
                    TARGET,
                    "Object {} has no vertices, placeholder bounds emitted",
                    index
                );
                is_empty[index as usize] = true;
                continue;
            }

            let vertex_count = positions.len() as u32;
            let group_count = dispatch_group_count(vertex_count, config.chunk_size);

            let position_data: Vec<[f32; 4]> = positions
                .iter()
                .map(|p| [p.x, p.y, p.z, 1.0])
                .collect();

            let (position_buffer, partial_min, partial_max) = {
                let mut device = device.lock().unwrap();
                let position_buffer = device.create_buffer(BufferDesc {
                    size: vertex_count as u64 * VEC4_STRIDE,
                    usage: BufferUsage::STORAGE | BufferUsage::MAP_WRITE,
                })?;
                let partial_desc = BufferDesc {
                    size: group_count as u64 * VEC4_STRIDE,
                    usage: BufferUsage::STORAGE,
                };
                let partial_min = device.create_buffer(partial_desc.clone())?;
                let partial_max = device.create_buffer(partial_desc)?;
                (position_buffer, partial_min, partial_max)
            };
            position_buffer.update(0, bytemuck::cast_slice(&position_data))?;

            let (reduce_group, fold_group) = {
                let device = device.lock().unwrap();
                let reduce_group = device.create_binding_group(
                    reduce_kernel,
                    &[
                        BindingResource::StorageBuffer(&position_buffer),
                        BindingResource::StorageBuffer(&partial_min),
                        BindingResource::StorageBuffer(&partial_max),
                    ],
                )?;
                let fold_group = device.create_binding_group(
                    fold_kernel,
                    &[
                        BindingResource::StorageBuffer(&partial_min),
                        BindingResource::StorageBuffer(&partial_max),
                        BindingResource::StorageBuffer(&staging_min),
                        BindingResource::StorageBuffer(&staging_max),
                    ],
                )?;
                (reduce_group, fold_group)
            };

            list.bind_kernel(reduce_kernel)?;
            list.bind_binding_group(0, &reduce_group)?;
            list.push_constants(0, &vertex_count.to_ne_bytes())?;
            list.push_constants(4, &config.chunk_size.to_ne_bytes())?;
            list.dispatch(group_count, 1, 1)?;
            list.buffer_barrier(&partial_min)?;
            list.buffer_barrier(&partial_max)?;

            list.bind_kernel(fold_kernel)?;
            list.bind_binding_group(0, &fold_group)?;
            list.push_constants(0, &group_count.to_ne_bytes())?;
            list.push_constants(4, &index.to_ne_bytes())?;
            list.dispatch(1, 1, 1)?;

            transients.push(position_buffer);
            transients.push(partial_min);
            transients.push(partial_max);
            groups_alive.push(reduce_group);
            groups_alive.push(fold_group);
            total_vertices += vertex_count as u64;
            total_groups += group_count;
        }

        list.buffer_barrier(&staging_min)?;
        list.buffer_barrier(&staging_max)?;
        list.end()?;

        {
            let device = device.lock().unwrap();
            device.submit(&[list.as_ref()])?;
            device.wait_idle()?;
        }

        // Reduction finished; vertex and partial buffers are not needed
        // past this point
        drop(list);
        drop(groups_alive);
        drop(transients);

        // Read back object-space bounds
        let mut min_data = vec![[0f32; 4]; object_count as usize];
        let mut max_data = vec![[0f32; 4]; object_count as usize];
        staging_min.read(0, bytemuck::cast_slice_mut(&mut min_data))?;
        staging_max.read(0, bytemuck::cast_slice_mut(&mut max_data))?;

        // Transform to world space on the host and upload the session copy
        let mut world_bounds = Vec::with_capacity(object_count as usize);
        for index in 0..object_count as usize {
            let object_space = if is_empty[index] {
                config.empty_object_bounds
            } else {
                Aabb {
                    min: Vec3::new(min_data[index][0], min_data[index][1], min_data[index][2]),
                    max: Vec3::new(max_data[index][0], max_data[index][1], max_data[index][2]),
                }
            };
            world_bounds.push(object_space.transformed(&source.world_matrix(index as u32)));
        }

        let world_min_data: Vec<[f32; 4]> = world_bounds
            .iter()
            .map(|b| [b.min.x, b.min.y, b.min.z, 0.0])
            .collect();
        let world_max_data: Vec<[f32; 4]> = world_bounds
            .iter()
            .map(|b| [b.max.x, b.max.y, b.max.z, 0.0])
            .collect();
        world_min.update(0, bytemuck::cast_slice(&world_min_data))?;
        world_max.update(0, bytemuck::cast_slice(&world_max_data))?;

        let bounds = SceneBounds {
            buffers: Some(BoundsBuffers {
                world_min,
                world_max,
            }),
            world_bounds,
            object_count,
        };
        bounds.verify_index_alignment()?;

        cull_info!(
            TARGET,
            "Scene bounds built: {} objects, {} vertices, {} reduce groups",
            object_count,
            total_vertices,
            total_groups
        );
        Ok(bounds)
    }

    /// Check that the host copy and the session buffers all cover exactly
    /// `object_count` entries.
    ///
    /// Flag i, bound i and sink slot i must refer to the same object;
    /// this is enforced after every build rather than assumed.
    pub fn verify_index_alignment(&self) -> Result<()> {
        if self.world_bounds.len() as u32 != self.object_count {
            cull_bail!(
                TARGET,
                "Bounds index misalignment: {} host entries for {} objects",
                self.world_bounds.len(),
                self.object_count
            );
        }
        if let Some(buffers) = &self.buffers {
            let expected = self.object_count as u64 * VEC4_STRIDE;
            if buffers.world_min.size() != expected || buffers.world_max.size() != expected {
                cull_bail!(
                    TARGET,
                    "Bounds index misalignment: buffers hold {}/{} bytes, expected {}",
                    buffers.world_min.size(),
                    buffers.world_max.size(),
                    expected
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "bounds_builder_tests.rs"]
mod tests;
