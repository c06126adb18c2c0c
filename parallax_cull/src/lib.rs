/*!
# Parallax Cull

GPU-resident visibility culling: a one-time parallel AABB reduction over
scene geometry plus a per-frame six-plane frustum test, both running as
compute kernels.

The crate is backend-agnostic through trait-based dynamic polymorphism.
`ComputeDevice` is the factory trait; the built-in `SoftwareDevice` runs
the kernels on a thread pool, and hardware backends (Vulkan) provide
their own implementations in separate crates.

## Architecture

- **ComputeDevice**: Factory trait for buffers, kernels and command lists
- **SceneBounds**: One-time reduction producing device-resident world AABBs
- **VisibilityPass**: Per-frame plane upload, dispatch and flag readback
- **CullingPipeline**: Owned service object tying the stages together
- **VertexSource / RenderEnableSink**: Caller-side scene interfaces

The pipeline never owns scene data: geometry is read once at
initialization and per-frame visibility is pushed back through the sink.
*/

// Internal modules
mod error;
pub mod log;
pub mod camera;
pub mod culling;
pub mod device;
pub mod scene;

// Main parallax namespace module
pub mod parallax {
    // Error types
    pub use crate::error::{Error, Result};

    // Culling pipeline, the crate's front door
    pub use crate::culling::{
        CullingConfig, CullingPipeline, FrameStats, KernelSet, PipelineState,
    };

    // Device factory trait and the built-in backend
    pub use crate::device::{ComputeDevice, DeviceConfig, SoftwareDevice};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
        // Note: cull_* macros are NOT re-exported here - they are internal only
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Culling sub-module with all pipeline types
    pub mod culling {
        pub use crate::culling::*;
    }

    // Device sub-module with the backend traits
    pub mod device {
        pub use crate::device::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
