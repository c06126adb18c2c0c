//! GPU visibility culling
//!
//! Two device-side stages: a one-time parallel AABB reduction over the
//! scene geometry (`SceneBounds`) and a per-frame six-plane visibility
//! test (`VisibilityPass`). `CullingPipeline` owns both plus the device
//! resources that connect them.

mod bounds_builder;
mod culling_pipeline;
mod kernels;
mod visibility_pass;

pub use bounds_builder::SceneBounds;
pub use culling_pipeline::{
    CullingConfig, CullingPipeline, FrameStats, KernelSet, PipelineState,
};
pub use kernels::{
    REDUCE_LOCAL_SIZE, fold_bounds_desc, reduce_bounds_desc, test_visibility_desc,
};
pub use visibility_pass::VisibilityPass;
