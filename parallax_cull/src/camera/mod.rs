//! Camera module — low-level camera and frustum plane extraction.
//!
//! Provides passive data containers for the culling pipeline.
//! The pipeline does NOT store or manage cameras — they are tools
//! provided by the crate, owned and driven by the caller.

mod camera;
mod frustum;

pub use camera::Camera;
pub use frustum::{
    Frustum,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
