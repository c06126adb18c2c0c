//! Scene-facing types and collaborator interfaces
//!
//! The engine does NOT store or manage scenes — it reads geometry through
//! `VertexSource` once at init and writes visibility through
//! `RenderEnableSink` every frame. Both are owned and driven by the caller.

mod aabb;
mod geometry;

pub use aabb::Aabb;
pub use geometry::{
    RenderEnableSink, SceneGeometry, SceneObject, VertexSource, VisibilityFlags,
};
