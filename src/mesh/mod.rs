//! Engine-agnostic mesh representation.
//!
//! Rendering backends consume these handles through a thin adapter; the
//! pipeline itself only ever works with plain vertex/index buffers.

mod builder;
mod resource;

pub use builder::MeshBuilder;
pub use resource::{BoundingBox, MeshResource};
