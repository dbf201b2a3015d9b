//! Native kernels for a 3D map renderer.
//!
//! Two independent kernels sharing only small primitives:
//!
//! - [`b3dtile`] decodes a compact binary tile format and answers spatial
//!   queries: octree descendant-depth probing, axis-aligned box clipping of
//!   the triangle mesh, and nearest ray/triangle intersection.
//! - [`sdfield`] converts a grayscale coverage image into a signed distance
//!   field texture for symbol and glyph rendering.
//!
//! Both are single-threaded and fully synchronous; every query runs to
//! completion within one call. The crate targets WebAssembly but is plain
//! portable Rust; the host boundary (callback registry and C-ABI entry
//! points) is confined to [`ffi`].

pub mod b3dtile;
pub mod ffi;
pub mod hashset;
pub mod sdfield;

pub use b3dtile::{ClipOutput, Rect, Tile, TileError, TileResult};
pub use sdfield::Converter;
