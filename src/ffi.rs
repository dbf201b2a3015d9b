//! C-ABI host boundary.
//!
//! The host installs three callbacks once, before constructing any tile;
//! after installation the registry is read-only. Results cross the boundary
//! through those callbacks (clip buffers are valid only during the call) or
//! through returned pointers whose lifetime is tied to the owning handle.
//! All `unsafe` in the crate lives here; the kernels themselves are safe
//! Rust returning plain values.

use std::ptr;

use once_cell::sync::OnceCell;

use crate::b3dtile::{Rect, Tile};
use crate::sdfield::Converter;

/// Fills `dst` with the tile bytes announced via `tile_create`'s size.
pub type BinaryCopyFn = unsafe extern "C" fn(dst: *mut u8);

/// Receives one clip result; `data` is only valid during the call.
pub type ClipResultFn = unsafe extern "C" fn(num_vertices: i32, num_triangles: i32, data: *const u8);

/// Receives one ray result; `distance == limit` means no intersection.
pub type RayResultFn = unsafe extern "C" fn(distance: f64, feature_id_lo: f64, feature_id_hi: f64);

struct HostCallbacks {
    binary_copy: BinaryCopyFn,
    clip_result: ClipResultFn,
    ray_result: RayResultFn,
}

static HOST: OnceCell<HostCallbacks> = OnceCell::new();

fn host() -> &'static HostCallbacks {
    HOST.get()
        .expect("initialize() must be called before any kernel entry")
}

/// Install the host callbacks. Only the first call has any effect.
#[no_mangle]
pub extern "C" fn initialize(
    binary_copy: BinaryCopyFn,
    clip_result: ClipResultFn,
    ray_result: RayResultFn,
) {
    let _ = HOST.set(HostCallbacks {
        binary_copy,
        clip_result,
        ray_result,
    });
}

/// Allocate a tile of `size` bytes, filled by the host's `binary_copy`
/// callback. Returns null when the buffer does not decode as a tile.
#[no_mangle]
pub unsafe extern "C" fn tile_create(size: i32) -> *mut Tile {
    assert!(size > 0);

    let mut data = vec![0u8; size as usize];
    (host().binary_copy)(data.as_mut_ptr());

    match Tile::new(data) {
        Ok(tile) => Box::into_raw(Box::new(tile)),
        Err(err) => {
            log::error!("tile_create: {err}");
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn tile_destroy(tile: *mut Tile) {
    assert!(!tile.is_null());
    drop(Box::from_raw(tile));
}

#[no_mangle]
pub unsafe extern "C" fn tile_get_descendant_depth(
    tile: *const Tile,
    x: f64,
    y: f64,
    z: f64,
    limit: i32,
) -> i32 {
    let tile = tile.as_ref().expect("null tile handle");
    tile.descendant_depth(x, y, z, limit)
}

#[no_mangle]
pub unsafe extern "C" fn tile_clip(tile: *const Tile, x: f32, y: f32, z: f32, size: f32) {
    let tile = tile.as_ref().expect("null tile handle");
    let output = tile.clip(x, y, z, size);
    (host().clip_result)(
        output.num_vertices as i32,
        output.num_triangles as i32,
        output.data.as_ptr(),
    );
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn tile_find_ray_distance(
    tile: *const Tile,
    ray_px: f64,
    ray_py: f64,
    ray_pz: f64,
    ray_dx: f64,
    ray_dy: f64,
    ray_dz: f64,
    limit: f64,
    lrect_ox: f32,
    lrect_oy: f32,
    lrect_oz: f32,
    lrect_size: f32,
) {
    let tile = tile.as_ref().expect("null tile handle");
    let lrect = Rect::create_cube([lrect_ox, lrect_oy, lrect_oz], lrect_size);
    let distance = tile.find_ray_distance(
        [ray_px, ray_py, ray_pz],
        [ray_dx, ray_dy, ray_dz],
        limit,
        &lrect,
    );
    // Feature ids are not populated in this scope.
    (host().ray_result)(distance, 0.0, 0.0);
}

#[no_mangle]
pub extern "C" fn converter_create(width: i32, height: i32, sdf_ext: i32) -> *mut Converter {
    Box::into_raw(Box::new(Converter::new(width, height, sdf_ext)))
}

#[no_mangle]
pub unsafe extern "C" fn converter_destroy(conv: *mut Converter) {
    assert!(!conv.is_null());
    drop(Box::from_raw(conv));
}

/// Address the host fills with `width * height` coverage bytes.
#[no_mangle]
pub unsafe extern "C" fn converter_get_write_position(conv: *mut Converter) -> *mut u8 {
    let conv = conv.as_mut().expect("null converter handle");
    conv.coverage_mut().as_mut_ptr()
}

/// Run the build; the returned pointer stays valid until the converter is
/// destroyed. Rows are `align4(width + 2 * sdf_ext)` bytes apart, row 0 at
/// the bottom.
#[no_mangle]
pub unsafe extern "C" fn converter_build_sdf(conv: *mut Converter) -> *const u8 {
    let conv = conv.as_mut().expect("null converter handle");
    conv.build_sdf().as_ptr()
}
