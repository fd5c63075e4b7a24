//! Documentation for the C API.
//!
//! For easier integration, none of the FFI methods allocate memory.
//! When tiling or untiling, allocate the destination array by calling
//! functions like [image_size], [mipmap_size] or [unpitched_image_size]
//! first.
//!
//! Surfaces are described by the same scalar fields as
//! [SurfaceDescription](crate::surface::SurfaceDescription), passed in
//! register encoded form: `tile_mode`, `format` and `dim` take the
//! AddrTileMode, data format and dim register values and `usage` takes the
//! [SurfaceUse](crate::surface::SurfaceUse) flag bits.
use crate::surface::{DataFormat, SurfaceDescription, SurfaceDim, SurfaceUse};
use crate::TileMode;

fn surface_description(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
) -> SurfaceDescription {
    SurfaceDescription {
        tile_mode: TileMode::new(tile_mode).unwrap(),
        format: DataFormat::new(format).unwrap(),
        bpp: bpp as usize,
        width: width as usize,
        height: height as usize,
        num_slices: num_slices as usize,
        num_samples: num_samples as usize,
        num_levels: num_levels as usize,
        bank_swizzle: bank_swizzle as usize,
        pipe_swizzle: pipe_swizzle as usize,
        usage: SurfaceUse::from_bits(usage),
        dim: SurfaceDim::new(dim).unwrap(),
    }
}

/// See [crate::surface::image_size].
///
/// # Safety
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn image_size(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
) -> usize {
    crate::surface::image_size(&surface_description(
        tile_mode,
        format,
        bpp,
        width,
        height,
        num_slices,
        num_samples,
        num_levels,
        bank_swizzle,
        pipe_swizzle,
        usage,
        dim,
    ))
}

/// See [crate::surface::mipmap_size].
///
/// # Safety
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn mipmap_size(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
) -> usize {
    crate::surface::mipmap_size(&surface_description(
        tile_mode,
        format,
        bpp,
        width,
        height,
        num_slices,
        num_samples,
        num_levels,
        bank_swizzle,
        pipe_swizzle,
        usage,
        dim,
    ))
}

/// See [crate::surface::mip_offset].
///
/// # Safety
/// `tile_mode`, `format` and `dim` must be valid register encoded values and
/// `level` must be between 1 and `num_levels - 1`.
#[no_mangle]
pub unsafe extern "C" fn mip_offset(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    level: u32,
) -> usize {
    crate::surface::mip_offset(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        level as usize,
    )
}

/// See [crate::surface::untile_image].
///
/// # Safety
/// `source` and `source_len` should refer to an array with at least as many
/// bytes as the result of [image_size], and likewise for `destination` and
/// `destination_len`.
///
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn untile_image(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::surface::untile_image(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
    )
    .unwrap();
}

/// See [crate::surface::untile_image_slice].
///
/// # Safety
/// The same conditions as [untile_image] apply, and `slice` must be less
/// than `num_slices`.
#[no_mangle]
pub unsafe extern "C" fn untile_image_slice(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
    slice: u32,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::surface::untile_image_slice(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
        slice as usize,
    )
    .unwrap();
}

/// See [crate::surface::untile_mipmaps].
///
/// # Safety
/// `source` and `source_len` should refer to an array with at least as many
/// bytes as the result of [mipmap_size], and likewise for `destination` and
/// `destination_len`.
///
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn untile_mipmaps(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::surface::untile_mipmaps(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
    )
    .unwrap();
}

/// See [crate::surface::untile_mip].
///
/// # Safety
/// The same conditions as [untile_mipmaps] apply, and `level` must be
/// between 1 and `num_levels - 1`.
#[no_mangle]
pub unsafe extern "C" fn untile_mip(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
    level: u32,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::surface::untile_mip(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
        level as usize,
    )
    .unwrap();
}

/// See [crate::surface::untile_mip_slice].
///
/// # Safety
/// The same conditions as [untile_mip] apply, and `slice` must be less than
/// the slice count of the level.
#[no_mangle]
pub unsafe extern "C" fn untile_mip_slice(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
    level: u32,
    slice: u32,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::surface::untile_mip_slice(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
        level as usize,
        slice as usize,
    )
    .unwrap();
}

/// See [crate::surface::tile_image].
///
/// # Safety
/// `source` and `source_len` should refer to an array with at least as many
/// bytes as the result of [image_size], and likewise for `destination` and
/// `destination_len`.
///
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn tile_image(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::surface::tile_image(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
    )
    .unwrap();
}

/// See [crate::surface::tile_mipmaps].
///
/// # Safety
/// `source` and `source_len` should refer to an array with at least as many
/// bytes as the result of [mipmap_size], and likewise for `destination` and
/// `destination_len`.
///
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn tile_mipmaps(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::surface::tile_mipmaps(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
    )
    .unwrap();
}

/// See [crate::unpitch::unpitched_image_size].
///
/// # Safety
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn unpitched_image_size(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
) -> usize {
    crate::unpitch::unpitched_image_size(&surface_description(
        tile_mode,
        format,
        bpp,
        width,
        height,
        num_slices,
        num_samples,
        num_levels,
        bank_swizzle,
        pipe_swizzle,
        usage,
        dim,
    ))
}

/// See [crate::unpitch::unpitched_mipmap_size].
///
/// # Safety
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn unpitched_mipmap_size(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
) -> usize {
    crate::unpitch::unpitched_mipmap_size(&surface_description(
        tile_mode,
        format,
        bpp,
        width,
        height,
        num_slices,
        num_samples,
        num_levels,
        bank_swizzle,
        pipe_swizzle,
        usage,
        dim,
    ))
}

/// See [crate::unpitch::unpitch_image].
///
/// # Safety
/// `source` and `source_len` should refer to an array with at least as many
/// bytes as the result of [image_size]. `destination` and `destination_len`
/// should refer to an array with at least as many bytes as the result of
/// [unpitched_image_size].
///
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn unpitch_image(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::unpitch::unpitch_image(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
    )
    .unwrap();
}

/// See [crate::unpitch::unpitch_mipmaps].
///
/// # Safety
/// `source` and `source_len` should refer to an array with at least as many
/// bytes as the result of [mipmap_size]. `destination` and
/// `destination_len` should refer to an array with at least as many bytes
/// as the result of [unpitched_mipmap_size].
///
/// `tile_mode`, `format` and `dim` must be valid register encoded values.
#[no_mangle]
pub unsafe extern "C" fn unpitch_mipmaps(
    tile_mode: u32,
    format: u32,
    bpp: u32,
    width: u32,
    height: u32,
    num_slices: u32,
    num_samples: u32,
    num_levels: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    usage: u32,
    dim: u32,
    source: *const u8,
    source_len: usize,
    destination: *mut u8,
    destination_len: usize,
) {
    let source = std::slice::from_raw_parts(source, source_len);
    let destination = std::slice::from_raw_parts_mut(destination, destination_len);

    crate::unpitch::unpitch_mipmaps(
        &surface_description(
            tile_mode,
            format,
            bpp,
            width,
            height,
            num_slices,
            num_samples,
            num_levels,
            bank_swizzle,
            pipe_swizzle,
            usage,
            dim,
        ),
        source,
        destination,
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Macro2DTiledThin1, 32 bpp, 100x60x2 texture array with 3 mip levels.
    const DESC: [u32; 12] = [0x04, 0x1A, 32, 100, 60, 2, 1, 3, 0, 0, 1, 5];

    fn rust_description() -> SurfaceDescription {
        surface_description(
            DESC[0], DESC[1], DESC[2], DESC[3], DESC[4], DESC[5], DESC[6], DESC[7], DESC[8],
            DESC[9], DESC[10], DESC[11],
        )
    }

    #[test]
    fn untile_image_matches_safe_api() {
        let size = unsafe {
            image_size(
                DESC[0], DESC[1], DESC[2], DESC[3], DESC[4], DESC[5], DESC[6], DESC[7], DESC[8],
                DESC[9], DESC[10], DESC[11],
            )
        };
        assert_eq!(crate::surface::image_size(&rust_description()), size);

        let mut rng = StdRng::from_seed([73u8; 32]);
        let tiled: Vec<u8> = (0..size).map(|_| rng.gen()).collect();

        let mut expected = vec![0u8; size];
        crate::surface::untile_image(&rust_description(), &tiled, &mut expected).unwrap();

        let mut actual = vec![0u8; size];
        unsafe {
            untile_image(
                DESC[0],
                DESC[1],
                DESC[2],
                DESC[3],
                DESC[4],
                DESC[5],
                DESC[6],
                DESC[7],
                DESC[8],
                DESC[9],
                DESC[10],
                DESC[11],
                tiled.as_ptr(),
                tiled.len(),
                actual.as_mut_ptr(),
                actual.len(),
            );
        }
        assert_eq!(expected, actual);
    }

    #[test]
    fn tile_then_untile_round_trips() {
        let size = crate::surface::image_size(&rust_description());

        let mut rng = StdRng::from_seed([79u8; 32]);
        let untiled: Vec<u8> = (0..size).map(|_| rng.gen()).collect();

        let mut tiled = vec![0u8; size];
        unsafe {
            tile_image(
                DESC[0],
                DESC[1],
                DESC[2],
                DESC[3],
                DESC[4],
                DESC[5],
                DESC[6],
                DESC[7],
                DESC[8],
                DESC[9],
                DESC[10],
                DESC[11],
                untiled.as_ptr(),
                untiled.len(),
                tiled.as_mut_ptr(),
                tiled.len(),
            );
        }

        let mut round_tripped = vec![0u8; size];
        unsafe {
            untile_image(
                DESC[0],
                DESC[1],
                DESC[2],
                DESC[3],
                DESC[4],
                DESC[5],
                DESC[6],
                DESC[7],
                DESC[8],
                DESC[9],
                DESC[10],
                DESC[11],
                tiled.as_ptr(),
                tiled.len(),
                round_tripped.as_mut_ptr(),
                round_tripped.len(),
            );
        }
        assert_eq!(untiled, round_tripped);
    }

    #[test]
    fn mip_sizes_match_safe_api() {
        let description = rust_description();
        unsafe {
            assert_eq!(
                crate::surface::mipmap_size(&description),
                mipmap_size(
                    DESC[0], DESC[1], DESC[2], DESC[3], DESC[4], DESC[5], DESC[6], DESC[7],
                    DESC[8], DESC[9], DESC[10], DESC[11],
                )
            );
            assert_eq!(
                crate::surface::mip_offset(&description, 2),
                mip_offset(
                    DESC[0], DESC[1], DESC[2], DESC[3], DESC[4], DESC[5], DESC[6], DESC[7],
                    DESC[8], DESC[9], DESC[10], DESC[11], 2,
                )
            );
            assert_eq!(
                crate::unpitch::unpitched_image_size(&description),
                unpitched_image_size(
                    DESC[0], DESC[1], DESC[2], DESC[3], DESC[4], DESC[5], DESC[6], DESC[7],
                    DESC[8], DESC[9], DESC[10], DESC[11],
                )
            );
        }
    }
}
