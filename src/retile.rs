//! Retiling between the hardware tiled layouts and row-major element order.
//!
//! [retile_info] derives the kernel parameters for one mip level from its
//! computed [SurfaceInfo](crate::surface::SurfaceInfo). [tile] and [untile]
//! then transcode any contiguous range of depth slices. The kernels never
//! interpret elements, so the same parameters work for any format with the
//! same bits per element.
use crate::surface::{surface_info, SurfaceDescription, SurfaceInfo};
use crate::{
    round_down, round_up, TileMode, GROUP_MASK, MICRO_TILE_HEIGHT, MICRO_TILE_WIDTH,
    NUM_BANKS, NUM_BANK_BITS, NUM_GROUP_BITS, NUM_PIPES, NUM_PIPE_BITS, PIPE_INTERLEAVE_BYTES,
    ROW_SIZE, SPLIT_SIZE, SWAP_SIZE,
};
use std::fmt;

/// Errors than can occur while tiling or untiling surface data.
#[derive(Debug, PartialEq, Eq)]
pub enum TileError {
    /// The source or destination buffer does not fit the requested slices.
    NotEnoughData {
        expected_size: usize,
        actual_size: usize,
    },
}

impl fmt::Display for TileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TileError::NotEnoughData {
                expected_size,
                actual_size,
            } => write!(
                f,
                "Not enough data. Expected {} bytes but found {} bytes.",
                expected_size, actual_size
            ),
        }
    }
}

impl std::error::Error for TileError {}

/// Precomputed parameters for retiling one mip level of a surface.
///
/// The values only depend on the surface layout, so they can be computed once
/// and reused for every slice range and for both directions.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RetileInfo {
    pub tile_mode: TileMode,
    pub bits_per_element: usize,
    /// Depth buffers interleave elements differently than color data.
    pub is_depth: bool,
    /// Bytes in one unpadded depth slice of the level.
    pub thin_slice_bytes: usize,
    pub is_tiled: bool,
    pub is_macro_tiled: bool,
    pub macro_tile_width: usize,
    pub macro_tile_height: usize,
    pub micro_tile_thickness: usize,
    /// Bytes in one micro tile including all of its thickness slices.
    pub thick_micro_tile_bytes: usize,
    pub num_tiles_per_row: usize,
    pub num_tiles_per_slice: usize,
    pub bank_swizzle: usize,
    pub pipe_swizzle: usize,
    /// Macro tile swap boundary in elements for the bank swapped modes, 0 otherwise.
    pub bank_swap_width: usize,
}

/// Computes the retiling parameters for a mip level described by `info`.
///
/// # Panics
/// Panics if the bits per element are unsupported for the surface class.
/// Color surfaces support 8, 16, 32, 64 and 128 bits per element and depth
/// surfaces support 16, 32 and 64.
pub fn retile_info(info: &SurfaceInfo) -> RetileInfo {
    let is_depth = info.usage.is_depth_buffer();
    if is_depth {
        assert!(
            matches!(info.bpp, 16 | 32 | 64),
            "Invalid depth surface bpp {}",
            info.bpp
        );
    } else {
        assert!(
            matches!(info.bpp, 8 | 16 | 32 | 64 | 128),
            "Invalid color surface bpp {}",
            info.bpp
        );
    }

    let tile_mode = info.tile_mode;
    let bytes_per_element = info.bpp / 8;
    let micro_tile_thickness = tile_mode.micro_tile_thickness();

    let num_tiles_per_row = info.pitch / MICRO_TILE_WIDTH;
    let num_tiles_per_slice = num_tiles_per_row * (info.height / MICRO_TILE_HEIGHT);

    let bank_swap_width = if tile_mode.is_bank_swapped() {
        // The kernels only accept single sample data.
        compute_bank_swap_width(tile_mode, info.bpp, 1, info.pitch)
    } else {
        0
    };

    RetileInfo {
        tile_mode,
        bits_per_element: info.bpp,
        is_depth,
        thin_slice_bytes: info.pitch * info.height * bytes_per_element,
        is_tiled: tile_mode.is_tiled(),
        is_macro_tiled: tile_mode.is_macro_tiled(),
        macro_tile_width: tile_mode.macro_tile_width(),
        macro_tile_height: tile_mode.macro_tile_height(),
        micro_tile_thickness,
        thick_micro_tile_bytes: MICRO_TILE_WIDTH
            * MICRO_TILE_HEIGHT
            * micro_tile_thickness
            * bytes_per_element,
        num_tiles_per_row,
        num_tiles_per_slice,
        bank_swizzle: info.bank_swizzle,
        pipe_swizzle: info.pipe_swizzle,
        bank_swap_width,
    }
}

/// Retiling parameters scoped to a contiguous slice range of the base level,
/// together with the byte windows the kernels expect.
///
/// The offsets address whole image buffers laid out by
/// [surface_info](crate::surface::surface_info). The tiled window covers the
/// complete thick slice groups the range touches, the untiled window covers
/// exactly the requested slices.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SliceRetileInfo {
    pub info: RetileInfo,
    pub first_slice: usize,
    pub num_slices: usize,
    /// Byte offset of the first thick slice group touched by the range.
    pub tiled_offset: usize,
    /// Tiled bytes starting at `tiled_offset`, in whole thick groups.
    pub tiled_size: usize,
    /// Byte offset of `first_slice` in the untiled layout.
    pub untiled_offset: usize,
    pub untiled_size: usize,
}

/// Computes [retile_info] for the base level of a surface together with the
/// buffer windows for a contiguous slice range.
pub fn slice_retile_info(
    description: &SurfaceDescription,
    first_slice: usize,
    num_slices: usize,
) -> SliceRetileInfo {
    let info = retile_info(&surface_info(description, 0));
    let thin_slice_bytes = info.thin_slice_bytes;

    SliceRetileInfo {
        info,
        first_slice,
        num_slices,
        tiled_offset: round_down(first_slice, info.micro_tile_thickness) * thin_slice_bytes,
        tiled_size: tiled_span(&info, first_slice, num_slices),
        untiled_offset: first_slice * thin_slice_bytes,
        untiled_size: num_slices * thin_slice_bytes,
    }
}

/// Untiles `num_slices` slices of tiled data starting at `first_slice`.
///
/// `tiled` must start at the thick slice group containing `first_slice` and
/// cover every thick group the range touches. `untiled` starts at
/// `first_slice` itself and holds exactly the requested slices.
///
/// # Examples
/**
```rust
use latte_tiling::TileMode;
use latte_tiling::retile::{retile_info, untile};
use latte_tiling::surface::{surface_info, DataFormat, SurfaceDescription, SurfaceDim, SurfaceUse};

# fn main() -> Result<(), latte_tiling::TileError> {
let description = SurfaceDescription {
    tile_mode: TileMode::Micro1DTiledThin1,
    format: DataFormat::Fmt8_8_8_8,
    bpp: 32,
    width: 64,
    height: 64,
    num_slices: 1,
    num_samples: 1,
    num_levels: 1,
    bank_swizzle: 0,
    pipe_swizzle: 0,
    usage: SurfaceUse::TEXTURE,
    dim: SurfaceDim::Texture2D,
};
let params = retile_info(&surface_info(&description, 0));

let tiled = vec![0u8; params.thin_slice_bytes];
let mut untiled = vec![0u8; params.thin_slice_bytes];
untile(&params, &tiled, &mut untiled, 0, 1)?;
# Ok(())
# }
```
*/
pub fn untile(
    info: &RetileInfo,
    tiled: &[u8],
    untiled: &mut [u8],
    first_slice: usize,
    num_slices: usize,
) -> Result<(), TileError> {
    let tiled_size = tiled_span(info, first_slice, num_slices);
    if tiled.len() < tiled_size {
        return Err(TileError::NotEnoughData {
            expected_size: tiled_size,
            actual_size: tiled.len(),
        });
    }

    let untiled_size = num_slices * info.thin_slice_bytes;
    if untiled.len() < untiled_size {
        return Err(TileError::NotEnoughData {
            expected_size: untiled_size,
            actual_size: untiled.len(),
        });
    }

    retile_inner::<true>(info, tiled, untiled, first_slice, num_slices);
    Ok(())
}

/// Tiles `num_slices` slices of row-major data starting at `first_slice`.
///
/// The buffer contract mirrors [untile] with the roles reversed.
pub fn tile(
    info: &RetileInfo,
    untiled: &[u8],
    tiled: &mut [u8],
    first_slice: usize,
    num_slices: usize,
) -> Result<(), TileError> {
    let untiled_size = num_slices * info.thin_slice_bytes;
    if untiled.len() < untiled_size {
        return Err(TileError::NotEnoughData {
            expected_size: untiled_size,
            actual_size: untiled.len(),
        });
    }

    let tiled_size = tiled_span(info, first_slice, num_slices);
    if tiled.len() < tiled_size {
        return Err(TileError::NotEnoughData {
            expected_size: tiled_size,
            actual_size: tiled.len(),
        });
    }

    retile_inner::<false>(info, untiled, tiled, first_slice, num_slices);
    Ok(())
}

/// The tiled bytes covered by a slice range, extended to whole thick groups.
pub(crate) fn tiled_span(info: &RetileInfo, first_slice: usize, num_slices: usize) -> usize {
    let thickness = info.micro_tile_thickness;
    let first = round_down(first_slice, thickness);
    let last = round_up(first_slice + num_slices, thickness);
    (last - first) * info.thin_slice_bytes
}

fn compute_bank_swap_width(
    tile_mode: TileMode,
    bpp: usize,
    num_samples: usize,
    pitch: usize,
) -> usize {
    let group_size = PIPE_INTERLEAVE_BYTES;
    let bytes_per_sample = 8 * bpp;
    let samples_per_tile = SPLIT_SIZE / bytes_per_sample;
    let slices_per_tile = if samples_per_tile != 0 {
        (num_samples / samples_per_tile).max(1)
    } else {
        1
    };

    let tile_samples = if tile_mode.micro_tile_thickness() == 4 {
        4
    } else {
        num_samples
    };
    let bytes_per_tile_slice = tile_samples * bytes_per_sample / slices_per_tile;

    let factor = match tile_mode {
        TileMode::Macro2BTiledThin2 => 2,
        TileMode::Macro2BTiledThin4 => 4,
        _ => 1,
    };

    let swap_tiles = ((SWAP_SIZE >> 1) / bpp).max(1);
    let swap_width = swap_tiles * MICRO_TILE_WIDTH * NUM_BANKS;
    let height_bytes = num_samples * factor * NUM_PIPES * bpp / slices_per_tile;
    let swap_max = NUM_PIPES * NUM_BANKS * ROW_SIZE / height_bytes;
    let swap_min = group_size * MICRO_TILE_WIDTH * NUM_BANKS / bytes_per_tile_slice;

    let mut bank_swap_width = swap_max.min(swap_min.max(swap_width));
    while bank_swap_width >= 2 * pitch {
        bank_swap_width >>= 1;
    }

    bank_swap_width
}

/// Fixed micro tile routines selected from the element class at run time.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum MicroTiler {
    Color8,
    Color16,
    Color32,
    Color64,
    Color128,
    Depth,
}

impl MicroTiler {
    fn new(bits_per_element: usize, is_depth: bool) -> MicroTiler {
        if is_depth {
            match bits_per_element {
                16 | 32 | 64 => MicroTiler::Depth,
                _ => panic!("Invalid depth surface bpp {}", bits_per_element),
            }
        } else {
            match bits_per_element {
                8 => MicroTiler::Color8,
                16 => MicroTiler::Color16,
                32 => MicroTiler::Color32,
                64 => MicroTiler::Color64,
                128 => MicroTiler::Color128,
                _ => panic!("Invalid color surface bpp {}", bits_per_element),
            }
        }
    }
}

// The tiled side indexes `source` when untiling and `destination` when tiling.
#[inline(always)]
fn copy_group<const UNTILE: bool>(
    source: &[u8],
    destination: &mut [u8],
    tiled_offset: usize,
    untiled_offset: usize,
    len: usize,
) {
    if UNTILE {
        destination[untiled_offset..untiled_offset + len]
            .copy_from_slice(&source[tiled_offset..tiled_offset + len]);
    } else {
        destination[tiled_offset..tiled_offset + len]
            .copy_from_slice(&source[untiled_offset..untiled_offset + len]);
    }
}

fn retile_inner<const UNTILE: bool>(
    info: &RetileInfo,
    source: &[u8],
    destination: &mut [u8],
    first_slice: usize,
    num_slices: usize,
) {
    if !info.is_tiled {
        // Linear layouts already store elements in row-major order.
        let total = num_slices * info.thin_slice_bytes;
        destination[..total].copy_from_slice(&source[..total]);
        return;
    }

    let tiler = MicroTiler::new(info.bits_per_element, info.is_depth);
    let bytes_per_element = info.bits_per_element / 8;
    let thickness = info.micro_tile_thickness;
    let thin_micro_tile_bytes = info.thick_micro_tile_bytes / thickness;
    let thick_slice_bytes = info.thin_slice_bytes * thickness;
    let untiled_stride = info.num_tiles_per_row * MICRO_TILE_WIDTH * bytes_per_element;

    let first_thick_slice_index = first_slice / thickness;
    let first_thin_slice_index = first_slice % thickness;

    let num_tiles = num_slices * info.num_tiles_per_slice;
    for tile_index in 0..num_tiles {
        let dispatch_slice_index = tile_index / info.num_tiles_per_slice;
        let slice_tile_index = tile_index % info.num_tiles_per_slice;
        let src_slice_index = first_slice + dispatch_slice_index;
        let local_slice_index = src_slice_index % thickness;
        let thick_slice_index = src_slice_index / thickness;

        let (mut untiled_offset, mut tiled_offset) = if info.is_macro_tiled {
            macro_tile_offsets(
                info,
                slice_tile_index,
                local_slice_index,
                thick_slice_index,
                thin_micro_tile_bytes,
                untiled_stride,
                bytes_per_element,
            )
        } else {
            micro_tile_offsets(
                info,
                slice_tile_index,
                local_slice_index,
                thin_micro_tile_bytes,
                bytes_per_element,
            )
        };

        // Thick groups advance linearly; partial ranges are rebased onto the
        // window the caller handed in.
        let thick_slice_offset = (thick_slice_index - first_thick_slice_index) * thick_slice_bytes;
        tiled_offset += thick_slice_offset;
        untiled_offset =
            untiled_offset + thick_slice_offset - first_thin_slice_index * info.thin_slice_bytes;

        match tiler {
            MicroTiler::Color8 => retile_micro_8::<UNTILE>(
                source,
                destination,
                tiled_offset,
                untiled_offset,
                untiled_stride,
            ),
            MicroTiler::Color16 => retile_micro_16::<UNTILE>(
                source,
                destination,
                tiled_offset,
                untiled_offset,
                untiled_stride,
            ),
            MicroTiler::Color32 => retile_micro_32::<UNTILE>(
                source,
                destination,
                tiled_offset,
                untiled_offset,
                untiled_stride,
            ),
            MicroTiler::Color64 => retile_micro_64::<UNTILE>(
                source,
                destination,
                tiled_offset,
                untiled_offset,
                untiled_stride,
                info.is_macro_tiled,
            ),
            MicroTiler::Color128 => retile_micro_128::<UNTILE>(
                source,
                destination,
                tiled_offset,
                untiled_offset,
                untiled_stride,
                info.is_macro_tiled,
            ),
            MicroTiler::Depth => retile_micro_depth::<UNTILE>(
                source,
                destination,
                tiled_offset,
                untiled_offset,
                untiled_stride,
                bytes_per_element,
            ),
        }
    }
}

fn micro_tile_offsets(
    info: &RetileInfo,
    slice_tile_index: usize,
    local_slice_index: usize,
    thin_micro_tile_bytes: usize,
    bytes_per_element: usize,
) -> (usize, usize) {
    let src_tile_y = slice_tile_index / info.num_tiles_per_row;
    let src_tile_x = slice_tile_index % info.num_tiles_per_row;

    let untiled_offset = local_slice_index * info.thin_slice_bytes
        + src_tile_x * MICRO_TILE_WIDTH * bytes_per_element
        + src_tile_y * info.num_tiles_per_row * thin_micro_tile_bytes;
    let tiled_offset =
        local_slice_index * thin_micro_tile_bytes + slice_tile_index * info.thick_micro_tile_bytes;

    (untiled_offset, tiled_offset)
}

fn macro_tile_offsets(
    info: &RetileInfo,
    slice_tile_index: usize,
    local_slice_index: usize,
    thick_slice_index: usize,
    thin_micro_tile_bytes: usize,
    untiled_stride: usize,
    bytes_per_element: usize,
) -> (usize, usize) {
    let micro_tiles_per_macro = info.macro_tile_width * info.macro_tile_height;
    let macro_tiles_per_row = info.num_tiles_per_row / info.macro_tile_width;
    let micro_tiles_per_macro_row = micro_tiles_per_macro * macro_tiles_per_row;

    let src_macro_tile_y = slice_tile_index / micro_tiles_per_macro_row;
    let macro_row_tile_index = slice_tile_index % micro_tiles_per_macro_row;
    let src_macro_tile_x = macro_row_tile_index / micro_tiles_per_macro;
    let micro_tile_index = macro_row_tile_index % micro_tiles_per_macro;
    let src_micro_tile_y = micro_tile_index / info.macro_tile_width;
    let src_micro_tile_x = micro_tile_index % info.macro_tile_width;
    let src_tile_x = src_macro_tile_x * info.macro_tile_width + src_micro_tile_x;
    let src_tile_y = src_macro_tile_y * info.macro_tile_height + src_micro_tile_y;

    let untiled_offset = local_slice_index * info.thin_slice_bytes
        + src_tile_x * MICRO_TILE_WIDTH * bytes_per_element
        + src_tile_y * MICRO_TILE_HEIGHT * untiled_stride;

    let macro_tile_bytes = micro_tiles_per_macro * info.thick_micro_tile_bytes;
    let macro_tile_index = src_macro_tile_y * macro_tiles_per_row + src_macro_tile_x;
    let macro_tile_offset = macro_tile_index * macro_tile_bytes;

    let tiled_base_offset = (macro_tile_offset >> (NUM_BANK_BITS + NUM_PIPE_BITS))
        + local_slice_index * thin_micro_tile_bytes;
    let offset_high = (tiled_base_offset & !GROUP_MASK) << (NUM_BANK_BITS + NUM_PIPE_BITS);
    let offset_low = tiled_base_offset & GROUP_MASK;

    let (bank_slice_rotation, pipe_slice_rotation) = if info.tile_mode.is_macro_3x() {
        (thick_slice_index / NUM_PIPES, thick_slice_index)
    } else {
        (((NUM_BANKS >> 1) - 1) * thick_slice_index, 0)
    };

    let mut bank_swap_rotation = 0;
    if info.tile_mode.is_bank_swapped() {
        const BANK_SWAP_ORDER: [usize; NUM_BANKS] = [0, 1, 3, 2];
        let swap_index =
            src_macro_tile_x * MICRO_TILE_WIDTH * info.macro_tile_width / info.bank_swap_width;
        bank_swap_rotation = BANK_SWAP_ORDER[swap_index % NUM_BANKS];
    }

    let mut bank = ((src_tile_x & 1) ^ ((src_tile_y >> 2) & 1))
        | ((((src_tile_x >> 1) & 1) ^ ((src_tile_y >> 1) & 1)) << 1);
    bank ^= (info.bank_swizzle + bank_slice_rotation) & (NUM_BANKS - 1);
    bank ^= bank_swap_rotation;

    let mut pipe = (src_tile_x & 1) ^ (src_tile_y & 1);
    pipe ^= (info.pipe_swizzle + pipe_slice_rotation) & (NUM_PIPES - 1);

    let tiled_offset = (bank << (NUM_GROUP_BITS + NUM_PIPE_BITS))
        | (pipe << NUM_GROUP_BITS)
        | offset_low
        | offset_high;

    (untiled_offset, tiled_offset)
}

fn retile_micro_8<const UNTILE: bool>(
    source: &[u8],
    destination: &mut [u8],
    tiled_offset: usize,
    untiled_offset: usize,
    untiled_stride: usize,
) {
    let tiled_stride = MICRO_TILE_WIDTH;
    let mut tiled = tiled_offset;
    let mut untiled = untiled_offset;

    // Rows 1 and 2 trade places within each group of 4 rows.
    for _ in (0..MICRO_TILE_HEIGHT).step_by(4) {
        copy_group::<UNTILE>(source, destination, tiled, untiled, 8);
        copy_group::<UNTILE>(
            source,
            destination,
            tiled + 2 * tiled_stride,
            untiled + untiled_stride,
            8,
        );
        copy_group::<UNTILE>(
            source,
            destination,
            tiled + tiled_stride,
            untiled + 2 * untiled_stride,
            8,
        );
        copy_group::<UNTILE>(
            source,
            destination,
            tiled + 3 * tiled_stride,
            untiled + 3 * untiled_stride,
            8,
        );

        tiled += 4 * tiled_stride;
        untiled += 4 * untiled_stride;
    }
}

fn retile_micro_16<const UNTILE: bool>(
    source: &[u8],
    destination: &mut [u8],
    tiled_offset: usize,
    untiled_offset: usize,
    untiled_stride: usize,
) {
    let tiled_stride = MICRO_TILE_WIDTH * 2;

    for row in 0..MICRO_TILE_HEIGHT {
        copy_group::<UNTILE>(
            source,
            destination,
            tiled_offset + row * tiled_stride,
            untiled_offset + row * untiled_stride,
            16,
        );
    }
}

fn retile_micro_32<const UNTILE: bool>(
    source: &[u8],
    destination: &mut [u8],
    tiled_offset: usize,
    untiled_offset: usize,
    untiled_stride: usize,
) {
    let tiled_stride = MICRO_TILE_WIDTH * 4;
    let mut tiled = tiled_offset;
    let mut untiled = untiled_offset;

    // Each pair of tiled rows holds the left then right halves of two
    // untiled rows.
    for _ in (0..MICRO_TILE_HEIGHT).step_by(2) {
        let tiled2 = tiled + tiled_stride;
        let untiled2 = untiled + untiled_stride;

        copy_group::<UNTILE>(source, destination, tiled, untiled, 16);
        copy_group::<UNTILE>(source, destination, tiled2, untiled + 16, 16);
        copy_group::<UNTILE>(source, destination, tiled + 16, untiled2, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 16, untiled2 + 16, 16);

        tiled += 2 * tiled_stride;
        untiled += 2 * untiled_stride;
    }
}

fn retile_micro_64<const UNTILE: bool>(
    source: &[u8],
    destination: &mut [u8],
    tiled_offset: usize,
    untiled_offset: usize,
    untiled_stride: usize,
    macro_tiling: bool,
) {
    let tiled_stride = MICRO_TILE_WIDTH * 8;
    let mut tiled = tiled_offset;
    let mut untiled = untiled_offset;

    for y in (0..MICRO_TILE_HEIGHT).step_by(2) {
        if macro_tiling && y == 4 {
            // The second half of the tile lives in the next bank/pipe group.
            tiled = tiled - y * tiled_stride + (0x100 << (NUM_BANK_BITS + NUM_PIPE_BITS));
        }

        let tiled2 = tiled + tiled_stride;
        let untiled2 = untiled + untiled_stride;

        copy_group::<UNTILE>(source, destination, tiled, untiled, 16);
        copy_group::<UNTILE>(source, destination, tiled + 16, untiled2, 16);
        copy_group::<UNTILE>(source, destination, tiled + 32, untiled + 16, 16);
        copy_group::<UNTILE>(source, destination, tiled + 48, untiled2 + 16, 16);
        copy_group::<UNTILE>(source, destination, tiled2, untiled + 32, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 16, untiled2 + 32, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 32, untiled + 48, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 48, untiled2 + 48, 16);

        tiled += 2 * tiled_stride;
        untiled += 2 * untiled_stride;
    }
}

fn retile_micro_128<const UNTILE: bool>(
    source: &[u8],
    destination: &mut [u8],
    tiled_offset: usize,
    untiled_offset: usize,
    untiled_stride: usize,
    macro_tiling: bool,
) {
    let tiled_stride = MICRO_TILE_WIDTH * 16;
    let mut tiled = tiled_offset;
    let mut untiled = untiled_offset;

    // Elements of two untiled rows interleave across two tiled rows.
    for _ in (0..MICRO_TILE_HEIGHT).step_by(2) {
        let tiled2 = tiled + tiled_stride;
        let untiled2 = untiled + untiled_stride;

        copy_group::<UNTILE>(source, destination, tiled, untiled, 16);
        copy_group::<UNTILE>(source, destination, tiled + 32, untiled + 16, 16);
        copy_group::<UNTILE>(source, destination, tiled + 16, untiled2, 16);
        copy_group::<UNTILE>(source, destination, tiled + 48, untiled2 + 16, 16);
        copy_group::<UNTILE>(source, destination, tiled + 64, untiled + 32, 16);
        copy_group::<UNTILE>(source, destination, tiled + 96, untiled + 48, 16);
        copy_group::<UNTILE>(source, destination, tiled + 80, untiled2 + 32, 16);
        copy_group::<UNTILE>(source, destination, tiled + 112, untiled2 + 48, 16);
        copy_group::<UNTILE>(source, destination, tiled2, untiled + 64, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 32, untiled + 80, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 16, untiled2 + 64, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 48, untiled2 + 80, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 64, untiled + 96, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 96, untiled + 112, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 80, untiled2 + 96, 16);
        copy_group::<UNTILE>(source, destination, tiled2 + 112, untiled2 + 112, 16);

        if macro_tiling {
            tiled += 0x100 << (NUM_BANK_BITS + NUM_PIPE_BITS);
        } else {
            tiled += 2 * tiled_stride;
        }
        untiled += 2 * untiled_stride;
    }
}

fn retile_micro_depth<const UNTILE: bool>(
    source: &[u8],
    destination: &mut [u8],
    tiled_offset: usize,
    untiled_offset: usize,
    untiled_stride: usize,
    bytes_per_element: usize,
) {
    let group_bytes = 2 * bytes_per_element;
    let tiled_stride = MICRO_TILE_WIDTH * bytes_per_element;

    for y in (0..MICRO_TILE_HEIGHT).step_by(4) {
        // (tiled x, tiled y, untiled x, untiled y) in units of 2 element groups.
        let groups = [
            (0, y, 0, y),
            (1, y, 0, y + 1),
            (2, y, 1, y),
            (3, y, 1, y + 1),
            (0, y + 1, 0, y + 2),
            (1, y + 1, 0, y + 3),
            (2, y + 1, 1, y + 2),
            (3, y + 1, 1, y + 3),
            (0, y + 2, 2, y),
            (1, y + 2, 2, y + 1),
            (2, y + 2, 3, y),
            (3, y + 2, 3, y + 1),
            (0, y + 3, 2, y + 2),
            (1, y + 3, 2, y + 3),
            (2, y + 3, 3, y + 2),
            (3, y + 3, 3, y + 3),
        ];

        for (tiled_x, tiled_y, untiled_x, untiled_y) in groups {
            copy_group::<UNTILE>(
                source,
                destination,
                tiled_offset + tiled_y * tiled_stride + tiled_x * group_bytes,
                untiled_offset + untiled_y * untiled_stride + untiled_x * group_bytes,
                group_bytes,
            );
        }
    }
}
