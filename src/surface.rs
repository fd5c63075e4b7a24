//! Surface layout calculation and whole surface retiling.
//!
//! The hardware pads every mip level to aligned dimensions and picks a per
//! level tile mode, so retiling a complete resource means recomputing the
//! layout for each level first. [surface_info] resolves that layout,
//! [image_size], [mipmap_size] and [mip_offset] size and address the backing
//! buffers and the untile and tile functions drive the
//! [retile](crate::retile) kernels over every slice window.

use crate::retile::{retile_info, tile, untile, RetileInfo, TileError};
use crate::{
    round_down, round_up, TileMode, MICRO_TILE_HEIGHT, MICRO_TILE_WIDTH, NUM_BANKS,
    PIPE_INTERLEAVE_BYTES,
};

/// Hardware data formats from the texture fetch constant encoding.
///
/// The tiling kernels treat elements as opaque bytes, so the format only
/// influences layout for [TileMode::LinearSpecial] surfaces, where block
/// compressed formats address whole 4x4 blocks.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum DataFormat {
    Invalid = 0x00,
    Fmt8 = 0x01,
    Fmt4_4 = 0x02,
    Fmt3_3_2 = 0x03,
    Fmt16 = 0x05,
    Fmt16Float = 0x06,
    Fmt8_8 = 0x07,
    Fmt5_6_5 = 0x08,
    Fmt6_5_5 = 0x09,
    Fmt1_5_5_5 = 0x0A,
    Fmt4_4_4_4 = 0x0B,
    Fmt5_5_5_1 = 0x0C,
    Fmt32 = 0x0D,
    Fmt32Float = 0x0E,
    Fmt16_16 = 0x0F,
    Fmt16_16Float = 0x10,
    Fmt8_24 = 0x11,
    Fmt8_24Float = 0x12,
    Fmt24_8 = 0x13,
    Fmt24_8Float = 0x14,
    Fmt10_11_11 = 0x15,
    Fmt10_11_11Float = 0x16,
    Fmt11_11_10 = 0x17,
    Fmt11_11_10Float = 0x18,
    Fmt2_10_10_10 = 0x19,
    Fmt8_8_8_8 = 0x1A,
    Fmt10_10_10_2 = 0x1B,
    FmtX24_8_32Float = 0x1C,
    Fmt32_32 = 0x1D,
    Fmt32_32Float = 0x1E,
    Fmt16_16_16_16 = 0x1F,
    Fmt16_16_16_16Float = 0x20,
    Fmt32_32_32_32 = 0x22,
    Fmt32_32_32_32Float = 0x23,
    Fmt1 = 0x25,
    FmtGbGr = 0x27,
    FmtBgRg = 0x28,
    Fmt32As8 = 0x29,
    Fmt32As8_8 = 0x2A,
    Fmt5_9_9_9SharedExp = 0x2B,
    Fmt8_8_8 = 0x2C,
    Fmt16_16_16 = 0x2D,
    Fmt16_16_16Float = 0x2E,
    Fmt32_32_32 = 0x2F,
    Fmt32_32_32Float = 0x30,
    FmtBc1 = 0x31,
    FmtBc2 = 0x32,
    FmtBc3 = 0x33,
    FmtBc4 = 0x34,
    FmtBc5 = 0x35,
    FmtApc0 = 0x36,
    FmtApc1 = 0x37,
    FmtApc2 = 0x38,
    FmtApc3 = 0x39,
    FmtApc4 = 0x3A,
    FmtApc5 = 0x3B,
    FmtApc6 = 0x3C,
    FmtApc7 = 0x3D,
    FmtCtx1 = 0x3E,
}

impl DataFormat {
    /// Converts a raw register value to the matching format, if any.
    pub fn new(value: u32) -> Option<DataFormat> {
        Some(match value {
            0x00 => DataFormat::Invalid,
            0x01 => DataFormat::Fmt8,
            0x02 => DataFormat::Fmt4_4,
            0x03 => DataFormat::Fmt3_3_2,
            0x05 => DataFormat::Fmt16,
            0x06 => DataFormat::Fmt16Float,
            0x07 => DataFormat::Fmt8_8,
            0x08 => DataFormat::Fmt5_6_5,
            0x09 => DataFormat::Fmt6_5_5,
            0x0A => DataFormat::Fmt1_5_5_5,
            0x0B => DataFormat::Fmt4_4_4_4,
            0x0C => DataFormat::Fmt5_5_5_1,
            0x0D => DataFormat::Fmt32,
            0x0E => DataFormat::Fmt32Float,
            0x0F => DataFormat::Fmt16_16,
            0x10 => DataFormat::Fmt16_16Float,
            0x11 => DataFormat::Fmt8_24,
            0x12 => DataFormat::Fmt8_24Float,
            0x13 => DataFormat::Fmt24_8,
            0x14 => DataFormat::Fmt24_8Float,
            0x15 => DataFormat::Fmt10_11_11,
            0x16 => DataFormat::Fmt10_11_11Float,
            0x17 => DataFormat::Fmt11_11_10,
            0x18 => DataFormat::Fmt11_11_10Float,
            0x19 => DataFormat::Fmt2_10_10_10,
            0x1A => DataFormat::Fmt8_8_8_8,
            0x1B => DataFormat::Fmt10_10_10_2,
            0x1C => DataFormat::FmtX24_8_32Float,
            0x1D => DataFormat::Fmt32_32,
            0x1E => DataFormat::Fmt32_32Float,
            0x1F => DataFormat::Fmt16_16_16_16,
            0x20 => DataFormat::Fmt16_16_16_16Float,
            0x22 => DataFormat::Fmt32_32_32_32,
            0x23 => DataFormat::Fmt32_32_32_32Float,
            0x25 => DataFormat::Fmt1,
            0x27 => DataFormat::FmtGbGr,
            0x28 => DataFormat::FmtBgRg,
            0x29 => DataFormat::Fmt32As8,
            0x2A => DataFormat::Fmt32As8_8,
            0x2B => DataFormat::Fmt5_9_9_9SharedExp,
            0x2C => DataFormat::Fmt8_8_8,
            0x2D => DataFormat::Fmt16_16_16,
            0x2E => DataFormat::Fmt16_16_16Float,
            0x2F => DataFormat::Fmt32_32_32,
            0x30 => DataFormat::Fmt32_32_32Float,
            0x31 => DataFormat::FmtBc1,
            0x32 => DataFormat::FmtBc2,
            0x33 => DataFormat::FmtBc3,
            0x34 => DataFormat::FmtBc4,
            0x35 => DataFormat::FmtBc5,
            0x36 => DataFormat::FmtApc0,
            0x37 => DataFormat::FmtApc1,
            0x38 => DataFormat::FmtApc2,
            0x39 => DataFormat::FmtApc3,
            0x3A => DataFormat::FmtApc4,
            0x3B => DataFormat::FmtApc5,
            0x3C => DataFormat::FmtApc6,
            0x3D => DataFormat::FmtApc7,
            0x3E => DataFormat::FmtCtx1,
            _ => return None,
        })
    }

    /// Whether elements of this format are compressed 4x4 texel blocks.
    pub const fn is_block_compressed(self) -> bool {
        matches!(
            self,
            DataFormat::FmtBc1
                | DataFormat::FmtBc2
                | DataFormat::FmtBc3
                | DataFormat::FmtBc4
                | DataFormat::FmtBc5
        )
    }
}

/// The dimensionality of a surface resource.
///
/// The dimension decides how mip levels shrink and how `num_slices` is
/// interpreted, so it feeds into every layout calculation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum SurfaceDim {
    Texture1D = 0,
    Texture2D = 1,
    Texture3D = 2,
    TextureCube = 3,
    Texture1DArray = 4,
    Texture2DArray = 5,
    Texture2DMsaa = 6,
    Texture2DMsaaArray = 7,
}

impl SurfaceDim {
    /// Converts a raw register value to the matching dimension, if any.
    pub fn new(value: u32) -> Option<SurfaceDim> {
        Some(match value {
            0 => SurfaceDim::Texture1D,
            1 => SurfaceDim::Texture2D,
            2 => SurfaceDim::Texture3D,
            3 => SurfaceDim::TextureCube,
            4 => SurfaceDim::Texture1DArray,
            5 => SurfaceDim::Texture2DArray,
            6 => SurfaceDim::Texture2DMsaa,
            7 => SurfaceDim::Texture2DMsaaArray,
            _ => return None,
        })
    }
}

/// Usage flags for a surface.
///
/// Depth buffers order the elements inside each micro tile differently, so
/// the usage travels with the layout into the tiling kernels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct SurfaceUse(u32);

impl SurfaceUse {
    pub const NONE: SurfaceUse = SurfaceUse(0);
    pub const TEXTURE: SurfaceUse = SurfaceUse(1 << 0);
    pub const COLOR_BUFFER: SurfaceUse = SurfaceUse(1 << 1);
    pub const DEPTH_BUFFER: SurfaceUse = SurfaceUse(1 << 2);
    pub const SCAN_BUFFER: SurfaceUse = SurfaceUse(1 << 3);

    /// Builds a usage from its raw flag bits.
    pub const fn from_bits(bits: u32) -> SurfaceUse {
        SurfaceUse(bits)
    }

    /// The raw flag bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether the surface uses the depth element order inside micro tiles.
    pub const fn is_depth_buffer(self) -> bool {
        self.0 & SurfaceUse::DEPTH_BUFFER.0 != 0
    }
}

impl std::ops::BitOr for SurfaceUse {
    type Output = SurfaceUse;

    fn bitor(self, rhs: SurfaceUse) -> SurfaceUse {
        SurfaceUse(self.0 | rhs.0)
    }
}

/// A description of a complete surface resource in GPU memory.
///
/// The fields match what a texture or render target register set carries.
/// Dimensions are the unpadded base level dimensions and `num_slices` counts
/// array layers or volume depth depending on `dim`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct SurfaceDescription {
    pub tile_mode: TileMode,
    pub format: DataFormat,
    /// Bits per element. For block compressed formats an element is one
    /// complete block.
    pub bpp: usize,
    pub width: usize,
    pub height: usize,
    pub num_slices: usize,
    pub num_samples: usize,
    pub num_levels: usize,
    pub bank_swizzle: usize,
    pub pipe_swizzle: usize,
    pub usage: SurfaceUse,
    pub dim: SurfaceDim,
}

/// The computed layout of one mip level.
///
/// `pitch`, `height` and `depth` are the padded dimensions the hardware
/// stores, so they can exceed the level dimensions that produced them. The
/// alignments that created the padding are carried along for buffer
/// placement. Sizes are in bytes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SurfaceInfo {
    /// The resolved tile mode, which can differ from the requested one for
    /// small mip levels.
    pub tile_mode: TileMode,
    pub usage: SurfaceUse,
    pub bpp: usize,
    pub pitch: usize,
    pub height: usize,
    pub depth: usize,
    pub surf_size: usize,
    pub slice_size: usize,
    pub base_align: usize,
    pub pitch_align: usize,
    pub height_align: usize,
    pub depth_align: usize,
    pub bank_swizzle: usize,
    pub pipe_swizzle: usize,
}

/// Computes the padded layout of mip `level` of a surface.
///
/// Level 0 keeps the requested tile mode. Higher levels shift the dimensions
/// down, can fall back to a simpler tile mode once the level no longer fills
/// a macro tile and are rounded up to powers of two before alignment.
///
/// # Panics
/// Panics if `bpp` is not a positive multiple of 8.
///
/// # Examples
/**
```rust
use latte_tiling::TileMode;
use latte_tiling::surface::{surface_info, DataFormat, SurfaceDescription, SurfaceDim, SurfaceUse};

let description = SurfaceDescription {
    tile_mode: TileMode::Macro2DTiledThin1,
    format: DataFormat::Fmt8_8_8_8,
    bpp: 32,
    width: 100,
    height: 100,
    num_slices: 1,
    num_samples: 1,
    num_levels: 1,
    bank_swizzle: 0,
    pipe_swizzle: 0,
    usage: SurfaceUse::TEXTURE,
    dim: SurfaceDim::Texture2D,
};

let info = surface_info(&description, 0);
assert_eq!(128, info.pitch);
assert_eq!(112, info.height);
assert_eq!(57344, info.slice_size);
```
*/
pub fn surface_info(description: &SurfaceDescription, level: usize) -> SurfaceInfo {
    assert!(
        description.bpp > 0 && description.bpp % 8 == 0,
        "Invalid surface bpp {}",
        description.bpp
    );

    let (width, height, num_slices) = mip_extent(description, level);
    let tile_mode = if level > 0 {
        mip_tile_mode(
            description.tile_mode,
            width,
            height,
            num_slices,
            description.dim == SurfaceDim::Texture3D,
        )
    } else {
        description.tile_mode
    };

    if tile_mode == TileMode::LinearSpecial {
        return linear_special_info(description, width, height, num_slices);
    }

    // Mip dimensions are padded to powers of two before alignment. Depth only
    // participates for volume textures where the slice count itself shrinks.
    let (width, height, num_slices) = if level > 0 {
        (
            width.next_power_of_two(),
            height.next_power_of_two(),
            if description.dim == SurfaceDim::Texture3D {
                num_slices.next_power_of_two()
            } else {
                num_slices
            },
        )
    } else {
        (width, height, num_slices)
    };

    let bytes_per_element = description.bpp / 8;
    let pitch_align = pitch_alignment(tile_mode, description.bpp, description.num_samples);
    let height_align = height_alignment(tile_mode);
    let depth_align = depth_alignment(tile_mode);
    let base_align = base_alignment(tile_mode, description.bpp, description.num_samples);

    let pitch = round_up(width, pitch_align);
    let height = round_up(height, height_align);
    let depth = round_up(num_slices, depth_align);

    let slice_size = pitch * height * bytes_per_element;
    let surf_size = slice_size * depth;

    SurfaceInfo {
        tile_mode,
        usage: description.usage,
        bpp: description.bpp,
        pitch,
        height,
        depth,
        surf_size,
        slice_size,
        base_align,
        pitch_align,
        height_align,
        depth_align,
        bank_swizzle: description.bank_swizzle,
        pipe_swizzle: description.pipe_swizzle,
    }
}

/// The unpadded width, height and slice count of a mip level.
pub(crate) fn mip_extent(description: &SurfaceDescription, level: usize) -> (usize, usize, usize) {
    let width = (description.width >> level).max(1);
    let height = (description.height >> level).max(1);
    match description.dim {
        SurfaceDim::Texture1D => (width, 1, 1),
        SurfaceDim::Texture2D => (width, height, 1),
        SurfaceDim::Texture3D => (width, height, (description.num_slices >> level).max(1)),
        SurfaceDim::TextureCube => (width, height, description.num_slices.max(6)),
        SurfaceDim::Texture1DArray => (width, 1, description.num_slices),
        SurfaceDim::Texture2DArray => (width, height, description.num_slices),
        SurfaceDim::Texture2DMsaa => (width, height, 1),
        SurfaceDim::Texture2DMsaaArray => (width, height, description.num_slices),
    }
}

// Mip levels shrink below a macro tile long before the chain ends, at which
// point the hardware stores them micro tiled. Thick volume surfaces also drop
// to the thin variant of their mode once fewer than 4 slices remain.
fn mip_tile_mode(
    tile_mode: TileMode,
    width: usize,
    height: usize,
    num_slices: usize,
    is_3d: bool,
) -> TileMode {
    if !tile_mode.is_macro_tiled() {
        return tile_mode;
    }

    let macro_tile_width = tile_mode.macro_tile_width() * MICRO_TILE_WIDTH;
    let macro_tile_height = tile_mode.macro_tile_height() * MICRO_TILE_HEIGHT;

    if width < macro_tile_width || height < macro_tile_height {
        if tile_mode.micro_tile_thickness() == 4 && !is_3d {
            return TileMode::Micro1DTiledThick;
        }
        return TileMode::Micro1DTiledThin1;
    }

    if is_3d && num_slices < 4 {
        match tile_mode {
            TileMode::Macro2DTiledThick => return TileMode::Macro2DTiledThin1,
            TileMode::Macro2BTiledThick => return TileMode::Macro2BTiledThin1,
            TileMode::Macro3DTiledThick => return TileMode::Macro3DTiledThin1,
            TileMode::Macro3BTiledThick => return TileMode::Macro3BTiledThin1,
            _ => (),
        }
    }

    tile_mode
}

fn height_alignment(tile_mode: TileMode) -> usize {
    if tile_mode.is_macro_tiled() {
        tile_mode.macro_tile_height() * MICRO_TILE_HEIGHT
    } else if tile_mode.is_tiled() {
        MICRO_TILE_HEIGHT
    } else {
        1
    }
}

fn pitch_alignment(tile_mode: TileMode, bpp: usize, num_samples: usize) -> usize {
    let bytes_per_element = bpp / 8;
    if tile_mode.is_macro_tiled() {
        let tile_row_bytes = PIPE_INTERLEAVE_BYTES / MICRO_TILE_HEIGHT;
        (tile_row_bytes / (bytes_per_element * num_samples) * NUM_BANKS)
            .max(tile_mode.macro_tile_width() * MICRO_TILE_WIDTH)
    } else if tile_mode.is_tiled() {
        (PIPE_INTERLEAVE_BYTES / (MICRO_TILE_HEIGHT * bytes_per_element * num_samples))
            .max(MICRO_TILE_WIDTH)
    } else if tile_mode == TileMode::LinearAligned {
        (PIPE_INTERLEAVE_BYTES / bytes_per_element).max(64)
    } else {
        1
    }
}

fn depth_alignment(tile_mode: TileMode) -> usize {
    if tile_mode.is_tiled() {
        tile_mode.micro_tile_thickness()
    } else {
        1
    }
}

fn base_alignment(tile_mode: TileMode, bpp: usize, num_samples: usize) -> usize {
    if !tile_mode.is_macro_tiled() {
        return PIPE_INTERLEAVE_BYTES;
    }

    let bytes_per_element = bpp / 8;
    let micro_tile_bytes = MICRO_TILE_WIDTH
        * MICRO_TILE_HEIGHT
        * tile_mode.micro_tile_thickness()
        * bytes_per_element
        * num_samples;
    let macro_tile_bytes =
        tile_mode.macro_tile_width() * tile_mode.macro_tile_height() * micro_tile_bytes;
    macro_tile_bytes.max(
        pitch_alignment(tile_mode, bpp, num_samples)
            * bytes_per_element
            * tile_mode.macro_tile_height()
            * MICRO_TILE_HEIGHT
            * num_samples,
    )
}

// LinearSpecial bypasses the tiling units entirely. Sizes follow the element
// grid with no alignment, and block compressed formats divide the dimensions
// down to whole blocks first.
fn linear_special_info(
    description: &SurfaceDescription,
    width: usize,
    height: usize,
    num_slices: usize,
) -> SurfaceInfo {
    let element_size = if description.format.is_block_compressed() {
        4
    } else {
        1
    };
    let bytes_per_element = description.bpp / 8;

    let pitch = (round_up(width, element_size) / element_size).max(1);
    let height = (round_up(height, element_size) / element_size).max(1);
    let depth = num_slices;

    let surf_size = pitch * height * description.num_samples * depth * bytes_per_element;
    let slice_size = surf_size / depth.max(1);

    SurfaceInfo {
        tile_mode: TileMode::LinearSpecial,
        usage: description.usage,
        bpp: description.bpp,
        pitch,
        height,
        depth,
        surf_size,
        slice_size,
        base_align: 1,
        pitch_align: 1,
        height_align: 1,
        depth_align: 1,
        bank_swizzle: description.bank_swizzle,
        pipe_swizzle: description.pipe_swizzle,
    }
}

/// The padded byte size of the base level including every slice.
///
/// Thick tile modes pad the slice count, so the result can cover more slices
/// than `num_slices`.
pub fn image_size(description: &SurfaceDescription) -> usize {
    surface_info(description, 0).surf_size
}

/// The padded byte size of the mip chain for levels 1 and up.
pub fn mipmap_size(description: &SurfaceDescription) -> usize {
    let mut size = 0;
    for level in 1..description.num_levels {
        let info = surface_info(description, level);
        size = round_up(size, info.base_align);
        size += info.surf_size;
    }
    size
}

/// The byte offset of a mip level inside the mip chain buffer.
///
/// Level 1 starts the chain at offset 0 and each following level begins at
/// the next multiple of its own base alignment.
///
/// # Panics
/// Panics if `level` is 0 or not below `num_levels`.
pub fn mip_offset(description: &SurfaceDescription, level: usize) -> usize {
    assert!(
        level >= 1 && level < description.num_levels,
        "Mip level {} out of range",
        level
    );

    let mut offset = 0;
    for current in 1..level {
        let info = surface_info(description, current);
        offset = round_up(offset, info.base_align) + info.surf_size;
    }
    round_up(offset, surface_info(description, level).base_align)
}

/// Untiles every slice of the base level.
///
/// `untiled` receives the slices in row major element order while keeping the
/// padded pitch and height from [surface_info]. Sizing both buffers with
/// [image_size] always fits; linear surfaces are copied through unchanged.
///
/// # Panics
/// Panics for multisample surfaces and for bits per element the kernels do
/// not support.
pub fn untile_image(
    description: &SurfaceDescription,
    tiled: &[u8],
    untiled: &mut [u8],
) -> Result<(), TileError> {
    check_single_sample(description);
    let (params, num_slices) = level_params(description, 0);
    retile_window::<true>(&params, tiled, untiled, 0, 0, num_slices)
}

/// Untiles a single slice of the base level.
///
/// Both buffers span the whole image as in [untile_image]; only the bytes of
/// `slice` are written.
///
/// # Panics
/// Panics if `slice` is out of range, in addition to the [untile_image]
/// conditions.
pub fn untile_image_slice(
    description: &SurfaceDescription,
    tiled: &[u8],
    untiled: &mut [u8],
    slice: usize,
) -> Result<(), TileError> {
    check_single_sample(description);
    let (params, num_slices) = level_params(description, 0);
    assert!(
        slice < num_slices,
        "Slice {} out of range for {} slices",
        slice,
        num_slices
    );
    retile_window::<true>(&params, tiled, untiled, 0, slice, 1)
}

/// Untiles every slice of every mip level above the base.
///
/// Levels keep their [mip_offset] positions in both buffers, so sizing both
/// with [mipmap_size] always fits. Returns an error as soon as one level does
/// not fit.
///
/// # Panics
/// Panics for multisample surfaces and for bits per element the kernels do
/// not support.
pub fn untile_mipmaps(
    description: &SurfaceDescription,
    tiled: &[u8],
    untiled: &mut [u8],
) -> Result<(), TileError> {
    check_single_sample(description);
    let mut offset = 0;
    for level in 1..description.num_levels {
        let info = surface_info(description, level);
        let params = retile_info(&info);
        let (_, _, num_slices) = mip_extent(description, level);

        offset = round_up(offset, info.base_align);
        retile_window::<true>(&params, tiled, untiled, offset, 0, num_slices)?;
        offset += info.surf_size;
    }
    Ok(())
}

/// Untiles every slice of a single mip level.
///
/// Both buffers span the whole mip chain as in [untile_mipmaps]; only the
/// bytes of `level` are written.
///
/// # Panics
/// Panics if `level` is 0 or not below `num_levels`, in addition to the
/// [untile_mipmaps] conditions.
pub fn untile_mip(
    description: &SurfaceDescription,
    tiled: &[u8],
    untiled: &mut [u8],
    level: usize,
) -> Result<(), TileError> {
    check_single_sample(description);
    let offset = mip_offset(description, level);
    let (params, num_slices) = level_params(description, level);
    retile_window::<true>(&params, tiled, untiled, offset, 0, num_slices)
}

/// Untiles a single slice of a single mip level.
///
/// # Panics
/// Panics if `slice` is out of range for the level, in addition to the
/// [untile_mip] conditions.
pub fn untile_mip_slice(
    description: &SurfaceDescription,
    tiled: &[u8],
    untiled: &mut [u8],
    level: usize,
    slice: usize,
) -> Result<(), TileError> {
    check_single_sample(description);
    let offset = mip_offset(description, level);
    let (params, num_slices) = level_params(description, level);
    assert!(
        slice < num_slices,
        "Slice {} out of range for {} slices",
        slice,
        num_slices
    );
    retile_window::<true>(&params, tiled, untiled, offset, slice, 1)
}

/// Tiles every slice of the base level, the inverse of [untile_image].
///
/// # Panics
/// Panics for multisample surfaces and for bits per element the kernels do
/// not support.
pub fn tile_image(
    description: &SurfaceDescription,
    untiled: &[u8],
    tiled: &mut [u8],
) -> Result<(), TileError> {
    check_single_sample(description);
    let (params, num_slices) = level_params(description, 0);
    retile_window::<false>(&params, untiled, tiled, 0, 0, num_slices)
}

/// Tiles every mip level above the base, the inverse of [untile_mipmaps].
///
/// # Panics
/// Panics for multisample surfaces and for bits per element the kernels do
/// not support.
pub fn tile_mipmaps(
    description: &SurfaceDescription,
    untiled: &[u8],
    tiled: &mut [u8],
) -> Result<(), TileError> {
    check_single_sample(description);
    let mut offset = 0;
    for level in 1..description.num_levels {
        let info = surface_info(description, level);
        let params = retile_info(&info);
        let (_, _, num_slices) = mip_extent(description, level);

        offset = round_up(offset, info.base_align);
        retile_window::<false>(&params, untiled, tiled, offset, 0, num_slices)?;
        offset += info.surf_size;
    }
    Ok(())
}

fn check_single_sample(description: &SurfaceDescription) {
    assert_eq!(
        1, description.num_samples,
        "Multisample surfaces are not supported"
    );
}

fn level_params(description: &SurfaceDescription, level: usize) -> (RetileInfo, usize) {
    let info = surface_info(description, level);
    let (_, _, num_slices) = mip_extent(description, level);
    (retile_info(&info), num_slices)
}

// Cuts the slice range windows out of whole resource buffers and runs the
// kernel on them. `offset` positions the level inside a mip chain buffer and
// is 0 for the base image. The tiled window is widened to whole thick slice
// groups as the kernels require.
fn retile_window<const UNTILE: bool>(
    params: &RetileInfo,
    source: &[u8],
    destination: &mut [u8],
    offset: usize,
    first_slice: usize,
    num_slices: usize,
) -> Result<(), TileError> {
    let thin_slice_bytes = params.thin_slice_bytes;
    let thickness = params.micro_tile_thickness;

    let tiled_start = offset + round_down(first_slice, thickness) * thin_slice_bytes;
    let tiled_end = offset + round_up(first_slice + num_slices, thickness) * thin_slice_bytes;
    let untiled_start = offset + first_slice * thin_slice_bytes;
    let untiled_end = untiled_start + num_slices * thin_slice_bytes;

    if UNTILE {
        check_len(source, tiled_end)?;
        check_len(destination, untiled_end)?;
        untile(
            params,
            &source[tiled_start..tiled_end],
            &mut destination[untiled_start..untiled_end],
            first_slice,
            num_slices,
        )
    } else {
        check_len(source, untiled_end)?;
        check_len(destination, tiled_end)?;
        tile(
            params,
            &source[untiled_start..untiled_end],
            &mut destination[tiled_start..tiled_end],
            first_slice,
            num_slices,
        )
    }
}

pub(crate) fn check_len(buffer: &[u8], expected_size: usize) -> Result<(), TileError> {
    if buffer.len() < expected_size {
        return Err(TileError::NotEnoughData {
            expected_size,
            actual_size: buffer.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const ALL_TILE_MODES: [TileMode; 17] = [
        TileMode::LinearGeneral,
        TileMode::LinearAligned,
        TileMode::Micro1DTiledThin1,
        TileMode::Micro1DTiledThick,
        TileMode::Macro2DTiledThin1,
        TileMode::Macro2DTiledThin2,
        TileMode::Macro2DTiledThin4,
        TileMode::Macro2DTiledThick,
        TileMode::Macro2BTiledThin1,
        TileMode::Macro2BTiledThin2,
        TileMode::Macro2BTiledThin4,
        TileMode::Macro2BTiledThick,
        TileMode::Macro3DTiledThin1,
        TileMode::Macro3DTiledThick,
        TileMode::Macro3BTiledThin1,
        TileMode::Macro3BTiledThick,
        TileMode::LinearSpecial,
    ];

    fn description(
        tile_mode: TileMode,
        bpp: usize,
        width: usize,
        height: usize,
        num_slices: usize,
        num_levels: usize,
        dim: SurfaceDim,
    ) -> SurfaceDescription {
        SurfaceDescription {
            tile_mode,
            format: DataFormat::Invalid,
            bpp,
            width,
            height,
            num_slices,
            num_samples: 1,
            num_levels,
            bank_swizzle: 0,
            pipe_swizzle: 0,
            usage: SurfaceUse::TEXTURE,
            dim,
        }
    }

    #[test]
    fn aligned_dimensions_cover_every_mode() {
        for tile_mode in ALL_TILE_MODES {
            for bpp in [8, 32, 128] {
                let desc = description(tile_mode, bpp, 97, 53, 5, 1, SurfaceDim::Texture2DArray);
                let info = surface_info(&desc, 0);

                assert!(info.pitch >= 97, "{:?} {}", tile_mode, bpp);
                assert!(info.height >= 53, "{:?} {}", tile_mode, bpp);
                assert!(info.depth >= 5, "{:?} {}", tile_mode, bpp);
                assert_eq!(0, info.pitch % info.pitch_align);
                assert_eq!(0, info.height % info.height_align);
                assert_eq!(0, info.depth % info.depth_align);
                assert_eq!(info.slice_size, info.pitch * info.height * bpp / 8);
                assert_eq!(info.surf_size, info.slice_size * info.depth);
            }
        }
    }

    #[test]
    fn macro_thin1_layout_values() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            256,
            256,
            1,
            1,
            SurfaceDim::Texture2D,
        );
        let info = surface_info(&desc, 0);

        assert_eq!(256, info.pitch);
        assert_eq!(256, info.height);
        assert_eq!(1, info.depth);
        assert_eq!(262144, info.slice_size);
        assert_eq!(262144, info.surf_size);
        assert_eq!(32, info.pitch_align);
        assert_eq!(16, info.height_align);
        assert_eq!(2048, info.base_align);
    }

    #[test]
    fn linear_aligned_row_pitch() {
        let desc = description(
            TileMode::LinearAligned,
            32,
            100,
            40,
            1,
            1,
            SurfaceDim::Texture2D,
        );
        let info = surface_info(&desc, 0);

        assert_eq!(128, info.pitch);
        assert_eq!(40, info.height);
        assert_eq!(20480, info.slice_size);
        assert_eq!(256, info.base_align);
    }

    #[test]
    fn micro_tiled_pitch_alignment() {
        let desc = description(
            TileMode::Micro1DTiledThin1,
            8,
            60,
            60,
            1,
            1,
            SurfaceDim::Texture2D,
        );
        let info = surface_info(&desc, 0);

        assert_eq!(32, info.pitch_align);
        assert_eq!(64, info.pitch);
        assert_eq!(64, info.height);
        assert_eq!(4096, info.slice_size);
        assert_eq!(256, info.base_align);
    }

    #[test]
    fn thick_modes_pad_depth() {
        let desc = description(
            TileMode::Micro1DTiledThick,
            32,
            32,
            32,
            6,
            1,
            SurfaceDim::Texture2DArray,
        );
        let info = surface_info(&desc, 0);

        assert_eq!(8, info.depth);
        assert_eq!(4096, info.slice_size);
        assert_eq!(32768, info.surf_size);
        assert_eq!(32768, image_size(&desc));
    }

    #[test]
    fn mip_dimensions_round_up_to_pow2() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            338,
            309,
            1,
            3,
            SurfaceDim::Texture2D,
        );

        let level1 = surface_info(&desc, 1);
        assert_eq!(TileMode::Macro2DTiledThin1, level1.tile_mode);
        assert_eq!(256, level1.pitch);
        assert_eq!(256, level1.height);

        let level2 = surface_info(&desc, 2);
        assert_eq!(128, level2.pitch);
        assert_eq!(128, level2.height);
    }

    #[test]
    fn small_mips_fall_back_to_micro_tiling() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            256,
            256,
            1,
            6,
            SurfaceDim::Texture2D,
        );
        assert_eq!(
            TileMode::Macro2DTiledThin1,
            surface_info(&desc, 3).tile_mode
        );
        assert_eq!(
            TileMode::Micro1DTiledThin1,
            surface_info(&desc, 4).tile_mode
        );

        // The fallback decision uses the shifted dimensions before the power
        // of two padding, otherwise 48 >> 1 = 24 would be padded to 32 and
        // stay macro tiled.
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            48,
            48,
            1,
            2,
            SurfaceDim::Texture2D,
        );
        assert_eq!(
            TileMode::Micro1DTiledThin1,
            surface_info(&desc, 1).tile_mode
        );

        let desc = description(
            TileMode::Macro2BTiledThick,
            32,
            256,
            256,
            8,
            6,
            SurfaceDim::Texture2DArray,
        );
        assert_eq!(
            TileMode::Micro1DTiledThick,
            surface_info(&desc, 4).tile_mode
        );
    }

    #[test]
    fn thick_3d_mips_switch_to_thin_below_four_slices() {
        let desc = description(
            TileMode::Macro2DTiledThick,
            32,
            256,
            256,
            16,
            5,
            SurfaceDim::Texture3D,
        );

        let level2 = surface_info(&desc, 2);
        assert_eq!(TileMode::Macro2DTiledThick, level2.tile_mode);
        assert_eq!(4, level2.depth);

        let level3 = surface_info(&desc, 3);
        assert_eq!(TileMode::Macro2DTiledThin1, level3.tile_mode);
        assert_eq!(2, level3.depth);

        let desc = SurfaceDescription {
            tile_mode: TileMode::Macro3BTiledThick,
            ..desc
        };
        assert_eq!(
            TileMode::Macro3BTiledThin1,
            surface_info(&desc, 3).tile_mode
        );
    }

    #[test]
    fn cube_mips_keep_six_faces() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            128,
            128,
            6,
            3,
            SurfaceDim::TextureCube,
        );

        assert_eq!(6, surface_info(&desc, 0).depth);
        let level2 = surface_info(&desc, 2);
        assert_eq!(TileMode::Macro2DTiledThin1, level2.tile_mode);
        assert_eq!(6, level2.depth);
    }

    #[test]
    fn mip_offsets_respect_base_alignment() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            128,
            128,
            1,
            5,
            SurfaceDim::Texture2D,
        );

        // Levels 1 and 2 stay macro tiled, 3 and 4 fall back to micro tiling
        // with a smaller base alignment.
        assert_eq!(0, mip_offset(&desc, 1));
        assert_eq!(16384, mip_offset(&desc, 2));
        assert_eq!(20480, mip_offset(&desc, 3));
        assert_eq!(21504, mip_offset(&desc, 4));
        assert_eq!(21760, mipmap_size(&desc));
    }

    #[test]
    fn mipmap_size_covers_the_last_level() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            128,
            128,
            1,
            5,
            SurfaceDim::Texture2D,
        );
        assert_eq!(
            mipmap_size(&desc),
            mip_offset(&desc, 4) + surface_info(&desc, 4).surf_size
        );
    }

    #[test]
    #[should_panic(expected = "Mip level")]
    fn mip_offset_rejects_the_base_level() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            128,
            128,
            1,
            5,
            SurfaceDim::Texture2D,
        );
        mip_offset(&desc, 0);
    }

    #[test]
    fn image_round_trips_through_tiling() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            200,
            120,
            1,
            1,
            SurfaceDim::Texture2D,
        );
        let size = image_size(&desc);
        assert_eq!(114688, size);

        let mut rng = StdRng::from_seed([31u8; 32]);
        let untiled: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let mut tiled = vec![0u8; size];
        tile_image(&desc, &untiled, &mut tiled).unwrap();
        assert_ne!(untiled, tiled);

        let mut output = vec![0u8; size];
        untile_image(&desc, &tiled, &mut output).unwrap();
        assert_eq!(untiled, output);
    }

    #[test]
    fn thick_volume_round_trips() {
        let desc = description(
            TileMode::Macro2DTiledThick,
            64,
            40,
            40,
            6,
            1,
            SurfaceDim::Texture3D,
        );
        let info = surface_info(&desc, 0);
        assert_eq!(24576, info.slice_size);
        assert_eq!(8, info.depth);

        // Only the unpadded 6 slices carry data, the padding slices stay 0.
        let data_size = 6 * info.slice_size;
        let mut rng = StdRng::from_seed([37u8; 32]);
        let mut untiled = vec![0u8; data_size];
        rng.fill(&mut untiled[..]);

        let mut tiled = vec![0u8; image_size(&desc)];
        tile_image(&desc, &untiled, &mut tiled).unwrap();

        let mut output = vec![0u8; data_size];
        untile_image(&desc, &tiled, &mut output).unwrap();
        assert_eq!(untiled, output);
    }

    #[test]
    fn untile_image_slice_matches_full_untile() {
        let desc = description(
            TileMode::Macro2DTiledThick,
            64,
            40,
            40,
            6,
            1,
            SurfaceDim::Texture3D,
        );
        let info = surface_info(&desc, 0);
        let data_size = 6 * info.slice_size;

        let mut rng = StdRng::from_seed([41u8; 32]);
        let untiled: Vec<u8> = (0..data_size).map(|_| rng.gen()).collect();
        let mut tiled = vec![0u8; image_size(&desc)];
        tile_image(&desc, &untiled, &mut tiled).unwrap();

        let mut full = vec![0u8; data_size];
        untile_image(&desc, &tiled, &mut full).unwrap();

        for slice in [0, 3, 5] {
            let mut output = vec![0u8; data_size];
            untile_image_slice(&desc, &tiled, &mut output, slice).unwrap();

            let window = slice * info.slice_size..(slice + 1) * info.slice_size;
            assert_eq!(full[window.clone()], output[window.clone()]);
            assert!(output[..window.start].iter().all(|&value| value == 0));
            assert!(output[window.end..].iter().all(|&value| value == 0));
        }
    }

    #[test]
    fn mipmaps_round_trip_through_tiling() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            128,
            128,
            1,
            5,
            SurfaceDim::Texture2D,
        );
        let size = mipmap_size(&desc);

        let mut rng = StdRng::from_seed([43u8; 32]);
        let untiled: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let mut tiled = vec![0u8; size];
        tile_mipmaps(&desc, &untiled, &mut tiled).unwrap();

        let mut output = vec![0u8; size];
        untile_mipmaps(&desc, &tiled, &mut output).unwrap();
        assert_eq!(untiled, output);
    }

    #[test]
    fn untile_mip_matches_chain_untile() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            64,
            64,
            4,
            3,
            SurfaceDim::Texture2DArray,
        );
        let size = mipmap_size(&desc);
        assert_eq!(20480, size);

        let mut rng = StdRng::from_seed([47u8; 32]);
        let untiled: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let mut tiled = vec![0u8; size];
        tile_mipmaps(&desc, &untiled, &mut tiled).unwrap();

        let mut full = vec![0u8; size];
        untile_mipmaps(&desc, &tiled, &mut full).unwrap();
        assert_eq!(untiled, full);

        let offset = mip_offset(&desc, 2);
        let level2 = surface_info(&desc, 2);

        let mut output = vec![0u8; size];
        untile_mip(&desc, &tiled, &mut output, 2).unwrap();
        assert_eq!(full[offset..], output[offset..]);
        assert!(output[..offset].iter().all(|&value| value == 0));

        let mut output = vec![0u8; size];
        untile_mip_slice(&desc, &tiled, &mut output, 2, 3).unwrap();
        let window = offset + 3 * level2.slice_size..offset + 4 * level2.slice_size;
        assert_eq!(full[window.clone()], output[window]);
    }

    #[test]
    fn volume_mip_padding_slices_stay_zeroed() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            64,
            64,
            6,
            2,
            SurfaceDim::Texture3D,
        );

        // Level 1 shrinks to 3 slices and pads the depth to 4. Only the
        // unpadded slices move through retiling, the padding slice is never
        // written on either side.
        let level1 = surface_info(&desc, 1);
        assert_eq!(4, level1.depth);
        let data_size = 3 * level1.slice_size;

        let size = mipmap_size(&desc);
        assert_eq!(16384, size);

        let mut rng = StdRng::from_seed([53u8; 32]);
        let mut untiled = vec![0u8; size];
        rng.fill(&mut untiled[..data_size]);

        let mut tiled = vec![0u8; size];
        tile_mipmaps(&desc, &untiled, &mut tiled).unwrap();
        assert!(tiled[data_size..].iter().all(|&value| value == 0));

        let mut output = vec![0u8; size];
        untile_mip(&desc, &tiled, &mut output, 1).unwrap();
        assert_eq!(untiled, output);
    }

    #[test]
    fn short_buffers_return_not_enough_data() {
        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            200,
            120,
            1,
            1,
            SurfaceDim::Texture2D,
        );
        let tiled = vec![0u8; image_size(&desc)];
        let mut untiled = vec![0u8; image_size(&desc)];

        assert_eq!(
            Err(TileError::NotEnoughData {
                expected_size: 114688,
                actual_size: 1000
            }),
            untile_image(&desc, &tiled[..1000], &mut untiled)
        );
        assert_eq!(
            Err(TileError::NotEnoughData {
                expected_size: 114688,
                actual_size: 114687
            }),
            untile_image(&desc, &tiled, &mut untiled[..114687])
        );
        assert_eq!(
            Err(TileError::NotEnoughData {
                expected_size: 114688,
                actual_size: 1000
            }),
            tile_image(&desc, &untiled[..1000], &mut tiled.clone())
        );

        let desc = description(
            TileMode::Macro2DTiledThin1,
            32,
            128,
            128,
            1,
            5,
            SurfaceDim::Texture2D,
        );
        let tiled = vec![0u8; mipmap_size(&desc) - 1];
        let mut untiled = vec![0u8; mipmap_size(&desc)];
        assert_eq!(
            Err(TileError::NotEnoughData {
                expected_size: 21760,
                actual_size: 21759
            }),
            untile_mipmaps(&desc, &tiled, &mut untiled)
        );
    }

    #[test]
    #[should_panic(expected = "Multisample")]
    fn multisample_surfaces_panic() {
        let desc = SurfaceDescription {
            num_samples: 2,
            ..description(
                TileMode::Macro2DTiledThin1,
                32,
                64,
                64,
                1,
                1,
                SurfaceDim::Texture2DMsaa,
            )
        };
        let tiled = vec![0u8; 16];
        let mut untiled = vec![0u8; 16];
        let _ = untile_image(&desc, &tiled, &mut untiled);
    }

    #[test]
    fn data_format_codes_round_trip() {
        let formats = [
            (DataFormat::Invalid, 0x00),
            (DataFormat::Fmt8, 0x01),
            (DataFormat::Fmt3_3_2, 0x03),
            (DataFormat::Fmt16Float, 0x06),
            (DataFormat::Fmt5_6_5, 0x08),
            (DataFormat::Fmt8_8_8_8, 0x1A),
            (DataFormat::Fmt32_32Float, 0x1E),
            (DataFormat::Fmt16_16_16_16Float, 0x20),
            (DataFormat::Fmt32_32_32_32Float, 0x23),
            (DataFormat::Fmt1, 0x25),
            (DataFormat::FmtBc1, 0x31),
            (DataFormat::FmtBc5, 0x35),
            (DataFormat::FmtCtx1, 0x3E),
        ];
        for (format, value) in formats {
            assert_eq!(Some(format), DataFormat::new(value));
            assert_eq!(value, format as u32);
        }

        for value in [0x04, 0x21, 0x24, 0x26, 0x3F, 0x100] {
            assert_eq!(None, DataFormat::new(value));
        }

        assert!(DataFormat::FmtBc1.is_block_compressed());
        assert!(DataFormat::FmtBc5.is_block_compressed());
        assert!(!DataFormat::Fmt8_8_8_8.is_block_compressed());
        assert!(!DataFormat::FmtApc0.is_block_compressed());
        assert!(!DataFormat::FmtCtx1.is_block_compressed());
    }

    #[test]
    fn linear_special_sizes_block_elements() {
        let desc = SurfaceDescription {
            format: DataFormat::FmtBc1,
            ..description(
                TileMode::LinearSpecial,
                64,
                64,
                64,
                1,
                1,
                SurfaceDim::Texture2D,
            )
        };
        let info = surface_info(&desc, 0);
        assert_eq!(16, info.pitch);
        assert_eq!(16, info.height);
        assert_eq!(2048, info.surf_size);
        assert_eq!(2048, info.slice_size);
        assert_eq!(1, info.base_align);
        assert_eq!(1, info.pitch_align);

        // Block dimensions round up for sizes that are not multiples of 4.
        let desc = SurfaceDescription {
            format: DataFormat::FmtBc3,
            bpp: 128,
            width: 70,
            height: 30,
            ..desc
        };
        let info = surface_info(&desc, 0);
        assert_eq!(18, info.pitch);
        assert_eq!(8, info.height);
        assert_eq!(2304, info.surf_size);

        let desc = SurfaceDescription {
            format: DataFormat::Fmt8_8_8_8,
            bpp: 32,
            ..desc
        };
        let info = surface_info(&desc, 0);
        assert_eq!(70, info.pitch);
        assert_eq!(30, info.height);
        assert_eq!(8400, info.surf_size);
    }

    #[test]
    fn linear_special_mips_skip_pow2_padding() {
        let desc = SurfaceDescription {
            format: DataFormat::FmtBc1,
            ..description(
                TileMode::LinearSpecial,
                64,
                20,
                20,
                6,
                2,
                SurfaceDim::Texture3D,
            )
        };
        let info = surface_info(&desc, 1);

        assert_eq!(TileMode::LinearSpecial, info.tile_mode);
        assert_eq!(3, info.pitch);
        assert_eq!(3, info.height);
        assert_eq!(3, info.depth);
        assert_eq!(216, info.surf_size);
        assert_eq!(72, info.slice_size);
    }

    #[test]
    fn surface_use_flag_queries() {
        assert_eq!(0, SurfaceUse::NONE.bits());
        assert_eq!(3, (SurfaceUse::TEXTURE | SurfaceUse::COLOR_BUFFER).bits());
        assert!(SurfaceUse::DEPTH_BUFFER.is_depth_buffer());
        assert!((SurfaceUse::TEXTURE | SurfaceUse::DEPTH_BUFFER).is_depth_buffer());
        assert!(!SurfaceUse::TEXTURE.is_depth_buffer());
        assert!(SurfaceUse::from_bits(4).is_depth_buffer());
    }
}
