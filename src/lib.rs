//! # latte_tiling
//! latte_tiling is an unofficial CPU and GPU implementation of surface memory
//! tiling for the Wii U's Latte GPU.
//!
//! # Getting Started
//! The following example demonstrates untiling a 2D RGBA8 texture stored with
//! the most common macro tiled layout. Tiled data would normally come from a
//! GX2 texture resource in emulated memory or a dumped file.
/*!
```rust
use latte_tiling::TileMode;
use latte_tiling::surface::{
    image_size, untile_image, DataFormat, SurfaceDescription, SurfaceDim, SurfaceUse,
};

# fn main() -> Result<(), latte_tiling::TileError> {
let description = SurfaceDescription {
    tile_mode: TileMode::Macro2DTiledThin1,
    format: DataFormat::Fmt8_8_8_8,
    bpp: 32,
    width: 256,
    height: 256,
    num_slices: 1,
    num_samples: 1,
    num_levels: 1,
    bank_swizzle: 0,
    pipe_swizzle: 0,
    usage: SurfaceUse::TEXTURE,
    dim: SurfaceDim::Texture2D,
};

let tiled = vec![0u8; image_size(&description)];

let mut untiled = vec![0u8; image_size(&description)];
untile_image(&description, &tiled, &mut untiled)?;
# Ok(())
# }
```
*/
//! # Tiled Surfaces
//! The GPU arranges surfaces as a grid of 8x8 pixel micro tiles. Thick modes
//! stack 4 depth slices into each micro tile. Macro tiled modes additionally
//! group micro tiles into macro tiles and spread consecutive tiles across the
//! memory controller's 4 banks and 2 pipes, so the byte order depends on the
//! tile coordinates, the surface's bank/pipe swizzle and, for the bank swapped
//! modes, the pitch. Untiling rewrites the bytes into plain row-major order
//! without interpreting them; tiling is the exact inverse.
//!
//! Tiled pitches, heights and depths are padded to hardware alignments, so a
//! tiled surface is usually larger than its row-major equivalent. Use
//! [unpitch](crate::unpitch) to strip the pitch padding after untiling.
//!
//! # Limitations
//! Tiling kernels operate on single-sample data. Multisample surfaces only
//! contribute their sample count to the alignment math.

pub mod retile;
pub mod surface;
pub mod unpitch;

#[cfg(feature = "gpu")]
pub mod gpu;

// Avoid making this module public to prevent people importing it accidentally.
#[cfg(feature = "ffi")]
mod ffi;

pub use retile::TileError;

pub(crate) const MICRO_TILE_WIDTH: usize = 8;
pub(crate) const MICRO_TILE_HEIGHT: usize = 8;
pub(crate) const NUM_PIPES: usize = 2;
pub(crate) const NUM_BANKS: usize = 4;

pub(crate) const PIPE_INTERLEAVE_BYTES: usize = 256;
pub(crate) const NUM_GROUP_BITS: usize = 8;
pub(crate) const NUM_PIPE_BITS: usize = 1;
pub(crate) const NUM_BANK_BITS: usize = 2;
pub(crate) const GROUP_MASK: usize = (1 << NUM_GROUP_BITS) - 1;

pub(crate) const ROW_SIZE: usize = 2048;
pub(crate) const SWAP_SIZE: usize = 256;
pub(crate) const SPLIT_SIZE: usize = 2048;

/// An enumeration of the hardware tiling layouts.
///
/// The values match the AddrTileMode register encoding, so modes read from
/// GX2 resources can be converted with [TileMode::new].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum TileMode {
    LinearGeneral = 0x00,
    LinearAligned = 0x01,
    Micro1DTiledThin1 = 0x02,
    Micro1DTiledThick = 0x03,
    Macro2DTiledThin1 = 0x04,
    Macro2DTiledThin2 = 0x05,
    Macro2DTiledThin4 = 0x06,
    Macro2DTiledThick = 0x07,
    Macro2BTiledThin1 = 0x08,
    Macro2BTiledThin2 = 0x09,
    Macro2BTiledThin4 = 0x0A,
    Macro2BTiledThick = 0x0B,
    Macro3DTiledThin1 = 0x0C,
    Macro3DTiledThick = 0x0D,
    Macro3BTiledThin1 = 0x0E,
    Macro3BTiledThick = 0x0F,
    LinearSpecial = 0x10,
}

impl TileMode {
    /// Attempts to convert a register encoded tile mode value.
    pub fn new(value: u32) -> Option<TileMode> {
        match value {
            0x00 => Some(TileMode::LinearGeneral),
            0x01 => Some(TileMode::LinearAligned),
            0x02 => Some(TileMode::Micro1DTiledThin1),
            0x03 => Some(TileMode::Micro1DTiledThick),
            0x04 => Some(TileMode::Macro2DTiledThin1),
            0x05 => Some(TileMode::Macro2DTiledThin2),
            0x06 => Some(TileMode::Macro2DTiledThin4),
            0x07 => Some(TileMode::Macro2DTiledThick),
            0x08 => Some(TileMode::Macro2BTiledThin1),
            0x09 => Some(TileMode::Macro2BTiledThin2),
            0x0A => Some(TileMode::Macro2BTiledThin4),
            0x0B => Some(TileMode::Macro2BTiledThick),
            0x0C => Some(TileMode::Macro3DTiledThin1),
            0x0D => Some(TileMode::Macro3DTiledThick),
            0x0E => Some(TileMode::Macro3BTiledThin1),
            0x0F => Some(TileMode::Macro3BTiledThick),
            0x10 => Some(TileMode::LinearSpecial),
            _ => None,
        }
    }

    /// The width of a macro tile in micro tiles.
    pub const fn macro_tile_width(self) -> usize {
        match self {
            TileMode::Macro2DTiledThin2 | TileMode::Macro2BTiledThin2 => 2,
            TileMode::Macro2DTiledThin4 | TileMode::Macro2BTiledThin4 => 1,
            _ if self.is_macro_tiled() => 4,
            _ => 1,
        }
    }

    /// The height of a macro tile in micro tiles.
    pub const fn macro_tile_height(self) -> usize {
        match self {
            TileMode::Macro2DTiledThin2 | TileMode::Macro2BTiledThin2 => 4,
            TileMode::Macro2DTiledThin4 | TileMode::Macro2BTiledThin4 => 8,
            _ if self.is_macro_tiled() => 2,
            _ => 1,
        }
    }

    /// The number of depth slices stored in each micro tile.
    pub const fn micro_tile_thickness(self) -> usize {
        match self {
            TileMode::Micro1DTiledThick
            | TileMode::Macro2DTiledThick
            | TileMode::Macro2BTiledThick
            | TileMode::Macro3DTiledThick
            | TileMode::Macro3BTiledThick => 4,
            _ => 1,
        }
    }

    pub const fn is_tiled(self) -> bool {
        !matches!(
            self,
            TileMode::LinearGeneral | TileMode::LinearAligned | TileMode::LinearSpecial
        )
    }

    pub const fn is_macro_tiled(self) -> bool {
        (self as u32) >= TileMode::Macro2DTiledThin1 as u32
            && (self as u32) <= TileMode::Macro3BTiledThick as u32
    }

    /// Whether the mode belongs to the 3D/3B family with per slice pipe rotation.
    pub const fn is_macro_3x(self) -> bool {
        matches!(
            self,
            TileMode::Macro3DTiledThin1
                | TileMode::Macro3DTiledThick
                | TileMode::Macro3BTiledThin1
                | TileMode::Macro3BTiledThick
        )
    }

    /// Whether consecutive macro tile columns rotate across banks.
    pub const fn is_bank_swapped(self) -> bool {
        matches!(
            self,
            TileMode::Macro2BTiledThin1
                | TileMode::Macro2BTiledThin2
                | TileMode::Macro2BTiledThin4
                | TileMode::Macro2BTiledThick
                | TileMode::Macro3BTiledThin1
                | TileMode::Macro3BTiledThick
        )
    }
}

pub(crate) const fn div_round_up(x: usize, d: usize) -> usize {
    (x + d - 1) / d
}

pub(crate) const fn round_up(x: usize, n: usize) -> usize {
    ((x + n - 1) / n) * n
}

pub(crate) const fn round_down(x: usize, n: usize) -> usize {
    (x / n) * n
}
