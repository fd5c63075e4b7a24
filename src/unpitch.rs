//! Removal of the pitch and height padding from untiled surface data.
//!
//! Untiled data keeps the aligned pitch and height from
//! [surface_info](crate::surface::surface_info), which is rarely what image
//! tools expect. The functions here compact the rows of every slice into a
//! tight unpadded layout. Buffer addressing mirrors the untile functions, so
//! the output of [untile_image](crate::surface::untile_image) and
//! [untile_mipmaps](crate::surface::untile_mipmaps) feeds straight in.

use crate::retile::TileError;
use crate::surface::{check_len, mip_extent, surface_info, SurfaceDescription};
use crate::{round_up, TileMode};

/// The tight byte size of the base level with all padding removed.
pub fn unpitched_image_size(description: &SurfaceDescription) -> usize {
    let (width, height, num_slices) = element_extent(description, 0);
    width * height * num_slices * (description.bpp / 8)
}

/// The tight byte size of mip levels 1 and up with all padding removed.
pub fn unpitched_mipmap_size(description: &SurfaceDescription) -> usize {
    let mut size = 0;
    for level in 1..description.num_levels {
        let (width, height, num_slices) = element_extent(description, level);
        size += width * height * num_slices * (description.bpp / 8);
    }
    size
}

/// Compacts the base level from the padded untiled layout into tight rows.
///
/// `pitched` uses the layout written by
/// [untile_image](crate::surface::untile_image). `unpitched` receives
/// `width * height` elements per slice with no padding between rows, slices
/// or levels; size it with [unpitched_image_size].
pub fn unpitch_image(
    description: &SurfaceDescription,
    pitched: &[u8],
    unpitched: &mut [u8],
) -> Result<(), TileError> {
    let info = surface_info(description, 0);
    let (width, height, num_slices) = element_extent(description, 0);
    let bytes_per_element = description.bpp / 8;
    let row_bytes = width * bytes_per_element;
    let row_stride = info.pitch * bytes_per_element;

    check_len(pitched, num_slices * info.slice_size)?;
    check_len(unpitched, num_slices * height * row_bytes)?;

    for slice in 0..num_slices {
        for row in 0..height {
            let source = slice * info.slice_size + row * row_stride;
            let destination = (slice * height + row) * row_bytes;
            unpitched[destination..destination + row_bytes]
                .copy_from_slice(&pitched[source..source + row_bytes]);
        }
    }
    Ok(())
}

/// Compacts every mip level above the base into tight rows.
///
/// `pitched` uses the layout written by
/// [untile_mipmaps](crate::surface::untile_mipmaps) with levels at their
/// [mip_offset](crate::surface::mip_offset) positions. The output packs the
/// levels back to back; size it with [unpitched_mipmap_size].
pub fn unpitch_mipmaps(
    description: &SurfaceDescription,
    pitched: &[u8],
    unpitched: &mut [u8],
) -> Result<(), TileError> {
    let bytes_per_element = description.bpp / 8;
    let mut source_offset = 0;
    let mut destination_offset = 0;

    for level in 1..description.num_levels {
        let info = surface_info(description, level);
        let (width, height, num_slices) = element_extent(description, level);
        let row_bytes = width * bytes_per_element;
        let row_stride = info.pitch * bytes_per_element;

        source_offset = round_up(source_offset, info.base_align);
        check_len(pitched, source_offset + num_slices * info.slice_size)?;
        check_len(
            unpitched,
            destination_offset + num_slices * height * row_bytes,
        )?;

        for slice in 0..num_slices {
            for row in 0..height {
                let source = source_offset + slice * info.slice_size + row * row_stride;
                let destination = destination_offset + (slice * height + row) * row_bytes;
                unpitched[destination..destination + row_bytes]
                    .copy_from_slice(&pitched[source..source + row_bytes]);
            }
        }

        source_offset += info.surf_size;
        destination_offset += num_slices * height * row_bytes;
    }
    Ok(())
}

// The unpadded level dimensions in elements. LinearSpecial surfaces describe
// block compressed data in texels and address whole 4x4 blocks; every other
// mode already works in elements.
fn element_extent(description: &SurfaceDescription, level: usize) -> (usize, usize, usize) {
    let (width, height, num_slices) = mip_extent(description, level);
    if description.tile_mode == TileMode::LinearSpecial && description.format.is_block_compressed()
    {
        (
            (round_up(width, 4) / 4).max(1),
            (round_up(height, 4) / 4).max(1),
            num_slices,
        )
    } else {
        (width, height, num_slices)
    }
}
