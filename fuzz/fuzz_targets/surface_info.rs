#![no_main]
use libfuzzer_sys::fuzz_target;

extern crate arbitrary;
use arbitrary::{Arbitrary, Result, Unstructured};

use latte_tiling::surface::{
    image_size, mip_offset, mipmap_size, surface_info, DataFormat, SurfaceDescription, SurfaceUse,
};
use latte_tiling::unpitch::{unpitched_image_size, unpitched_mipmap_size};

#[derive(Debug)]
struct Input {
    description: SurfaceDescription,
}

impl<'a> Arbitrary<'a> for Input {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let depth_buffer: bool = u.arbitrary()?;
        let bpp = if depth_buffer {
            *u.choose(&[16usize, 32, 64])?
        } else {
            *u.choose(&[8usize, 16, 32, 64, 128])?
        };

        Ok(Input {
            description: SurfaceDescription {
                tile_mode: u.arbitrary()?,
                format: DataFormat::Invalid,
                bpp,
                width: u.int_in_range(1..=4096)?,
                height: u.int_in_range(1..=4096)?,
                num_slices: u.int_in_range(1..=64)?,
                num_samples: 1,
                num_levels: u.int_in_range(1..=13)?,
                bank_swizzle: u.int_in_range(0..=3)?,
                pipe_swizzle: u.int_in_range(0..=1)?,
                usage: if depth_buffer {
                    SurfaceUse::DEPTH_BUFFER
                } else {
                    SurfaceUse::TEXTURE
                },
                dim: u.arbitrary()?,
            },
        })
    }
}

fuzz_target!(|input: Input| {
    let description = &input.description;

    // The layout math should never panic for a supported description, and
    // the padded dimensions must stay multiples of their alignments.
    for level in 0..description.num_levels {
        let info = surface_info(description, level);
        assert_eq!(0, info.pitch % info.pitch_align);
        assert_eq!(0, info.height % info.height_align);
        assert_eq!(0, info.depth % info.depth_align);
        assert_eq!(info.surf_size, info.slice_size * info.depth);
    }

    image_size(description);
    mipmap_size(description);
    unpitched_image_size(description);
    unpitched_mipmap_size(description);

    if description.num_levels > 1 {
        mip_offset(description, description.num_levels - 1);
    }
});
