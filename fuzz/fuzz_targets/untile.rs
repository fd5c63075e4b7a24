#![no_main]
use libfuzzer_sys::fuzz_target;

extern crate arbitrary;
use arbitrary::{Arbitrary, Result, Unstructured};

use latte_tiling::surface::{
    untile_image, untile_mipmaps, DataFormat, SurfaceDescription, SurfaceUse,
};
use latte_tiling::unpitch::{unpitch_image, unpitch_mipmaps};

#[derive(Debug)]
struct Input {
    description: SurfaceDescription,
    source_size: usize,
    destination_size: usize,
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
                width: u.int_in_range(1..=256)?,
                height: u.int_in_range(1..=256)?,
                num_slices: u.int_in_range(1..=16)?,
                num_samples: 1,
                num_levels: u.int_in_range(1..=8)?,
                bank_swizzle: u.int_in_range(0..=3)?,
                pipe_swizzle: u.int_in_range(0..=1)?,
                usage: if depth_buffer {
                    SurfaceUse::DEPTH_BUFFER
                } else {
                    SurfaceUse::TEXTURE
                },
                dim: u.arbitrary()?,
            },
            source_size: u.int_in_range(0..=16777216)?,
            destination_size: u.int_in_range(0..=16777216)?,
        })
    }
}

fuzz_target!(|input: Input| {
    let source = vec![0u8; input.source_size];
    let mut destination = vec![0u8; input.destination_size];

    // These should return an error instead of panicking even when the
    // buffer sizes are incorrect.
    let _ = untile_image(&input.description, &source, &mut destination);
    let _ = untile_mipmaps(&input.description, &source, &mut destination);
    let _ = unpitch_image(&input.description, &source, &mut destination);
    let _ = unpitch_mipmaps(&input.description, &source, &mut destination);
});
